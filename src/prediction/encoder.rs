//! Categorical encoding for `region` and `title_sentiment`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::artifacts::read_json;
use super::error::ArtifactLoadFailure;

/// Id returned for categories that weren't seen at training time.
pub const UNSEEN_CATEGORY_ID: u32 = 0;

pub const DEFAULT_REGION: &str = "unknown";
pub const DEFAULT_SENTIMENT: &str = "neutral";

/// A frozen category -> id mapping.
pub trait CategoryEncoding: Send + Sync {
    /// Id of an already normalized category, `None` when it wasn't fitted.
    fn transform(&self, category: &str) -> Option<u32>;

    /// Number of fitted categories.
    fn len(&self) -> usize;
}

#[derive(Deserialize)]
struct LabelEncodingFile {
    classes: Vec<String>,
}

/// Label encoding where a category's id is its position in the fitted class
/// list.
#[derive(Debug, Clone)]
pub struct LabelEncoding {
    ids: HashMap<String, u32>,
}

impl LabelEncoding {
    pub fn new<I, S>(classes: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = HashMap::new();
        for (position, class) in classes.into_iter().enumerate() {
            let class = class.into();
            let id = u32::try_from(position).map_err(|_| "too many classes".to_owned())?;
            if ids.insert(class.clone(), id).is_some() {
                return Err(format!("duplicate class {class:?}"));
            }
        }
        if ids.is_empty() {
            return Err("no classes".to_owned());
        }
        Ok(LabelEncoding { ids })
    }

    /// Loads `{"classes": [...]}`.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadFailure> {
        let file: LabelEncodingFile = read_json(path)?;
        LabelEncoding::new(file.classes).map_err(|reason| ArtifactLoadFailure::Invalid {
            path: path.to_owned(),
            reason,
        })
    }
}

impl CategoryEncoding for LabelEncoding {
    fn transform(&self, category: &str) -> Option<u32> {
        self.ids.get(category).copied()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Normalizes free-text input and maps it through a [`CategoryEncoding`].
#[derive(Clone)]
pub struct CategoryEncoder {
    encoding: Arc<dyn CategoryEncoding>,
    default_token: &'static str,
}

impl CategoryEncoder {
    pub fn new(encoding: Arc<dyn CategoryEncoding>, default_token: &'static str) -> Self {
        CategoryEncoder {
            encoding,
            default_token,
        }
    }

    pub fn region(encoding: Arc<dyn CategoryEncoding>) -> Self {
        Self::new(encoding, DEFAULT_REGION)
    }

    pub fn sentiment(encoding: Arc<dyn CategoryEncoding>) -> Self {
        Self::new(encoding, DEFAULT_SENTIMENT)
    }

    /// Lower-cases the input, substituting the default token for empty or
    /// missing values. No trimming, `" us"` stays distinct from `"us"`.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        match raw {
            Some(value) if !value.is_empty() => value.to_lowercase(),
            _ => self.default_token.to_owned(),
        }
    }

    /// Never fails: unseen categories map to [`UNSEEN_CATEGORY_ID`].
    pub fn encode(&self, raw: Option<&str>) -> u32 {
        let normalized = self.normalize(raw);
        self.encoding
            .transform(&normalized)
            .unwrap_or(UNSEEN_CATEGORY_ID)
    }

    pub fn category_count(&self) -> usize {
        self.encoding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn regions() -> CategoryEncoder {
        CategoryEncoder::region(Arc::new(
            LabelEncoding::new(["ca", "de", "gb", "in", "unknown", "us"]).unwrap(),
        ))
    }

    #[test]
    fn encodes_case_insensitively() {
        let encoder = regions();
        assert_eq!(encoder.encode(Some("US")), 5);
        assert_eq!(encoder.encode(Some("us")), 5);
        assert_eq!(encoder.encode(Some("Gb")), 2);
        assert_eq!(encoder.encode(Some("ca")), 0);
    }

    #[test]
    fn empty_and_missing_use_default_token() {
        let encoder = regions();
        assert_eq!(encoder.normalize(None), "unknown");
        assert_eq!(encoder.normalize(Some("")), "unknown");
        assert_eq!(encoder.encode(None), 4);
        assert_eq!(encoder.encode(Some("")), 4);
    }

    #[test]
    fn unseen_categories_fall_back() {
        let encoder = regions();
        for raw in ["fr", "mars", " us", "u s", "ÜS"] {
            let id = encoder.encode(Some(raw));
            assert_eq!(id, UNSEEN_CATEGORY_ID, "{raw}");
            assert!((id as usize) < encoder.category_count());
        }
    }

    #[test]
    fn sentiment_default_token_may_be_unseen() {
        let encoder = CategoryEncoder::sentiment(Arc::new(
            LabelEncoding::new(["negative", "positive"]).unwrap(),
        ));
        assert_eq!(encoder.normalize(None), "neutral");
        assert_eq!(encoder.encode(None), UNSEEN_CATEGORY_ID);
        assert_eq!(encoder.encode(Some("POSITIVE")), 1);
    }

    #[test]
    fn rejects_duplicate_or_empty_classes() {
        assert!(LabelEncoding::new(["a", "b", "a"]).is_err());
        assert!(LabelEncoding::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"classes": ["negative", "neutral", "positive"]}}"#).unwrap();
        let encoding = LabelEncoding::load(file.path()).unwrap();
        assert_eq!(encoding.len(), 3);
        assert_eq!(encoding.transform("positive"), Some(2));
        assert_eq!(encoding.transform("Positive"), None);
    }

    #[test]
    fn load_reports_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"classes": ["us", "us"]}}"#).unwrap();
        assert!(matches!(
            LabelEncoding::load(file.path()),
            Err(ArtifactLoadFailure::Invalid { .. })
        ));
    }
}
