use serde::de::DeserializeOwned;
use std::path::Path;

use super::error::ArtifactLoadFailure;

/// Reads and deserializes a JSON artifact, mapping failures to the file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadFailure> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactLoadFailure::Missing(path.to_owned()))
        }
        Err(source) => {
            return Err(ArtifactLoadFailure::Io {
                path: path.to_owned(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| ArtifactLoadFailure::Corrupt {
        path: path.to_owned(),
        source,
    })
}
