//! Shared constants for end-to-end tests
//!
//! When the fixture artifacts change, update the expected predictions here.

// ============================================================================
// Expected predictions for the example record
// ============================================================================

pub const EXAMPLE_VIEWS: &str = "Views: 275,000";

/// The model2 forest yields 150000.6, served rounded.
pub const EXAMPLE_SUBSCRIBERS: &str = "Subscribers: 150,001";

pub const EXAMPLE_CLASS: &str = "Class: high";

pub const EXAMPLE_STATUS: &str = "Status: successful";

// ============================================================================
// Expected predictions for the all-zero record
// ============================================================================

pub const ZERO_VIEWS: &str = "Views: 1,500";

pub const ZERO_SUBSCRIBERS: &str = "Subscribers: 10";

pub const ZERO_CLASS: &str = "Class: low";

pub const ZERO_STATUS: &str = "Status: unsuccessful";

// ============================================================================
// Timeouts
// ============================================================================

/// Max time to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Poll interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
