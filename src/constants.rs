//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Maximum number of redirects followed per request
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Number of history entries kept before the oldest is evicted
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Quiet period before environment edits are written to disk
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Directory under the home directory holding config and data files
pub const DATA_DIR_NAME: &str = ".courier";

pub const CONFIG_FILE: &str = "config.yaml";
pub const COLLECTIONS_FILE: &str = "collections.json";
pub const ENVIRONMENT_FILE: &str = "environment.json";
pub const LOG_FILE: &str = "courier.log";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_URLENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Application name
pub const APP_NAME: &str = "Courier";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
