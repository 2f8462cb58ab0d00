//! Shared constants used across inkdraft crates.

use std::time::Duration;

/// Title substituted for blank titles on load and save.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Untitled Document";

/// Serialized form of the default (single newline) document.
pub const DEFAULT_DOCUMENT_CONTENT: &str = r#"{"ops":[{"insert":"\n"}]}"#;

/// Default autosave quiet period in milliseconds.
pub const DEFAULT_AUTO_SAVE_INTERVAL_MS: u64 = 2_000;

/// Default base URL of the document store API.
pub const DEFAULT_SERVER_URL: &str = "https://localhost:8000/api/v1";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on the shutdown flush of pending saves.
pub const SHUTDOWN_SAVE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a notification stays on screen before the surface drops it.
pub const TOAST_TTL: Duration = Duration::from_secs(3);

/// Maximum number of notifications kept on screen at once.
pub const TOAST_LIMIT: usize = 4;

/// Fallback stem for export artifacts when the title sanitizes to nothing.
pub const DEFAULT_EXPORT_STEM: &str = "document";
