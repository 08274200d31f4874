//! Names and defaults shared across the crate.

/// Binary name, used in help text and completion scripts.
pub const APP_NAME: &str = "chatctl";

/// Directory under the XDG config home holding the credentials file.
pub const APP_DIR: &str = "chatctl";

pub const CREDENTIALS_FILE: &str = "credentials.yaml";

/// Pre-XDG location, relative to `$HOME`.
pub const LEGACY_CREDENTIALS_FILE: &str = ".chatctl";

/// File name of the local-mode socket inside the runtime directory.
pub const LOCAL_SOCKET_FILE: &str = "chatctl_local.sock";

/// Prefix every server endpoint lives under.
pub const API_PREFIX: &str = "/api/v4";

/// Response header carrying the server build version.
pub const VERSION_HEADER: &str = "x-version-id";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response header carrying the session token after a password login.
pub const TOKEN_HEADER: &str = "token";

/// Poll interval of the job waiter.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Page size used when walking paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server release whose API this client speaks; compared against `X-Version-Id`.
pub const SERVER_API_VERSION: &str = "10.5.0";

pub fn user_agent() -> String {
    format!("{APP_NAME}/{CLIENT_VERSION}")
}
