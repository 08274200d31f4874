//! Diagnostic logging to standard error, controlled by `CHATCTL_LOG`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

pub const LOG_ENV: &str = "CHATCTL_LOG";

fn filter_from(raw: Option<&str>) -> EnvFilter {
    let directive = match raw.map(str::to_ascii_lowercase).as_deref() {
        Some(level @ ("trace" | "debug" | "info" | "warn" | "error" | "off")) => level.to_string(),
        Some(other) if !other.is_empty() => other.to_string(),
        _ => "warn".to_string(),
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the subscriber once; later calls are no-ops.
pub fn init() {
    if INIT.get().is_some() {
        return;
    }
    let raw = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from(raw.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    let _ = INIT.set(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_warn() {
        assert_eq!(filter_from(None).to_string(), "warn");
        assert_eq!(filter_from(Some("")).to_string(), "warn");
        assert_eq!(filter_from(Some("DEBUG")).to_string(), "debug");
    }

    #[test]
    fn accepts_directives() {
        assert_eq!(filter_from(Some("chatctl=trace")).to_string(), "chatctl=trace");
    }
}
