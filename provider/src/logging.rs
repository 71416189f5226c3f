//! Logging setup
//!
//! Plugin hosts set `TF_LOG` to a level name (`TRACE`, `DEBUG`, `INFO`,
//! `WARN`, `ERROR`). `RUST_LOG` takes precedence when set, so individual
//! modules can be turned up. Output goes to stderr; stdout belongs to the host.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn";

/// Filter directive for the given `TF_LOG` and `RUST_LOG` values
pub fn directive(tf_log: Option<&str>, rust_log: Option<&str>) -> String {
    if let Some(rust_log) = rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        return rust_log.to_string();
    }
    match tf_log.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some(level @ ("trace" | "debug" | "info" | "warn" | "error")) => level.to_string(),
        // TF_LOG=JSON or any other truthy value means "log everything"
        Some("") | None => DEFAULT_DIRECTIVE.to_string(),
        Some(_) => "trace".to_string(),
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init() {
    let tf_log = std::env::var("TF_LOG").ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = EnvFilter::try_new(directive(tf_log.as_deref(), rust_log.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // A subscriber may already be installed by the host or an earlier call
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_from_tf_log() {
        assert_eq!(directive(Some("DEBUG"), None), "debug");
        assert_eq!(directive(Some("JSON"), None), "trace");
        assert_eq!(directive(None, None), "warn");
        assert_eq!(directive(Some(""), None), "warn");
    }

    #[test]
    fn test_rust_log_wins() {
        assert_eq!(
            directive(Some("INFO"), Some("softlayer_provider::wait=debug")),
            "softlayer_provider::wait=debug"
        );
        assert_eq!(directive(Some("ERROR"), Some("  ")), "error");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }
}
