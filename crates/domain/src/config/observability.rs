use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Logging configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Structured logging configuration. No network export here (the gateway
/// runs close to its downstream processes and stdio front door, so a
/// collector hop isn't assumed) — just the `tracing-subscriber` filter and
/// output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive string, e.g. `"info,mux_core=debug"`.
    /// When `None`, falls back to `RUST_LOG` or a built-in default.
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit structured JSON log lines instead of the human-readable format.
    #[serde(default = "d_json")]
    pub json: bool,

    /// The `service.name` reported in each log line.
    #[serde(default = "d_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: None,
            json: d_json(),
            service_name: d_service_name(),
        }
    }
}

fn d_json() -> bool {
    true
}

fn d_service_name() -> String {
    "mcplexer".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_explicit_filter() {
        let cfg = ObservabilityConfig::default();
        assert!(cfg.filter.is_none());
    }

    #[test]
    fn default_emits_json() {
        assert!(ObservabilityConfig::default().json);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert!(cfg.filter.is_none());
        assert_eq!(cfg.service_name, "mcplexer");
    }

    #[test]
    fn deserialize_with_filter() {
        let raw = r#"
            filter = "info,mux_core=debug"
            json = false
            service_name = "my-gateway"
        "#;
        let cfg: ObservabilityConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.filter.as_deref(), Some("info,mux_core=debug"));
        assert!(!cfg.json);
        assert_eq!(cfg.service_name, "my-gateway");
    }
}
