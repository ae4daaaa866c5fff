use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a downstream tool-serving process is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownstreamTransportKind {
    Stdio,
}

impl Default for DownstreamTransportKind {
    fn default() -> Self {
        DownstreamTransportKind::Stdio
    }
}

/// A single downstream server descriptor. See SPEC_FULL.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamServerConfig {
    pub id: String,
    #[serde(default)]
    pub transport: DownstreamTransportKind,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownstreamConfig {
    #[serde(default)]
    pub servers: Vec<DownstreamServerConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_defaults_to_stdio() {
        let raw = r#"
            id = "fs"
            command = "mcp-fs-server"
        "#;
        let cfg: DownstreamServerConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.transport, DownstreamTransportKind::Stdio);
        assert!(cfg.args.is_empty());
    }
}
