use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Front door (agent-facing JSON-RPC)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// "stdio" or "tcp".
    #[serde(default = "d_transport")]
    pub transport: String,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: d_transport(),
            host: d_host(),
            port: d_port(),
        }
    }
}

fn d_transport() -> String {
    "stdio".into()
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    7433
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin HTTP surface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "d_admin_enabled")]
    pub enabled: bool,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_admin_port")]
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: d_admin_enabled(),
            host: d_host(),
            port: d_admin_port(),
        }
    }
}

fn d_admin_enabled() -> bool {
    true
}
fn d_admin_port() -> u16 {
    7434
}
