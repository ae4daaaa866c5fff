use serde::{Deserialize, Serialize};

/// Global defaults for the approval gate. Individual route rules may override
/// the timeout; see `RouteRule::approval_timeout_sec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "d_default_timeout_sec")]
    pub default_timeout_sec: u64,

    /// On startup, any persisted approval still `Pending` and older than this
    /// is swept to `Timeout` before the gateway starts serving calls.
    #[serde(default = "d_stale_after_sec")]
    pub stale_after_sec: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_timeout_sec: d_default_timeout_sec(),
            stale_after_sec: d_stale_after_sec(),
        }
    }
}

fn d_default_timeout_sec() -> u64 {
    300
}
fn d_stale_after_sec() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ApprovalConfig::default();
        assert!(cfg.default_timeout_sec > 0);
        assert!(cfg.stale_after_sec >= cfg.default_timeout_sec);
    }
}
