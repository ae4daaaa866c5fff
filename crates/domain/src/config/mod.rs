pub mod approval;
pub mod cache;
pub mod downstream;
pub mod observability;
pub mod server;

use serde::{Deserialize, Serialize};

pub use approval::ApprovalConfig;
pub use cache::{CacheConfig, ToolCallCachePolicy};
pub use downstream::{DownstreamConfig, DownstreamServerConfig, DownstreamTransportKind};
pub use observability::ObservabilityConfig;
pub use server::{AdminConfig, ServerConfig};

use crate::model::{RouteRule, Workspace};

/// Top-level, TOML-loadable configuration. One file, loaded once at startup,
/// read via the `MUX_CONFIG` environment variable (falling back to
/// `Config::default()` when unset, the way a dev box with no config on disk
/// still boots).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub tool_call_cache_policies: Vec<ToolCallCachePolicy>,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default)]
    pub routes: Vec<RouteRule>,
    /// Directory the JSON-file store keeps its record files under.
    #[serde(default = "d_state_dir")]
    pub state_dir: String,
}

fn d_state_dir() -> String {
    "./state".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigIssue {
    pub path: String,
    pub message: String,
    pub severity: ConfigSeverity,
}

impl ConfigIssue {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: ConfigSeverity::Error,
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: ConfigSeverity::Warning,
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        write!(f, "[{severity}] {}: {}", self.path, self.message)
    }
}

impl Config {
    /// Structural + cross-referential validation beyond what serde's
    /// `#[serde(default)]` machinery already guarantees. Errors indicate the
    /// gateway should refuse to start; warnings are surfaced but non-fatal.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.transport != "stdio" && self.server.transport != "tcp" {
            issues.push(ConfigIssue::error(
                "server.transport",
                format!("unknown transport {:?}, expected stdio or tcp", self.server.transport),
            ));
        }

        let mut seen_workspace_ids = std::collections::HashSet::new();
        for ws in &self.workspaces {
            if !seen_workspace_ids.insert(ws.id.as_str()) {
                issues.push(ConfigIssue::error(
                    "workspaces",
                    format!("duplicate workspace id {:?}", ws.id),
                ));
            }
            if ws.root_path.is_empty() {
                issues.push(ConfigIssue::error(
                    "workspaces",
                    format!("workspace {:?} has an empty root_path", ws.id),
                ));
            }
        }

        let mut seen_server_ids = std::collections::HashSet::new();
        for server in &self.downstream.servers {
            if !seen_server_ids.insert(server.id.as_str()) {
                issues.push(ConfigIssue::error(
                    "downstream.servers",
                    format!("duplicate downstream server id {:?}", server.id),
                ));
            }
            if server.command.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    "downstream.servers",
                    format!("server {:?} has an empty command", server.id),
                ));
            }
        }

        let mut seen_route_ids = std::collections::HashSet::new();
        for route in &self.routes {
            if !seen_route_ids.insert(route.id.as_str()) {
                issues.push(ConfigIssue::error(
                    "routes",
                    format!("duplicate route id {:?}", route.id),
                ));
            }
            if !seen_workspace_ids.contains(route.workspace_id.as_str()) {
                issues.push(ConfigIssue::error(
                    "routes",
                    format!(
                        "route {:?} references unknown workspace {:?}",
                        route.id, route.workspace_id
                    ),
                ));
            }
            if route.downstream_server_id != crate::model::BUILTIN_SERVER_ID
                && !seen_server_ids.contains(route.downstream_server_id.as_str())
            {
                issues.push(ConfigIssue::error(
                    "routes",
                    format!(
                        "route {:?} references unknown downstream server {:?}",
                        route.id, route.downstream_server_id
                    ),
                ));
            }
        }

        for policy in &self.tool_call_cache_policies {
            if !seen_server_ids.contains(policy.downstream_server_id.as_str()) {
                issues.push(ConfigIssue::warning(
                    "tool_call_cache_policies",
                    format!(
                        "cache policy for unknown downstream server {:?} will never apply",
                        policy.downstream_server_id
                    ),
                ));
            }
            for pattern in policy.cacheable.iter().chain(policy.mutating.iter()) {
                if pattern.trim().is_empty() {
                    issues.push(ConfigIssue::error(
                        "tool_call_cache_policies",
                        "cache policy pattern must not be empty",
                    ));
                }
            }
        }

        if self.admin.enabled && self.admin.port == self.server.port {
            issues.push(ConfigIssue::warning(
                "admin.port",
                "admin port matches the front-door port; they should normally differ",
            ));
        }

        issues
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == ConfigSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Policy;

    fn base_config() -> Config {
        Config {
            workspaces: vec![Workspace {
                id: "w1".into(),
                name: "root".into(),
                root_path: "/".into(),
            }],
            downstream: DownstreamConfig {
                servers: vec![DownstreamServerConfig {
                    id: "fs".into(),
                    transport: DownstreamTransportKind::Stdio,
                    command: "mcp-fs-server".into(),
                    args: vec![],
                    env: Default::default(),
                }],
            },
            ..Default::default()
        }
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = Config::default().validate();
        assert!(!Config::has_errors(&issues), "{:?}", issues);
    }

    #[test]
    fn bad_transport_is_error() {
        let mut cfg = Config::default();
        cfg.server.transport = "carrier-pigeon".into();
        let issues = cfg.validate();
        assert!(Config::has_errors(&issues));
    }

    #[test]
    fn route_to_unknown_workspace_is_error() {
        let mut cfg = base_config();
        cfg.routes.push(RouteRule {
            id: "r1".into(),
            workspace_id: "nope".into(),
            priority: 0,
            path_glob: "*".into(),
            tool_match: vec![],
            policy: Policy::Allow,
            downstream_server_id: "fs".into(),
            auth_scope_id: "default".into(),
            requires_approval: false,
            approval_timeout_sec: None,
            allowed_orgs: None,
            allowed_repos: None,
            log_level: None,
        });
        assert!(Config::has_errors(&cfg.validate()));
    }

    #[test]
    fn duplicate_downstream_server_ids_is_error() {
        let mut cfg = base_config();
        let dup = cfg.downstream.servers[0].clone();
        cfg.downstream.servers.push(dup);
        assert!(Config::has_errors(&cfg.validate()));
    }

    #[test]
    fn cache_policy_for_unknown_server_is_warning_not_error() {
        let mut cfg = base_config();
        cfg.tool_call_cache_policies.push(ToolCallCachePolicy::new("ghost"));
        let issues = cfg.validate();
        assert!(!Config::has_errors(&issues));
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn admin_port_collision_is_warning() {
        let mut cfg = base_config();
        cfg.admin.port = cfg.server.port;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.path == "admin.port" && i.severity == ConfigSeverity::Warning));
    }
}
