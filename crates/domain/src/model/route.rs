use serde::{Deserialize, Serialize};

/// Allow or deny the matched call outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Allow,
    Deny,
}

/// A guarded mapping from `(path, tool)` to a downstream server and auth
/// scope, with a policy. See SPEC_FULL.md §3/§4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub priority: i64,
    pub path_glob: String,
    /// Empty or absent is treated as `["*"]` (see `Self::tool_patterns`).
    #[serde(default)]
    pub tool_match: Vec<String>,
    pub policy: Policy,
    pub downstream_server_id: String,
    pub auth_scope_id: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub approval_timeout_sec: Option<u64>,
    #[serde(default)]
    pub allowed_orgs: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_repos: Option<Vec<String>>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl RouteRule {
    /// `tool_match` defaults to `["*"]` when absent or empty.
    pub fn tool_patterns(&self) -> Vec<&str> {
        if self.tool_match.is_empty() {
            vec!["*"]
        } else {
            self.tool_match.iter().map(String::as_str).collect()
        }
    }
}

/// Reserved sentinel `downstream_server_id` identifying built-in tools.
pub const BUILTIN_SERVER_ID: &str = "built-in";
