use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Timeout,
    Cancelled,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverType {
    McpAgent,
    Dashboard,
    System,
}

/// A persisted record representing a tool call suspended until an external
/// decider resolves it. See SPEC_FULL.md §3/§4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: String,
    pub request_session_id: String,
    pub request_client_type: String,
    pub request_model: Option<String>,
    pub workspace_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub justification: String,
    pub route_rule_id: String,
    pub downstream_server_id: String,
    pub auth_scope_id: String,
    pub status: ApprovalStatus,
    pub approver_session_id: Option<String>,
    pub approver_type: Option<ApproverType>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub timeout_sec: u64,
}

/// Default approval timeout when a route doesn't specify one.
pub const DEFAULT_APPROVAL_TIMEOUT_SEC: u64 = 300;
