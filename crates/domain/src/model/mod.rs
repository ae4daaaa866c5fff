pub mod approval;
pub mod route;
pub mod workspace;

pub use approval::{ApprovalRecord, ApprovalStatus, ApproverType, DEFAULT_APPROVAL_TIMEOUT_SEC};
pub use route::{Policy, RouteRule, BUILTIN_SERVER_ID};
pub use workspace::{is_path_ancestor, subpath_relative_to, workspace_chain, Workspace};
