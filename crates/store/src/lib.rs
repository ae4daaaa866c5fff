pub mod approvals;
pub mod audit;
pub mod json_file;
pub mod routes;
pub mod workspaces;

pub use approvals::ApprovalStore;
pub use audit::{AuditLog, AuditRecord};
pub use routes::RouteStore;
pub use workspaces::WorkspaceStore;
