//! The gateway's dispatch core: generic cache, tool-call cache policy,
//! route engine, approval manager, event bus, and the dispatch orchestrator
//! that ties them together. See SPEC_FULL.md §4.

pub mod approval;
pub mod bus;
pub mod cache;
pub mod dispatch;
pub mod route;
pub mod toolcache;

pub use approval::{ApprovalError, ApprovalEvent, ApprovalEventKind, ApprovalManager, ApprovalOutcome};
pub use bus::{EventBus, Subscription};
pub use cache::{CacheStats, GenericCache, LoadError};
pub use dispatch::{CacheAwareDownstream, DispatchError, Dispatcher, SessionContext, ToolCallRequest};
pub use route::{resolve_in_workspace, resolve_with_fallback, RouteError, RouteMatch};
pub use toolcache::{bare_tool_name, fingerprint, tool_name_matches, ToolCallCache, ToolCallKey};
