//! Downstream connection management: spawns one child process per
//! configured tool-serving server, speaks the MCP handshake and `tools/*`
//! calls over stdio, and exposes a uniform [`DownstreamManager`] trait the
//! dispatch orchestrator calls through.

pub mod manager;
pub mod transport;

pub use manager::{DownstreamError, DownstreamManager, StdioDownstreamManager};
pub use transport::{DownstreamTransport, StdioTransport, TransportError};
