//! HTTP client for the tool-invocation protocol (MCP) the workflow
//! runtime calls out to for `SYSTEM_ACTION` steps.

pub mod clients;
pub mod protocol;
pub mod transport;

pub use clients::HttpMcpClient;
pub use protocol::{MCPRequest, MCPResponse};
pub use transport::{HttpTransport, TransportError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
