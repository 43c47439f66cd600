//! Switchboard Client - bring groups of MCP servers up and down as one resource
//!
//! A [`ServerGroupManager`] takes an ordered mapping of server configs and:
//!
//! - **Acquire**: builds every connector first (no I/O), then opens them one
//!   by one in declaration order; an open failure rolls back everything
//!   opened so far
//! - **Release**: signals shutdown, waits a settle delay, then closes every
//!   server in reverse open order, collecting failures instead of stopping
//! - **Scope**: [`ServerGroupManager::scope`] wraps both so release always
//!   runs and the caller's own error is returned unchanged
//!
//! Transports are rmcp-based (stdio, SSE, streamable HTTP) and sit behind the
//! [`TransportFactory`] seam, so tests can substitute their own.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchboard_client::{ServerConfigMap, ServerGroupManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let configs = ServerConfigMap::from_file("servers.toml")?;
//! let answer = ServerGroupManager::new(configs)
//!     .scope(|servers| async move {
//!         servers
//!             .call_tool("get_neo4j_schema", serde_json::json!({}))
//!             .await
//!             .map(|result| result.text_content())
//!     })
//!     .await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

mod handle;
mod manager;
mod scope;
mod teardown;
mod transport;

pub use handle::{ServerHandle, ServerHandles};
pub use manager::{OpenRetryPolicy, ServerGroupManager, DEFAULT_SETTLE_DELAY};
pub use scope::ScopeError;
pub use transport::RmcpTransportFactory;

// Re-export core types
pub use switchboard_core::{
    expand_env, CleanupError, CleanupPhase, CleanupReport, ConnectedServer, ConnectionParams,
    ContentBlock, Result, ScopeOutcome, ServerConfig, ServerConfigMap, ServerConnector,
    ShutdownCapability, SwitchboardError, ToolFilter, ToolInfo, ToolResult, TransportConfig,
    TransportFactory, TransportKind,
};
