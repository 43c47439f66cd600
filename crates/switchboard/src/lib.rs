//! # Switchboard - MCP server groups as one scoped resource
//!
//! This crate is the single entry point to the switchboard crates:
//!
//! - **Core** (`switchboard-core`) - configuration model, tool filter,
//!   transport traits and cleanup reports
//! - **Client** (`switchboard-client`) - the server group manager and the
//!   rmcp-backed stdio, SSE and streamable HTTP transports
//!
//! ## Features
//!
//! - `cli` (default) - build the `switchboard` command line tool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchboard::{ServerConfig, ServerGroupManager, SwitchboardError};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ServerGroupManager::from_configs(vec![
//!     ServerConfig::stdio("neo4j", "uvx")
//!         .with_args(["mcp-neo4j-cypher@0.3.0", "--transport", "stdio"])
//!         .with_allowed_tools(["read_neo4j_cypher", "get_neo4j_schema"]),
//!     ServerConfig::http("github", "https://api.githubcopilot.com/mcp")
//!         .with_header("Authorization", "Bearer <token>"),
//! ]);
//!
//! let tool_count = manager
//!     .scope(|servers| async move {
//!         let mut count = 0;
//!         for handle in servers.values() {
//!             count += handle.list_tools().await?.len();
//!         }
//!         Ok::<_, SwitchboardError>(count)
//!     })
//!     .await?;
//! println!("{} tools available", tool_count);
//! # Ok(())
//! # }
//! ```

// Core types are always available at the root
pub use switchboard_core::*;

/// Server group management and transports
pub mod client {
    pub use switchboard_client::*;
}

// Convenience re-exports for common usage patterns
pub use client::{
    OpenRetryPolicy, RmcpTransportFactory, ScopeError, ServerGroupManager, ServerHandle,
    ServerHandles, DEFAULT_SETTLE_DELAY,
};
