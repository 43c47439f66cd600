//! Switchboard Core - config model and transport traits for MCP server groups
//!
//! This crate provides the foundational pieces used by `switchboard-client`:
//!
//! - [`ServerConfigMap`] / [`ServerConfig`] - ordered, per-server configuration
//!   with one transport kind per entry (stdio, SSE, streamable HTTP)
//! - [`ConnectionParams`] - the canonical parameter shape a transport is built from
//! - [`ToolFilter`] - static allow-list applied to remote tool catalogs
//! - [`TransportFactory`], [`ServerConnector`], [`ConnectedServer`] - the
//!   seams transports plug into
//! - [`CleanupReport`] - aggregated teardown failures
//!
//! # Configuration
//!
//! ```rust
//! use switchboard_core::{ServerConfigMap, TransportKind};
//!
//! let map = ServerConfigMap::from_json_str(r#"{
//!     "neo4j": {
//!         "command": "uvx",
//!         "args": ["mcp-neo4j-cypher@0.3.0", "--transport", "stdio"],
//!         "allowed_tools": ["read_neo4j_cypher", "get_neo4j_schema"]
//!     },
//!     "github": {
//!         "transport": "http",
//!         "url": "https://api.githubcopilot.com/mcp",
//!         "headers": {"Authorization": "Bearer ${GITHUB_TOKEN}"}
//!     }
//! }"#).unwrap();
//!
//! let configs = map.parse_all().unwrap();
//! assert_eq!(configs[0].kind(), TransportKind::Stdio);
//! assert_eq!(configs[1].kind(), TransportKind::Http);
//! ```

mod config;
mod error;
mod filter;
mod load;
mod params;
mod report;
mod traits;
mod types;

pub use config::*;
pub use error::*;
pub use filter::*;
pub use load::expand_env;
pub use params::*;
pub use report::*;
pub use traits::*;
pub use types::*;
