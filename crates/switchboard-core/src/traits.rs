//! Transport collaborator traits
//!
//! A [`TransportFactory`] turns [`ConnectionParams`] into an unopened
//! [`ServerConnector`]. Opening the connector performs the transport
//! handshake and yields a [`ConnectedServer`], which stays usable until it is
//! closed.

use async_trait::async_trait;

use crate::{ConnectionParams, Result, ScopeOutcome, ToolInfo, ToolResult};

/// Builds connectors for configured servers
///
/// `build` must not perform I/O: nothing is spawned or dialled until
/// [`ServerConnector::open`] runs.
pub trait TransportFactory: Send + Sync {
    fn build(&self, params: &ConnectionParams) -> Result<Box<dyn ServerConnector>>;
}

/// A built but not yet opened connection
#[async_trait]
pub trait ServerConnector: Send {
    /// Perform the transport handshake (spawn the subprocess, establish the
    /// HTTP session, ...)
    async fn open(self: Box<Self>) -> Result<Box<dyn ConnectedServer>>;
}

/// An open connection to one server
#[async_trait]
pub trait ConnectedServer: Send + Sync {
    /// Fetch the remote tool catalog, unfiltered
    async fn list_tools(&self) -> Result<Vec<ToolInfo>>;

    /// Call a remote tool
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolResult>;

    /// Whether [`ConnectedServer::shutdown`] does anything for this server
    fn supports_shutdown(&self) -> bool {
        false
    }

    /// Ask the server to wind down gracefully before it is closed
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Close the connection
    ///
    /// Must be safe to call more than once.
    async fn close(&mut self, outcome: &ScopeOutcome) -> Result<()>;
}
