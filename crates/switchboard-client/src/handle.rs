//! Opened server handles

use std::sync::Arc;

use switchboard_core::{
    ConnectedServer, ConnectionParams, Result, ScopeOutcome, ShutdownCapability, SwitchboardError,
    ToolFilter, ToolInfo, ToolResult, TransportKind,
};
use tokio::sync::RwLock;
use tracing::debug;

/// The opened, usable representation of one configured server
///
/// Handles are owned by the server group manager and shared with callers for
/// tool invocation. Once the group is released the handle is closed for good
/// and every operation on it fails with [`SwitchboardError::ServerClosed`].
pub struct ServerHandle {
    name: String,
    transport: TransportKind,
    capability: ShutdownCapability,
    tool_filter: Option<ToolFilter>,
    cache_tools_list: bool,
    cached_tools: RwLock<Option<Vec<ToolInfo>>>,
    connection: RwLock<Option<Box<dyn ConnectedServer>>>,
}

impl ServerHandle {
    pub(crate) fn new(params: &ConnectionParams, connection: Box<dyn ConnectedServer>) -> Self {
        let capability = if connection.supports_shutdown() {
            ShutdownCapability::HasShutdown
        } else {
            ShutdownCapability::NoShutdown
        };
        Self {
            name: params.server_name.clone(),
            transport: params.kind(),
            capability,
            tool_filter: params.tool_filter.clone(),
            cache_tools_list: params.cache_tools_list,
            cached_tools: RwLock::new(None),
            connection: RwLock::new(Some(connection)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn shutdown_capability(&self) -> ShutdownCapability {
        self.capability
    }

    pub fn tool_filter(&self) -> Option<&ToolFilter> {
        self.tool_filter.as_ref()
    }

    pub fn caches_tools_list(&self) -> bool {
        self.cache_tools_list
    }

    pub async fn is_open(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// The remote tool catalog with the tool filter applied
    ///
    /// With `cache_tools_list` the filtered catalog is fetched once and reused;
    /// otherwise it is fetched and filtered on every call.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        if self.cache_tools_list {
            if let Some(tools) = self.cached_tools.read().await.as_ref() {
                return Ok(tools.clone());
            }
        }

        let guard = self.connection.read().await;
        let connection = guard
            .as_ref()
            .ok_or_else(|| SwitchboardError::ServerClosed(self.name.clone()))?;

        let raw = connection.list_tools().await?;
        let total = raw.len();
        let tools = match &self.tool_filter {
            Some(filter) => filter.apply(raw),
            None => raw,
        };
        debug!(server = %self.name, total, exposed = tools.len(), "fetched tool catalog");

        if self.cache_tools_list {
            *self.cached_tools.write().await = Some(tools.clone());
        }
        Ok(tools)
    }

    /// Drop the cached catalog so the next `list_tools` fetches again
    pub async fn invalidate_tools_cache(&self) {
        *self.cached_tools.write().await = None;
    }

    /// Call a tool on this server
    ///
    /// Names rejected by the tool filter fail without reaching the server.
    pub async fn call_tool(&self, tool: &str, arguments: serde_json::Value) -> Result<ToolResult> {
        if let Some(filter) = &self.tool_filter {
            if !filter.allows(tool) {
                return Err(SwitchboardError::ToolNotAllowed {
                    server: self.name.clone(),
                    tool: tool.to_string(),
                });
            }
        }

        let guard = self.connection.read().await;
        let connection = guard
            .as_ref()
            .ok_or_else(|| SwitchboardError::ServerClosed(self.name.clone()))?;

        debug!(server = %self.name, tool = %tool, "calling tool");
        connection.call_tool(tool, arguments).await
    }

    /// Send the graceful shutdown signal; a no-op once closed
    pub(crate) async fn signal_shutdown(&self) -> Result<()> {
        if self.capability == ShutdownCapability::NoShutdown {
            return Ok(());
        }
        match self.connection.read().await.as_ref() {
            Some(connection) => connection.shutdown().await,
            None => Ok(()),
        }
    }

    /// Close the underlying connection; a no-op once closed
    pub(crate) async fn close(&self, outcome: &ScopeOutcome) -> Result<()> {
        let connection = {
            let mut guard = self.connection.write().await;
            *self.cached_tools.write().await = None;
            guard.take()
        };
        match connection {
            Some(mut connection) => connection.close(outcome).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("capability", &self.capability)
            .field("cache_tools_list", &self.cache_tools_list)
            .finish_non_exhaustive()
    }
}

/// Ordered mapping of server name to handle, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ServerHandles {
    entries: Vec<(String, Arc<ServerHandle>)>,
}

impl ServerHandles {
    pub(crate) fn from_handles(handles: &[Arc<ServerHandle>]) -> Self {
        Self {
            entries: handles
                .iter()
                .map(|h| (h.name().to_string(), Arc::clone(h)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ServerHandle>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, handle)| handle)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ServerHandle>)> {
        self.entries.iter().map(|(n, h)| (n.as_str(), h))
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<ServerHandle>> {
        self.entries.iter().map(|(_, h)| h)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First server, in declaration order, whose exposed catalog has `tool`
    ///
    /// Servers whose catalog cannot be fetched are skipped.
    pub async fn find_tool(&self, tool: &str) -> Option<Arc<ServerHandle>> {
        for handle in self.values() {
            match handle.list_tools().await {
                Ok(tools) if tools.iter().any(|t| t.name == tool) => {
                    return Some(Arc::clone(handle));
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(server = %handle.name(), error = %e, "skipping server in tool lookup")
                }
            }
        }
        None
    }

    /// Route a call to the first server exposing `tool`
    pub async fn call_tool(&self, tool: &str, arguments: serde_json::Value) -> Result<ToolResult> {
        let handle = self
            .find_tool(tool)
            .await
            .ok_or_else(|| SwitchboardError::ToolNotFound(tool.to_string()))?;
        handle.call_tool(tool, arguments).await
    }
}
