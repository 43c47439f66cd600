//! Canonical per-transport connection parameters

use crate::config::{TransportConfig, TransportKind};
use crate::filter::ToolFilter;
use serde_json::{Map, Value};

/// Parameters a transport is built from
///
/// Three layers, kept in separate fields so they can never collide:
/// the common layer (`cache_tools_list`, `tool_filter`), the transport layer
/// and the pass-through layer (`extra`, never containing a reserved name).
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionParams {
    /// Display name of the server, used in logs and errors
    pub server_name: String,
    pub cache_tools_list: bool,
    pub tool_filter: Option<ToolFilter>,
    pub transport: TransportConfig,
    pub extra: Map<String, Value>,
}

impl ConnectionParams {
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Unsigned integer pass-through field
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(Value::as_u64)
    }
}
