//! Configuration types for MCP server groups
//!
//! A server group is described by an ordered mapping of server name to a raw
//! configuration record. Each record is turned into a typed [`ServerConfig`]
//! (one transport kind per entry plus a side-map of pass-through fields) and
//! then normalized into the [`ConnectionParams`] a transport is built from.

use crate::error::{Result, SwitchboardError};
use crate::filter::ToolFilter;
use crate::params::ConnectionParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Field names with a fixed meaning in a raw server record.
///
/// These never pass through to a transport as extra fields.
pub const RESERVED_FIELDS: [&str; 8] = [
    "transport",
    "allowed_tools",
    "cache_tools_list",
    "command",
    "args",
    "env",
    "url",
    "headers",
];

/// Whether `key` is one of [`RESERVED_FIELDS`]
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Supported MCP transport kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Local subprocess speaking over stdin/stdout
    Stdio,
    /// HTTP Server-Sent Events
    Sse,
    /// HTTP streamable request/response
    Http,
}

impl TransportKind {
    /// Parse a transport string for `server`, case-insensitively
    pub fn parse(server: &str, raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "sse" => Ok(Self::Sse),
            "http" => Ok(Self::Http),
            _ => Err(SwitchboardError::UnsupportedTransport {
                server: server.to_string(),
                transport: raw.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::Http => "http",
        }
    }
}

impl Default for TransportKind {
    fn default() -> Self {
        Self::Stdio
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-specific connection fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Local process-based server using stdin/stdout communication
    Stdio {
        /// Command to execute (e.g., "uvx")
        command: String,
        /// Arguments to pass to the command
        #[serde(default)]
        args: Vec<String>,
        /// Environment variables set on top of the inherited environment
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Server-Sent Events based connection
    Sse {
        /// SSE endpoint URL
        url: String,
        /// Headers sent with every request
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Streamable HTTP connection
    Http {
        /// MCP endpoint URL
        url: String,
        /// Headers sent with every request
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Stdio,
            Self::Sse { .. } => TransportKind::Sse,
            Self::Http { .. } => TransportKind::Http,
        }
    }
}

/// Configuration for one server of a group
///
/// `name` is a display and debugging identifier only; it is never sent to
/// the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub transport: TransportConfig,
    /// If present, only these remote tool names are exposed and callable
    pub allowed_tools: Option<Vec<String>>,
    /// Whether the remote tool list may be cached instead of re-fetched
    pub cache_tools_list: bool,
    /// Non-reserved fields passed verbatim to the transport
    pub extra: Map<String, Value>,
}

impl ServerConfig {
    fn with_transport(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            allowed_tools: None,
            cache_tools_list: true,
            extra: Map::new(),
        }
    }

    /// A stdio server launching `command`
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Stdio {
                command: command.into(),
                args: Vec::new(),
                env: HashMap::new(),
            },
        )
    }

    /// An SSE server at `url`
    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Sse {
                url: url.into(),
                headers: HashMap::new(),
            },
        )
    }

    /// A streamable HTTP server at `url`
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Http {
                url: url.into(),
                headers: HashMap::new(),
            },
        )
    }

    /// Append command arguments (stdio only, ignored otherwise)
    pub fn with_args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let TransportConfig::Stdio { args, .. } = &mut self.transport {
            args.extend(new_args.into_iter().map(Into::into));
        }
        self
    }

    /// Set an environment variable (stdio only, ignored otherwise)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Stdio { env, .. } = &mut self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Set a request header (sse/http only, ignored otherwise)
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.transport {
            TransportConfig::Sse { headers, .. } | TransportConfig::Http { headers, .. } => {
                headers.insert(key.into(), value.into());
            }
            TransportConfig::Stdio { .. } => {}
        }
        self
    }

    /// Restrict the exposed tools to `tools`
    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(dedup(tools.into_iter().map(Into::into)));
        self
    }

    pub fn with_cache_tools_list(mut self, cache: bool) -> Self {
        self.cache_tools_list = cache;
        self
    }

    /// Add a pass-through field
    ///
    /// Fails if `key` is one of [`RESERVED_FIELDS`].
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Result<Self> {
        let key = key.into();
        if is_reserved_field(&key) {
            return Err(SwitchboardError::invalid_field(
                &self.name,
                key,
                "reserved field cannot be used as a pass-through field",
            ));
        }
        self.extra.insert(key, value);
        Ok(self)
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Parse a raw configuration record
    ///
    /// `transport` defaults to `stdio`. Reserved fields that do not apply to
    /// the selected transport are ignored; every other field is kept in
    /// [`ServerConfig::extra`].
    pub fn from_raw(name: &str, raw: &Value) -> Result<Self> {
        let record = raw.as_object().ok_or_else(|| {
            SwitchboardError::invalid_field(name, "<record>", "expected a table/object")
        })?;

        let kind = match record.get("transport") {
            None | Some(Value::Null) => TransportKind::default(),
            Some(Value::String(s)) => TransportKind::parse(name, s)?,
            Some(other) => {
                return Err(SwitchboardError::invalid_field(
                    name,
                    "transport",
                    format!("expected a string, got {}", other),
                ))
            }
        };

        let transport = match kind {
            TransportKind::Stdio => TransportConfig::Stdio {
                command: required_string(name, record, "command")?,
                args: string_list(name, record, "args")?.unwrap_or_default(),
                env: string_map(name, record, "env")?,
            },
            TransportKind::Sse => TransportConfig::Sse {
                url: required_string(name, record, "url")?,
                headers: string_map(name, record, "headers")?,
            },
            TransportKind::Http => TransportConfig::Http {
                url: required_string(name, record, "url")?,
                headers: string_map(name, record, "headers")?,
            },
        };

        let allowed_tools =
            string_list(name, record, "allowed_tools")?.map(|t| dedup(t.into_iter()));

        let cache_tools_list = match record.get("cache_tools_list") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(SwitchboardError::invalid_field(
                    name,
                    "cache_tools_list",
                    format!("expected a boolean, got {}", other),
                ))
            }
        };

        let mut extra = Map::new();
        for (key, value) in record {
            if is_reserved_field(key) {
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }
        if !extra.is_empty() {
            debug!(
                server = %name,
                fields = ?extra.keys().collect::<Vec<_>>(),
                "pass-through fields"
            );
        }

        Ok(Self {
            name: name.to_string(),
            transport,
            allowed_tools,
            cache_tools_list,
            extra,
        })
    }

    /// Normalize into the canonical parameter shape for this transport
    pub fn to_params(&self) -> ConnectionParams {
        ConnectionParams {
            server_name: self.name.clone(),
            cache_tools_list: self.cache_tools_list,
            tool_filter: self
                .allowed_tools
                .as_ref()
                .map(|tools| ToolFilter::allow_only(tools.iter().cloned())),
            transport: self.transport.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Ordered mapping of server name to raw configuration record
///
/// Declaration order is preserved; it is the order servers are opened in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerConfigMap {
    entries: Map<String, Value>,
}

impl ServerConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a raw entry, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, raw: Value) {
        self.entries.insert(name.into(), raw);
    }

    /// Add a typed entry, converting it back to its raw shape
    pub fn insert_config(&mut self, config: &ServerConfig) {
        self.entries.insert(config.name.clone(), to_raw(config));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse every entry, stopping at the first invalid one
    pub fn parse_all(&self) -> Result<Vec<ServerConfig>> {
        self.entries
            .iter()
            .map(|(name, raw)| ServerConfig::from_raw(name, raw))
            .collect()
    }

    pub(crate) fn from_entries(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<ServerConfig> for ServerConfigMap {
    fn from_iter<I: IntoIterator<Item = ServerConfig>>(iter: I) -> Self {
        let mut map = Self::new();
        for config in iter {
            map.insert_config(&config);
        }
        map
    }
}

fn to_raw(config: &ServerConfig) -> Value {
    let mut record = config.extra.clone();
    if let Ok(Value::Object(transport)) = serde_json::to_value(&config.transport) {
        record.extend(transport);
    }
    if let Some(tools) = &config.allowed_tools {
        record.insert("allowed_tools".to_string(), Value::from(tools.clone()));
    }
    record.insert(
        "cache_tools_list".to_string(),
        Value::Bool(config.cache_tools_list),
    );
    Value::Object(record)
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn required_string(
    server: &str,
    record: &Map<String, Value>,
    field: &'static str,
) -> Result<String> {
    match record.get(field) {
        None | Some(Value::Null) => Err(SwitchboardError::MissingField {
            server: server.to_string(),
            field,
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(SwitchboardError::invalid_field(
            server,
            field,
            "must not be empty",
        )),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SwitchboardError::invalid_field(
            server,
            field,
            format!("expected a string, got {}", other),
        )),
    }
}

fn string_list(
    server: &str,
    record: &Map<String, Value>,
    field: &str,
) -> Result<Option<Vec<String>>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(SwitchboardError::invalid_field(
                    server,
                    field,
                    format!("expected a list of strings, found {}", other),
                )),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(SwitchboardError::invalid_field(
            server,
            field,
            format!("expected a list of strings, got {}", other),
        )),
    }
}

/// Read a string-to-string table. Numbers and booleans are stringified.
fn string_map(
    server: &str,
    record: &Map<String, Value>,
    field: &str,
) -> Result<HashMap<String, String>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(HashMap::new()),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(SwitchboardError::invalid_field(
                            server,
                            format!("{}.{}", field, key),
                            format!("expected a string, got {}", other),
                        ))
                    }
                };
                Ok((key.clone(), value))
            })
            .collect(),
        Some(other) => Err(SwitchboardError::invalid_field(
            server,
            field,
            format!("expected a table of strings, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_defaults_to_stdio() {
        let config = ServerConfig::from_raw("neo4j", &json!({"command": "uvx"})).unwrap();
        assert_eq!(config.kind(), TransportKind::Stdio);
        assert!(config.cache_tools_list);
        assert!(config.allowed_tools.is_none());
    }

    #[test]
    fn test_transport_is_case_insensitive() {
        let config = ServerConfig::from_raw(
            "github",
            &json!({"transport": "HTTP", "url": "https://api.example.com/mcp"}),
        )
        .unwrap();
        assert_eq!(config.kind(), TransportKind::Http);
    }

    #[test]
    fn test_unknown_transport() {
        let err = ServerConfig::from_raw("graph", &json!({"transport": "quic", "url": "x"}))
            .unwrap_err();
        match err {
            SwitchboardError::UnsupportedTransport { server, transport } => {
                assert_eq!(server, "graph");
                assert_eq!(transport, "quic");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_command() {
        let err = ServerConfig::from_raw("local", &json!({"args": ["-v"]})).unwrap_err();
        assert!(matches!(
            err,
            SwitchboardError::MissingField { field: "command", .. }
        ));
    }

    #[test]
    fn test_missing_url_for_sse() {
        let err = ServerConfig::from_raw("events", &json!({"transport": "sse"})).unwrap_err();
        assert!(matches!(err, SwitchboardError::MissingField { field: "url", .. }));
    }

    #[test]
    fn test_stdio_fields() {
        let config = ServerConfig::from_raw(
            "neo4j",
            &json!({
                "command": "uvx",
                "args": ["mcp-neo4j-cypher@0.3.0", "--transport", "stdio"],
                "env": {"NEO4J_PORT": 7687, "DEBUG": true},
                "allowed_tools": ["read_neo4j_cypher", "get_neo4j_schema", "read_neo4j_cypher"],
                "cache_tools_list": false
            }),
        )
        .unwrap();

        match &config.transport {
            TransportConfig::Stdio { command, args, env } => {
                assert_eq!(command, "uvx");
                assert_eq!(args.len(), 3);
                assert_eq!(env.get("NEO4J_PORT").map(String::as_str), Some("7687"));
                assert_eq!(env.get("DEBUG").map(String::as_str), Some("true"));
            }
            other => panic!("unexpected transport: {other:?}"),
        }
        assert_eq!(
            config.allowed_tools,
            Some(vec![
                "read_neo4j_cypher".to_string(),
                "get_neo4j_schema".to_string()
            ])
        );
        assert!(!config.cache_tools_list);
    }

    #[test]
    fn test_pass_through_excludes_reserved() {
        let config = ServerConfig::from_raw(
            "github",
            &json!({
                "transport": "http",
                "url": "https://api.example.com/mcp",
                "headers": {"Authorization": "Bearer t"},
                "command": "ignored",
                "timeout_secs": 10,
                "client_label": "ops"
            }),
        )
        .unwrap();

        assert_eq!(config.extra.len(), 2);
        assert_eq!(config.extra["timeout_secs"], json!(10));
        assert!(!config.extra.contains_key("command"));
        assert!(!config.extra.contains_key("transport"));
    }

    #[test]
    fn test_invalid_args_shape() {
        let err = ServerConfig::from_raw("local", &json!({"command": "x", "args": "-v"}))
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::InvalidField { .. }));
    }

    #[test]
    fn test_with_extra_rejects_reserved() {
        let err = ServerConfig::stdio("local", "x")
            .with_extra("url", json!("http://localhost"))
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::InvalidField { .. }));
    }

    #[test]
    fn test_config_map_keeps_order_and_round_trips_typed() {
        let map: ServerConfigMap = vec![
            ServerConfig::stdio("zeta", "z").with_args(["--stdio"]),
            ServerConfig::http("alpha", "http://localhost:3000/mcp").with_allowed_tools(["a"]),
            ServerConfig::sse("mid", "http://localhost:4000/sse"),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.names(), vec!["zeta", "alpha", "mid"]);
        let parsed = map.parse_all().unwrap();
        assert_eq!(parsed[0], ServerConfig::stdio("zeta", "z").with_args(["--stdio"]));
        assert_eq!(parsed[1].allowed_tools, Some(vec!["a".to_string()]));
        assert_eq!(parsed[2].kind(), TransportKind::Sse);
    }
}
