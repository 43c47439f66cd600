//! Error types for Switchboard operations

use crate::TransportKind;
use thiserror::Error;

/// Result type for Switchboard operations
pub type Result<T> = std::result::Result<T, SwitchboardError>;

/// Errors that can occur while configuring, opening or using a server group
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// The `transport` field names a kind we cannot build
    #[error("Unsupported transport type for server '{server}': {transport}")]
    UnsupportedTransport { server: String, transport: String },

    /// A field required by the server's transport is absent
    #[error("Server '{server}' is missing required field '{field}'")]
    MissingField { server: String, field: &'static str },

    /// A field is present but has the wrong shape
    #[error("Server '{server}' has invalid field '{field}': {message}")]
    InvalidField {
        server: String,
        field: String,
        message: String,
    },

    /// Transport handshake failed while opening a server
    #[error("Failed to open server '{server}' ({transport}): {message}")]
    Open {
        server: String,
        transport: TransportKind,
        message: String,
    },

    /// `acquire` was called while the group is already up
    #[error("Server group is already acquired")]
    AlreadyAcquired,

    /// `acquire` was called after the group was released
    #[error("Server group has been released and cannot be acquired again")]
    ManagerSpent,

    /// Operation on a handle that has been closed
    #[error("Server '{0}' is closed")]
    ServerClosed(String),

    /// The tool filter of the server rejects this tool name
    #[error("Tool '{tool}' is not allowed on server '{server}'")]
    ToolNotAllowed { server: String, tool: String },

    /// No open server exposes the tool
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Transport-level failure on an open server
    #[error("Server '{server}' error: {message}")]
    Server { server: String, message: String },

    /// Malformed configuration document
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SwitchboardError {
    /// Create a transport-level error for a named server
    pub fn server(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-field error
    pub fn invalid_field(
        server: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            server: server.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised while reading configuration,
    /// before any connection was attempted
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTransport { .. }
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::Config(_)
                | Self::Json(_)
                | Self::Toml(_)
        )
    }

    /// Name of the server the error refers to, if any
    pub fn server_name(&self) -> Option<&str> {
        match self {
            Self::UnsupportedTransport { server, .. }
            | Self::MissingField { server, .. }
            | Self::InvalidField { server, .. }
            | Self::Open { server, .. }
            | Self::ToolNotAllowed { server, .. }
            | Self::Server { server, .. } => Some(server),
            Self::ServerClosed(server) => Some(server),
            _ => None,
        }
    }
}
