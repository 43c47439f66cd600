//! Core types shared by transports and the server group manager

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tool advertised by a remote server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Name of the tool as reported by the server
    pub name: String,
    /// Optional human-readable description
    pub description: Option<String>,
    /// JSON schema describing the tool's input parameters
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
        }
    }
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool
    pub content: Vec<ContentBlock>,
    /// Whether the tool reported an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
            is_error: false,
        }
    }

    /// All text blocks joined by newlines
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content block in tool responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },
    /// Image content (base64 encoded)
    Image { data: String, mime_type: String },
    /// Resource reference
    Resource { uri: String, text: Option<String> },
}

impl ContentBlock {
    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// How the caller's work inside a server group scope finished
///
/// Handed to every close so a transport can tell "closing after success"
/// from "closing after failure".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// The work finished without error
    Completed,
    /// The work returned an error
    Failed { message: String },
    /// The work was cancelled before it finished
    Cancelled,
}

impl ScopeOutcome {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::Failed {
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ScopeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed { message } => write!(f, "failed: {}", message),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Whether an open server accepts a graceful shutdown signal
///
/// Resolved once when the server is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCapability {
    HasShutdown,
    NoShutdown,
}
