use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, Content, ResourceContents};
use rmcp::service::RunningService;
use rmcp::RoleClient;
use switchboard_core::{
    ConnectedServer, ContentBlock, Result, ScopeOutcome, SwitchboardError, ToolInfo, ToolResult,
};
use tracing::debug;

type McpService = RunningService<RoleClient, ()>;

/// An initialized rmcp client session, whatever transport carries it
pub(crate) struct RmcpServer {
    name: String,
    service: Option<McpService>,
}

impl RmcpServer {
    pub(crate) fn new(name: impl Into<String>, service: McpService) -> Self {
        Self {
            name: name.into(),
            service: Some(service),
        }
    }

    fn service(&self) -> Result<&McpService> {
        self.service
            .as_ref()
            .ok_or_else(|| SwitchboardError::ServerClosed(self.name.clone()))
    }
}

#[async_trait]
impl ConnectedServer for RmcpServer {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let tools = self
            .service()?
            .list_all_tools()
            .await
            .map_err(|e| SwitchboardError::server(&self.name, e.to_string()))?;

        Ok(tools
            .into_iter()
            .map(|t| ToolInfo {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: serde_json::Value::Object((*t.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolResult> {
        let arguments = match arguments {
            serde_json::Value::Null => None,
            serde_json::Value::Object(map) => Some(map),
            other => {
                return Err(SwitchboardError::server(
                    &self.name,
                    format!("tool arguments must be a JSON object, got {}", other),
                ))
            }
        };

        let result = self
            .service()?
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| SwitchboardError::server(&self.name, e.to_string()))?;

        Ok(ToolResult {
            content: result.content.iter().filter_map(convert_content).collect(),
            is_error: result.is_error.unwrap_or(false),
        })
    }

    /// Cancel the session and wait for it to wind down
    ///
    /// Cancelling an rmcp session closes its transport, so there is no
    /// separate shutdown signal: sessions end here, one at a time, in the
    /// order the teardown closes them.
    async fn close(&mut self, outcome: &ScopeOutcome) -> Result<()> {
        let Some(service) = self.service.take() else {
            return Ok(());
        };
        let reason = service
            .cancel()
            .await
            .map_err(|e| SwitchboardError::server(&self.name, e.to_string()))?;
        debug!(server = %self.name, reason = ?reason, outcome = %outcome, "session closed");
        Ok(())
    }
}

fn convert_content(content: &Content) -> Option<ContentBlock> {
    if let Some(text) = content.as_text() {
        return Some(ContentBlock::Text {
            text: text.text.clone(),
        });
    }
    if let Some(image) = content.as_image() {
        return Some(ContentBlock::Image {
            data: image.data.clone(),
            mime_type: image.mime_type.clone(),
        });
    }
    match &content.as_resource()?.resource {
        ResourceContents::TextResourceContents { uri, text, .. } => Some(ContentBlock::Resource {
            uri: uri.clone(),
            text: Some(text.clone()),
        }),
        ResourceContents::BlobResourceContents { uri, .. } => Some(ContentBlock::Resource {
            uri: uri.clone(),
            text: None,
        }),
    }
}
