use async_trait::async_trait;
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::SseClientTransport;
use rmcp::ServiceExt;
use switchboard_core::{
    ConnectedServer, ConnectionParams, Result, ServerConnector, SwitchboardError,
    TransportConfig, TransportKind,
};
use tracing::debug;

use super::{check_url, RmcpServer};

/// Legacy SSE transport: an event stream plus a POST endpoint
pub(crate) struct SseConnector {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl SseConnector {
    pub(crate) fn new(params: &ConnectionParams, client: reqwest::Client) -> Result<Self> {
        let TransportConfig::Sse { url, .. } = &params.transport else {
            return Err(SwitchboardError::UnsupportedTransport {
                server: params.server_name.clone(),
                transport: params.kind().to_string(),
            });
        };
        check_url(params, url)?;
        Ok(Self {
            name: params.server_name.clone(),
            url: url.clone(),
            client,
        })
    }
}

#[async_trait]
impl ServerConnector for SseConnector {
    async fn open(self: Box<Self>) -> Result<Box<dyn ConnectedServer>> {
        debug!(server = %self.name, url = %self.url, "connecting event stream");
        let open_error = |message: String| SwitchboardError::Open {
            server: self.name.clone(),
            transport: TransportKind::Sse,
            message,
        };

        let config = SseClientConfig {
            sse_endpoint: self.url.as_str().into(),
            ..Default::default()
        };
        let transport = SseClientTransport::start_with_client(self.client.clone(), config)
            .await
            .map_err(|e| open_error(e.to_string()))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(RmcpServer::new(self.name.clone(), service)))
    }
}
