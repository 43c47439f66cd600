use async_trait::async_trait;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use switchboard_core::{
    ConnectedServer, ConnectionParams, Result, ServerConnector, SwitchboardError,
    TransportConfig, TransportKind,
};
use tracing::debug;

use super::{check_url, RmcpServer};

/// Streamable HTTP transport
pub(crate) struct HttpConnector {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpConnector {
    pub(crate) fn new(params: &ConnectionParams, client: reqwest::Client) -> Result<Self> {
        let TransportConfig::Http { url, .. } = &params.transport else {
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
impl ServerConnector for HttpConnector {
    async fn open(self: Box<Self>) -> Result<Box<dyn ConnectedServer>> {
        debug!(server = %self.name, url = %self.url, "initializing http session");
        let transport = StreamableHttpClientTransport::with_client(
            self.client.clone(),
            StreamableHttpClientTransportConfig::with_uri(self.url.as_str()),
        );
        let service = ().serve(transport).await.map_err(|e| SwitchboardError::Open {
            server: self.name.clone(),
            transport: TransportKind::Http,
            message: e.to_string(),
        })?;

        Ok(Box::new(RmcpServer::new(self.name.clone(), service)))
    }
}
