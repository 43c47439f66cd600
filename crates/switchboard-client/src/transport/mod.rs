//! rmcp-backed transports
//!
//! [`RmcpTransportFactory`] is the default [`TransportFactory`]. Building a
//! connector only validates and prepares; the subprocess is spawned (or the
//! HTTP session established) when the connector is opened.

mod http;
mod service;
mod sse;
mod stdio;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use switchboard_core::{
    ConnectionParams, Result, ServerConnector, SwitchboardError, TransportConfig, TransportFactory,
    TransportKind,
};
use tracing::debug;

pub(crate) use http::HttpConnector;
pub(crate) use service::RmcpServer;
pub(crate) use sse::SseConnector;
pub(crate) use stdio::StdioConnector;

/// Pass-through fields each transport understands
const STDIO_EXTRAS: &[&str] = &["cwd"];
const REMOTE_EXTRAS: &[&str] = &["timeout_secs"];

/// Builds stdio, SSE and streamable HTTP connectors on top of rmcp
#[derive(Debug, Clone, Default)]
pub struct RmcpTransportFactory {
    _private: (),
}

impl RmcpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransportFactory for RmcpTransportFactory {
    fn build(&self, params: &ConnectionParams) -> Result<Box<dyn ServerConnector>> {
        let known = match params.kind() {
            TransportKind::Stdio => STDIO_EXTRAS,
            TransportKind::Sse | TransportKind::Http => REMOTE_EXTRAS,
        };
        for key in params.extra.keys().filter(|k| !known.contains(&k.as_str())) {
            debug!(
                server = %params.server_name,
                field = %key,
                "ignoring unrecognized pass-through field"
            );
        }

        match &params.transport {
            TransportConfig::Stdio { .. } => Ok(Box::new(StdioConnector::new(params)?)),
            TransportConfig::Sse { headers, .. } => {
                let client = http_client(params, headers)?;
                Ok(Box::new(SseConnector::new(params, client)?))
            }
            TransportConfig::Http { headers, .. } => {
                let client = http_client(params, headers)?;
                Ok(Box::new(HttpConnector::new(params, client)?))
            }
        }
    }
}

/// reqwest client carrying the configured headers on every request
///
/// `timeout_secs` bounds connection setup only; a whole-request timeout would
/// cut long-lived event streams.
fn http_client(
    params: &ConnectionParams,
    headers: &HashMap<String, String>,
) -> Result<reqwest::Client> {
    let mut header_map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let invalid = |e: &dyn std::fmt::Display| {
            let message = format!("{}: {}", key, e);
            SwitchboardError::invalid_field(&params.server_name, "headers", message)
        };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid(&e))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
        header_map.insert(name, value);
    }

    let mut builder = reqwest::Client::builder().default_headers(header_map);
    if let Some(secs) = params.extra_u64("timeout_secs") {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| SwitchboardError::server(&params.server_name, e.to_string()))
}

/// Reject URLs reqwest could never dial, before anything is opened
fn check_url(params: &ConnectionParams, url: &str) -> Result<()> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(SwitchboardError::invalid_field(
            &params.server_name,
            "url",
            format!("unsupported scheme '{}'", parsed.scheme()),
        )),
        Err(e) => Err(SwitchboardError::invalid_field(&params.server_name, "url", e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::ServerConfig;

    #[test]
    fn test_builds_every_transport_without_io() {
        let factory = RmcpTransportFactory::new();
        let configs = [
            ServerConfig::stdio("local", "definitely-not-a-real-binary")
                .with_extra("cwd", serde_json::json!("/tmp"))
                .unwrap(),
            ServerConfig::sse("events", "http://localhost:8000/sse")
                .with_header("Authorization", "Bearer abc"),
            ServerConfig::http("remote", "https://example.com/mcp")
                .with_extra("timeout_secs", serde_json::json!(5))
                .unwrap(),
        ];
        for config in configs {
            assert!(factory.build(&config.to_params()).is_ok(), "{}", config.name);
        }
    }

    #[test]
    fn test_bad_header_name_is_a_config_error() {
        let params = ServerConfig::http("remote", "https://example.com/mcp")
            .with_header("bad header", "x")
            .to_params();
        let err = RmcpTransportFactory::new().build(&params).err().unwrap();
        assert!(matches!(
            err,
            SwitchboardError::InvalidField { ref field, .. } if field == "headers"
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_bad_url_rejected_at_build() {
        let params = ServerConfig::sse("events", "ftp://example.com/sse").to_params();
        let err = RmcpTransportFactory::new().build(&params).err().unwrap();
        assert!(matches!(err, SwitchboardError::InvalidField { ref field, .. } if field == "url"));

        let params = ServerConfig::http("remote", "not a url").to_params();
        assert!(RmcpTransportFactory::new().build(&params).is_err());
    }
}
