use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use switchboard_core::{
    ConnectedServer, ConnectionParams, Result, ServerConnector, SwitchboardError,
    TransportConfig, TransportKind,
};
use tokio::process::Command;
use tracing::debug;

use super::RmcpServer;

/// Launches a local server and speaks MCP over its stdin/stdout
pub(crate) struct StdioConnector {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl StdioConnector {
    pub(crate) fn new(params: &ConnectionParams) -> Result<Self> {
        let TransportConfig::Stdio { command, args, env } = &params.transport else {
            return Err(SwitchboardError::UnsupportedTransport {
                server: params.server_name.clone(),
                transport: params.kind().to_string(),
            });
        };
        let cwd = match params.extra.get("cwd") {
            None => None,
            Some(value) => match value.as_str() {
                Some(dir) => Some(PathBuf::from(dir)),
                None => {
                    return Err(SwitchboardError::invalid_field(
                        &params.server_name,
                        "cwd",
                        "expected a string path",
                    ))
                }
            },
        };
        Ok(Self {
            name: params.server_name.clone(),
            command: command.clone(),
            args: args.clone(),
            env: env.clone(),
            cwd,
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).envs(&self.env).kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ServerConnector for StdioConnector {
    async fn open(self: Box<Self>) -> Result<Box<dyn ConnectedServer>> {
        debug!(
            server = %self.name,
            command = %self.command,
            args = ?self.args,
            "spawning server process"
        );
        let open_error = |message: String| SwitchboardError::Open {
            server: self.name.clone(),
            transport: TransportKind::Stdio,
            message,
        };

        let transport = TokioChildProcess::new(self.command())
            .map_err(|e| open_error(format!("failed to spawn '{}': {}", self.command, e)))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(RmcpServer::new(self.name.clone(), service)))
    }
}
