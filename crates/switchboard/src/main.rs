use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use switchboard::{
    OpenRetryPolicy, ScopeError, ServerConfigMap, ServerGroupManager, ServerHandles,
    DEFAULT_SETTLE_DELAY,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Delay between open attempts when `--open-retries` is set
const OPEN_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[clap(
    name = "switchboard",
    version,
    about = "Bring a group of MCP servers up, use them, and tear them down again"
)]
struct Args {
    /// Server group config file (.json or .toml)
    #[clap(short, long)]
    config: PathBuf,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Wait between shutdown signals and closing, in milliseconds
    #[clap(long, default_value_t = DEFAULT_SETTLE_DELAY.as_millis() as u64)]
    settle_ms: u64,

    /// Extra attempts for a server that fails to open
    #[clap(long, default_value = "0")]
    open_retries: u32,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List configured servers with their transport and tool count
    Servers,
    /// List the tools each server exposes
    Tools {
        /// Only this server
        #[clap(long)]
        server: Option<String>,
    },
    /// Call one tool and print its text output
    Call {
        server: String,
        tool: String,
        /// Tool arguments as a JSON object
        #[clap(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting switchboard v{}", env!("CARGO_PKG_VERSION"));

    let configs = ServerConfigMap::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    debug!(servers = ?configs.names(), "loaded configuration");

    let manager = ServerGroupManager::new(configs)
        .with_settle_delay(Duration::from_millis(args.settle_ms))
        .with_open_retry(OpenRetryPolicy::linear(
            args.open_retries.saturating_add(1),
            OPEN_RETRY_DELAY,
        ));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting servers down");
            ctrl_c.cancel();
        }
    });

    let command = args.command;
    let result = manager
        .scope_with_cancel(cancel, |servers| async move { run(command, servers).await })
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(ScopeError::Acquire(e)) => {
            Err(anyhow::Error::new(e).context("failed to start servers"))
        }
        Err(ScopeError::Work(e)) => Err(e),
        Err(ScopeError::Cancelled) => bail!("interrupted"),
    }
}

async fn run(command: Command, servers: ServerHandles) -> Result<()> {
    match command {
        Command::Servers => {
            for (name, handle) in servers.iter() {
                let tools = handle.list_tools().await?;
                println!("{}\t{}\t{} tools", name, handle.transport(), tools.len());
            }
        }
        Command::Tools { server } => {
            for (name, handle) in servers.iter() {
                if server.as_deref().is_some_and(|wanted| wanted != name) {
                    continue;
                }
                println!("{}:", name);
                for tool in handle.list_tools().await? {
                    match tool.description {
                        Some(description) => println!("  {} - {}", tool.name, description),
                        None => println!("  {}", tool.name),
                    }
                }
            }
            if let Some(wanted) = server {
                if servers.get(&wanted).is_none() {
                    bail!("no server named '{}'", wanted);
                }
            }
        }
        Command::Call { server, tool, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            let handle = servers
                .get(&server)
                .with_context(|| format!("no server named '{}'", server))?;
            let result = handle.call_tool(&tool, arguments).await?;
            println!("{}", result.text_content());
            if result.is_error {
                bail!("tool '{}' on '{}' reported an error", tool, server);
            }
        }
    }
    Ok(())
}
