//! Server group manager
//!
//! Brings a group of independently configured MCP servers up as one resource
//! and tears all of them down again, exactly once and in reverse open order,
//! however the caller's work ended.

use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{
    CleanupError, CleanupPhase, CleanupReport, ConnectedServer, ConnectionParams, Result,
    ScopeOutcome, ServerConfig, ServerConfigMap, ServerConnector, SwitchboardError,
    TransportFactory,
};
use tracing::{debug, error, info, instrument, warn};

use crate::handle::{ServerHandle, ServerHandles};
use crate::teardown::teardown;
use crate::transport::RmcpTransportFactory;

/// Wait between the shutdown signals and the first close
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Re-attempts made when a server fails to open
///
/// The default makes a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl OpenRetryPolicy {
    /// Fail fast on the first open error
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Up to `max_attempts` tries with a fixed `delay` between them
    pub fn linear(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for OpenRetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

enum ConfigSource {
    Raw(ServerConfigMap),
    Typed(Vec<ServerConfig>),
}

impl ConfigSource {
    fn len(&self) -> usize {
        match self {
            Self::Raw(map) => map.len(),
            Self::Typed(configs) => configs.len(),
        }
    }

    fn names(&self) -> Vec<String> {
        match self {
            Self::Raw(map) => map.names(),
            Self::Typed(configs) => configs.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Normalized params for every entry, in declaration order
    fn params(&self) -> impl Iterator<Item = Result<ConnectionParams>> + '_ {
        let iter: Box<dyn Iterator<Item = Result<ConnectionParams>> + '_> = match self {
            Self::Raw(map) => Box::new(
                map.iter()
                    .map(|(name, raw)| ServerConfig::from_raw(name, raw).map(|c| c.to_params())),
            ),
            Self::Typed(configs) => Box::new(configs.iter().map(|c| Ok(c.to_params()))),
        };
        iter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupState {
    Idle,
    Active,
    Spent,
}

/// Manages a group of MCP servers as a single scoped resource
///
/// Construction performs no I/O. [`acquire`](Self::acquire) builds a
/// connector for every configured server, then opens them one by one in
/// declaration order. [`release`](Self::release) signals shutdown, waits the
/// settle delay, and closes every server in reverse order, collecting close
/// failures into a [`CleanupReport`] instead of returning them.
///
/// A released manager is spent; build a new one to bring the group up again.
///
/// # Example
///
/// ```rust,no_run
/// use switchboard_client::{ServerGroupManager, ScopeOutcome};
/// use switchboard_core::ServerConfigMap;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let configs = ServerConfigMap::from_json_str(r#"{
///     "neo4j": {"command": "uvx", "args": ["mcp-neo4j-cypher@0.3.0", "--transport", "stdio"]}
/// }"#)?;
///
/// let mut manager = ServerGroupManager::new(configs);
/// let servers = manager.acquire().await?;
/// for (name, handle) in servers.iter() {
///     println!("{}: {} tools", name, handle.list_tools().await?.len());
/// }
/// let report = manager.release(ScopeOutcome::Completed).await;
/// assert!(report.is_clean());
/// # Ok(())
/// # }
/// ```
pub struct ServerGroupManager {
    configs: ConfigSource,
    factory: Arc<dyn TransportFactory>,
    settle_delay: Duration,
    open_retry: OpenRetryPolicy,
    state: GroupState,
    /// Opened handles, in open order
    opened: Vec<Arc<ServerHandle>>,
    handles: ServerHandles,
}

impl ServerGroupManager {
    /// Manage the servers of a raw config mapping
    ///
    /// Entries are validated during [`acquire`](Self::acquire), not here.
    pub fn new(configs: ServerConfigMap) -> Self {
        Self::with_source(ConfigSource::Raw(configs))
    }

    /// Manage already-typed server configs, in the given order
    pub fn from_configs(configs: Vec<ServerConfig>) -> Self {
        Self::with_source(ConfigSource::Typed(configs))
    }

    fn with_source(configs: ConfigSource) -> Self {
        Self {
            configs,
            factory: Arc::new(RmcpTransportFactory::new()),
            settle_delay: DEFAULT_SETTLE_DELAY,
            open_retry: OpenRetryPolicy::default(),
            state: GroupState::Idle,
            opened: Vec::new(),
            handles: ServerHandles::default(),
        }
    }

    /// Use a different transport factory
    pub fn with_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_open_retry(mut self, policy: OpenRetryPolicy) -> Self {
        self.open_retry = policy;
        self
    }

    /// Number of configured servers
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Configured server names, in declaration order
    pub fn server_names(&self) -> Vec<String> {
        self.configs.names()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Handles of the currently acquired group (empty when not acquired)
    pub fn handles(&self) -> &ServerHandles {
        &self.handles
    }

    pub fn is_acquired(&self) -> bool {
        self.state == GroupState::Active
    }

    /// Whether the group has been released
    pub fn is_spent(&self) -> bool {
        self.state == GroupState::Spent
    }

    /// Bring every configured server up
    ///
    /// Returns a handle for every entry or an error with nothing left open:
    /// a configuration error fails before anything is opened, and an open
    /// failure closes the servers opened so far (in reverse order) before the
    /// original error is returned. A failed acquire leaves the manager idle.
    #[instrument(skip(self), fields(servers = self.configs.len()))]
    pub async fn acquire(&mut self) -> Result<ServerHandles> {
        match self.state {
            GroupState::Active => return Err(SwitchboardError::AlreadyAcquired),
            GroupState::Spent => return Err(SwitchboardError::ManagerSpent),
            GroupState::Idle => {}
        }

        // Build pass: validate and construct every connector, no I/O yet.
        let mut pending: Vec<(ConnectionParams, Box<dyn ServerConnector>)> =
            Vec::with_capacity(self.configs.len());
        for params in self.configs.params() {
            let params = params?;
            let connector = self.factory.build(&params).map_err(|e| {
                error!(
                    server = %params.server_name,
                    transport = %params.kind(),
                    error = %e,
                    "failed to build server"
                );
                e
            })?;
            debug!(server = %params.server_name, transport = %params.kind(), "built server");
            pending.push((params, connector));
        }

        // Open pass, one server at a time.
        self.state = GroupState::Active;
        for (params, connector) in pending {
            match self.open_with_retry(&params, connector).await {
                Ok(connection) => {
                    info!(
                        server = %params.server_name,
                        transport = %params.kind(),
                        "server opened"
                    );
                    self.opened
                        .push(Arc::new(ServerHandle::new(&params, connection)));
                }
                Err(err) => {
                    error!(
                        server = %params.server_name,
                        transport = %params.kind(),
                        error = %err,
                        opened = self.opened.len(),
                        "failed to open server, rolling back"
                    );
                    let opened = std::mem::take(&mut self.opened);
                    spawn_teardown(opened, ScopeOutcome::failed(&err), self.settle_delay)
                        .await
                        .log();
                    self.state = GroupState::Idle;
                    return Err(err);
                }
            }
        }

        self.handles = ServerHandles::from_handles(&self.opened);
        info!(servers = ?self.handles.names(), "server group acquired");
        Ok(self.handles.clone())
    }

    async fn open_with_retry(
        &self,
        params: &ConnectionParams,
        connector: Box<dyn ServerConnector>,
    ) -> Result<Box<dyn ConnectedServer>> {
        let mut connector = connector;
        let mut attempt = 1;
        loop {
            match connector.open().await {
                Ok(connection) => return Ok(connection),
                Err(e) if attempt < self.open_retry.max_attempts() => {
                    warn!(
                        server = %params.server_name,
                        attempt,
                        max_attempts = self.open_retry.max_attempts(),
                        error = %e,
                        "open failed, retrying"
                    );
                    tokio::time::sleep(self.open_retry.delay()).await;
                    connector = self.factory.build(params)?;
                    attempt += 1;
                }
                Err(e) => return Err(open_error(params, e)),
            }
        }
    }

    /// Tear the group down
    ///
    /// Sends the shutdown signal to every server that supports it, waits the
    /// settle delay, then closes every server in reverse open order. Close
    /// failures never stop the remaining closes and are returned in the
    /// report rather than as an error. Handles are cleared even when cleanup
    /// errors occur. Releasing a group that holds no handles is a no-op.
    ///
    /// The teardown runs on its own task: if the future returned here is
    /// dropped, closing still runs to completion in the background.
    #[instrument(skip_all, fields(outcome = %outcome))]
    pub async fn release(&mut self, outcome: ScopeOutcome) -> CleanupReport {
        if self.state == GroupState::Active {
            self.state = GroupState::Spent;
        }
        if self.opened.is_empty() {
            debug!("nothing to release");
            self.handles = ServerHandles::default();
            return CleanupReport::default();
        }

        let opened = std::mem::take(&mut self.opened);
        let count = opened.len();
        let report = spawn_teardown(opened, outcome, self.settle_delay).await;

        self.handles = ServerHandles::default();
        report.log();
        info!(servers = count, errors = report.error_count(), "server group released");
        report
    }
}

impl Drop for ServerGroupManager {
    fn drop(&mut self) {
        if self.opened.is_empty() {
            return;
        }
        let opened = std::mem::take(&mut self.opened);
        let count = opened.len();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(
                    servers = count,
                    "server group dropped without release, closing in background"
                );
                let settle_delay = self.settle_delay;
                runtime.spawn(async move {
                    teardown(opened, &ScopeOutcome::Cancelled, settle_delay)
                        .await
                        .log();
                });
            }
            Err(_) => {
                error!(
                    servers = count,
                    "server group dropped without release outside a tokio runtime"
                );
            }
        }
    }
}

/// Run the teardown on its own task so dropping the caller's future cannot
/// interrupt a close halfway through
async fn spawn_teardown(
    handles: Vec<Arc<ServerHandle>>,
    outcome: ScopeOutcome,
    settle_delay: Duration,
) -> CleanupReport {
    let task = tokio::spawn(async move { teardown(handles, &outcome, settle_delay).await });
    match task.await {
        Ok(report) => report,
        Err(join_error) => {
            error!(error = %join_error, "teardown task failed");
            let mut report = CleanupReport::default();
            report.push(CleanupError::new("<group>", CleanupPhase::Close, join_error));
            report
        }
    }
}

fn open_error(params: &ConnectionParams, err: SwitchboardError) -> SwitchboardError {
    match err {
        SwitchboardError::Open { .. } => err,
        other => SwitchboardError::Open {
            server: params.server_name.clone(),
            transport: params.kind(),
            message: other.to_string(),
        },
    }
}
