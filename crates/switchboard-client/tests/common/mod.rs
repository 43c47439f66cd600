//! Recording fake transport shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use switchboard_client::{
    ConnectedServer, ConnectionParams, Result, ScopeOutcome, ServerConfig, ServerConnector,
    SwitchboardError, ToolInfo, ToolResult, TransportFactory,
};

/// How one fake server behaves
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    /// Number of leading open attempts that fail
    pub failing_opens: usize,
    pub close_error: Option<String>,
    pub close_panics: bool,
    pub shutdown: bool,
    pub shutdown_error: Option<String>,
    pub catalog: Vec<String>,
}

impl Behavior {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing_open() -> Self {
        Self {
            failing_opens: usize::MAX,
            ..Self::default()
        }
    }

    pub fn flaky_open(failures: usize) -> Self {
        Self {
            failing_opens: failures,
            ..Self::default()
        }
    }

    pub fn failing_close(message: &str) -> Self {
        Self {
            close_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_shutdown(mut self) -> Self {
        self.shutdown = true;
        self
    }

    pub fn with_catalog(mut self, tools: &[&str]) -> Self {
        self.catalog = tools.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Ordered record of everything the fakes were asked to do
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
    outcomes: Arc<Mutex<Vec<(String, ScopeOutcome)>>>,
}

impl EventLog {
    fn push(&self, kind: &str, server: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", kind, server));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Server names for one kind of event, in the order they happened
    pub fn servers(&self, kind: &str) -> Vec<String> {
        let prefix = format!("{}:", kind);
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn close_outcomes(&self) -> Vec<(String, ScopeOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub log: EventLog,
    behaviors: HashMap<String, Behavior>,
    open_attempts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, server: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(server.to_string(), behavior);
        self
    }
}

impl TransportFactory for FakeFactory {
    fn build(&self, params: &ConnectionParams) -> Result<Box<dyn ServerConnector>> {
        self.log.push("build", &params.server_name);
        Ok(Box::new(FakeConnector {
            name: params.server_name.clone(),
            behavior: self
                .behaviors
                .get(&params.server_name)
                .cloned()
                .unwrap_or_default(),
            log: self.log.clone(),
            open_attempts: Arc::clone(&self.open_attempts),
        }))
    }
}

struct FakeConnector {
    name: String,
    behavior: Behavior,
    log: EventLog,
    open_attempts: Arc<Mutex<HashMap<String, usize>>>,
}

#[async_trait]
impl ServerConnector for FakeConnector {
    async fn open(self: Box<Self>) -> Result<Box<dyn ConnectedServer>> {
        self.log.push("open", &self.name);
        let attempt = {
            let mut attempts = self.open_attempts.lock().unwrap();
            let count = attempts.entry(self.name.clone()).or_default();
            *count += 1;
            *count
        };
        if attempt <= self.behavior.failing_opens {
            return Err(SwitchboardError::server(&self.name, "connection refused"));
        }
        Ok(Box::new(FakeServer {
            name: self.name,
            behavior: self.behavior,
            log: self.log,
            closed: false,
        }))
    }
}

struct FakeServer {
    name: String,
    behavior: Behavior,
    log: EventLog,
    closed: bool,
}

#[async_trait]
impl ConnectedServer for FakeServer {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        self.log.push("list", &self.name);
        Ok(self.behavior.catalog.iter().map(ToolInfo::new).collect())
    }

    async fn call_tool(&self, name: &str, _arguments: serde_json::Value) -> Result<ToolResult> {
        self.log.push("call", &format!("{}/{}", self.name, name));
        Ok(ToolResult::text(format!("{} ran {}", self.name, name)))
    }

    fn supports_shutdown(&self) -> bool {
        self.behavior.shutdown
    }

    async fn shutdown(&self) -> Result<()> {
        self.log.push("shutdown", &self.name);
        match &self.behavior.shutdown_error {
            Some(message) => Err(SwitchboardError::server(&self.name, message.clone())),
            None => Ok(()),
        }
    }

    async fn close(&mut self, outcome: &ScopeOutcome) -> Result<()> {
        assert!(!self.closed, "server {} closed twice", self.name);
        self.closed = true;
        self.log.push("close", &self.name);
        self.log
            .outcomes
            .lock()
            .unwrap()
            .push((self.name.clone(), outcome.clone()));
        if self.behavior.close_panics {
            panic!("close blew up");
        }
        match &self.behavior.close_error {
            Some(message) => Err(SwitchboardError::server(&self.name, message.clone())),
            None => Ok(()),
        }
    }
}

/// Stdio configs for the given names; the command is never run
pub fn stdio_configs(names: &[&str]) -> Vec<ServerConfig> {
    names
        .iter()
        .map(|name| ServerConfig::stdio(*name, "fake-mcp-server"))
        .collect()
}
