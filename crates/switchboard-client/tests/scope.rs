//! Scoped runs: release always happens and the caller's error wins

mod common;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{stdio_configs, Behavior, FakeFactory};
use switchboard_client::{
    ScopeError, ScopeOutcome, ServerConfig, ServerGroupManager, SwitchboardError,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq)]
struct QueryError(&'static str);

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed: {}", self.0)
    }
}

impl std::error::Error for QueryError {}

fn manager(configs: Vec<ServerConfig>, factory: &Arc<FakeFactory>) -> ServerGroupManager {
    ServerGroupManager::from_configs(configs)
        .with_factory(factory.clone())
        .with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_scope_returns_work_value_and_releases() {
    let factory = Arc::new(FakeFactory::new().with("b", Behavior::ok().with_catalog(&["schema"])));
    let value = manager(stdio_configs(&["a", "b"]), &factory)
        .scope(|servers| async move {
            let result = servers.call_tool("schema", serde_json::json!({})).await?;
            Ok::<_, SwitchboardError>(result.text_content())
        })
        .await
        .unwrap();

    assert_eq!(value, "b ran schema");
    assert_eq!(factory.log.servers("close"), vec!["b", "a"]);
    assert!(factory
        .log
        .close_outcomes()
        .iter()
        .all(|(_, outcome)| *outcome == ScopeOutcome::Completed));
}

#[tokio::test]
async fn test_work_error_survives_cleanup_errors() {
    let factory = Arc::new(
        FakeFactory::new()
            .with("a", Behavior::failing_close("close timed out"))
            .with("b", Behavior::failing_close("broken pipe")),
    );
    let result = manager(stdio_configs(&["a", "b"]), &factory)
        .scope(|_servers| async move { Err::<(), _>(QueryError("syntax error near MATCH")) })
        .await;

    match result {
        Err(ScopeError::Work(err)) => assert_eq!(err, QueryError("syntax error near MATCH")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(factory.log.servers("close"), vec!["b", "a"]);
    assert!(factory.log.close_outcomes().iter().all(|(_, outcome)| {
        *outcome == ScopeOutcome::failed("query failed: syntax error near MATCH")
    }));
}

#[tokio::test]
async fn test_acquire_failure_skips_work() {
    let factory = Arc::new(FakeFactory::new().with("b", Behavior::failing_open()));
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    let result = manager(stdio_configs(&["a", "b"]), &factory)
        .scope(|_servers| async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, QueryError>(())
        })
        .await;

    assert!(matches!(result, Err(ScopeError::Acquire(SwitchboardError::Open { .. }))));
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(factory.log.servers("close"), vec!["a"]);
}

#[tokio::test]
async fn test_cancellation_releases_with_cancelled_outcome() {
    let factory = Arc::new(FakeFactory::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let result = manager(stdio_configs(&["a", "b"]), &factory)
        .scope_with_cancel(cancel, |_servers| async move {
            trigger.cancel();
            std::future::pending::<Result<(), QueryError>>().await
        })
        .await;

    assert!(matches!(result, Err(ScopeError::Cancelled)));
    assert_eq!(factory.log.servers("close"), vec!["b", "a"]);
    assert!(factory
        .log
        .close_outcomes()
        .iter()
        .all(|(_, outcome)| *outcome == ScopeOutcome::Cancelled));
}

#[tokio::test]
async fn test_allowed_tools_hide_and_block_other_tools() {
    let factory = Arc::new(FakeFactory::new().with(
        "neo4j",
        Behavior::ok().with_catalog(&["read_cypher", "write_cypher"]),
    ));
    let configs = vec![
        ServerConfig::stdio("neo4j", "fake-mcp-server").with_allowed_tools(["read_cypher"]),
    ];
    let log = factory.log.clone();

    manager(configs, &factory)
        .scope(|servers| async move {
            let neo4j = servers.get("neo4j").unwrap();
            let names: Vec<_> = neo4j.list_tools().await?.into_iter().map(|t| t.name).collect();
            assert_eq!(names, vec!["read_cypher"]);

            let err = neo4j
                .call_tool("write_cypher", serde_json::json!({"query": "CREATE (n)"}))
                .await
                .unwrap_err();
            assert!(matches!(err, SwitchboardError::ToolNotAllowed { .. }));
            assert!(matches!(
                servers.call_tool("write_cypher", serde_json::json!({})).await,
                Err(SwitchboardError::ToolNotFound(_))
            ));
            Ok::<_, SwitchboardError>(())
        })
        .await
        .unwrap();

    assert!(log.servers("call").is_empty());
}

#[tokio::test]
async fn test_cached_catalog_fetched_once_per_server() {
    let factory = Arc::new(FakeFactory::new().with("a", Behavior::ok().with_catalog(&["echo"])));
    let log = factory.log.clone();

    manager(stdio_configs(&["a"]), &factory)
        .scope(|servers| async move {
            let a = servers.get("a").unwrap();
            a.list_tools().await?;
            a.list_tools().await?;
            Ok::<_, SwitchboardError>(())
        })
        .await
        .unwrap();

    assert_eq!(log.servers("list"), vec!["a"]);
}
