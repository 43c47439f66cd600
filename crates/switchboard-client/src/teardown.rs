//! Signal, settle, close-in-reverse teardown shared by release and rollback

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use switchboard_core::{
    CleanupError, CleanupPhase, CleanupReport, ScopeOutcome, ShutdownCapability,
};
use tracing::{debug, error, info, warn};

use crate::handle::ServerHandle;

/// Tear down `handles`, given in open order
///
/// Every handle is closed exactly once, last-opened first. A failure (or a
/// panic) on one handle is recorded and the remaining handles are still
/// closed.
pub(crate) async fn teardown(
    handles: Vec<Arc<ServerHandle>>,
    outcome: &ScopeOutcome,
    settle_delay: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for handle in &handles {
        if handle.shutdown_capability() == ShutdownCapability::NoShutdown {
            continue;
        }
        report.signalled.push(handle.name().to_string());
        match AssertUnwindSafe(handle.signal_shutdown()).catch_unwind().await {
            Ok(Ok(())) => debug!(server = %handle.name(), "shutdown signal sent"),
            Ok(Err(e)) => {
                warn!(server = %handle.name(), error = %e, "shutdown signal failed");
                report.push(CleanupError::new(handle.name(), CleanupPhase::Shutdown, e));
            }
            Err(panic) => {
                let message = panic_message(panic);
                warn!(server = %handle.name(), error = %message, "shutdown signal panicked");
                report.push(CleanupError::new(handle.name(), CleanupPhase::Shutdown, message));
            }
        }
    }

    if !report.signalled.is_empty() && !settle_delay.is_zero() {
        debug!(
            delay_ms = settle_delay.as_millis() as u64,
            "waiting for in-flight messages to settle"
        );
        tokio::time::sleep(settle_delay).await;
    }

    for handle in handles.iter().rev() {
        report.close_attempts.push(handle.name().to_string());
        match AssertUnwindSafe(handle.close(outcome)).catch_unwind().await {
            Ok(Ok(())) => info!(server = %handle.name(), "server closed"),
            Ok(Err(e)) => {
                error!(server = %handle.name(), error = %e, "Error cleaning up server");
                report.push(CleanupError::new(handle.name(), CleanupPhase::Close, e));
            }
            Err(panic) => {
                let message = panic_message(panic);
                error!(server = %handle.name(), error = %message, "server close panicked");
                report.push(CleanupError::new(handle.name(), CleanupPhase::Close, message));
            }
        }
    }

    report
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
