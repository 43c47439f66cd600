//! Scoped use of a server group
//!
//! Acquire, run the caller's work, release. The release always runs, and the
//! caller's own error always wins over anything that happens during cleanup.

use std::fmt;
use std::future::Future;

use switchboard_core::{ScopeOutcome, SwitchboardError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::handle::ServerHandles;
use crate::manager::ServerGroupManager;

/// Why a scoped run did not produce a value
#[derive(Debug)]
pub enum ScopeError<E> {
    /// The group could not be brought up; the work never ran
    Acquire(SwitchboardError),
    /// The work itself failed; this is the caller's error, unchanged
    Work(E),
    /// The cancellation token fired before the work finished
    Cancelled,
}

impl<E> ScopeError<E> {
    /// The caller's error, if the work is what failed
    pub fn into_work_error(self) -> Option<E> {
        match self {
            Self::Work(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<E: fmt::Display> fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "{}", e),
            Self::Work(e) => write!(f, "{}", e),
            Self::Cancelled => f.write_str("Operation cancelled"),
        }
    }
}

impl<E> std::error::Error for ScopeError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Acquire(e) => Some(e),
            Self::Work(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

impl ServerGroupManager {
    /// Acquire the group, run `work` with the handles, then release
    ///
    /// The release runs whether `work` succeeds or fails. Cleanup failures
    /// are logged; they never replace the result of `work`.
    pub async fn scope<F, Fut, T, E>(self, work: F) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(ServerHandles) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.scope_with_cancel(CancellationToken::new(), work).await
    }

    /// Like [`scope`](Self::scope), but stops the work when `cancel` fires
    ///
    /// On cancellation the work future is dropped, the group is released
    /// with [`ScopeOutcome::Cancelled`], and [`ScopeError::Cancelled`] is
    /// returned.
    pub async fn scope_with_cancel<F, Fut, T, E>(
        mut self,
        cancel: CancellationToken,
        work: F,
    ) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(ServerHandles) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let handles = self.acquire().await.map_err(ScopeError::Acquire)?;
        info!(servers = ?handles.names(), "Servers started");

        let result = tokio::select! {
            result = work(handles) => result.map_err(ScopeError::Work),
            _ = cancel.cancelled() => Err(ScopeError::Cancelled),
        };

        let outcome = match &result {
            Ok(_) => ScopeOutcome::Completed,
            Err(ScopeError::Work(e)) => ScopeOutcome::failed(e),
            Err(_) => ScopeOutcome::Cancelled,
        };
        let report = self.release(outcome).await;
        if !report.is_clean() && result.is_err() {
            warn!(
                errors = report.error_count(),
                "cleanup errors occurred after the scope failed; returning the original error"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_passes_work_error_through() {
        let err: ScopeError<String> = ScopeError::Work("query failed".to_string());
        assert_eq!(err.to_string(), "query failed");
        assert_eq!(err.into_work_error().as_deref(), Some("query failed"));
        assert!(ScopeError::<String>::Cancelled.is_cancelled());
    }
}
