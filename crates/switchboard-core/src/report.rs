//! Aggregated teardown results

use std::fmt;
use tracing::warn;

/// Teardown step a cleanup error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    Shutdown,
    Close,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown"),
            Self::Close => f.write_str("close"),
        }
    }
}

/// One server's failure during teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupError {
    pub server: String,
    pub phase: CleanupPhase,
    pub message: String,
}

impl CleanupError {
    pub fn new(server: impl Into<String>, phase: CleanupPhase, message: impl fmt::Display) -> Self {
        Self {
            server: server.into(),
            phase,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error during {} of server {}: {}",
            self.phase, self.server, self.message
        )
    }
}

/// Result of tearing down a server group
///
/// Cleanup failures are collected here rather than returned as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Servers a shutdown signal was sent to, in send order
    pub signalled: Vec<String>,
    /// Servers a close was attempted on, in close order
    pub close_attempts: Vec<String>,
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Errors recorded for `server`
    pub fn errors_for<'a>(&'a self, server: &'a str) -> impl Iterator<Item = &'a CleanupError> {
        self.errors.iter().filter(move |e| e.server == server)
    }

    pub fn push(&mut self, error: CleanupError) {
        self.errors.push(error);
    }

    /// Log the error summary, if there is one
    pub fn log(&self) {
        if self.is_clean() {
            return;
        }
        warn!(
            error_count = self.error_count(),
            "Encountered {} error(s) during cleanup",
            self.error_count()
        );
        for error in &self.errors {
            warn!(server = %error.server, phase = %error.phase, "- {}", error);
        }
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "Closed {} server(s) cleanly", self.close_attempts.len());
        }
        write!(
            f,
            "Encountered {} error(s) during cleanup:",
            self.error_count()
        )?;
        for error in &self.errors {
            write!(f, "\n- {}", error)?;
        }
        Ok(())
    }
}
