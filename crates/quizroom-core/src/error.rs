//! Engine error types.
//!
//! Only caller misuse and collaborator failures are errors. Routine races
//! (joining an ended session, answering a question that has already moved on)
//! are reported as `false`/`None` by the operations themselves.

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by catalog and session registry operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input to test creation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The test id is not in the catalog.
    #[error("test not found: {0}")]
    TestNotFound(String),

    /// The session id is not in the registry.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The test already has a live session.
    #[error("test {test_id} already has a live session ({session_id})")]
    ActiveSessionExists { test_id: String, session_id: Uuid },

    /// The test's session has already run to completion.
    #[error("test {0} is already completed")]
    TestCompleted(String),

    /// The session was already ended.
    #[error("session {0} has already ended")]
    SessionEnded(Uuid),

    /// The question source failed to produce questions.
    #[error("question source failed: {0:#}")]
    QuestionSource(#[source] anyhow::Error),

    /// The result sink refused the session's results.
    #[error("result sink failed: {0:#}")]
    Sink(#[source] anyhow::Error),
}

impl EngineError {
    /// Returns `true` for unknown test or session ids.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::TestNotFound(_) | EngineError::SessionNotFound(_)
        )
    }

    /// Returns `true` for lifecycle conflicts (second live session, reuse of
    /// a completed test, ending a session twice).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::ActiveSessionExists { .. }
                | EngineError::TestCompleted(_)
                | EngineError::SessionEnded(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
