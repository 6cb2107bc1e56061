//! Collaborator traits consumed by the session engine.
//!
//! The engine does not own question authoring, learner profiles or long-term
//! result storage. Those live behind the traits below so that the hosting
//! application can plug in its own backends.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Question;
use crate::report::SessionReport;

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// Produces the questions for a newly created test.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name (e.g. "template").
    fn name(&self) -> &str;

    /// Produce `request.count` questions in presentation order.
    async fn generate(&self, request: &QuestionRequest) -> anyhow::Result<Vec<Question>>;
}

/// What a test needs questions about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub subject: String,
    pub topic: String,
    pub grade: String,
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Learner roster
// ---------------------------------------------------------------------------

/// Profile of a learner as known to the institution's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub name: String,
    pub grade: String,
    pub institution_id: String,
}

/// Looks up learners for join eligibility.
#[async_trait]
pub trait LearnerRoster: Send + Sync {
    /// Returns `None` when the learner is unknown.
    async fn lookup(&self, learner_id: &str) -> anyhow::Result<Option<LearnerProfile>>;
}

/// Roster backed by a map, for tests and simulations.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    learners: RwLock<HashMap<String, LearnerProfile>>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learners(learners: impl IntoIterator<Item = LearnerProfile>) -> Self {
        let roster = Self::new();
        for learner in learners {
            roster.insert(learner);
        }
        roster
    }

    pub fn insert(&self, profile: LearnerProfile) {
        self.learners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(profile.learner_id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.learners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LearnerRoster for InMemoryRoster {
    async fn lookup(&self, learner_id: &str) -> anyhow::Result<Option<LearnerProfile>> {
        Ok(self
            .learners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(learner_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

/// Receives the final results of a session before the session is closed.
///
/// An error keeps the session open so the teacher can retry ending it.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, report: &SessionReport) -> anyhow::Result<()>;
}
