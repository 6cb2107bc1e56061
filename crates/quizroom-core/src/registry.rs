//! Session registry: live sessions, join codes and per-session locking.
//!
//! Each session sits behind its own `tokio::sync::Mutex`; the registry index
//! is only locked long enough to look up or insert a session handle, so
//! different sessions never wait on each other. Every state change and the
//! message that records it are applied under the session lock together.
//!
//! Lock order: index -> catalog, and session -> catalog. The catalog lock is
//! never held while waiting on the index or a session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use crate::catalog::TestCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    join_code_for, normalize_join_code, Question, TestMessage, TestResult, TestSession,
};
use crate::report::SessionReport;
use crate::statistics::{compute_results, SessionSummary};
use crate::traits::{LearnerRoster, ResultSink};

/// Join code -> session ids. A code owned by more than one session does not
/// resolve.
#[derive(Debug, Default)]
pub struct JoinCodeIndex {
    codes: HashMap<String, Vec<Uuid>>,
}

impl JoinCodeIndex {
    pub fn insert(&mut self, session_id: Uuid) {
        let ids = self.codes.entry(join_code_for(&session_id)).or_default();
        if !ids.contains(&session_id) {
            ids.push(session_id);
        }
    }

    pub fn remove(&mut self, session_id: &Uuid) {
        let code = join_code_for(session_id);
        if let Some(ids) = self.codes.get_mut(&code) {
            ids.retain(|id| id != session_id);
            if ids.is_empty() {
                self.codes.remove(&code);
            }
        }
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.codes.contains_key(&normalize_join_code(code))
    }

    /// Resolve user-entered code text. Case and surrounding whitespace are
    /// ignored.
    pub fn resolve(&self, code: &str) -> Option<Uuid> {
        match self.codes.get(&normalize_join_code(code))?.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// A live feed of a session's message log.
#[derive(Debug)]
pub struct Subscription {
    /// Log length when the subscription was taken. The first message received
    /// sits at this position, so `messages_since(position)` and the feed
    /// never overlap.
    pub position: usize,
    pub events: broadcast::Receiver<TestMessage>,
}

/// Mutable state of one session, guarded by the session mutex.
pub(crate) struct SessionState {
    pub(crate) session: TestSession,
    events: broadcast::Sender<TestMessage>,
}

impl SessionState {
    pub(crate) fn new(session: TestSession, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { session, events }
    }

    /// Append to the log and notify subscribers.
    pub(crate) fn append(&mut self, message: TestMessage) {
        self.session.messages.push(message.clone());
        // No subscribers is fine; the log is the source of truth.
        let _ = self.events.send(message);
    }
}

/// A registered session: immutable facts plus its guarded state.
pub(crate) struct LiveSession {
    pub(crate) test_id: String,
    pub(crate) grade: String,
    /// Snapshot of the test's questions taken at start.
    pub(crate) questions: Vec<Question>,
    pub(crate) state: Mutex<SessionState>,
}

#[derive(Default)]
struct RegistryIndex {
    sessions: HashMap<Uuid, Arc<LiveSession>>,
    join_codes: JoinCodeIndex,
    live_by_test: HashMap<String, Uuid>,
}

/// Owns every session started through the engine.
///
/// Ended sessions stay registered, so snapshots and message logs remain
/// readable, until [`SessionRegistry::prune_ended`] drops them.
pub struct SessionRegistry {
    index: RwLock<RegistryIndex>,
    config: EngineConfig,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            index: RwLock::new(RegistryIndex::default()),
            config,
        }
    }

    pub(crate) async fn handle(&self, session_id: &Uuid) -> Option<Arc<LiveSession>> {
        self.index.read().await.sessions.get(session_id).cloned()
    }

    async fn require(&self, session_id: &Uuid) -> Result<Arc<LiveSession>> {
        self.handle(session_id)
            .await
            .ok_or(EngineError::SessionNotFound(*session_id))
    }

    pub(crate) fn ai_sender_name(&self) -> &str {
        &self.config.ai_sender_name
    }

    /// Start the single live session of a test.
    #[tracing::instrument(skip(self, catalog))]
    pub async fn start(&self, catalog: &TestCatalog, test_id: &str) -> Result<TestSession> {
        let mut index = self.index.write().await;

        if let Some(existing) = index.live_by_test.get(test_id) {
            return Err(EngineError::ActiveSessionExists {
                test_id: test_id.to_string(),
                session_id: *existing,
            });
        }

        let test = catalog.activate(test_id).await?;

        let mut session_id = Uuid::new_v4();
        for _ in 1..self.config.join_code_attempts.max(1) {
            if !index.join_codes.contains_code(&join_code_for(&session_id)) {
                break;
            }
            session_id = Uuid::new_v4();
        }

        let session = TestSession::new(session_id, test_id);
        let live = LiveSession {
            test_id: test.id.clone(),
            grade: test.grade.clone(),
            questions: test.questions,
            state: Mutex::new(SessionState::new(session.clone(), self.config.event_capacity)),
        };

        index.join_codes.insert(session_id);
        index.live_by_test.insert(test.id.clone(), session_id);
        index.sessions.insert(session_id, Arc::new(live));

        tracing::info!(
            session = %session_id,
            join_code = %session.join_code,
            test = %test.id,
            "session started"
        );
        Ok(session)
    }

    /// Resolve a join code to a session id.
    pub async fn resolve_join_code(&self, code: &str) -> Option<Uuid> {
        self.index.read().await.join_codes.resolve(code)
    }

    /// Add a learner to an active session.
    ///
    /// Returns `false` when the session is unknown or inactive, or the roster
    /// does not place the learner in the test's grade.
    pub async fn join(
        &self,
        roster: &dyn LearnerRoster,
        session_id: &Uuid,
        learner_id: &str,
        learner_name: &str,
    ) -> bool {
        let Some(live) = self.handle(session_id).await else {
            tracing::debug!(session = %session_id, learner = learner_id, "join: unknown session");
            return false;
        };

        let profile = match roster.lookup(learner_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(learner = learner_id, "join: learner not on roster");
                return false;
            }
            Err(e) => {
                tracing::warn!(learner = learner_id, "join: roster lookup failed: {e:#}");
                return false;
            }
        };
        if profile.grade != live.grade {
            tracing::warn!(
                learner = learner_id,
                learner_grade = %profile.grade,
                test_grade = %live.grade,
                "join: grade mismatch"
            );
            return false;
        }

        let mut state = live.state.lock().await;
        if !state.session.is_active {
            tracing::debug!(session = %session_id, learner = learner_id, "join: session ended");
            return false;
        }
        if !state.session.participants.insert(learner_id.to_string()) {
            return true;
        }

        let welcome = TestMessage::system(
            &self.config.ai_sender_name,
            format!("Welcome {learner_name}! You have joined the test."),
        );
        state.append(welcome);
        tracing::info!(session = %session_id, learner = learner_id, "learner joined");
        true
    }

    /// End a session: score it, hand the report to `sink`, then close it.
    ///
    /// If the sink fails the session stays active and untouched.
    #[tracing::instrument(skip(self, catalog, sink))]
    pub async fn end(
        &self,
        catalog: &TestCatalog,
        sink: &dyn ResultSink,
        session_id: &Uuid,
    ) -> Result<Vec<TestResult>> {
        let live = self.require(session_id).await?;

        let mut state = live.state.lock().await;
        if !state.session.is_active {
            return Err(EngineError::SessionEnded(*session_id));
        }

        let ended_at = Utc::now();
        let results = compute_results(&state.session, ended_at);
        let report = SessionReport {
            session_id: *session_id,
            join_code: state.session.join_code.clone(),
            test_id: live.test_id.clone(),
            started_at: state.session.started_at,
            ended_at,
            summary: SessionSummary::from_results(&results),
            results,
        };

        if let Err(e) = sink.persist(&report).await {
            tracing::error!(session = %session_id, "result sink failed: {e:#}");
            return Err(EngineError::Sink(e));
        }

        state.session.is_active = false;
        state.session.ended_at = Some(ended_at);
        catalog.complete(&live.test_id).await;

        tracing::info!(
            session = %session_id,
            participants = report.results.len(),
            "session ended"
        );

        drop(state);
        self.index.write().await.live_by_test.remove(&live.test_id);
        Ok(report.results)
    }

    /// Append the closing `Results` announcement.
    pub async fn add_results_message(
        &self,
        session_id: &Uuid,
        results: &[TestResult],
    ) -> Result<()> {
        let live = self.require(session_id).await?;
        let summary = SessionSummary::from_results(results);
        let message = TestMessage::results(&self.config.ai_sender_name, summary.render());
        live.state.lock().await.append(message);
        Ok(())
    }

    /// Current state of a session.
    pub async fn snapshot(&self, session_id: &Uuid) -> Result<TestSession> {
        let live = self.require(session_id).await?;
        let state = live.state.lock().await;
        Ok(state.session.clone())
    }

    /// Messages at log positions `cursor..`.
    pub async fn messages_since(
        &self,
        session_id: &Uuid,
        cursor: usize,
    ) -> Result<Vec<TestMessage>> {
        let live = self.require(session_id).await?;
        let state = live.state.lock().await;
        Ok(state
            .session
            .messages
            .get(cursor..)
            .map(<[TestMessage]>::to_vec)
            .unwrap_or_default())
    }

    /// Receive every message appended from now on, in log order.
    ///
    /// A receiver that lags can catch up with `messages_since`, counting
    /// positions from `Subscription::position`.
    pub async fn subscribe(&self, session_id: &Uuid) -> Result<Subscription> {
        let live = self.require(session_id).await?;
        let state = live.state.lock().await;
        Ok(Subscription {
            position: state.session.messages.len(),
            events: state.events.subscribe(),
        })
    }

    /// Forget sessions that ended before `cutoff`, freeing their join codes.
    /// Sessions whose lock is held are left for a later call.
    pub async fn prune_ended(&self, cutoff: DateTime<Utc>) -> usize {
        let mut index = self.index.write().await;
        let expired: Vec<Uuid> = index
            .sessions
            .iter()
            .filter(|(_, live)| {
                live.state.try_lock().is_ok_and(|state| {
                    !state.session.is_active
                        && state.session.ended_at.is_some_and(|at| at < cutoff)
                })
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            index.sessions.remove(id);
            index.join_codes.remove(id);
        }
        if !expired.is_empty() {
            tracing::info!(pruned = expired.len(), "pruned ended sessions");
        }
        expired.len()
    }

    /// Snapshot of the live session of a test, if one is running.
    pub async fn live_session_for_test(&self, test_id: &str) -> Option<TestSession> {
        let live = {
            let index = self.index.read().await;
            let session_id = index.live_by_test.get(test_id)?;
            index.sessions.get(session_id).cloned()?
        };
        let state = live.state.lock().await;
        state.session.is_active.then(|| state.session.clone())
    }
}
