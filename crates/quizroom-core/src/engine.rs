//! Session engine facade.
//!
//! Wires the test catalog and session registry to the collaborator traits
//! and exposes the operations used by teacher and learner request handlers.
//! The engine is `Send + Sync`; share it behind an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::catalog::TestCatalog;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{AiTest, NewTest, Question, TestMessage, TestResult, TestSession};
use crate::registry::{SessionRegistry, Subscription};
use crate::traits::{LearnerRoster, QuestionSource, ResultSink};

/// The live test session engine.
pub struct SessionEngine {
    catalog: TestCatalog,
    registry: SessionRegistry,
    roster: Arc<dyn LearnerRoster>,
    source: Arc<dyn QuestionSource>,
    sink: Arc<dyn ResultSink>,
}

impl SessionEngine {
    pub fn new(
        roster: Arc<dyn LearnerRoster>,
        source: Arc<dyn QuestionSource>,
        sink: Arc<dyn ResultSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog: TestCatalog::new(),
            registry: SessionRegistry::new(config),
            roster,
            source,
            sink,
        }
    }

    // -- teacher operations -------------------------------------------------

    /// Create a pending test with questions from the configured source.
    pub async fn create_test(&self, new: NewTest) -> Result<AiTest> {
        self.catalog.create(new, self.source.as_ref()).await
    }

    /// Create a pending test from a pre-built question set.
    pub async fn create_test_with_questions(
        &self,
        new: NewTest,
        questions: Vec<Question>,
    ) -> Result<AiTest> {
        self.catalog.create_with_questions(new, questions).await
    }

    pub async fn start_session(&self, test_id: &str) -> Result<TestSession> {
        self.registry.start(&self.catalog, test_id).await
    }

    /// End a session and return its ranked results.
    pub async fn end_session(&self, session_id: &Uuid) -> Result<Vec<TestResult>> {
        self.registry
            .end(&self.catalog, self.sink.as_ref(), session_id)
            .await
    }

    pub async fn add_results_message(
        &self,
        session_id: &Uuid,
        results: &[TestResult],
    ) -> Result<()> {
        self.registry.add_results_message(session_id, results).await
    }

    // -- learner operations -------------------------------------------------

    pub async fn join_session(
        &self,
        session_id: &Uuid,
        learner_id: &str,
        learner_name: &str,
    ) -> bool {
        self.registry
            .join(self.roster.as_ref(), session_id, learner_id, learner_name)
            .await
    }

    /// Join using the 8-character code shown to learners.
    pub async fn join_session_by_code(
        &self,
        code: &str,
        learner_id: &str,
        learner_name: &str,
    ) -> bool {
        match self.registry.resolve_join_code(code).await {
            Some(session_id) => self.join_session(&session_id, learner_id, learner_name).await,
            None => {
                tracing::debug!(code, learner = learner_id, "join code did not resolve");
                false
            }
        }
    }

    pub async fn send_next_question(
        &self,
        session_id: &Uuid,
        previous_question_id: Option<&str>,
    ) -> Option<Question> {
        self.registry
            .send_next_question(session_id, previous_question_id)
            .await
    }

    pub async fn submit_answer(
        &self,
        session_id: &Uuid,
        learner_id: &str,
        question_id: &str,
        answer: &str,
        learner_name: &str,
    ) -> bool {
        self.registry
            .submit_answer(session_id, learner_id, question_id, answer, learner_name)
            .await
    }

    // -- queries ------------------------------------------------------------

    pub async fn get_test(&self, test_id: &str) -> Result<AiTest> {
        self.catalog.get(test_id).await
    }

    pub async fn list_active_tests_for_teacher(&self, teacher_id: &str) -> Vec<AiTest> {
        self.catalog.list_active_for_teacher(teacher_id).await
    }

    /// Active tests a learner of `grade` at `institution_id` can join, each
    /// with its live session.
    pub async fn list_available_tests_for_learner(
        &self,
        grade: &str,
        institution_id: &str,
    ) -> Vec<(AiTest, TestSession)> {
        let tests = self.catalog.active_for_grade(grade, institution_id).await;
        let sessions = join_all(
            tests
                .iter()
                .map(|t| self.registry.live_session_for_test(&t.id)),
        )
        .await;

        tests
            .into_iter()
            .zip(sessions)
            .filter_map(|(test, session)| Some((test, session?)))
            .collect()
    }

    /// Drop sessions that ended before `cutoff`. Returns how many went.
    pub async fn prune_ended_sessions(&self, cutoff: DateTime<Utc>) -> usize {
        self.registry.prune_ended(cutoff).await
    }

    pub async fn resolve_join_code(&self, code: &str) -> Option<Uuid> {
        self.registry.resolve_join_code(code).await
    }

    pub async fn session_snapshot(&self, session_id: &Uuid) -> Result<TestSession> {
        self.registry.snapshot(session_id).await
    }

    pub async fn messages_since(
        &self,
        session_id: &Uuid,
        cursor: usize,
    ) -> Result<Vec<TestMessage>> {
        self.registry.messages_since(session_id, cursor).await
    }

    pub async fn subscribe(&self, session_id: &Uuid) -> Result<Subscription> {
        self.registry.subscribe(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{MessageKind, QuestionKind, TestStatus};
    use crate::report::MemorySink;
    use crate::source::TemplateQuestionSource;
    use crate::traits::{InMemoryRoster, LearnerProfile};

    fn learner(id: &str, name: &str, grade: &str) -> LearnerProfile {
        LearnerProfile {
            learner_id: id.into(),
            name: name.into(),
            grade: grade.into(),
            institution_id: "inst-1".into(),
        }
    }

    fn engine_with(sink: Arc<MemorySink>) -> SessionEngine {
        let roster = InMemoryRoster::with_learners([
            learner("L1", "Alice", "7"),
            learner("L2", "Bongani", "7"),
            learner("L9", "Zanele", "9"),
        ]);
        SessionEngine::new(
            Arc::new(roster),
            Arc::new(TemplateQuestionSource),
            sink,
            EngineConfig::default(),
        )
    }

    fn new_test(count: u32) -> NewTest {
        NewTest {
            teacher_id: "T1".into(),
            institution_id: "inst-1".into(),
            subject: "Science".into(),
            topic: "Plants".into(),
            grade: "7".into(),
            class_name: "7A".into(),
            duration_minutes: 20,
            question_count: count,
        }
    }

    fn two_questions() -> Vec<Question> {
        vec![
            Question {
                id: "q1".into(),
                content: "Plants need sunlight.".into(),
                kind: QuestionKind::TrueFalse,
                options: vec![],
                correct_answer: "True".into(),
                marks: 1,
            },
            Question {
                id: "q2".into(),
                content: "Name the green pigment in leaves.".into(),
                kind: QuestionKind::ShortAnswer,
                options: vec![],
                correct_answer: "chlorophyll".into(),
                marks: 1,
            },
        ]
    }

    #[tokio::test]
    async fn two_question_scenario_scores_fifty() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine_with(sink.clone());
        let test = engine
            .create_test_with_questions(new_test(2), two_questions())
            .await
            .unwrap();

        let session = engine.start_session(&test.id).await.unwrap();
        assert!(session.is_active);
        assert!(session.participants.is_empty());
        assert_eq!(
            engine.get_test(&test.id).await.unwrap().status,
            TestStatus::Active
        );

        assert!(engine.join_session(&session.id, "L1", "Alice").await);
        let q1 = engine.send_next_question(&session.id, None).await.unwrap();
        assert_eq!(q1.id, "q1");
        assert!(
            engine
                .submit_answer(&session.id, "L1", &q1.id, &q1.correct_answer, "Alice")
                .await
        );

        let q2 = engine
            .send_next_question(&session.id, Some(&q1.id))
            .await
            .unwrap();
        assert_eq!(q2.id, "q2");
        assert!(
            engine
                .submit_answer(&session.id, "L1", &q2.id, "wrong", "Alice")
                .await
        );

        let snapshot = engine.session_snapshot(&session.id).await.unwrap();
        let answers: Vec<_> = snapshot.answers().collect();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].is_correct, Some(true));
        assert_eq!(answers[1].is_correct, Some(false));

        let results = engine.end_session(&session.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].learner_id, "L1");
        assert_eq!(results[0].total_questions, 2);
        assert_eq!(results[0].correct_answers, 1);
        assert_eq!(results[0].score, 50);

        assert_eq!(
            engine.get_test(&test.id).await.unwrap().status,
            TestStatus::Completed
        );
        assert_eq!(sink.reports().len(), 1);
        assert_eq!(sink.reports()[0].results, results);
    }

    #[tokio::test]
    async fn join_requires_matching_grade_and_known_learner() {
        let engine = engine_with(Arc::new(MemorySink::new()));
        let test = engine.create_test(new_test(1)).await.unwrap();
        let session = engine.start_session(&test.id).await.unwrap();

        assert!(!engine.join_session(&session.id, "L9", "Zanele").await);
        assert!(!engine.join_session(&session.id, "ghost", "Ghost").await);
        assert!(!engine.join_session(&Uuid::new_v4(), "L1", "Alice").await);

        let snapshot = engine.session_snapshot(&session.id).await.unwrap();
        assert!(snapshot.participants.is_empty());
        assert!(snapshot.messages.is_empty());
    }

    #[tokio::test]
    async fn join_by_code_is_case_insensitive() {
        let engine = engine_with(Arc::new(MemorySink::new()));
        let test = engine.create_test(new_test(1)).await.unwrap();
        let session = engine.start_session(&test.id).await.unwrap();

        let code = session.join_code.to_lowercase();
        assert_eq!(engine.resolve_join_code(&code).await, Some(session.id));
        assert!(engine.join_session_by_code(&code, "L2", "Bongani").await);
        assert!(!engine.join_session_by_code("ZZZZZZZZ", "L1", "Alice").await);

        let snapshot = engine.session_snapshot(&session.id).await.unwrap();
        assert!(snapshot.participants.contains("L2"));
        assert_eq!(snapshot.messages[0].kind, MessageKind::System);
        assert!(snapshot.messages[0].content.contains("Bongani"));
    }

    #[tokio::test]
    async fn learner_listing_pairs_tests_with_live_sessions() {
        let engine = engine_with(Arc::new(MemorySink::new()));
        let pending = engine.create_test(new_test(1)).await.unwrap();
        let running = engine.create_test(new_test(1)).await.unwrap();
        let session = engine.start_session(&running.id).await.unwrap();

        let available = engine.list_available_tests_for_learner("7", "inst-1").await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].0.id, running.id);
        assert_eq!(available[0].1.id, session.id);

        assert!(engine
            .list_available_tests_for_learner("8", "inst-1")
            .await
            .is_empty());
        assert!(engine
            .list_available_tests_for_learner("7", "other-school")
            .await
            .is_empty());

        let teacher_tests = engine.list_active_tests_for_teacher("T1").await;
        let ids: Vec<_> = teacher_tests.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&pending.id.as_str()));
        assert!(ids.contains(&running.id.as_str()));

        engine.end_session(&session.id).await.unwrap();
        assert!(engine
            .list_available_tests_for_learner("7", "inst-1")
            .await
            .is_empty());
        assert_eq!(engine.list_active_tests_for_teacher("T1").await.len(), 1);
    }
}
