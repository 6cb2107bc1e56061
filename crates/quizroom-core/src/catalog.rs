//! Test catalog: creation, lookup and lifecycle status of tests.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::model::{AiTest, NewTest, Question, TestStatus};
use crate::parser::validate_questions;
use crate::traits::{QuestionRequest, QuestionSource};

/// Owns every test created through the engine.
#[derive(Debug, Default)]
pub struct TestCatalog {
    tests: RwLock<HashMap<String, AiTest>>,
}

fn validate_duration(new: &NewTest) -> Result<()> {
    if new.duration_minutes < 1 {
        return Err(EngineError::Validation(
            "duration must be at least 1 minute".into(),
        ));
    }
    Ok(())
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a test whose questions come from `source`.
    pub async fn create(&self, new: NewTest, source: &dyn QuestionSource) -> Result<AiTest> {
        if new.question_count < 1 {
            return Err(EngineError::Validation(
                "question count must be at least 1".into(),
            ));
        }
        validate_duration(&new)?;

        let request = QuestionRequest {
            subject: new.subject.clone(),
            topic: new.topic.clone(),
            grade: new.grade.clone(),
            count: new.question_count,
        };
        let questions = source
            .generate(&request)
            .await
            .map_err(EngineError::QuestionSource)?;

        tracing::debug!(
            source = source.name(),
            count = questions.len(),
            "generated questions for {} / {}",
            new.subject,
            new.topic
        );

        self.create_with_questions(new, questions).await
    }

    /// Create a test from a pre-built question set.
    pub async fn create_with_questions(
        &self,
        new: NewTest,
        questions: Vec<Question>,
    ) -> Result<AiTest> {
        validate_duration(&new)?;
        if questions.is_empty() {
            return Err(EngineError::Validation("test has no questions".into()));
        }
        if let Some(w) = validate_questions(&questions).into_iter().next() {
            let id = w.question_id.unwrap_or_default();
            return Err(EngineError::Validation(format!(
                "question {id}: {}",
                w.message
            )));
        }

        let test = AiTest {
            id: Uuid::new_v4().to_string(),
            teacher_id: new.teacher_id,
            institution_id: new.institution_id,
            subject: new.subject,
            topic: new.topic,
            grade: new.grade,
            class_name: new.class_name,
            duration_minutes: new.duration_minutes,
            questions,
            status: TestStatus::Pending,
            created_at: Utc::now(),
        };

        tracing::info!(
            test = %test.id,
            teacher = %test.teacher_id,
            questions = test.questions.len(),
            "created test"
        );

        self.tests
            .write()
            .await
            .insert(test.id.clone(), test.clone());
        Ok(test)
    }

    pub async fn get(&self, test_id: &str) -> Result<AiTest> {
        self.tests
            .read()
            .await
            .get(test_id)
            .cloned()
            .ok_or_else(|| EngineError::TestNotFound(test_id.to_string()))
    }

    /// Pending and active tests of a teacher, oldest first.
    pub async fn list_active_for_teacher(&self, teacher_id: &str) -> Vec<AiTest> {
        let mut tests: Vec<AiTest> = self
            .tests
            .read()
            .await
            .values()
            .filter(|t| t.teacher_id == teacher_id)
            .filter(|t| matches!(t.status, TestStatus::Pending | TestStatus::Active))
            .cloned()
            .collect();
        tests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tests
    }

    /// Active tests for a grade at an institution, oldest first.
    pub async fn active_for_grade(&self, grade: &str, institution_id: &str) -> Vec<AiTest> {
        let mut tests: Vec<AiTest> = self
            .tests
            .read()
            .await
            .values()
            .filter(|t| t.status == TestStatus::Active)
            .filter(|t| t.grade == grade && t.institution_id == institution_id)
            .cloned()
            .collect();
        tests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tests
    }

    /// Move a pending test to `Active`, returning the activated test.
    pub(crate) async fn activate(&self, test_id: &str) -> Result<AiTest> {
        let mut tests = self.tests.write().await;
        let test = tests
            .get_mut(test_id)
            .ok_or_else(|| EngineError::TestNotFound(test_id.to_string()))?;
        if test.status == TestStatus::Completed {
            return Err(EngineError::TestCompleted(test_id.to_string()));
        }
        test.status = TestStatus::Active;
        Ok(test.clone())
    }

    pub(crate) async fn complete(&self, test_id: &str) {
        if let Some(test) = self.tests.write().await.get_mut(test_id) {
            test.status = TestStatus::Completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;
    use crate::source::TemplateQuestionSource;

    fn new_test(teacher: &str, count: u32) -> NewTest {
        NewTest {
            teacher_id: teacher.into(),
            institution_id: "inst-1".into(),
            subject: "Science".into(),
            topic: "Plants".into(),
            grade: "7".into(),
            class_name: "7B".into(),
            duration_minutes: 30,
            question_count: count,
        }
    }

    #[tokio::test]
    async fn create_synthesizes_questions() {
        let catalog = TestCatalog::new();
        let test = catalog
            .create(new_test("T1", 3), &TemplateQuestionSource)
            .await
            .unwrap();
        assert_eq!(test.questions.len(), 3);
        assert_eq!(test.status, TestStatus::Pending);
        assert_eq!(catalog.get(&test.id).await.unwrap().class_name, "7B");
    }

    #[tokio::test]
    async fn create_rejects_zero_questions_and_duration() {
        let catalog = TestCatalog::new();
        let err = catalog
            .create(new_test("T1", 0), &TemplateQuestionSource)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let mut no_time = new_test("T1", 2);
        no_time.duration_minutes = 0;
        let err = catalog
            .create(no_time, &TemplateQuestionSource)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn prebuilt_questions_are_validated() {
        let catalog = TestCatalog::new();
        let bad = vec![Question {
            id: "q1".into(),
            content: "Pick one".into(),
            kind: QuestionKind::MultipleChoice,
            options: vec![],
            correct_answer: "A".into(),
            marks: 1,
        }];
        let err = catalog
            .create_with_questions(new_test("T1", 1), bad)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no options"), "got: {err}");

        let err = catalog
            .create_with_questions(new_test("T1", 1), vec![])
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn teacher_listing_excludes_completed_and_other_teachers() {
        let catalog = TestCatalog::new();
        let a = catalog
            .create(new_test("T1", 1), &TemplateQuestionSource)
            .await
            .unwrap();
        let b = catalog
            .create(new_test("T1", 1), &TemplateQuestionSource)
            .await
            .unwrap();
        catalog
            .create(new_test("T2", 1), &TemplateQuestionSource)
            .await
            .unwrap();

        catalog.activate(&b.id).await.unwrap();
        catalog.complete(&a.id).await;

        let listed = catalog.list_active_for_teacher("T1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[0].status, TestStatus::Active);
    }

    #[tokio::test]
    async fn completed_test_cannot_be_activated() {
        let catalog = TestCatalog::new();
        let test = catalog
            .create(new_test("T1", 1), &TemplateQuestionSource)
            .await
            .unwrap();
        catalog.complete(&test.id).await;

        let err = catalog.activate(&test.id).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(catalog.activate("missing").await.unwrap_err().is_not_found());
    }
}
