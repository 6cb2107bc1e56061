//! Answer evaluation.
//!
//! Multiple choice and true/false answers must match the canonical token
//! exactly. Short answers are compared trimmed and case-insensitively; there
//! is no partial credit.

use uuid::Uuid;

use crate::model::{Question, QuestionKind, TestMessage};
use crate::registry::{SessionRegistry, SessionState};

/// Whether `answer` is correct for `question`.
pub fn is_correct(question: &Question, answer: &str) -> bool {
    match question.kind {
        QuestionKind::MultipleChoice | QuestionKind::TrueFalse => {
            answer == question.correct_answer
        }
        QuestionKind::ShortAnswer => {
            answer.trim().to_lowercase() == question.correct_answer.trim().to_lowercase()
        }
    }
}

/// Why a submission was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    Inactive,
    NotParticipant,
    NoOpenQuestion,
    StaleQuestion,
}

impl SessionState {
    /// Score and log an answer to the open question.
    pub(crate) fn record_answer(
        &mut self,
        questions: &[Question],
        learner_id: &str,
        learner_name: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<bool, Rejection> {
        if !self.session.is_active {
            return Err(Rejection::Inactive);
        }
        if !self.session.participants.contains(learner_id) {
            return Err(Rejection::NotParticipant);
        }
        let current = self
            .session
            .current_question_index
            .and_then(|i| questions.get(i))
            .ok_or(Rejection::NoOpenQuestion)?;
        if current.id != question_id {
            return Err(Rejection::StaleQuestion);
        }

        let correct = is_correct(current, answer);
        self.append(TestMessage::answer(
            learner_id,
            learner_name,
            question_id,
            answer,
            correct,
        ));
        Ok(correct)
    }

    fn has_answered(&self, learner_id: &str, question_id: &str) -> bool {
        self.session
            .answers()
            .any(|m| m.sender_id == learner_id && m.question_id.as_deref() == Some(question_id))
    }
}

impl SessionRegistry {
    /// Submit a learner's answer to the session's open question.
    ///
    /// Returns `true` once the answer is logged, whether or not it is
    /// correct. Returns `false` if the session is unknown or inactive, the
    /// learner has not joined, or `question_id` is not the open question.
    /// Repeat submissions are logged, but only the first one is scored.
    pub async fn submit_answer(
        &self,
        session_id: &Uuid,
        learner_id: &str,
        question_id: &str,
        answer: &str,
        learner_name: &str,
    ) -> bool {
        let Some(live) = self.handle(session_id).await else {
            return false;
        };
        let mut state = live.state.lock().await;

        let repeat = state.has_answered(learner_id, question_id);
        match state.record_answer(&live.questions, learner_id, learner_name, question_id, answer) {
            Ok(correct) => {
                if repeat {
                    tracing::debug!(
                        session = %session_id,
                        learner = learner_id,
                        question = question_id,
                        "repeat answer logged; the first answer stands"
                    );
                } else {
                    tracing::debug!(
                        session = %session_id,
                        learner = learner_id,
                        question = question_id,
                        correct,
                        "answer recorded"
                    );
                }
                true
            }
            Err(reason) => {
                tracing::debug!(
                    session = %session_id,
                    learner = learner_id,
                    question = question_id,
                    ?reason,
                    "answer rejected"
                );
                false
            }
        }
    }
}
