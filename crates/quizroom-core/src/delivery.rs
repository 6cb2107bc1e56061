//! Question delivery: moves a session's cursor and announces the question.
//!
//! Delivery is per session, not per learner. Everyone sees the same open
//! question; a learner who joins late answers from whatever is open.

use uuid::Uuid;

use crate::model::{option_letter, Question, QuestionKind, TestMessage};
use crate::registry::{SessionRegistry, SessionState};

/// Text of a `Question` message: a numbered header, the content, and for
/// multiple choice one `A. option` line per option.
pub fn render_question(question: &Question, number: usize, total: usize) -> String {
    let mut text = format!("Question {number} of {total}: {}", question.content);
    if question.kind == QuestionKind::MultipleChoice {
        for (i, option) in question.options.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", option_letter(i), option));
        }
    }
    text
}

/// Position of the question that follows `previous`, or of the first
/// question when `previous` is `None`.
fn next_index(questions: &[Question], previous: Option<&str>) -> Option<usize> {
    let index = match previous {
        None => 0,
        Some(prev) => questions.iter().position(|q| q.id == prev)? + 1,
    };
    (index < questions.len()).then_some(index)
}

impl SessionState {
    /// Open the next question and append its message in one step.
    pub(crate) fn deliver_next(
        &mut self,
        questions: &[Question],
        previous: Option<&str>,
        sender_name: &str,
    ) -> Option<Question> {
        if !self.session.is_active {
            return None;
        }
        // Only the open question can be advanced past; anything else is a
        // stale or repeated request.
        let open = self
            .session
            .current_question_index
            .and_then(|i| questions.get(i))
            .map(|q| q.id.as_str());
        if previous != open {
            return None;
        }
        let index = next_index(questions, previous)?;
        let question = &questions[index];

        self.session.current_question_index = Some(index);
        let content = render_question(question, index + 1, questions.len());
        self.append(TestMessage::question(sender_name, &question.id, content));
        Some(question.clone())
    }
}

impl SessionRegistry {
    /// Deliver the question after `previous_question_id` (or the first).
    ///
    /// Returns `None` if the session is unknown or inactive, `previous_question_id`
    /// is not the open question, or there is no next question; the cursor is
    /// left as it was.
    pub async fn send_next_question(
        &self,
        session_id: &Uuid,
        previous_question_id: Option<&str>,
    ) -> Option<Question> {
        let live = self.handle(session_id).await?;
        let mut state = live.state.lock().await;

        let delivered = state.deliver_next(
            &live.questions,
            previous_question_id,
            self.ai_sender_name(),
        );
        match &delivered {
            Some(q) => {
                tracing::debug!(session = %session_id, question = %q.id, "question delivered")
            }
            None => tracing::debug!(
                session = %session_id,
                previous = ?previous_question_id,
                active = state.session.is_active,
                "no question to deliver"
            ),
        }
        delivered
    }
}
