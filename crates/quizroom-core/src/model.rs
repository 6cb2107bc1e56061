//! Core data model types for quizroom.
//!
//! Tests own an ordered list of questions; sessions are live runs of a test
//! with a participant set and an append-only message log; results are the
//! per-learner outcome computed when a session ends.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender id used for engine-authored messages.
pub const AI_SENDER_ID: &str = "AI";

/// Number of leading session-id characters that form a join code.
pub const JOIN_CODE_LEN: usize = 8;

/// Derive the human-shareable join code for a session id.
pub fn join_code_for(session_id: &Uuid) -> String {
    let simple = session_id.simple().to_string();
    simple[..JOIN_CODE_LEN].to_uppercase()
}

/// Normalize user-entered join code text for lookup.
pub fn normalize_join_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Lifecycle state of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Active,
    Completed,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pending => write!(f, "pending"),
            TestStatus::Active => write!(f, "active"),
            TestStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A test created by a teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTest {
    pub id: String,
    pub teacher_id: String,
    pub institution_id: String,
    pub subject: String,
    pub topic: String,
    pub grade: String,
    #[serde(rename = "class")]
    pub class_name: String,
    /// Planned length in minutes. Informational; sessions end only when the
    /// teacher ends them.
    pub duration_minutes: u32,
    /// Presentation order.
    pub questions: Vec<Question>,
    pub status: TestStatus,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTest {
    pub teacher_id: String,
    pub institution_id: String,
    pub subject: String,
    pub topic: String,
    pub grade: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub duration_minutes: u32,
    pub question_count: u32,
}

/// Question formats supported by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::ShortAnswer => write!(f, "short_answer"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "multiple_choice" | "mcq" | "mc" => Ok(QuestionKind::MultipleChoice),
            "true_false" | "tf" | "boolean" => Ok(QuestionKind::TrueFalse),
            "short_answer" | "short" | "text" => Ok(QuestionKind::ShortAnswer),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// A single question of a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the owning test.
    pub id: String,
    pub content: String,
    pub kind: QuestionKind,
    /// Answer options; non-empty only for multiple choice.
    #[serde(default)]
    pub options: Vec<String>,
    /// Canonical answer token: an option letter (`"A"`), `"True"`/`"False"`,
    /// or free text for short answers.
    pub correct_answer: String,
    #[serde(default = "default_marks")]
    pub marks: u32,
}

fn default_marks() -> u32 {
    1
}

/// Option letter for a zero-based option index (`0 -> "A"`).
pub fn option_letter(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// A live run of a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    pub id: Uuid,
    pub join_code: String,
    pub test_id: String,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub participants: BTreeSet<String>,
    /// Append-only; insertion order is chronological order.
    pub messages: Vec<TestMessage>,
    /// Position of the open question in the test's question list.
    #[serde(default)]
    pub current_question_index: Option<usize>,
}

impl TestSession {
    pub fn new(id: Uuid, test_id: impl Into<String>) -> Self {
        Self {
            id,
            join_code: join_code_for(&id),
            test_id: test_id.into(),
            is_active: true,
            started_at: Utc::now(),
            ended_at: None,
            participants: BTreeSet::new(),
            messages: Vec::new(),
            current_question_index: None,
        }
    }

    pub fn answers(&self) -> impl Iterator<Item = &TestMessage> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Answer)
    }
}

/// Kind of a message in a session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Question,
    Answer,
    System,
    Results,
}

/// An entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMessage {
    pub id: Uuid,
    /// A learner id, or [`AI_SENDER_ID`].
    pub sender_id: String,
    pub sender_name: String,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set on `Question` and `Answer` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    /// Set on `Answer` messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl TestMessage {
    fn new(sender_id: &str, sender_name: &str, kind: MessageKind, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            kind,
            content,
            timestamp: Utc::now(),
            question_id: None,
            is_correct: None,
        }
    }

    pub fn system(sender_name: &str, content: impl Into<String>) -> Self {
        Self::new(AI_SENDER_ID, sender_name, MessageKind::System, content.into())
    }

    pub fn question(sender_name: &str, question_id: &str, content: String) -> Self {
        Self {
            question_id: Some(question_id.to_string()),
            ..Self::new(AI_SENDER_ID, sender_name, MessageKind::Question, content)
        }
    }

    pub fn answer(
        learner_id: &str,
        learner_name: &str,
        question_id: &str,
        answer: &str,
        is_correct: bool,
    ) -> Self {
        Self {
            question_id: Some(question_id.to_string()),
            is_correct: Some(is_correct),
            ..Self::new(
                learner_id,
                learner_name,
                MessageKind::Answer,
                answer.to_string(),
            )
        }
    }

    pub fn results(sender_name: &str, content: String) -> Self {
        Self::new(AI_SENDER_ID, sender_name, MessageKind::Results, content)
    }
}

/// Final outcome of one learner in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub session_id: Uuid,
    pub learner_id: String,
    /// Percentage, 0..=100.
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_display_and_parse() {
        assert_eq!(QuestionKind::MultipleChoice.to_string(), "multiple_choice");
        assert_eq!(
            "multiple-choice".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultipleChoice
        );
        assert_eq!("TF".parse::<QuestionKind>().unwrap(), QuestionKind::TrueFalse);
        assert_eq!(
            "short".parse::<QuestionKind>().unwrap(),
            QuestionKind::ShortAnswer
        );
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn join_code_is_uppercase_prefix() {
        let id = Uuid::parse_str("a1b2c3d4-e5f6-4789-8abc-def012345678").unwrap();
        assert_eq!(join_code_for(&id), "A1B2C3D4");
        assert_eq!(normalize_join_code("  a1b2c3d4 "), "A1B2C3D4");
    }

    #[test]
    fn option_letters() {
        assert_eq!(option_letter(0), "A");
        assert_eq!(option_letter(3), "D");
        assert_eq!(option_letter(25), "Z");
        assert_eq!(option_letter(26), "AA");
    }

    #[test]
    fn question_marks_default_to_one() {
        let json = r#"{
            "id": "q1",
            "content": "Water boils at 100C at sea level.",
            "kind": "true_false",
            "correct_answer": "True"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.marks, 1);
        assert!(q.options.is_empty());
    }

    #[test]
    fn new_session_starts_empty() {
        let session = TestSession::new(Uuid::new_v4(), "t1");
        assert!(session.is_active);
        assert!(session.participants.is_empty());
        assert!(session.messages.is_empty());
        assert_eq!(session.current_question_index, None);
        assert_eq!(session.join_code.len(), JOIN_CODE_LEN);
    }

    #[test]
    fn answer_message_carries_question_and_correctness() {
        let msg = TestMessage::answer("L1", "Alice", "q1", "B", false);
        assert_eq!(msg.kind, MessageKind::Answer);
        assert_eq!(msg.question_id.as_deref(), Some("q1"));
        assert_eq!(msg.is_correct, Some(false));

        let sys = TestMessage::system("AI Assistant", "hello");
        assert_eq!(sys.sender_id, AI_SENDER_ID);
        assert_eq!(sys.is_correct, None);
        let json = serde_json::to_string(&sys).unwrap();
        assert!(!json.contains("is_correct"));
    }
}
