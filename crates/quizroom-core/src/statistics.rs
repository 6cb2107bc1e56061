//! Result aggregation and ranking.
//!
//! Results are derived purely from a session's message log: only the first
//! answer a learner gives to a question counts, and a learner's question
//! total is the number of distinct questions they answered.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{TestResult, TestSession};

/// Percentage score, rounded to the nearest integer. Zero questions score 0.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    (100.0 * correct as f64 / total as f64).round() as u32
}

#[derive(Debug, Default)]
struct Tally {
    total: u32,
    correct: u32,
    last_answer_at: Option<DateTime<Utc>>,
}

/// Compute one result per participant and return them ranked.
///
/// `ended_at` stands in as the completion time of learners who never
/// answered.
pub fn compute_results(session: &TestSession, ended_at: DateTime<Utc>) -> Vec<TestResult> {
    let mut counted: HashSet<(&str, &str)> = HashSet::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for msg in session.answers() {
        let Some(question_id) = msg.question_id.as_deref() else {
            continue;
        };
        let learner = msg.sender_id.as_str();
        if !session.participants.contains(learner) {
            continue;
        }
        if !counted.insert((learner, question_id)) {
            continue;
        }

        let tally = tallies.entry(learner).or_default();
        tally.total += 1;
        if msg.is_correct == Some(true) {
            tally.correct += 1;
        }
        tally.last_answer_at = Some(msg.timestamp);
    }

    let mut results: Vec<TestResult> = session
        .participants
        .iter()
        .map(|learner_id| {
            let tally = tallies.remove(learner_id.as_str()).unwrap_or_default();
            TestResult {
                id: Uuid::new_v4(),
                session_id: session.id,
                learner_id: learner_id.clone(),
                score: percentage(tally.correct, tally.total),
                correct_answers: tally.correct,
                total_questions: tally.total,
                completed_at: tally.last_answer_at.unwrap_or(ended_at),
            }
        })
        .collect();

    rank_results(&mut results);
    results
}

/// Sort by score descending, earlier finisher first on ties.
pub fn rank_results(results: &mut [TestResult]) {
    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.completed_at.cmp(&b.completed_at))
            .then_with(|| a.learner_id.cmp(&b.learner_id))
    });
}

/// Aggregate outcome of a session, for the closing announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub participant_count: usize,
    pub top_score: Option<u32>,
    pub average_score: f64,
}

impl SessionSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let participant_count = results.len();
        let top_score = results.iter().map(|r| r.score).max();
        let average_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score as f64).sum::<f64>() / participant_count as f64
        };
        Self {
            participant_count,
            top_score,
            average_score,
        }
    }

    /// Announcement text for the `Results` message.
    pub fn render(&self) -> String {
        match self.top_score {
            None => "Test completed with no participants.".to_string(),
            Some(top) => format!(
                "Test completed! {} participant{}. Top score: {}%. Average score: {:.0}%.",
                self.participant_count,
                if self.participant_count == 1 { "" } else { "s" },
                top,
                self.average_score
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::model::TestMessage;

    fn session_with(participants: &[&str]) -> TestSession {
        let mut session = TestSession::new(Uuid::new_v4(), "t1");
        for p in participants {
            session.participants.insert(p.to_string());
        }
        session
    }

    fn answer_at(
        session: &mut TestSession,
        learner: &str,
        question: &str,
        correct: bool,
        offset_secs: i64,
    ) {
        let mut msg = TestMessage::answer(learner, learner, question, "x", correct);
        msg.timestamp = session.started_at + Duration::seconds(offset_secs);
        session.messages.push(msg);
    }

    #[test]
    fn percentage_rounds_and_handles_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(5, 3), 100);
    }

    #[test]
    fn first_answer_per_question_counts() {
        let mut session = session_with(&["L1"]);
        answer_at(&mut session, "L1", "q1", false, 1);
        answer_at(&mut session, "L1", "q1", true, 2);
        answer_at(&mut session, "L1", "q2", true, 3);

        let results = compute_results(&session, Utc::now());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_questions, 2);
        assert_eq!(results[0].correct_answers, 1);
        assert_eq!(results[0].score, 50);
    }

    #[test]
    fn silent_participant_scores_zero() {
        let session = session_with(&["L1"]);
        let ended = Utc::now();
        let results = compute_results(&session, ended);
        assert_eq!(results[0].score, 0);
        assert_eq!(results[0].total_questions, 0);
        assert_eq!(results[0].completed_at, ended);
    }

    #[test]
    fn answers_from_non_participants_are_ignored() {
        let mut session = session_with(&["L1"]);
        answer_at(&mut session, "intruder", "q1", true, 1);
        let results = compute_results(&session, Utc::now());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].learner_id, "L1");
    }

    #[test]
    fn ranking_breaks_ties_by_completion_time() {
        let mut session = session_with(&["slow", "fast", "weak"]);
        answer_at(&mut session, "slow", "q1", true, 10);
        answer_at(&mut session, "fast", "q1", true, 5);
        answer_at(&mut session, "weak", "q1", false, 1);

        let results = compute_results(&session, Utc::now());
        let order: Vec<_> = results.iter().map(|r| r.learner_id.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow", "weak"]);
        for r in &results {
            assert!(r.score <= 100);
            assert!(r.correct_answers <= r.total_questions);
        }
    }

    #[test]
    fn summary_render() {
        let mut session = session_with(&["L1", "L2"]);
        answer_at(&mut session, "L1", "q1", true, 1);
        answer_at(&mut session, "L2", "q1", false, 2);
        let results = compute_results(&session, Utc::now());

        let summary = SessionSummary::from_results(&results);
        assert_eq!(summary.participant_count, 2);
        assert_eq!(summary.top_score, Some(100));
        assert!((summary.average_score - 50.0).abs() < f64::EPSILON);
        assert_eq!(
            summary.render(),
            "Test completed! 2 participants. Top score: 100%. Average score: 50%."
        );

        let empty = SessionSummary::from_results(&[]);
        assert_eq!(empty.render(), "Test completed with no participants.");
    }
}
