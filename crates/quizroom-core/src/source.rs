//! Built-in question sources.
//!
//! [`TemplateQuestionSource`] synthesizes placeholder questions for a topic;
//! [`BankQuestionSource`] draws from a curriculum question bank.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Question, QuestionKind};
use crate::parser::QuestionBank;
use crate::traits::{QuestionRequest, QuestionSource};

/// Deterministic question synthesis, cycling multiple choice, true/false and
/// short answer.
#[derive(Debug, Default, Clone)]
pub struct TemplateQuestionSource;

impl TemplateQuestionSource {
    fn synthesize(request: &QuestionRequest, n: u32) -> Question {
        let id = format!("q{n}");
        let topic = &request.topic;
        let subject = &request.subject;
        match (n - 1) % 3 {
            0 => Question {
                id,
                content: format!(
                    "Which statement about {topic} in {subject} is correct? (item {n})"
                ),
                kind: QuestionKind::MultipleChoice,
                options: vec![
                    format!("{topic} is a core idea of {subject}"),
                    format!("{topic} is unrelated to {subject}"),
                    format!("{topic} was removed from the grade {} syllabus", request.grade),
                    "None of the above".to_string(),
                ],
                correct_answer: "A".to_string(),
                marks: 1,
            },
            1 => Question {
                id,
                content: format!("True or false: {topic} is studied as part of {subject}."),
                kind: QuestionKind::TrueFalse,
                options: Vec::new(),
                correct_answer: "True".to_string(),
                marks: 1,
            },
            _ => Question {
                id,
                content: format!("Name the topic of this test (item {n})."),
                kind: QuestionKind::ShortAnswer,
                options: Vec::new(),
                correct_answer: topic.clone(),
                marks: 1,
            },
        }
    }
}

#[async_trait]
impl QuestionSource for TemplateQuestionSource {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>> {
        Ok((1..=request.count)
            .map(|n| Self::synthesize(request, n))
            .collect())
    }
}

/// Selects questions from loaded banks matching the request's subject and
/// grade, preferring those tagged with the requested topic.
#[derive(Debug, Clone)]
pub struct BankQuestionSource {
    banks: Vec<QuestionBank>,
}

impl BankQuestionSource {
    pub fn new(banks: Vec<QuestionBank>) -> Self {
        Self { banks }
    }
}

#[async_trait]
impl QuestionSource for BankQuestionSource {
    fn name(&self) -> &str {
        "bank"
    }

    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>> {
        let candidates: Vec<_> = self
            .banks
            .iter()
            .filter(|b| {
                b.subject.eq_ignore_ascii_case(&request.subject) && b.grade == request.grade
            })
            .flat_map(|b| b.entries.iter())
            .collect();

        anyhow::ensure!(
            !candidates.is_empty(),
            "no bank questions for subject '{}' grade {}",
            request.subject,
            request.grade
        );

        let (on_topic, off_topic): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|e| e.topic.eq_ignore_ascii_case(&request.topic));

        let selected: Vec<Question> = on_topic
            .into_iter()
            .chain(off_topic)
            .take(request.count as usize)
            .enumerate()
            .map(|(i, entry)| Question {
                id: format!("q{}", i + 1),
                ..entry.question.clone()
            })
            .collect();

        if selected.len() < request.count as usize {
            tracing::warn!(
                requested = request.count,
                available = selected.len(),
                "question bank is short for {} grade {}",
                request.subject,
                request.grade
            );
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::parser::parse_bank_str;

    fn request(count: u32) -> QuestionRequest {
        QuestionRequest {
            subject: "Science".into(),
            topic: "Photosynthesis".into(),
            grade: "7".into(),
            count,
        }
    }

    #[tokio::test]
    async fn template_cycles_kinds() {
        let questions = TemplateQuestionSource.generate(&request(4)).await.unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3", "q4"]);
        assert_eq!(questions[0].kind, QuestionKind::MultipleChoice);
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[1].kind, QuestionKind::TrueFalse);
        assert_eq!(questions[2].kind, QuestionKind::ShortAnswer);
        assert_eq!(questions[2].correct_answer, "Photosynthesis");
        assert_eq!(questions[3].kind, QuestionKind::MultipleChoice);
    }

    const BANK: &str = r#"
[bank]
id = "sci-7"
name = "Science grade 7"
subject = "science"
grade = "7"

[[questions]]
id = "cells-1"
topic = "Cells"
content = "The basic unit of life is the ___."
kind = "short_answer"
answer = "cell"

[[questions]]
id = "photo-1"
topic = "Photosynthesis"
content = "Plants make food using sunlight."
kind = "true_false"
answer = "true"

[[questions]]
id = "photo-2"
topic = "photosynthesis"
content = "Which gas do plants absorb?"
kind = "multiple_choice"
options = ["Oxygen", "Carbon dioxide", "Nitrogen"]
answer = "B"
marks = 2
"#;

    #[tokio::test]
    async fn bank_prefers_topic_and_renumbers() {
        let bank = parse_bank_str(BANK, &PathBuf::from("bank.toml")).unwrap();
        let source = BankQuestionSource::new(vec![bank]);

        let questions = source.generate(&request(3)).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].content, "Plants make food using sunlight.");
        assert_eq!(questions[1].marks, 2);
        assert_eq!(questions[2].content, "The basic unit of life is the ___.");
        let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn bank_without_matching_grade_fails() {
        let bank = parse_bank_str(BANK, &PathBuf::from("bank.toml")).unwrap();
        let source = BankQuestionSource::new(vec![bank]);
        let mut req = request(2);
        req.grade = "9".into();
        assert!(source.generate(&req).await.is_err());
    }
}
