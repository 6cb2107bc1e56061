//! The `quizroom simulate` command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::broadcast::error::RecvError;

use quizroom_core::config::load_config_from;
use quizroom_core::model::{option_letter, MessageKind, NewTest, Question, QuestionKind};
use quizroom_core::parser;
use quizroom_core::report::JsonFileSink;
use quizroom_core::source::BankQuestionSource;
use quizroom_core::statistics::SessionSummary;
use quizroom_core::traits::{InMemoryRoster, LearnerProfile};
use quizroom_core::SessionEngine;

const TEST_DURATION_MINUTES: u32 = 30;

const NAMES: &[&str] = &[
    "Amara", "Bongani", "Chloe", "Dmitri", "Esi", "Farah", "Gustavo", "Hana", "Ibrahim", "Jun",
];

pub async fn execute(
    bank_path: PathBuf,
    learners: Option<usize>,
    questions: Option<u32>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let learner_count = learners.unwrap_or(config.simulation.learners);
    let question_count = questions.unwrap_or(config.simulation.questions);
    let accuracy = config.simulation.accuracy_percent;
    let output = output.unwrap_or_else(|| config.results_dir.clone());

    anyhow::ensure!(learner_count >= 1, "learners must be at least 1");
    anyhow::ensure!(question_count >= 1, "questions must be at least 1");
    anyhow::ensure!(accuracy <= 100, "accuracy_percent must be at most 100");

    let banks = parser::load_banks(&bank_path)?;
    let bank = banks
        .first()
        .with_context(|| format!("no question banks found in {}", bank_path.display()))?;
    for w in parser::validate_bank(bank) {
        tracing::warn!(bank = %bank.id, question = ?w.question_id, "{}", w.message);
    }

    let subject = bank.subject.clone();
    let grade = bank.grade.clone();
    let topic = bank
        .entries
        .first()
        .map(|e| e.topic.clone())
        .unwrap_or_default();
    let institution_id = config.simulation.institution_id.clone();

    let profiles: Vec<LearnerProfile> = (0..learner_count)
        .map(|i| LearnerProfile {
            learner_id: format!("learner-{:02}", i + 1),
            name: learner_name(i),
            grade: grade.clone(),
            institution_id: institution_id.clone(),
        })
        .collect();

    let sink = JsonFileSink::new(&output);
    let engine = Arc::new(SessionEngine::new(
        Arc::new(InMemoryRoster::with_learners(profiles.clone())),
        Arc::new(BankQuestionSource::new(banks.clone())),
        Arc::new(sink.clone()),
        config.engine.clone(),
    ));

    let test = engine
        .create_test(NewTest {
            teacher_id: "simulator".into(),
            institution_id,
            subject: subject.clone(),
            topic,
            grade: grade.clone(),
            class_name: format!("Grade {grade}"),
            duration_minutes: TEST_DURATION_MINUTES,
            question_count,
        })
        .await?;

    let started = Instant::now();
    let session = engine.start_session(&test.id).await?;
    eprintln!(
        "quizroom v{}: {} grade {}, {} questions x {} learners",
        env!("CARGO_PKG_VERSION"),
        subject,
        grade,
        test.questions.len(),
        profiles.len()
    );
    eprintln!(
        "Session {} started, join code {}",
        session.id, session.join_code
    );

    let subscription = engine.subscribe(&session.id).await?;
    let listener = tokio::spawn(async move {
        let mut events = subscription.events;
        let mut seen = subscription.position;
        loop {
            match events.recv().await {
                Ok(msg) => {
                    seen += 1;
                    tracing::debug!(kind = ?msg.kind, from = %msg.sender_name, "{}", msg.content);
                    if msg.kind == MessageKind::Results {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => seen += skipped as usize,
                Err(RecvError::Closed) => break,
            }
        }
        seen
    });

    let joins = profiles.iter().map(|learner| {
        let engine = Arc::clone(&engine);
        let code = session.join_code.clone();
        let learner = learner.clone();
        tokio::spawn(async move {
            engine
                .join_session_by_code(&code, &learner.learner_id, &learner.name)
                .await
        })
    });
    let joined = count_accepted(join_all(joins).await)?;
    eprintln!("  {joined}/{} learners joined", profiles.len());

    let mut previous: Option<String> = None;
    let mut number = 0usize;
    while let Some(question) = engine
        .send_next_question(&session.id, previous.as_deref())
        .await
    {
        number += 1;
        let submissions = profiles.iter().enumerate().map(|(i, learner)| {
            let engine = Arc::clone(&engine);
            let session_id = session.id;
            let learner = learner.clone();
            let question_id = question.id.clone();
            let answer = simulated_answer(&question, i, number, accuracy);
            tokio::spawn(async move {
                engine
                    .submit_answer(
                        &session_id,
                        &learner.learner_id,
                        &question_id,
                        &answer,
                        &learner.name,
                    )
                    .await
            })
        });
        let recorded = count_accepted(join_all(submissions).await)?;
        eprintln!(
            "  Question {number}: {recorded}/{} answers recorded",
            profiles.len()
        );
        previous = Some(question.id);
    }

    let results = engine.end_session(&session.id).await?;
    engine.add_results_message(&session.id, &results).await?;
    let broadcast = listener.await?;

    let names: HashMap<&str, &str> = profiles
        .iter()
        .map(|p| (p.learner_id.as_str(), p.name.as_str()))
        .collect();
    let table = super::results_table(&results, |id| {
        names
            .get(id)
            .map_or_else(|| id.to_string(), |n| n.to_string())
    });
    println!("\n{table}");
    println!("\n{}", SessionSummary::from_results(&results).render());

    eprintln!(
        "\nSession ended: {broadcast} messages broadcast ({:.1}s)",
        started.elapsed().as_secs_f64()
    );
    eprintln!(
        "Report saved to: {}",
        sink.session_path(&session.join_code, &session.id).display()
    );

    Ok(())
}

fn learner_name(index: usize) -> String {
    let name = NAMES[index % NAMES.len()];
    match index / NAMES.len() {
        0 => name.to_string(),
        round => format!("{name} {}", round + 1),
    }
}

fn count_accepted(
    outcomes: Vec<std::result::Result<bool, tokio::task::JoinError>>,
) -> Result<usize> {
    let mut accepted = 0;
    for outcome in outcomes {
        if outcome? {
            accepted += 1;
        }
    }
    Ok(accepted)
}

/// Deterministic answer for a simulated learner: right roughly
/// `accuracy` percent of the time.
fn simulated_answer(question: &Question, learner: usize, number: usize, accuracy: u32) -> String {
    let roll = ((learner * 37 + number * 11) % 100) as u32;
    if roll < accuracy {
        return match question.kind {
            QuestionKind::ShortAnswer => question.correct_answer.to_lowercase(),
            _ => question.correct_answer.clone(),
        };
    }

    match question.kind {
        QuestionKind::MultipleChoice => (0..question.options.len().max(2))
            .map(option_letter)
            .find(|letter| *letter != question.correct_answer)
            .unwrap_or_else(|| "Z".to_string()),
        QuestionKind::TrueFalse if question.correct_answer == "True" => "False".to_string(),
        QuestionKind::TrueFalse => "True".to_string(),
        QuestionKind::ShortAnswer => "I don't know".to_string(),
    }
}
