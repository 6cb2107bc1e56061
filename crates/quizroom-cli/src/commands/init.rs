//! The `quizroom init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizroom.toml
    if Path::new("quizroom.toml").exists() {
        println!("quizroom.toml already exists, skipping.");
    } else {
        std::fs::write("quizroom.toml", SAMPLE_CONFIG)?;
        println!("Created quizroom.toml");
    }

    // Create example question bank
    std::fs::create_dir_all("question-banks")?;
    let example_path = Path::new("question-banks/example.toml");
    if example_path.exists() {
        println!("question-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created question-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add questions to question-banks/example.toml");
    println!("  2. Run: quizroom validate --bank question-banks/example.toml");
    println!("  3. Run: quizroom simulate --bank question-banks/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizroom configuration
# String values may reference environment variables as ${VAR}.

results_dir = "./quizroom-results"

[engine]
ai_sender_name = "AI Assistant"
event_capacity = 256
join_code_attempts = 16

[simulation]
learners = 5
questions = 4
accuracy_percent = 70
institution_id = "demo-school"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Science Bank"
description = "A small grade 7 science bank to get started"
subject = "Science"
grade = "7"

[[questions]]
id = "photosynthesis-1"
topic = "Photosynthesis"
content = "Which gas do plants absorb from the air?"
kind = "multiple_choice"
options = ["Oxygen", "Carbon dioxide", "Nitrogen", "Helium"]
answer = "B"

[[questions]]
id = "photosynthesis-2"
topic = "Photosynthesis"
content = "Plants make their own food using sunlight."
kind = "true_false"
answer = "true"

[[questions]]
id = "photosynthesis-3"
topic = "Photosynthesis"
content = "Name the green pigment found in leaves."
kind = "short_answer"
answer = "chlorophyll"

[[questions]]
id = "cells-1"
topic = "Cells"
content = "The basic unit of all living things is the ___."
kind = "short_answer"
answer = "cell"
"#;
