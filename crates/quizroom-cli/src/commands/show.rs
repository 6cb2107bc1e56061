//! The `quizroom show` command.

use std::path::PathBuf;

use anyhow::Result;

use quizroom_core::report::SessionReport;

pub fn execute(report_path: PathBuf, json: bool) -> Result<()> {
    let report = SessionReport::load_json(&report_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Session {} (join code {})",
        report.session_id, report.join_code
    );
    println!("Test:    {}", report.test_id);
    println!(
        "Ran:     {} to {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.ended_at.format("%Y-%m-%d %H:%M:%S")
    );

    if !report.results.is_empty() {
        let table = super::results_table(&report.results, str::to_string);
        println!("\n{table}");
    }
    println!("\n{}", report.summary.render());

    Ok(())
}
