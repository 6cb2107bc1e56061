pub mod init;
pub mod show;
pub mod simulate;
pub mod validate;

use comfy_table::{Cell, Table};
use quizroom_core::model::TestResult;

/// Ranked results as a table; `names` maps learner ids to display names.
pub(crate) fn results_table(results: &[TestResult], names: impl Fn(&str) -> String) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Rank", "Learner", "Score", "Correct", "Completed"]);

    for (rank, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(names(&result.learner_id)),
            Cell::new(format!("{}%", result.score)),
            Cell::new(format!(
                "{}/{}",
                result.correct_answers, result.total_questions
            )),
            Cell::new(result.completed_at.format("%H:%M:%S%.3f")),
        ]);
    }
    table
}
