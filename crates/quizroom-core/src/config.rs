//! Engine and file configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime settings for the session engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Display name on engine-authored messages.
    #[serde(default = "default_ai_sender_name")]
    pub ai_sender_name: String,
    /// Buffered messages per session subscription before slow readers lag.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Attempts at drawing a session id whose join code is not taken.
    #[serde(default = "default_join_code_attempts")]
    pub join_code_attempts: u32,
}

fn default_ai_sender_name() -> String {
    "AI Assistant".to_string()
}
fn default_event_capacity() -> usize {
    256
}
fn default_join_code_attempts() -> u32 {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_sender_name: default_ai_sender_name(),
            event_capacity: default_event_capacity(),
            join_code_attempts: default_join_code_attempts(),
        }
    }
}

/// Defaults for `quizroom simulate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_learners")]
    pub learners: usize,
    #[serde(default = "default_questions")]
    pub questions: u32,
    /// Share of answers a simulated learner gets right, in percent.
    #[serde(default = "default_accuracy")]
    pub accuracy_percent: u32,
    #[serde(default = "default_institution")]
    pub institution_id: String,
}

fn default_learners() -> usize {
    5
}
fn default_questions() -> u32 {
    5
}
fn default_accuracy() -> u32 {
    70
}
fn default_institution() -> String {
    "demo-school".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            learners: default_learners(),
            questions: default_questions(),
            accuracy_percent: default_accuracy(),
            institution_id: default_institution(),
        }
    }
}

/// Top-level quizroom configuration (`quizroom.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizroomConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Where session reports are written.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./quizroom-results")
}

impl Default for QuizroomConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            simulation: SimulationConfig::default(),
            results_dir: default_results_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut search_from = 0;
    while let Some(offset) = result[search_from..].find("${") {
        let start = search_from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        search_from = start + value.len();
    }
    result
}

/// Load configuration from the default location.
///
/// Looks for `quizroom.toml` in the current directory and falls back to
/// built-in defaults. `QUIZROOM_RESULTS_DIR` overrides `results_dir`.
pub fn load_config() -> Result<QuizroomConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default location.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizroomConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("quizroom.toml");
            local.exists().then_some(local)
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizroomConfig::default(),
    };

    if let Ok(dir) = std::env::var("QUIZROOM_RESULTS_DIR") {
        config.results_dir = PathBuf::from(dir);
    }

    Ok(config)
}

/// Parse config text and resolve `${VAR}` references in string settings.
pub fn parse_config_str(content: &str) -> Result<QuizroomConfig> {
    let mut config: QuizroomConfig = toml::from_str(content)?;

    config.engine.ai_sender_name = resolve_env_vars(&config.engine.ai_sender_name);
    config.simulation.institution_id = resolve_env_vars(&config.simulation.institution_id);
    config.results_dir = PathBuf::from(resolve_env_vars(&config.results_dir.to_string_lossy()));

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZROOM_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZROOM_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZROOM_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_QUIZROOM_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_unset_and_unterminated() {
        assert_eq!(resolve_env_vars("a${_QUIZROOM_UNSET_VAR}b"), "ab");
        assert_eq!(resolve_env_vars("a${oops"), "a${oops");
    }

    #[test]
    fn default_config() {
        let config = QuizroomConfig::default();
        assert_eq!(config.engine.ai_sender_name, "AI Assistant");
        assert_eq!(config.engine.event_capacity, 256);
        assert_eq!(config.simulation.learners, 5);
        assert_eq!(config.results_dir, PathBuf::from("./quizroom-results"));
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
results_dir = "out"

[engine]
ai_sender_name = "Quiz Bot"

[simulation]
learners = 12
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.engine.ai_sender_name, "Quiz Bot");
        assert_eq!(config.engine.join_code_attempts, 16);
        assert_eq!(config.simulation.learners, 12);
        assert_eq!(config.simulation.accuracy_percent, 70);
        assert_eq!(config.results_dir, PathBuf::from("out"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("definitely-missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
