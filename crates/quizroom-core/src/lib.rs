//! quizroom-core: live test session engine.
//!
//! Teachers create tests and run them as live sessions; learners join with a
//! short code, receive questions in order and answer them. When the teacher
//! ends a session the answer log is scored into ranked results.

pub mod catalog;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;
pub mod report;
pub mod source;
pub mod statistics;
pub mod traits;

pub use engine::SessionEngine;
pub use error::{EngineError, Result};
