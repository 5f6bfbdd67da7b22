//! Step Verifier
//!
//! Drives a browser through natural-language test steps and asks an LLM
//! whether each step's acceptance criteria hold on the resulting page:
//! - Executes each step through an LLM-planned browser action (retried)
//! - Verifies the page in three stages: analysis, judgment, reason
//! - Records exactly one pass/fail result per step
//! - Runs from a task file (fail-fast) or interactively (continue on error)
//!
//! TASK LOOP:
//! EXECUTE → SETTLE → SNAPSHOT → ANALYZE → JUDGE → EXPLAIN? → RECORD

pub mod actions;
pub mod browser;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod processor;
pub mod retry;
pub mod runner;
pub mod sinks;
pub mod sources;
pub mod verification;

#[cfg(test)]
mod testing;

pub use error::Result;

// Re-export common types
pub use models::*;
