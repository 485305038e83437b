//! Repro Agent - the LLM-backed reproduction loop
//!
//! Turns a free-text bug report into a runnable browser-automation script,
//! executes it in the sandbox, classifies the outcome deterministically,
//! and iterates with failure feedback up to a bounded number of attempts.

pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod providers;

pub use error::{AgentError, Result};
pub use orchestrator::{route_after_evaluate, Orchestrator, Transition};
pub use providers::{AnthropicProvider, LlmProvider, MockProvider, OpenAiProvider};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
