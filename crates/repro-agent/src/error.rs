//! Error types for the agent loop

use repro_core::CoreError;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Failures that end a job with `status=failed`.
///
/// None of these mean "the bug did not reproduce" - that verdict is a
/// negative classification, not an error. These mean the pipeline itself
/// could not run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The analyze step returned unparsable intent even after its inner retry.
    #[error("Analysis returned malformed JSON after {attempts} attempts: {reason}")]
    MalformedAnalysis { attempts: u32, reason: String },

    /// The generate/refine step produced a script that does not parse even
    /// after its inner retry.
    #[error("Generated script failed to parse after {attempts} attempts: {reason}")]
    InvalidScript { attempts: u32, reason: String },

    /// The LLM backend could not be reached or replied with garbage.
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// The sandbox failed for reasons unrelated to the script (daemon down,
    /// image missing). Not retried by this subsystem.
    #[error("Sandbox infrastructure failure: {0}")]
    Infrastructure(String),

    /// Configuration named a provider this build does not know.
    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    /// Core-level failure (persistence, invariant breach).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
