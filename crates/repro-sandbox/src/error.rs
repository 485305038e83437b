//! Error types for the sandbox layer

use repro_core::{CoreError, SecurityViolation};
use thiserror::Error;

/// Result type alias for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Engine-level failures, kept distinguishable from content-level failures.
///
/// The orchestrator converts `Security` and `Timeout` into synthetic
/// ExecutionResults and keeps retrying; `Startup` and `Runtime` are
/// infrastructure failures that end the job.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Script rejected before launch; the sandbox was never started.
    #[error(transparent)]
    Security(#[from] SecurityViolation),

    /// The container exceeded its wall-clock budget and was force-killed.
    #[error("Execution timed out after {0}s")]
    Timeout(u64),

    /// The container could not be started.
    #[error("Container startup failed: {0}")]
    Startup(String),

    /// The container runtime misbehaved after a successful launch.
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// Script or artifact persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] CoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
