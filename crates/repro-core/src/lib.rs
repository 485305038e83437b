//! Repro Core - data model, security gate, and deterministic classification
//!
//! The pieces of the reproduction pipeline with real invariants and no I/O
//! beyond job/artifact persistence: the shared record types, the static
//! security gate that inspects untrusted generated scripts, the feedback
//! normalizer, and the outcome classifier the retry loop pivots on.

pub mod classifier;
pub mod config;
pub mod error;
pub mod feedback;
pub mod security;
pub mod storage;
pub mod types;

pub use classifier::{classify, SUCCESS_MARKER};
pub use config::{ReproConfig, SandboxSettings};
pub use error::{CoreError, Result, SecurityViolation};
pub use feedback::normalize;
pub use storage::{ArtifactStore, JobStore};
pub use types::{
    AgentState, Analysis, AttemptRecord, ErrorTag, ExecutionResult, FailureType, JobRecord,
    JobStatus,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
