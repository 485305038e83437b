//! Repro Sandbox - isolated execution of generated scripts
//!
//! Runs untrusted browser-automation scripts inside a resource-capped
//! container: static security gate before launch, hard CPU/memory/network
//! caps, a wall-clock deadline enforced by forced termination, and
//! unconditional teardown on every exit path.

pub mod engine;
pub mod error;
pub mod runtime;

pub use engine::ExecutionEngine;
pub use error::{Result, SandboxError};
pub use runtime::{ContainerRuntime, ContainerSpec, DockerCli, ARTIFACT_MOUNT, SCRIPT_MOUNT};
