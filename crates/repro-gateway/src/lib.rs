//! Repro Gateway - HTTP front door for automated bug reproduction
//!
//! Accepts free-text bug reports over HTTP, dispatches each as an
//! independent background reproduction job, and serves job results,
//! final scripts, and captured screenshots.
//!
//! # Endpoints
//!
//! - `POST /reproduce` - accept a bug report, returns `202` with a job id
//! - `GET /result/{job_id}` - job status or full result
//! - `GET /result/{job_id}/script` - download the final script
//! - `GET /result/{job_id}/screenshot/{filename}` - captured screenshot
//! - `GET /health` - health check

pub mod config;
pub mod error;
pub mod gateway;
pub mod schemas;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState};
pub use schemas::{JobCreatedResponse, JobResultResponse, ReproduceRequest};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8090;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";
