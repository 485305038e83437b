//! Request/response bodies for the Gateway API

use serde::{Deserialize, Serialize};

use repro_core::JobStatus;

/// Request body for `POST /reproduce`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReproduceRequest {
    pub bug_report: String,
    pub target_url: String,
}

/// Response for an accepted reproduction job.
#[derive(Debug, Clone, Serialize)]
pub struct JobCreatedResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Response for a completed or failed reproduction job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResultResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub success: bool,
    pub attempt_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_script: Option<String>,
    pub screenshot_urls: Vec<String>,
    pub logs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}
