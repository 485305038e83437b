//! Shared data model for reproduction jobs
//!
//! Single source of truth for the records that flow through the agent loop:
//! the per-attempt execution outcome, the append-only attempt history, the
//! mutable working state, and the persisted job document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Content-derived classification of a failed script run.
///
/// Closed set; infrastructure-level abort causes (security rejection,
/// container timeout) are tracked separately as [`ErrorTag`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    ElementNotFound,
    Timeout,
    AssertionError,
    NetworkError,
    Unknown,
}

/// Tag attached to an [`ExecutionResult`] explaining why it is not a success.
///
/// The first five variants mirror [`FailureType`] and are derived from output
/// content; `SecurityViolation` and `ContainerTimeout` are determined before
/// or around execution rather than from output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorTag {
    ElementNotFound,
    Timeout,
    AssertionError,
    NetworkError,
    Unknown,
    SecurityViolation,
    ContainerTimeout,
}

impl From<FailureType> for ErrorTag {
    fn from(failure: FailureType) -> Self {
        match failure {
            FailureType::ElementNotFound => ErrorTag::ElementNotFound,
            FailureType::Timeout => ErrorTag::Timeout,
            FailureType::AssertionError => ErrorTag::AssertionError,
            FailureType::NetworkError => ErrorTag::NetworkError,
            FailureType::Unknown => ErrorTag::Unknown,
        }
    }
}

/// Structured outcome of one sandboxed script execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the sandbox was aborted before the process could exit.
    pub exit_code: i32,
    pub error_type: Option<ErrorTag>,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    /// Artifact paths scraped from stdout, in order of appearance.
    pub screenshot_paths: Vec<String>,
    /// `None` when execution never started.
    pub duration_seconds: Option<f64>,
}

/// One complete generate→execute→evaluate cycle for a job.
///
/// Immutable once appended, except for `refinement_note`, which the refine
/// step attaches exactly once after the fact to explain why this attempt's
/// script failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number, matching `attempt_count` at append time.
    pub attempt: u32,
    pub script: String,
    pub result: ExecutionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement_note: Option<String>,
}

/// Structured intent extracted from the bug report by the analyze step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub inferred_steps: Vec<String>,
    pub target_elements: Vec<String>,
    pub expected_behavior: String,
    pub success_condition: String,
    pub risk_factors: Vec<String>,
}

/// Mutable working record for one job's run through the agent loop.
///
/// Each pipeline stage takes the state by value and returns an updated copy;
/// the orchestrator is the only component that threads it across attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub job_id: String,
    pub bug_report: String,
    pub target_url: String,
    /// Starts at 0, incremented by exactly one per execution.
    pub attempt_count: u32,
    /// Fixed at job start, immutable afterwards.
    pub max_attempts: u32,
    pub analysis: Option<Analysis>,
    /// Current candidate script, replaced by each generate/refine step.
    pub script: String,
    pub execution_result: Option<ExecutionResult>,
    pub success: bool,
    pub history: Vec<AttemptRecord>,
}

impl AgentState {
    pub fn new(
        job_id: impl Into<String>,
        bug_report: impl Into<String>,
        target_url: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            bug_report: bug_report.into(),
            target_url: target_url.into(),
            attempt_count: 0,
            max_attempts,
            analysis: None,
            script: String::new(),
            execution_result: None,
            success: false,
            history: Vec::new(),
        }
    }

    /// Check the structural invariants that must hold after every transition.
    pub fn check_invariants(&self) -> Result<()> {
        if self.attempt_count > self.max_attempts {
            return Err(CoreError::InvariantViolation(format!(
                "attempt_count {} exceeds max_attempts {}",
                self.attempt_count, self.max_attempts
            )));
        }
        if self.history.len() as u32 != self.attempt_count {
            return Err(CoreError::InvariantViolation(format!(
                "history length {} does not match attempt_count {}",
                self.history.len(),
                self.attempt_count
            )));
        }
        Ok(())
    }
}

/// Terminal status of a job. Transitions are monotonic:
/// `processing → done | failed`, never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
    Failed,
}

/// Persisted job document - the externally visible record of a run.
///
/// `status=done, success=false` means the pipeline ran and the bug did not
/// reproduce; `status=failed` means the pipeline itself broke. Callers must
/// not conflate the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub bug_report: String,
    pub target_url: String,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_script: Option<String>,
    pub history: Vec<AttemptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Stub persisted at submission time, before the agent loop starts.
    pub fn processing(
        job_id: impl Into<String>,
        bug_report: impl Into<String>,
        target_url: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Processing,
            bug_report: bug_report.into(),
            target_url: target_url.into(),
            attempt_count: 0,
            max_attempts,
            success: false,
            analysis: None,
            final_script: None,
            history: Vec::new(),
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Terminal record for a loop that ran to completion (reproduced or not).
    pub fn completed(state: AgentState, created_at: DateTime<Utc>) -> Self {
        let final_script = (!state.script.is_empty()).then(|| state.script.clone());
        Self {
            job_id: state.job_id,
            status: JobStatus::Done,
            bug_report: state.bug_report,
            target_url: state.target_url,
            attempt_count: state.attempt_count,
            max_attempts: state.max_attempts,
            success: state.success,
            analysis: state.analysis,
            final_script,
            history: state.history,
            error: None,
            created_at,
            completed_at: Some(Utc::now()),
        }
    }

    /// Terminal record for a pipeline that broke before reaching a verdict.
    pub fn failed(state: AgentState, error: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            job_id: state.job_id,
            status: JobStatus::Failed,
            bug_report: state.bug_report,
            target_url: state.target_url,
            attempt_count: state.attempt_count,
            max_attempts: state.max_attempts,
            success: false,
            analysis: state.analysis,
            final_script: None,
            history: state.history,
            error: Some(error.into()),
            created_at,
            completed_at: Some(Utc::now()),
        }
    }

    /// Concatenated stdout of every attempt, oldest first.
    pub fn stdout_log(&self) -> String {
        self.history
            .iter()
            .map(|record| record.result.stdout.as_str())
            .collect()
    }
}
