//! Retry orchestrator - the bounded analyze → generate → execute → evaluate loop
//!
//! States: Analyze → Generate → Execute → Evaluate → {EndSuccess | Refine →
//! Generate | EndFailure}. Execute is the only state that consumes an
//! attempt; Refine rewrites the script and annotates the attempt that just
//! failed. The loop terminates in finite steps because `attempt_count`
//! strictly increases toward the fixed `max_attempts`.

use std::sync::Arc;

use uuid::Uuid;

use repro_core::{
    classify, security, AgentState, Analysis, ArtifactStore, AttemptRecord, CoreError, ErrorTag,
    ExecutionResult, JobRecord, JobStore, ReproConfig,
};
use repro_sandbox::{ExecutionEngine, SandboxError};

use crate::error::{AgentError, Result};
use crate::prompts;
use crate::providers::LlmProvider;

/// Per-stage sampling temperatures: deterministic intent extraction, a
/// little variation for script generation, slightly more for refinement.
const ANALYZE_TEMPERATURE: f64 = 0.0;
const GENERATE_TEMPERATURE: f64 = 0.2;
const REFINE_TEMPERATURE: f64 = 0.3;

/// Inner budget for the LLM-backed steps: one extra attempt each. Exhausting
/// it is fatal for the job, distinct from a reproduction failure.
const INNER_TRIES: u32 = 2;

/// Where the evaluate state routes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EndSuccess,
    Refine,
    EndFailure,
}

/// Transition rule at Evaluate: end on success, refine while attempts
/// remain, otherwise end as a non-reproduction.
pub fn route_after_evaluate(state: &AgentState) -> Transition {
    if state.success {
        return Transition::EndSuccess;
    }
    if state.attempt_count < state.max_attempts {
        return Transition::Refine;
    }
    Transition::EndFailure
}

/// Drives one job through the full reproduction loop.
///
/// The orchestrator is the only component with cross-attempt memory; every
/// stage takes the working state by value and returns the updated state.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    engine: ExecutionEngine,
    jobs: JobStore,
    artifacts: ArtifactStore,
    config: ReproConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        engine: ExecutionEngine,
        config: ReproConfig,
    ) -> Self {
        Self {
            provider,
            engine,
            jobs: JobStore::new(&config.data_dir),
            artifacts: ArtifactStore::new(&config.data_dir),
            config,
        }
    }

    /// Public entrypoint. Runs the full agent loop and persists the terminal
    /// record. Infrastructure failures end the job as `failed`; they are
    /// never reported as "ran and did not reproduce".
    pub async fn run_job(
        &self,
        bug_report: &str,
        target_url: &str,
        job_id: Option<String>,
    ) -> JobRecord {
        let job_id = job_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        // Reuse the submission stub if the front door already persisted one.
        let created_at = match self.jobs.load(&job_id) {
            Ok(Some(existing)) => existing.created_at,
            _ => {
                let stub =
                    JobRecord::processing(&job_id, bug_report, target_url, self.config.max_attempts);
                if let Err(e) = self.jobs.save(&stub) {
                    tracing::error!(%job_id, error = %e, "failed to persist job stub");
                }
                stub.created_at
            }
        };

        let initial = AgentState::new(&job_id, bug_report, target_url, self.config.max_attempts);
        let record = match self.drive(initial.clone()).await {
            Ok(state) => {
                if !state.script.is_empty() {
                    if let Err(e) = self.artifacts.save_final_script(&job_id, &state.script) {
                        tracing::warn!(%job_id, error = %e, "failed to persist final script");
                    }
                }
                JobRecord::completed(state, created_at)
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "agent loop failed");
                JobRecord::failed(initial, e.to_string(), created_at)
            }
        };

        if let Err(e) = self.jobs.save(&record) {
            tracing::error!(%job_id, error = %e, "failed to persist terminal record");
        }
        tracing::info!(%job_id, success = record.success, status = ?record.status, "agent run complete");
        record
    }

    /// The state machine proper.
    async fn drive(&self, mut state: AgentState) -> Result<AgentState> {
        state = self.analyze(state).await?;
        loop {
            state = self.generate(state).await?;
            state = self.execute(state).await?;
            state = self.evaluate(state);
            match route_after_evaluate(&state) {
                Transition::EndSuccess | Transition::EndFailure => return Ok(state),
                Transition::Refine => state = self.refine(state).await?,
            }
        }
    }

    /// Analyze: parse the bug report into structured intent.
    async fn analyze(&self, mut state: AgentState) -> Result<AgentState> {
        let mut prompt = prompts::analyze_prompt(&state.bug_report, &state.target_url);
        let mut last_reason = String::new();

        for inner in 0..INNER_TRIES {
            let response = self.provider.generate(&prompt, ANALYZE_TEMPERATURE).await?;
            match serde_json::from_str::<Analysis>(response.trim()) {
                Ok(analysis) => {
                    tracing::info!(job_id = %state.job_id, "analysis extracted");
                    state.analysis = Some(analysis);
                    return Ok(state);
                }
                Err(e) => {
                    tracing::warn!(job_id = %state.job_id, inner, error = %e, "analysis parse error");
                    last_reason = e.to_string();
                    if inner == 0 {
                        prompt.push_str(prompts::ANALYZE_RETRY_SUFFIX);
                    }
                }
            }
        }

        Err(AgentError::MalformedAnalysis {
            attempts: INNER_TRIES,
            reason: last_reason,
        })
    }

    /// Generate: produce a candidate script from the analysis and any prior
    /// failure notes.
    async fn generate(&self, mut state: AgentState) -> Result<AgentState> {
        let analysis = state.analysis.as_ref().ok_or_else(|| {
            CoreError::InvariantViolation("generate reached without analysis".to_string())
        })?;
        let analysis_json = serde_json::to_string_pretty(analysis)?;

        let prior_failures = if state.history.is_empty() {
            "None".to_string()
        } else {
            state
                .history
                .iter()
                .map(|record| {
                    format!(
                        "Attempt {}: {}",
                        record.attempt,
                        record.refinement_note.as_deref().unwrap_or("No note")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut prompt =
            prompts::generate_prompt(&analysis_json, &state.target_url, &prior_failures);
        let mut last_reason = String::new();

        for inner in 0..INNER_TRIES {
            let response = self.provider.generate(&prompt, GENERATE_TEMPERATURE).await?;
            let script = strip_fences(&response);
            match security::syntax_check(&script) {
                Ok(()) => {
                    tracing::info!(job_id = %state.job_id, "script generated");
                    state.script = script;
                    return Ok(state);
                }
                Err(reason) => {
                    tracing::warn!(job_id = %state.job_id, inner, %reason, "generated script does not parse");
                    if inner == 0 {
                        prompt.push_str(&prompts::generate_retry_suffix(&reason));
                    }
                    last_reason = reason;
                }
            }
        }

        Err(AgentError::InvalidScript {
            attempts: INNER_TRIES,
            reason: last_reason,
        })
    }

    /// Execute: one sandboxed run. Engine-level aborts (security rejection,
    /// container timeout) fold into a synthetic result so every attempt
    /// yields exactly one ExecutionResult; infrastructure failures propagate
    /// and end the job.
    async fn execute(&self, mut state: AgentState) -> Result<AgentState> {
        let attempt = state.attempt_count + 1;
        let result = match self.engine.run(&state.script, &state.job_id, attempt).await {
            Ok(result) => result,
            Err(SandboxError::Security(violation)) => ExecutionResult {
                stderr: violation.to_string(),
                exit_code: -1,
                error_type: Some(ErrorTag::SecurityViolation),
                error_message: Some(violation.reason),
                duration_seconds: Some(0.0),
                ..Default::default()
            },
            Err(SandboxError::Timeout(secs)) => ExecutionResult {
                stderr: "Execution timed out.".to_string(),
                exit_code: -1,
                error_type: Some(ErrorTag::ContainerTimeout),
                error_message: Some("Container timeout".to_string()),
                duration_seconds: Some(secs as f64),
                ..Default::default()
            },
            Err(other) => return Err(AgentError::Infrastructure(other.to_string())),
        };

        state.attempt_count = attempt;
        state.history.push(AttemptRecord {
            attempt,
            script: state.script.clone(),
            result: result.clone(),
            refinement_note: None,
        });
        state.execution_result = Some(result);
        state.check_invariants()?;

        tracing::info!(
            job_id = %state.job_id,
            attempt,
            exit_code = state.execution_result.as_ref().map(|r| r.exit_code).unwrap_or(-1),
            "execution complete"
        );
        Ok(state)
    }

    /// Evaluate: deterministic success/failure classification, zero LLM calls.
    fn evaluate(&self, mut state: AgentState) -> AgentState {
        let (success, failure) = match state.execution_result.as_ref() {
            Some(result) => classify(result),
            None => (false, None),
        };
        state.success = success;
        if let Some(failure) = failure {
            if let Some(result) = state.execution_result.as_mut() {
                result.error_type = Some(failure.into());
            }
        }
        tracing::info!(
            job_id = %state.job_id,
            success,
            attempt = state.attempt_count,
            "evaluation complete"
        );
        state
    }

    /// Refine: rewrite the script from failure feedback. Attaches the note
    /// to the attempt that just failed; never consumes an attempt.
    async fn refine(&self, mut state: AgentState) -> Result<AgentState> {
        let failure_json = serde_json::to_string_pretty(&state.execution_result)?;
        let history_summary = state
            .history
            .iter()
            .map(|record| {
                format!(
                    "Attempt {}: error_type={}, note={}",
                    record.attempt,
                    record
                        .result
                        .error_type
                        .map(|tag| format!("{tag:?}"))
                        .unwrap_or_else(|| "None".to_string()),
                    record.refinement_note.as_deref().unwrap_or("N/A")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = prompts::refine_prompt(&state.script, &failure_json, &history_summary);
        let mut last_reason = String::new();

        for inner in 0..INNER_TRIES {
            let response = self.provider.generate(&prompt, REFINE_TEMPERATURE).await?;
            let content = response.trim();
            let script = strip_fences(content);
            match security::syntax_check(&script) {
                Ok(()) => {
                    let note = refinement_note(content);
                    if let Some(last) = state.history.last_mut() {
                        // written once, never overwritten
                        if last.refinement_note.is_none() {
                            last.refinement_note = Some(note);
                        }
                    }
                    tracing::info!(job_id = %state.job_id, attempt = state.attempt_count, "refinement complete");
                    state.script = script;
                    return Ok(state);
                }
                Err(reason) => {
                    tracing::warn!(job_id = %state.job_id, inner, %reason, "refined script does not parse");
                    if inner == 0 {
                        prompt.push_str(&prompts::generate_retry_suffix(&reason));
                    }
                    last_reason = reason;
                }
            }
        }

        Err(AgentError::InvalidScript {
            attempts: INNER_TRIES,
            reason: last_reason,
        })
    }
}

/// Remove surrounding markdown code fences if present.
fn strip_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim().lines().collect();
    if lines.first().is_some_and(|line| line.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|line| line.starts_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}

/// First two lines of the refine response explain the failure; fall back to
/// a 200-character prefix for one-line replies.
fn refinement_note(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() >= 2 {
        lines[..2].join(" ")
    } else {
        content.chars().take(200).collect()
    }
}
