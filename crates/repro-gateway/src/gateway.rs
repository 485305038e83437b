//! Main Gateway implementation
//!
//! HTTP front door for the reproduction service: accepts bug reports,
//! dispatches each job as an independent background task, and serves
//! results, scripts, and screenshots.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use repro_agent::{providers, Orchestrator};
use repro_core::{ArtifactStore, JobRecord, JobStatus, JobStore, ReproConfig};
use repro_sandbox::{ContainerRuntime, DockerCli, ExecutionEngine};

use crate::config::GatewayConfig;
use crate::schemas::{JobCreatedResponse, JobResultResponse, ReproduceRequest};
use crate::{GatewayError, Result};

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub repro: ReproConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub jobs: JobStore,
    pub artifacts: ArtifactStore,
}

/// Main Gateway
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Wire the gateway to the local Docker daemon and the configured
    /// LLM provider.
    pub fn new(config: GatewayConfig, repro: ReproConfig) -> Result<Self> {
        let provider = providers::from_config(&repro)
            .map_err(|e| GatewayError::Startup(e.to_string()))?;
        let engine = ExecutionEngine::docker(&repro);
        let orchestrator = Arc::new(Orchestrator::new(provider, engine, repro.clone()));
        Ok(Self::with_orchestrator(config, repro, orchestrator))
    }

    /// Wire the gateway to a prebuilt orchestrator (used by tests).
    pub fn with_orchestrator(
        config: GatewayConfig,
        repro: ReproConfig,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        let state = Arc::new(GatewayState {
            config,
            jobs: JobStore::new(&repro.data_dir),
            artifacts: ArtifactStore::new(&repro.data_dir),
            repro,
            orchestrator,
        });
        Self { state }
    }

    /// Get gateway state
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/reproduce", post(Self::handle_reproduce))
            .route("/result/:job_id", get(Self::handle_result))
            .route("/result/:job_id/script", get(Self::handle_script))
            .route(
                "/result/:job_id/screenshot/:filename",
                get(Self::handle_screenshot),
            )
            .route("/health", get(Self::handle_health))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the gateway server
    pub async fn start(&self) -> Result<()> {
        // Fail fast if the container runtime is unreachable.
        DockerCli
            .ping()
            .await
            .map_err(|e| GatewayError::Startup(e.to_string()))?;
        std::fs::create_dir_all(self.state.repro.data_dir.join("jobs"))?;
        std::fs::create_dir_all(self.state.repro.data_dir.join("artifacts"))?;

        let addr = self.state.config.socket_addr()?;
        let router = self.build_router();

        tracing::info!(%addr, "repro gateway starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(())
    }

    // HTTP handlers

    /// Accept a bug report and start asynchronous reproduction.
    async fn handle_reproduce(
        State(state): State<Arc<GatewayState>>,
        Json(request): Json<ReproduceRequest>,
    ) -> Result<Response> {
        if request.bug_report.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "bug_report must not be empty".to_string(),
            ));
        }
        url::Url::parse(&request.target_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid target_url: {e}")))?;

        let job_id = Uuid::new_v4().to_string();
        let stub = JobRecord::processing(
            &job_id,
            &request.bug_report,
            &request.target_url,
            state.repro.max_attempts,
        );
        state.jobs.save(&stub)?;

        // One detached task per job; sandboxes are capped per job, so
        // concurrent jobs contend only for host-level capacity.
        let orchestrator = state.orchestrator.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            orchestrator
                .run_job(&request.bug_report, &request.target_url, Some(spawned_id))
                .await;
        });

        tracing::info!(%job_id, "reproduction job accepted");
        let body = JobCreatedResponse {
            job_id,
            status: JobStatus::Processing,
        };
        Ok((StatusCode::ACCEPTED, Json(body)).into_response())
    }

    /// Get the current status/result of a reproduction job.
    async fn handle_result(
        State(state): State<Arc<GatewayState>>,
        Path(job_id): Path<String>,
    ) -> Result<Response> {
        let record = state
            .jobs
            .load(&job_id)?
            .ok_or_else(|| GatewayError::JobNotFound(job_id.clone()))?;

        // A reader may observe `processing` with partial history mid-run;
        // statuses are monotonic, so this stub is never stale backwards.
        if record.status == JobStatus::Processing {
            return Ok(Json(serde_json::json!({
                "job_id": job_id,
                "status": record.status,
            }))
            .into_response());
        }

        let screenshot_urls = state
            .artifacts
            .list_screenshots(&job_id)?
            .into_iter()
            .map(|name| format!("/result/{job_id}/screenshot/{name}"))
            .collect();

        let body = JobResultResponse {
            job_id: record.job_id.clone(),
            status: record.status,
            success: record.success,
            attempt_count: record.attempt_count,
            final_script: record.final_script.clone(),
            screenshot_urls,
            logs: record.stdout_log(),
            error: record.error.clone(),
            created_at: record.created_at.to_rfc3339(),
            completed_at: record.completed_at.map(|at| at.to_rfc3339()),
        };
        Ok(Json(body).into_response())
    }

    /// Download the final reproduction script.
    async fn handle_script(
        State(state): State<Arc<GatewayState>>,
        Path(job_id): Path<String>,
    ) -> Result<Response> {
        state
            .jobs
            .load(&job_id)?
            .ok_or_else(|| GatewayError::JobNotFound(job_id.clone()))?;
        let path = state
            .artifacts
            .final_script_path(&job_id)
            .ok_or_else(|| GatewayError::ArtifactNotFound("final script".to_string()))?;
        let script = tokio::fs::read_to_string(path).await?;

        Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"reproduction.py\"",
                ),
            ],
            script,
        )
            .into_response())
    }

    /// Serve a screenshot captured during execution.
    async fn handle_screenshot(
        State(state): State<Arc<GatewayState>>,
        Path((job_id, filename)): Path<(String, String)>,
    ) -> Result<Response> {
        let path = state
            .artifacts
            .screenshot_path(&job_id, &filename)
            .ok_or_else(|| GatewayError::ArtifactNotFound(filename.clone()))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
    }

    async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "ok",
            "version": crate::VERSION,
        }))
    }
}
