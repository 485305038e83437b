//! Gateway API tests over an in-memory orchestrator.
//!
//! The orchestrator runs with the mock provider and a runtime fake that
//! reports a reproduction on the first attempt, so the full submit → poll →
//! download flow can be exercised without Docker or network access.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use repro_agent::{MockProvider, Orchestrator};
use repro_core::ReproConfig;
use repro_gateway::{Gateway, GatewayConfig};
use repro_sandbox::{ContainerRuntime, ContainerSpec, ExecutionEngine};

/// Runtime whose containers always print the success marker and exit 0.
struct ReproducingRuntime;

#[async_trait]
impl ContainerRuntime for ReproducingRuntime {
    async fn ping(&self) -> repro_sandbox::Result<()> {
        Ok(())
    }

    async fn launch(&self, _spec: &ContainerSpec) -> repro_sandbox::Result<String> {
        Ok("container-0".to_string())
    }

    async fn wait(&self, _container_id: &str) -> repro_sandbox::Result<i32> {
        Ok(0)
    }

    async fn logs(&self, _container_id: &str) -> repro_sandbox::Result<(String, String)> {
        Ok(("Step 6: Checking for error message\nREPRODUCED\n".to_string(), String::new()))
    }

    async fn remove(&self, _container_id: &str) -> repro_sandbox::Result<()> {
        Ok(())
    }
}

fn gateway(data_dir: &std::path::Path) -> Gateway {
    let repro = ReproConfig::default()
        .with_provider("mock")
        .with_max_attempts(3)
        .with_data_dir(data_dir);
    let engine = ExecutionEngine::new(
        Arc::new(ReproducingRuntime),
        repro.sandbox.clone(),
        &repro.data_dir,
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(MockProvider::new()),
        engine,
        repro.clone(),
    ));
    Gateway::with_orchestrator(GatewayConfig::default(), repro, orchestrator)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let response = router
        .oneshot(Request::get("/result/no-such-job").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_target_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let request = Request::post("/reproduce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "bug_report": "something is wrong",
                "target_url": "not a url",
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_empty_bug_report_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let request = Request::post("/reproduce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "bug_report": "   ",
                "target_url": "http://example.com/login",
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_submit_poll_and_download_flow() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let request = Request::post("/reproduce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "bug_report": "login shows an error with valid credentials",
                "target_url": "http://example.com/login",
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let created = body_json(response).await;
    let job_id = created["job_id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "processing");

    // poll until the background task reaches a terminal state
    let mut result = serde_json::Value::Null;
    for _ in 0..100 {
        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/result/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        result = body_json(response).await;
        if result["status"] != "processing" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(result["status"], "done");
    assert_eq!(result["success"], true);
    assert_eq!(result["attempt_count"], 1);
    assert!(result["logs"].as_str().unwrap().contains("REPRODUCED"));
    assert!(result["final_script"].as_str().unwrap().contains("selenium"));

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/result/{job_id}/script"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_screenshot_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = gateway(dir.path()).build_router();

    let response = router
        .oneshot(
            Request::get("/result/some-job/screenshot/missing.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
