//! Execution engine - gate, launch, supervise, tear down
//!
//! Runs one candidate script inside a resource-capped container. The
//! security gate runs before anything touches the runtime, the wait is
//! bounded by a wall-clock deadline, and the container is removed on every
//! exit path past a successful launch.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use repro_core::{security, ArtifactStore, ExecutionResult, ReproConfig, SandboxSettings};

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ContainerSpec, DockerCli};

/// Engine for sandboxed script execution.
pub struct ExecutionEngine {
    runtime: Arc<dyn ContainerRuntime>,
    artifacts: ArtifactStore,
    settings: SandboxSettings,
}

impl ExecutionEngine {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        settings: SandboxSettings,
        data_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            runtime,
            artifacts: ArtifactStore::new(data_dir),
            settings,
        }
    }

    /// Engine wired to the local Docker daemon.
    pub fn docker(config: &ReproConfig) -> Self {
        Self::new(
            Arc::new(DockerCli),
            config.sandbox.clone(),
            &config.data_dir,
        )
    }

    /// Verify the underlying runtime is reachable (called at startup).
    pub async fn ping(&self) -> Result<()> {
        self.runtime.ping().await
    }

    /// Run one attempt's script for a job.
    ///
    /// The script is materialized as `attempt_<n>.py` in the job's artifact
    /// directory and mounted read-only; the artifact directory itself is the
    /// only writable mount. Engine-level failures surface as typed errors,
    /// never as a partial ExecutionResult.
    pub async fn run(&self, script: &str, job_id: &str, attempt: u32) -> Result<ExecutionResult> {
        security::check(script)?;

        let script_path = self.artifacts.save_attempt_script(job_id, attempt, script)?;
        let artifacts_dir = self.artifacts.job_dir(job_id)?;
        let spec = ContainerSpec {
            image: self.settings.image.clone(),
            script_path,
            artifacts_dir,
            memory_mb: self.settings.memory_mb,
        };

        let started = Instant::now();
        let container_id = self.runtime.launch(&spec).await?;
        let outcome = self.supervise(&container_id).await;

        // Unconditional teardown: exactly once for every launched container,
        // whether the wait finished, errored, or hit the deadline.
        if let Err(teardown) = self.runtime.remove(&container_id).await {
            tracing::warn!(job_id, %container_id, error = %teardown, "sandbox teardown failed");
        }

        let (stdout, stderr, exit_code) = outcome?;
        let duration = started.elapsed().as_secs_f64();

        let mut result = repro_core::normalize(&stdout, &stderr, exit_code);
        result.duration_seconds = Some((duration * 100.0).round() / 100.0);

        tracing::info!(job_id, attempt, exit_code, duration, "container run complete");
        Ok(result)
    }

    /// Wait for exit under the deadline, then collect output. Never removes
    /// the container - the caller owns teardown.
    async fn supervise(&self, container_id: &str) -> Result<(String, String, i32)> {
        let deadline = Duration::from_secs(self.settings.timeout_secs);
        let exit_code = match timeout(deadline, self.runtime.wait(container_id)).await {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(SandboxError::Timeout(self.settings.timeout_secs)),
        };
        let (stdout, stderr) = self.runtime.logs(container_id).await?;
        Ok((stdout, stderr, exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ContainerRuntime;
    use async_trait::async_trait;
    use repro_core::ErrorTag;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable runtime standing in for Docker.
    struct FakeRuntime {
        stdout: String,
        stderr: String,
        exit_code: i32,
        hang: bool,
        fail_launch: bool,
        launches: AtomicUsize,
        removals: AtomicUsize,
    }

    impl FakeRuntime {
        fn exiting(stdout: &str, stderr: &str, exit_code: i32) -> Self {
            Self {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                exit_code,
                hang: false,
                fail_launch: false,
                launches: AtomicUsize::new(0),
                removals: AtomicUsize::new(0),
            }
        }

        fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::exiting("", "", 0)
            }
        }

        fn failing_launch() -> Self {
            Self {
                fail_launch: true,
                ..Self::exiting("", "", 0)
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn launch(&self, _spec: &ContainerSpec) -> Result<String> {
            if self.fail_launch {
                return Err(SandboxError::Startup("image not found".to_string()));
            }
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok("container-0".to_string())
        }

        async fn wait(&self, _container_id: &str) -> Result<i32> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(self.exit_code)
        }

        async fn logs(&self, _container_id: &str) -> Result<(String, String)> {
            Ok((self.stdout.clone(), self.stderr.clone()))
        }

        async fn remove(&self, _container_id: &str) -> Result<()> {
            self.removals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine(runtime: Arc<FakeRuntime>, data_dir: &Path) -> ExecutionEngine {
        let settings = SandboxSettings {
            timeout_secs: 1,
            ..SandboxSettings::default()
        };
        ExecutionEngine::new(runtime, settings, data_dir)
    }

    #[tokio::test]
    async fn test_normal_run_returns_normalized_result() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::exiting("step 1\nREPRODUCED\n", "", 0));
        let engine = engine(runtime.clone(), dir.path());

        let result = engine.run("print('REPRODUCED')\n", "job-1", 1).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.error_type, None);
        assert!(result.duration_seconds.is_some());
        assert_eq!(runtime.removals.load(Ordering::SeqCst), 1);

        // script was materialized for the read-only mount
        let script = dir.path().join("artifacts/job-1/attempt_1.py");
        assert!(script.exists());
    }

    #[tokio::test]
    async fn test_failure_output_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::exiting("", "TimeoutException: wait\n", 1));
        let engine = engine(runtime, dir.path());

        let result = engine.run("print('x')\n", "job-1", 1).await.unwrap();
        assert_eq!(result.error_type, Some(ErrorTag::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_raises_timeout_and_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::hanging());
        let engine = engine(runtime.clone(), dir.path());

        let err = engine.run("print('x')\n", "job-1", 1).await.unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(1)));
        assert_eq!(runtime.removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_leak_across_three_forced_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::hanging());
        let engine = engine(runtime.clone(), dir.path());

        for attempt in 1..=3 {
            let err = engine.run("print('x')\n", "job-1", attempt).await.unwrap_err();
            assert!(matches!(err, SandboxError::Timeout(_)));
        }
        assert_eq!(runtime.launches.load(Ordering::SeqCst), 3);
        assert_eq!(runtime.removals.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_security_violation_never_launches() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::exiting("", "", 0));
        let engine = engine(runtime.clone(), dir.path());

        let err = engine.run("import os\n", "job-1", 1).await.unwrap_err();
        assert!(matches!(err, SandboxError::Security(_)));
        assert_eq!(runtime.launches.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.removals.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_is_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::failing_launch());
        let engine = engine(runtime.clone(), dir.path());

        let err = engine.run("print('x')\n", "job-1", 1).await.unwrap_err();
        assert!(matches!(err, SandboxError::Startup(_)));
        assert_eq!(runtime.removals.load(Ordering::SeqCst), 0);
    }
}
