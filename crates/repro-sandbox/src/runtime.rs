//! Container runtime boundary
//!
//! The engine drives the container runtime through this trait so the
//! execution path can be exercised with a fake in tests. The production
//! implementation shells out to the Docker CLI.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, SandboxError};

/// Fixed in-sandbox path the script is mounted read-only at.
pub const SCRIPT_MOUNT: &str = "/scripts/script.py";

/// Fixed in-sandbox path of the only writable directory. Screenshots must
/// land here to be discoverable, and it is exactly the path the security
/// gate permits `open()` calls against.
pub const ARTIFACT_MOUNT: &str = "/screenshots";

/// Non-privileged identity the sandboxed process runs as.
const SANDBOX_USER: &str = "1000";

/// Everything needed to launch one sandbox instance.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    /// Host path of the materialized script, bound read-only.
    pub script_path: PathBuf,
    /// Host path of the job artifact directory, bound read-write.
    pub artifacts_dir: PathBuf,
    /// Memory ceiling in megabytes.
    pub memory_mb: u64,
}

/// Minimal lifecycle surface the engine needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Verify the runtime daemon is reachable.
    async fn ping(&self) -> Result<()>;

    /// Launch a detached container; returns its runtime identifier.
    async fn launch(&self, spec: &ContainerSpec) -> Result<String>;

    /// Block until the container exits; returns its exit code. The caller
    /// bounds this with a deadline and drops the future on expiry.
    async fn wait(&self, container_id: &str) -> Result<i32>;

    /// Captured (stdout, stderr) of the container process.
    async fn logs(&self, container_id: &str) -> Result<(String, String)>;

    /// Force-stop and remove the container. Must be safe to call while the
    /// container is still running.
    async fn remove(&self, container_id: &str) -> Result<()>;
}

/// Production runtime backed by the `docker` CLI.
///
/// Scripts run with a memory ceiling, a single-CPU compute cap, an isolated
/// bridge network (never the host namespace), and a non-root user.
pub struct DockerCli;

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<()> {
        let output = Command::new("docker")
            .args(["version", "--format", "{{.Server.Version}}"])
            .output()
            .await
            .map_err(|e| SandboxError::Startup(format!("docker CLI unavailable: {e}")))?;
        if !output.status.success() {
            return Err(SandboxError::Startup(format!(
                "docker daemon unreachable: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn launch(&self, spec: &ContainerSpec) -> Result<String> {
        let output = Command::new("docker")
            .args(["run", "--detach"])
            .args(["--memory", &format!("{}m", spec.memory_mb)])
            .args(["--cpus", "1"])
            .args(["--network", "bridge"])
            .args(["--user", SANDBOX_USER])
            .args([
                "-v",
                &format!("{}:{}:ro", spec.script_path.display(), SCRIPT_MOUNT),
            ])
            .args([
                "-v",
                &format!("{}:{}:rw", spec.artifacts_dir.display(), ARTIFACT_MOUNT),
            ])
            .arg(&spec.image)
            .output()
            .await
            .map_err(|e| SandboxError::Startup(e.to_string()))?;

        if !output.status.success() {
            return Err(SandboxError::Startup(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn wait(&self, container_id: &str) -> Result<i32> {
        // kill_on_drop so an expired deadline reaps the blocking `docker wait`.
        let output = Command::new("docker")
            .args(["wait", container_id])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SandboxError::Runtime(e.to_string()))?;
        if !output.status.success() {
            return Err(SandboxError::Runtime(format!(
                "docker wait failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|e| SandboxError::Runtime(format!("unparsable exit code: {e}")))
    }

    async fn logs(&self, container_id: &str) -> Result<(String, String)> {
        // docker replays container stdout/stderr on the matching host streams
        let output = Command::new("docker")
            .args(["logs", container_id])
            .output()
            .await
            .map_err(|e| SandboxError::Runtime(e.to_string()))?;
        if !output.status.success() {
            return Err(SandboxError::Runtime(format!(
                "docker logs failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok((
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        // `--force` sends SIGKILL; untrusted code may ignore graceful signals
        let output = Command::new("docker")
            .args(["rm", "--force", container_id])
            .output()
            .await
            .map_err(|e| SandboxError::Runtime(e.to_string()))?;
        if !output.status.success() {
            return Err(SandboxError::Runtime(format!(
                "docker rm failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
