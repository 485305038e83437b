//! Service configuration
//!
//! All settings are read from environment variables with defaults, so a bare
//! `repro-gateway` starts against a local Docker daemon with no config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration shared by the agent loop and the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproConfig {
    /// Which LLM backend to use: `anthropic`, `openai`, or `mock`.
    pub llm_provider: String,

    /// Model identifier passed to the provider.
    pub llm_model: String,

    /// Attempt budget per job, fixed at job start.
    pub max_attempts: u32,

    /// Sandbox resource limits.
    pub sandbox: SandboxSettings,

    /// Root directory for job documents and artifacts.
    pub data_dir: PathBuf,
}

/// Hard resource caps applied to every sandbox launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Container image the scripts run in.
    pub image: String,

    /// Memory ceiling in megabytes.
    pub memory_mb: u64,

    /// Wall-clock budget in seconds; the container is force-killed past it.
    pub timeout_secs: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            image: "repro-sandbox:latest".to_string(),
            memory_mb: 512,
            timeout_secs: 60,
        }
    }
}

impl Default for ReproConfig {
    fn default() -> Self {
        Self {
            llm_provider: "anthropic".to_string(),
            llm_model: "claude-3-5-sonnet-20241022".to_string(),
            max_attempts: 5,
            sandbox: SandboxSettings::default(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl ReproConfig {
    /// Build the configuration from the process environment, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm_provider: env_or("LLM_PROVIDER", defaults.llm_provider),
            llm_model: env_or("LLM_MODEL", defaults.llm_model),
            max_attempts: env_parsed("MAX_ATTEMPTS", defaults.max_attempts),
            sandbox: SandboxSettings {
                image: env_or("SANDBOX_IMAGE", defaults.sandbox.image),
                memory_mb: env_parsed("SANDBOX_MEMORY_MB", defaults.sandbox.memory_mb),
                timeout_secs: env_parsed("SANDBOX_TIMEOUT_SECONDS", defaults.sandbox.timeout_secs),
            },
            data_dir: PathBuf::from(env_or(
                "DATA_DIR",
                defaults.data_dir.to_string_lossy().into_owned(),
            )),
        }
    }

    /// Set the data directory (used by tests to point at a tempdir).
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the provider selector.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = provider.into();
        self
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
