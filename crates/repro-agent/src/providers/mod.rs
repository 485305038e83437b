//! LLM provider capability interface
//!
//! One narrow capability: prompt in, completion text out. The backend is
//! selected once at job start from configuration; call sites never branch
//! on the provider.

pub mod anthropic;
pub mod mock;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use repro_core::ReproConfig;

use crate::error::{AgentError, Result};

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// Request timeout applied to every provider call.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Capability interface implemented by all LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Generate a completion for the prompt at the given sampling temperature.
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String>;
}

/// Select the provider named by the configuration.
pub fn from_config(config: &ReproConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.llm_provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicProvider::from_env(&config.llm_model)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::from_env(&config.llm_model)?)),
        "mock" => Ok(Arc::new(MockProvider::new())),
        other => Err(AgentError::UnknownProvider(other.to_string())),
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AgentError::Provider(format!("failed to create HTTP client: {e}")))
}

/// POST a JSON body and parse the JSON response, with a single retry on
/// rate limiting or timeout.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: serde_json::Value,
) -> Result<serde_json::Value> {
    let mut retried = false;
    loop {
        let response = client
            .post(url)
            .headers(headers.clone())
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                return resp
                    .json()
                    .await
                    .map_err(|e| AgentError::Provider(format!("invalid JSON response: {e}")));
            }
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS && !retried => {
                retried = true;
                tracing::warn!(url, "rate limited, retrying once");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(AgentError::Provider(format!("HTTP {status}: {text}")));
            }
            Err(e) if e.is_timeout() && !retried => {
                retried = true;
                tracing::warn!(url, "request timed out, retrying once");
            }
            Err(e) => return Err(AgentError::Provider(e.to_string())),
        }
    }
}
