// src/gateway/mod.rs

//! Remote completion gateway.

pub mod dispatch;
pub mod types;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::GatewayConfig;

pub use dispatch::{DispatchTable, ModelDispatch};
pub use types::{ChatRequest, Message};

/// A service that turns a chat request into completion text.
///
/// Implementations return `GatewayFailure` for transport errors, non-success
/// statuses, malformed payloads and empty content.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Gateway configured from `[gateway]`, reading the key from its env var.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::config(format!("{} is not set", config.api_key_env)))?;
        Self::new(config.base_url.clone(), api_key, config)
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::gateway(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::gateway(format!("status {status}: {body}")));
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| AppError::gateway(format!("malformed response: {e}")))?;

        log::debug!(
            "Completion from {} in {} ms",
            request.model,
            start.elapsed().as_millis()
        );
        raw.into_content()
            .ok_or_else(|| AppError::gateway("empty completion"))
    }
}
