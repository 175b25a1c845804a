use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::InferenceError;

/// Text-completion backend in JSON mode.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

/// Ollama `/api/generate`, non-streaming, `format: "json"`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            format: "json",
            stream: false,
        };

        let start = Instant::now();
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let text = response.text().await?;
        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            bytes = text.len(),
            "Inference completed"
        );
        Ok(completion_text(&text))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// The `response` string of a generate reply. A reply without one is a
/// malformed completion, not a transport failure: it comes back empty and
/// the interpreter turns it into the fallback result.
fn completion_text(body: &str) -> String {
    let completion = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("response").and_then(Value::as_str).map(str::to_string));
    match completion {
        Some(c) => c,
        None => {
            let sample: String = body.chars().take(120).collect();
            warn!(sample = %sample, "Generate reply has no response text");
            String::new()
        }
    }
}

// ── Tests ──
