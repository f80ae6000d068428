//! Language-model capability: one prompt in, raw text out.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use wayfind_core::config::AssistantConfig;

use crate::error::ModelError;

/// A text-completion capability.
///
/// Replies carry no guaranteed structure; callers must parse leniently.
pub trait ModelClient: Send + Sync {
    /// Send a single prompt and return the raw reply text.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, ModelError>> + Send;

    /// Name of the model answering prompts, for remediation hints.
    fn model_name(&self) -> &str;
}

// =============================================================================
// Ollama
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for a local Ollama server's `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Unreachable(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, ModelError> {
        Self::new(
            &config.base_url,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl ModelClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelError::ModelMissing(self.model.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        tracing::debug!(model = %self.model, chars = reply.response.len(), "Model replied");
        Ok(reply.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Mock
// =============================================================================

#[derive(Debug, Clone)]
enum MockBehavior {
    Replies(Arc<Mutex<VecDeque<String>>>),
    Unreachable,
    Failing(u16),
}

/// Scripted model for testing.
///
/// Hands out queued replies in order, repeating the last one once the queue
/// runs dry. Every prompt is recorded.
#[derive(Debug, Clone)]
pub struct MockModelClient {
    behavior: MockBehavior,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockModelClient {
    /// A model that answers every prompt with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self::with_replies(vec![reply.to_string()])
    }

    /// A model that answers with each reply in turn.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self::with_behavior(MockBehavior::Replies(Arc::new(Mutex::new(
            replies.into_iter().collect(),
        ))))
    }

    /// A model whose service refuses connections.
    pub fn unreachable() -> Self {
        Self::with_behavior(MockBehavior::Unreachable)
    }

    /// A model whose service answers with an HTTP error status.
    pub fn failing(status: u16) -> Self {
        Self::with_behavior(MockBehavior::Failing(status))
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wait this long before answering each prompt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }

    fn next_reply(&self) -> Result<String, ModelError> {
        match &self.behavior {
            MockBehavior::Unreachable => Err(ModelError::Unreachable(
                "connection refused".to_string(),
            )),
            MockBehavior::Failing(status) => Err(ModelError::Status {
                status: *status,
                body: "mock failure".to_string(),
            }),
            MockBehavior::Replies(queue) => {
                let mut queue = queue.lock().map_err(|e| ModelError::Decode(e.to_string()))?;
                let reply = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                Ok(reply.unwrap_or_default())
            }
        }
    }
}

impl ModelClient for MockModelClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.record(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_reply()
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replies_in_order_then_repeats_last() {
        let model = MockModelClient::with_replies(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(model.generate("1").await.unwrap(), "a");
        assert_eq!(model.generate("2").await.unwrap(), "b");
        assert_eq!(model.generate("3").await.unwrap(), "b");
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.prompts()[1], "2");
    }

    #[tokio::test]
    async fn test_mock_unreachable() {
        let model = MockModelClient::unreachable();
        let err = model.generate("hi").await.unwrap_err();
        assert!(matches!(err, ModelError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_mock_failing_status() {
        let model = MockModelClient::failing(500);
        let err = model.generate("hi").await.unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 500, .. }));
    }

    #[test]
    fn test_ollama_from_config() {
        let client = OllamaClient::from_config(&AssistantConfig::default()).unwrap();
        assert_eq!(client.model_name(), "llama3.2");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_shape() {
        let body = GenerateRequest {
            model: "llama3.2",
            prompt: "hello",
            stream: false,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"model":"llama3.2","prompt":"hello","stream":false}"#
        );
    }

    #[tokio::test]
    async fn test_ollama_unreachable() {
        let client =
            OllamaClient::new("http://127.0.0.1:9", "llama3.2", Duration::from_secs(2)).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(
            matches!(err, ModelError::Unreachable(_) | ModelError::Timeout),
            "unexpected error: {}",
            err
        );
    }
}
