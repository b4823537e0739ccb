//! Test-only mock LLM provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    embeddings: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    pub default_embedding: Vec<f32>,
    chat_requests: Arc<Mutex<Vec<Vec<Message>>>>,
    pub fail_chat: bool,
    pub fail_embed: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            embeddings: Arc::new(Mutex::new(HashMap::new())),
            default_embedding: vec![0.0; 8],
            chat_requests: Arc::new(Mutex::new(Vec::new())),
            fail_chat: false,
            fail_embed: false,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_chat() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_embed() -> Self {
        Self {
            fail_embed: true,
            ..Self::default()
        }
    }

    /// Register the vector returned for an exact input text. Unregistered
    /// texts fall back to `default_embedding`.
    #[must_use]
    pub fn with_embedding(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.lock().unwrap().insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_default_embedding(mut self, vector: Vec<f32>) -> Self {
        self.default_embedding = vector;
        self
    }

    /// Messages passed to every `chat` call so far, in call order.
    #[must_use]
    pub fn chat_requests(&self) -> Vec<Vec<Message>> {
        self.chat_requests.lock().unwrap().clone()
    }
}

impl LlmProvider for MockProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.chat_requests.lock().unwrap().push(messages.to_vec());
        if self.fail_chat {
            return Err(LlmError::Other("mock chat error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if self.fail_embed {
            return Err(LlmError::Other("mock embed error".into()));
        }
        let embeddings = self.embeddings.lock().unwrap();
        Ok(embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_embedding.clone()))
    }
}
