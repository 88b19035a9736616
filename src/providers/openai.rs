//! OpenAI-compatible HTTP provider for completions and embeddings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::AssistantError;

use super::{CompletionProvider, EmbeddingProvider};

/// Client for any endpoint speaking the OpenAI chat/embeddings wire format.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_base: String,
    api_key: String,
    completion_model: String,
    embedding_model: String,
    temperature: f32,
}

impl OpenAiProvider {
    /// Builds a provider from [`Settings`].
    pub fn new(settings: &Settings) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|err| AssistantError::Completion(err.to_string()))?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            completion_model: settings.completion_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            temperature: 0.2,
        })
    }

    /// Overrides the sampling temperature (default 0.2).
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AssistantError> {
        let body = ChatRequest {
            model: &self.completion_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AssistantError::Completion(err.to_string()))?
            .error_for_status()
            .map_err(|err| AssistantError::Completion(err.to_string()))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| AssistantError::Completion(err.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::Completion("response carried no choices".into()))?;

        debug!(model = %self.completion_model, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AssistantError::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistantError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AssistantError::Embedding(err.to_string()))?
            .error_for_status()
            .map_err(|err| AssistantError::Embedding(err.to_string()))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| AssistantError::Embedding(err.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(AssistantError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|datum| datum.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let settings = Settings {
            api_key: "test-key".into(),
            api_base: server.base_url(),
            ..Settings::default()
        };
        OpenAiProvider::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn completion_parses_first_choice() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "RAG"}}]
            }));
        });

        let provider = provider_for(&server);
        let output = provider.complete("classify this").await.unwrap();
        assert_eq!(output, "RAG");
        mock.assert();
    }

    #[tokio::test]
    async fn embedding_batch_preserves_order_and_len() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200).json_body(serde_json::json!({
                "data": [
                    {"embedding": [0.1, 0.2]},
                    {"embedding": [0.3, 0.4]}
                ]
            }));
        });

        let provider = provider_for(&server);
        let vectors = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn http_error_surfaces_as_completion_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500);
        });

        let provider = provider_for(&server);
        let err = provider.complete("x").await.unwrap_err();
        assert!(matches!(err, AssistantError::Completion(_)));
    }
}
