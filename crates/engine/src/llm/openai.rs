//! OpenAI-compatible chat/embeddings client
//!
//! Works against any endpoint speaking the `/v1/chat/completions` and
//! `/v1/embeddings` shapes (OpenAI, Ollama, llama.cpp server).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use delver_domain::GameResult;

use super::{transport_error, ChatRequest, ChatResponse, LlmPort};

/// Default base URL for the hosted API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ApiChatResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ApiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ApiEmbeddingResponse {
    data: Vec<ApiEmbedding>,
}

#[derive(Deserialize)]
struct ApiEmbedding {
    embedding: Vec<f64>,
}

#[async_trait]
impl LlmPort for OpenAiClient {
    async fn chat_completion(&self, request: ChatRequest) -> GameResult<ChatResponse> {
        let api_request = ApiChatRequest {
            model: &request.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ApiMessage {
                    role: "user",
                    content: &request.user_context,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(transport_error(format!("{status}: {body}")));
        }

        let api_response: ApiChatResponse =
            response.json().await.map_err(transport_error)?;
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| transport_error("empty choices"))?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }

    async fn create_embedding(&self, text: &str, model: &str) -> GameResult<Vec<f64>> {
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ApiEmbeddingRequest { model, input: text })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(transport_error(status));
        }

        let api_response: ApiEmbeddingResponse =
            response.json().await.map_err(transport_error)?;
        api_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| transport_error("empty embedding data"))
    }
}
