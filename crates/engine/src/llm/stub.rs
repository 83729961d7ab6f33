//! Deterministic LLM stub for tests and offline play
//!
//! Returns canned content keyed by substrings of the prompt, with a
//! hash-derived default so distinct prompts still get distinct (but stable)
//! text. Embeddings are a cheap fold of the input bytes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use delver_domain::GameResult;

use super::{ChatRequest, ChatResponse, LlmPort};

/// Embedding width used by the stub
pub const STUB_EMBEDDING_DIM: usize = 16;

#[derive(Default)]
pub struct StubLlm {
    /// substring of (system prompt + user context) -> canned reply
    canned: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl StubLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned reply for prompts containing `needle`
    pub fn respond_with(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        {
            let mut canned = self.canned.lock().unwrap_or_else(|e| e.into_inner());
            canned.insert(needle.into(), reply.into());
        }
        self
    }

    /// How many chat calls the stub has served
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn prompt_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl LlmPort for StubLlm {
    async fn chat_completion(&self, request: ChatRequest) -> GameResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let haystack = format!("{}\n{}", request.system_prompt, request.user_context);
        let canned = self.canned.lock().unwrap_or_else(|e| e.into_inner());
        let content = canned
            .iter()
            .find(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| format!("stub-{:016x}", prompt_hash(&haystack)));
        Ok(ChatResponse {
            content,
            finish_reason: "stop".to_string(),
        })
    }

    async fn create_embedding(&self, text: &str, _model: &str) -> GameResult<Vec<f64>> {
        let mut vector = vec![0.0f64; STUB_EMBEDDING_DIM];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % STUB_EMBEDDING_DIM] += f64::from(byte) / 255.0;
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_reply_by_substring() {
        let stub = StubLlm::new().respond_with("wares", "Finest goods in the deep.");
        let response = stub
            .chat_completion(ChatRequest::new("m", "You are a merchant.", "Tell me about wares"))
            .await
            .expect("stub never fails");
        assert_eq!(response.content, "Finest goods in the deep.");
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_default_reply_is_stable() {
        let stub = StubLlm::new();
        let a = stub
            .chat_completion(ChatRequest::new("m", "sys", "ctx"))
            .await
            .expect("ok");
        let b = stub
            .chat_completion(ChatRequest::new("m", "sys", "ctx"))
            .await
            .expect("ok");
        assert_eq!(a.content, b.content);
    }

    #[tokio::test]
    async fn test_embedding_shape() {
        let stub = StubLlm::new();
        let vector = stub.create_embedding("deep halls", "m").await.expect("ok");
        assert_eq!(vector.len(), STUB_EMBEDDING_DIM);
    }
}
