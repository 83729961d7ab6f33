//! Embedding-backed event memory
//!
//! Append-only store of event fragments with embeddings, recalled by cosine
//! similarity. Persistence is a flat JSON snapshot; reload is idempotent.
//! Used for narration continuity and NPC knowledge grounding.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use delver_domain::{GameError, GameResult};

use crate::llm::LlmPort;

/// One remembered fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFragment {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f64>,
}

/// Append-only memory with cosine-similarity recall
#[derive(Default)]
pub struct MemoryStore {
    fragments: Vec<MemoryFragment>,
    embed_model: String,
}

impl MemoryStore {
    pub fn new(embed_model: impl Into<String>) -> Self {
        Self {
            fragments: Vec::new(),
            embed_model: embed_model.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.fragments.len()
    }

    pub fn clear_all(&mut self) {
        self.fragments.clear();
    }

    /// Embed and append a fragment. An embedding failure surfaces as
    /// `ExternalUnavailable`; the caller decides whether memory is optional.
    pub async fn remember(
        &mut self,
        llm: &dyn LlmPort,
        text: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> GameResult<()> {
        let text = text.into();
        let embedding = llm.create_embedding(&text, &self.embed_model).await?;
        self.fragments.push(MemoryFragment {
            text,
            metadata,
            embedding,
        });
        Ok(())
    }

    /// Top-k most similar fragments to the query
    pub async fn recall(
        &self,
        llm: &dyn LlmPort,
        query: &str,
        k: usize,
    ) -> GameResult<Vec<String>> {
        if self.fragments.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = llm.create_embedding(query, &self.embed_model).await?;

        let mut scored: Vec<(f64, &MemoryFragment)> = self
            .fragments
            .iter()
            .map(|f| (cosine_similarity(&query_embedding, &f.embedding), f))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, f)| f.text.clone())
            .collect())
    }

    /// Write the flat-file snapshot
    pub fn save_snapshot(&self, path: &Path) -> GameResult<()> {
        let encoded = serde_json::to_string(&self.fragments)
            .map_err(|e| GameError::internal(format!("encode memory: {e}")))?;
        std::fs::write(path, encoded)
            .map_err(|e| GameError::internal(format!("write memory snapshot: {e}")))
    }

    /// Replace contents from a snapshot; loading twice gives the same state
    pub fn load_snapshot(&mut self, path: &Path) -> GameResult<()> {
        if !path.exists() {
            self.fragments.clear();
            return Ok(());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GameError::internal(format!("read memory snapshot: {e}")))?;
        self.fragments = serde_json::from_str(&raw)
            .map_err(|_| GameError::corrupt("MemorySnapshot", path.display().to_string()))?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StubLlm;

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_remember_and_recall() {
        let stub = StubLlm::new();
        let mut memory = MemoryStore::new("embed-model");
        memory
            .remember(&stub, "The merchant sold you a sword", BTreeMap::new())
            .await
            .expect("remember");
        memory
            .remember(&stub, "A wolf attacked in the frozen hall", BTreeMap::new())
            .await
            .expect("remember");
        assert_eq!(memory.size(), 2);

        // identical text embeds identically, so it comes back first
        let recalled = memory
            .recall(&stub, "The merchant sold you a sword", 1)
            .await
            .expect("recall");
        assert_eq!(recalled, vec!["The merchant sold you a sword".to_string()]);
    }

    #[tokio::test]
    async fn test_recall_empty_store() {
        let stub = StubLlm::new();
        let memory = MemoryStore::new("embed-model");
        assert!(memory.recall(&stub, "anything", 5).await.expect("recall").is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_is_idempotent() {
        let stub = StubLlm::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");

        let mut memory = MemoryStore::new("embed-model");
        memory
            .remember(&stub, "Something worth keeping", BTreeMap::new())
            .await
            .expect("remember");
        memory.save_snapshot(&path).expect("save");

        let mut restored = MemoryStore::new("embed-model");
        restored.load_snapshot(&path).expect("load");
        restored.load_snapshot(&path).expect("load again");
        assert_eq!(restored.size(), 1);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let stub = StubLlm::new();
        let mut memory = MemoryStore::new("embed-model");
        memory
            .remember(&stub, "ephemeral", BTreeMap::new())
            .await
            .expect("remember");
        memory.clear_all();
        assert_eq!(memory.size(), 0);
    }
}
