//! Knowledge component: cached answers to topics an NPC has been asked about
//!
//! Topics are normalized (lowercased, trimmed, inner whitespace collapsed)
//! before lookup so "The Wares", "wares " and "wares" share one cache entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached answer about one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
    pub cached_at: DateTime<Utc>,
}

/// Normalize a topic string for cache keying
pub fn normalize_topic(topic: &str) -> String {
    topic
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Topic -> cached answer map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeComponent {
    entries: BTreeMap<String, KnowledgeEntry>,
}

impl KnowledgeComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(&normalize_topic(topic))
    }

    pub fn insert(&mut self, topic: &str, question: String, answer: String, at: DateTime<Utc>) {
        self.entries.insert(
            normalize_topic(topic),
            KnowledgeEntry {
                question,
                answer,
                cached_at: at,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        chrono::TimeZone::timestamp_opt(&Utc, 1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_normalize_topic() {
        assert_eq!(normalize_topic("  The   WARES "), "the wares");
        assert_eq!(normalize_topic("wares"), "wares");
    }

    #[test]
    fn test_cache_hit_across_spellings() {
        let mut knowledge = KnowledgeComponent::new();
        knowledge.insert("Wares", "what about wares?".into(), "Fine goods.".into(), now());
        assert!(knowledge.get("  wares ").is_some());
        assert!(knowledge.get("prices").is_none());
        assert_eq!(knowledge.len(), 1);
    }
}
