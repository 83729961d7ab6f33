//! Observable game events emitted to front-end subscribers
//!
//! Subscribers are fire-and-forget; a dropped event must never stall the
//! engine. Each emitted event carries a monotonic stamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::QuestId;

/// Severity of a `System` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemLevel {
    Info,
    Warning,
    Error,
}

/// Typed events observable by the front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GameEvent {
    /// Prose describing the world
    Narrative { text: String },
    /// Echo of what the player did
    PlayerAction { text: String },
    /// Blow-by-blow combat line
    Combat { text: String },
    /// Engine message for the player (errors, warnings, saves)
    System { level: SystemLevel, message: String },
    /// Quest lifecycle notification
    Quest {
        quest_id: Option<QuestId>,
        message: String,
    },
    /// Player vitals / location change for status bars
    StatusUpdate {
        hp: Option<i32>,
        max_hp: Option<i32>,
        location: Option<String>,
    },
}

impl GameEvent {
    pub fn narrative(text: impl Into<String>) -> Self {
        Self::Narrative { text: text.into() }
    }

    pub fn player_action(text: impl Into<String>) -> Self {
        Self::PlayerAction { text: text.into() }
    }

    pub fn combat(text: impl Into<String>) -> Self {
        Self::Combat { text: text.into() }
    }

    pub fn system(level: SystemLevel, message: impl Into<String>) -> Self {
        Self::System {
            level,
            message: message.into(),
        }
    }

    pub fn quest(quest_id: Option<QuestId>, message: impl Into<String>) -> Self {
        Self::Quest {
            quest_id,
            message: message.into(),
        }
    }

    pub fn status(hp: Option<i32>, max_hp: Option<i32>, location: Option<String>) -> Self {
        Self::StatusUpdate {
            hp,
            max_hp,
            location,
        }
    }
}

/// Monotonic stamp: per-world sequence number plus wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStamp {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

/// A game event with its emission stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampedEvent {
    pub stamp: EventStamp,
    pub event: GameEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_levels_ordered() {
        assert!(SystemLevel::Info < SystemLevel::Warning);
        assert!(SystemLevel::Warning < SystemLevel::Error);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = GameEvent::narrative("You move north.");
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"narrative\""));
    }
}
