//! Social events and quest-progress actions

use serde::{Deserialize, Serialize};

use crate::entities::item::ItemTemplateId;
use crate::{ChunkId, EntityId};

/// Social events an NPC reacts to, each mapping to a signed disposition delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SocialEventKind {
    /// Asking questions neither pleases nor offends
    QuestionAsked,
    /// Delta comes from the emote table (keyword x disposition band)
    EmoteReceived { emote: String, delta: i32 },
    Attacked,
    Persuaded,
    Intimidated,
    ItemGiven,
    TradeCompleted,
    TheftDetected,
}

impl SocialEventKind {
    /// Signed disposition delta this event applies
    pub fn disposition_delta(&self) -> i32 {
        match self {
            Self::QuestionAsked => 0,
            Self::EmoteReceived { delta, .. } => *delta,
            Self::Attacked => -30,
            Self::Persuaded => 10,
            Self::Intimidated => -15,
            Self::ItemGiven => 10,
            Self::TradeCompleted => 5,
            Self::TheftDetected => -25,
        }
    }
}

/// Things a player did that may advance quest objectives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum QuestAction {
    KilledNpc { npc: EntityId, npc_name: String },
    CollectedItem { template_id: ItemTemplateId },
    VisitedRoom { space_id: ChunkId },
    TalkedToNpc { npc: EntityId, npc_name: String },
    DeliveredItem {
        template_id: ItemTemplateId,
        npc: EntityId,
    },
    SkillCheckPassed { skill: String },
}
