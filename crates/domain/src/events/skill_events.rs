//! Skill progression events
//!
//! Emitted by the skill engine and appended to the persistent skill event
//! log. The `LevelUp` variant carries the perk-milestone flag so the
//! front-end can prompt for a perk choice.

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// How a locked skill became usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "method")]
pub enum UnlockMethod {
    /// Low-probability roll on blind attempt
    Attempt,
    /// Watched a practitioner; unlocks with a small temporary buff
    Observation { mentor: EntityId },
    /// Paid training; unlocks at level 1 with a larger temporary buff
    Training { trainer: EntityId },
    /// Another skill reached a threshold
    Prerequisite { skill: String, level: u32 },
}

/// Events produced by skill progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SkillEvent {
    XpGained {
        skill: String,
        amount: u64,
        current_xp: u64,
        level: u32,
    },
    LevelUp {
        skill: String,
        new_level: u32,
        is_at_perk_milestone: bool,
        via_lucky_promotion: bool,
    },
    SkillUnlocked {
        skill: String,
        method: UnlockMethod,
    },
    PerkChosen {
        skill: String,
        perk: String,
    },
}

impl SkillEvent {
    pub fn skill_name(&self) -> &str {
        match self {
            Self::XpGained { skill, .. }
            | Self::LevelUp { skill, .. }
            | Self::SkillUnlocked { skill, .. }
            | Self::PerkChosen { skill, .. } => skill,
        }
    }
}
