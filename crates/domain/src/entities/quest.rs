//! Quests and objectives

use serde::{Deserialize, Serialize};

use crate::entities::item::ItemTemplateId;
use crate::events::QuestAction;
use crate::{ChunkId, EntityId, QuestId};

/// Global quest status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    Active,
    Completed,
    Claimed,
    Failed,
}

/// What must be done, with progress tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ObjectiveKind {
    KillNpc { npc_name: String },
    CollectItem { template_id: ItemTemplateId },
    VisitRoom { space_id: ChunkId },
    TalkToNpc { npc_name: String },
    DeliverItem {
        template_id: ItemTemplateId,
        npc_name: String,
    },
    SkillCheck { skill: String },
}

/// One objective inside a quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestObjective {
    pub kind: ObjectiveKind,
    pub required_count: u32,
    pub progress: u32,
}

impl QuestObjective {
    pub fn new(kind: ObjectiveKind, required_count: u32) -> Self {
        Self {
            kind,
            required_count: required_count.max(1),
            progress: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.required_count
    }

    /// Whether the action advances this objective
    fn matches(&self, action: &QuestAction) -> bool {
        match (&self.kind, action) {
            (ObjectiveKind::KillNpc { npc_name }, QuestAction::KilledNpc { npc_name: n, .. }) => {
                npc_name == n
            }
            (
                ObjectiveKind::CollectItem { template_id },
                QuestAction::CollectedItem { template_id: t },
            ) => template_id == t,
            (ObjectiveKind::VisitRoom { space_id }, QuestAction::VisitedRoom { space_id: s }) => {
                space_id == s
            }
            (ObjectiveKind::TalkToNpc { npc_name }, QuestAction::TalkedToNpc { npc_name: n, .. }) => {
                npc_name == n
            }
            (
                ObjectiveKind::DeliverItem { template_id, .. },
                QuestAction::DeliveredItem { template_id: t, .. },
            ) => template_id == t,
            (ObjectiveKind::SkillCheck { skill }, QuestAction::SkillCheckPassed { skill: s }) => {
                skill == s
            }
            _ => false,
        }
    }
}

/// Reward granted when a completed quest is claimed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestReward {
    pub xp: u64,
    pub gold: i64,
    pub items: Vec<ItemTemplateId>,
}

/// A quest offered to or held by a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    id: QuestId,
    pub title: String,
    pub description: String,
    pub objectives: Vec<QuestObjective>,
    pub status: QuestStatus,
    pub reward: QuestReward,
    /// NPC that offered the quest, when any
    pub giver: Option<EntityId>,
}

impl Quest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: QuestId::new(),
            title: title.into(),
            description: description.into(),
            objectives: Vec::new(),
            status: QuestStatus::Active,
            reward: QuestReward::default(),
            giver: None,
        }
    }

    pub fn id(&self) -> QuestId {
        self.id
    }

    pub fn with_id(mut self, id: QuestId) -> Self {
        self.id = id;
        self
    }

    pub fn with_objective(mut self, objective: QuestObjective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_reward(mut self, reward: QuestReward) -> Self {
        self.reward = reward;
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.objectives.is_empty() && self.objectives.iter().all(QuestObjective::is_complete)
    }

    /// Advance matching objectives. Returns true when the action moved any
    /// progress; flips the status to Completed when all objectives finish.
    pub fn apply_action(&mut self, action: &QuestAction) -> bool {
        if self.status != QuestStatus::Active {
            return false;
        }
        let mut advanced = false;
        for objective in &mut self.objectives {
            if !objective.is_complete() && objective.matches(action) {
                objective.progress += 1;
                advanced = true;
            }
        }
        if advanced && self.is_complete() {
            self.status = QuestStatus::Completed;
        }
        advanced
    }

    /// Claim the reward. Only valid from Completed.
    pub fn claim(&mut self) -> bool {
        if self.status != QuestStatus::Completed {
            return false;
        }
        self.status = QuestStatus::Claimed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill_quest() -> Quest {
        Quest::new("Rat Problem", "Clear the cellar").with_objective(QuestObjective::new(
            ObjectiveKind::KillNpc {
                npc_name: "Cellar Rat".into(),
            },
            2,
        ))
    }

    fn kill_action() -> QuestAction {
        QuestAction::KilledNpc {
            npc: EntityId::new(),
            npc_name: "Cellar Rat".into(),
        }
    }

    #[test]
    fn test_progress_and_completion() {
        let mut quest = kill_quest();
        assert!(quest.apply_action(&kill_action()));
        assert_eq!(quest.status, QuestStatus::Active);
        assert!(quest.apply_action(&kill_action()));
        assert_eq!(quest.status, QuestStatus::Completed);
        // completed quests ignore further actions
        assert!(!quest.apply_action(&kill_action()));
    }

    #[test]
    fn test_unrelated_action_ignored() {
        let mut quest = kill_quest();
        let other = QuestAction::KilledNpc {
            npc: EntityId::new(),
            npc_name: "Harmless Slime".into(),
        };
        assert!(!quest.apply_action(&other));
    }

    #[test]
    fn test_claim_requires_completion() {
        let mut quest = kill_quest();
        assert!(!quest.claim());
        quest.apply_action(&kill_action());
        quest.apply_action(&kill_action());
        assert!(quest.claim());
        assert_eq!(quest.status, QuestStatus::Claimed);
        assert!(!quest.claim());
    }
}
