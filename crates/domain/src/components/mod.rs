//! Typed attribute bag components
//!
//! The closed set of component kinds. Callers discover a component through
//! [`crate::Entity::component`] and pattern-match on the concrete variant;
//! there is no downcasting outside this enum.

mod combat;
mod inventory;
mod knowledge;
mod skill;
mod social;
mod trading;

pub use combat::{CombatComponent, CombatState};
pub use inventory::InventoryComponent;
pub use knowledge::{KnowledgeComponent, KnowledgeEntry};
pub use skill::{
    xp_to_next, ResourcePool, ResourceType, SkillBuff, SkillComponent, SkillState,
    PERK_MILESTONE_INTERVAL,
};
pub use social::{SocialChallenge, SocialChallengeKind, SocialComponent, SocialEventRecord};
pub use trading::TradingComponent;

use serde::{Deserialize, Serialize};

use crate::entities::graph::GraphNode;
use crate::entities::space::SpaceProperties;

/// Closed set of component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Social,
    Combat,
    Inventory,
    Trading,
    GraphNode,
    SpaceProperties,
    Skill,
    Knowledge,
}

/// A component value, tagged by kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Component {
    Social(SocialComponent),
    Combat(CombatComponent),
    Inventory(InventoryComponent),
    Trading(TradingComponent),
    GraphNode(GraphNode),
    SpaceProperties(SpaceProperties),
    Skill(SkillComponent),
    Knowledge(KnowledgeComponent),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Social(_) => ComponentKind::Social,
            Self::Combat(_) => ComponentKind::Combat,
            Self::Inventory(_) => ComponentKind::Inventory,
            Self::Trading(_) => ComponentKind::Trading,
            Self::GraphNode(_) => ComponentKind::GraphNode,
            Self::SpaceProperties(_) => ComponentKind::SpaceProperties,
            Self::Skill(_) => ComponentKind::Skill,
            Self::Knowledge(_) => ComponentKind::Knowledge,
        }
    }

    pub fn as_social(&self) -> Option<&SocialComponent> {
        match self {
            Self::Social(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_social_mut(&mut self) -> Option<&mut SocialComponent> {
        match self {
            Self::Social(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_combat(&self) -> Option<&CombatComponent> {
        match self {
            Self::Combat(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_combat_mut(&mut self) -> Option<&mut CombatComponent> {
        match self {
            Self::Combat(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_inventory(&self) -> Option<&InventoryComponent> {
        match self {
            Self::Inventory(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_inventory_mut(&mut self) -> Option<&mut InventoryComponent> {
        match self {
            Self::Inventory(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_trading(&self) -> Option<&TradingComponent> {
        match self {
            Self::Trading(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_trading_mut(&mut self) -> Option<&mut TradingComponent> {
        match self {
            Self::Trading(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_skill(&self) -> Option<&SkillComponent> {
        match self {
            Self::Skill(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_skill_mut(&mut self) -> Option<&mut SkillComponent> {
        match self {
            Self::Skill(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_knowledge(&self) -> Option<&KnowledgeComponent> {
        match self {
            Self::Knowledge(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_knowledge_mut(&mut self) -> Option<&mut KnowledgeComponent> {
        match self {
            Self::Knowledge(c) => Some(c),
            _ => None,
        }
    }
}
