//! Combat component: hit points, base stats, and the per-combatant state machine
//!
//! An entity is in combat iff its combat component is present and in the
//! `InCombat` state. NPCs carry the component from spawn (holding their hit
//! points); terminal states record how the last engagement ended.

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Per-combatant state machine: Idle -> InCombat -> (Victor | Defeated | Fled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum CombatState {
    Idle,
    InCombat { opponent: EntityId },
    Victor,
    Defeated,
    Fled,
}

impl CombatState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Victor | Self::Defeated | Self::Fled)
    }

    pub fn opponent(&self) -> Option<EntityId> {
        match self {
            Self::InCombat { opponent } => Some(*opponent),
            _ => None,
        }
    }
}

/// Combat stats and state for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatComponent {
    pub health: i32,
    pub max_health: i32,
    /// Legacy weapon bonus used when no V2 instance is equipped
    pub weapon_bonus: i32,
    /// Legacy armor defense used when no V2 instance is equipped
    pub armor_defense: i32,
    /// Initiative ordering in the space's turn queue
    pub initiative: i32,
    /// Bosses are immune to social de-escalation and respawn on zone reset
    pub is_boss: bool,
    state: CombatState,
}

impl CombatComponent {
    pub fn new(max_health: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            weapon_bonus: 0,
            armor_defense: 0,
            initiative: 0,
            is_boss: false,
            state: CombatState::Idle,
        }
    }

    pub fn boss(max_health: i32) -> Self {
        let mut component = Self::new(max_health);
        component.is_boss = true;
        component
    }

    pub fn with_weapon_bonus(mut self, bonus: i32) -> Self {
        self.weapon_bonus = bonus;
        self
    }

    pub fn with_armor_defense(mut self, defense: i32) -> Self {
        self.armor_defense = defense;
        self
    }

    pub fn state(&self) -> CombatState {
        self.state
    }

    /// In combat iff present and non-terminal
    pub fn in_combat(&self) -> bool {
        matches!(self.state, CombatState::InCombat { .. })
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn engage(&mut self, opponent: EntityId) {
        self.state = CombatState::InCombat { opponent };
    }

    pub fn resolve(&mut self, outcome: CombatState) {
        debug_assert!(outcome.is_terminal() || outcome == CombatState::Idle);
        self.state = outcome;
    }

    /// Apply damage, clamped at 0. Returns remaining health.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.health = (self.health - amount.max(0)).max(0);
        self.health
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health
    }
}
