//! Player state
//!
//! Carries both the legacy flat fields (single weapon/armor bonus, template
//! list inventory) and the V2 inventory component; combat reads V2 equipment
//! first and falls back to legacy bonuses.

use serde::{Deserialize, Serialize};

use crate::components::{CombatState, InventoryComponent, SkillComponent};
use crate::entities::item::ItemTemplateId;
use crate::{ChunkId, EntityId, QuestId};

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

/// Named ability, used by checks and exit conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl Ability {
    /// Parse "STR", "wisdom", etc. None for skill names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "STR" | "STRENGTH" => Some(Self::Str),
            "DEX" | "DEXTERITY" => Some(Self::Dex),
            "CON" | "CONSTITUTION" => Some(Self::Con),
            "INT" | "INTELLIGENCE" => Some(Self::Int),
            "WIS" | "WISDOM" => Some(Self::Wis),
            "CHA" | "CHARISMA" => Some(Self::Cha),
            _ => None,
        }
    }
}

impl AbilityScores {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.strength,
            Ability::Dex => self.dexterity,
            Ability::Con => self.constitution,
            Ability::Int => self.intelligence,
            Ability::Wis => self.wisdom,
            Ability::Cha => self.charisma,
        }
    }

    /// Standard derived modifier: floor((score - 10) / 2)
    pub fn modifier(&self, ability: Ability) -> i32 {
        (self.score(ability) - 10).div_euclid(2)
    }
}

/// Full state of one player
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    id: EntityId,
    pub name: String,
    pub space_id: ChunkId,
    pub health: i32,
    pub max_health: i32,
    pub abilities: AbilityScores,
    /// Legacy inventory, superseded by `inventory`
    pub legacy_inventory: Vec<ItemTemplateId>,
    /// Legacy flat bonuses, used when no V2 instance is equipped
    pub legacy_weapon_bonus: i32,
    pub legacy_armor_defense: i32,
    pub inventory: InventoryComponent,
    pub experience: u64,
    pub active_quests: Vec<QuestId>,
    pub available_quests: Vec<QuestId>,
    /// Present iff the player is engaged
    pub combat: Option<CombatState>,
    pub last_conversation_partner: Option<EntityId>,
    pub skills: SkillComponent,
}

impl PlayerState {
    pub fn new(name: impl Into<String>, space_id: ChunkId) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            space_id,
            health: 100,
            max_health: 100,
            abilities: AbilityScores::default(),
            legacy_inventory: Vec::new(),
            legacy_weapon_bonus: 0,
            legacy_armor_defense: 0,
            inventory: InventoryComponent::default(),
            experience: 0,
            active_quests: Vec::new(),
            available_quests: Vec::new(),
            combat: None,
            last_conversation_partner: None,
            skills: SkillComponent::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn in_combat(&self) -> bool {
        matches!(self.combat, Some(CombatState::InCombat { .. }))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers() {
        let abilities = AbilityScores {
            strength: 16,
            dexterity: 9,
            constitution: 10,
            intelligence: 7,
            wisdom: 12,
            charisma: 18,
        };
        assert_eq!(abilities.modifier(Ability::Str), 3);
        assert_eq!(abilities.modifier(Ability::Dex), -1);
        assert_eq!(abilities.modifier(Ability::Con), 0);
        assert_eq!(abilities.modifier(Ability::Int), -2);
        assert_eq!(abilities.modifier(Ability::Wis), 1);
        assert_eq!(abilities.modifier(Ability::Cha), 4);
    }

    #[test]
    fn test_ability_parse() {
        assert_eq!(Ability::parse("wis"), Some(Ability::Wis));
        assert_eq!(Ability::parse("Strength"), Some(Ability::Str));
        assert_eq!(Ability::parse("Perception"), None);
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let mut player = PlayerState::new("Tavi", ChunkId::new());
        player.take_damage(250);
        assert_eq!(player.health, 0);
        assert!(player.is_dead());
    }

    #[test]
    fn test_not_in_combat_by_default() {
        let player = PlayerState::new("Tavi", ChunkId::new());
        assert!(!player.in_combat());
    }
}
