//! Space properties - the leaf chunks a player can stand in
//!
//! A space's `entities` list is the authoritative presence set; an entity is
//! in at most one space. Exits are one-directional as stored; the generator
//! produces reciprocal pairs where appropriate, but movement code must not
//! assume reciprocity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::item::{ItemInstance, ItemTemplateId};
use crate::{ChunkId, EntityId};

/// Terrain of a space, driving movement cost and risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    Normal,
    Difficult,
    Hazardous,
    Impassable,
}

impl Terrain {
    pub fn is_passable(&self) -> bool {
        !matches!(self, Self::Impassable)
    }
}

/// A trap placed in a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trap {
    pub id: String,
    pub trap_type: String,
    pub difficulty: u8,
    pub triggered: bool,
}

/// A harvestable resource node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: String,
    pub template_id: ItemTemplateId,
    pub quantity: u32,
    /// Ticks until the node refills after depletion, None = never
    pub respawn_ticks: Option<u64>,
}

/// A gate on an exit, evaluated against player state at traversal time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ExitCondition {
    /// Opposed roll through the skill engine
    SkillCheck { skill: String, dc: u8 },
    /// Template must be present in inventory at the moment of the check
    ItemRequired { template_id: ItemTemplateId },
    /// Space state flag must equal the value
    FlagEquals { flag: String, value: bool },
}

/// A named, conditional, possibly hidden edge out of a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exit {
    pub target: ChunkId,
    /// Arbitrary string: cardinal names and natural phrases both permitted
    pub direction: String,
    pub description: String,
    pub conditions: Vec<ExitCondition>,
    pub hidden: bool,
    /// Perception DC to notice the exit, present iff hidden
    pub hidden_difficulty: Option<u8>,
}

impl Exit {
    pub fn open(target: ChunkId, direction: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            target,
            direction: direction.into(),
            description: description.into(),
            conditions: Vec::new(),
            hidden: false,
            hidden_difficulty: None,
        }
    }

    pub fn hidden(mut self, difficulty: u8) -> Self {
        self.hidden = true;
        self.hidden_difficulty = Some(difficulty);
        self
    }

    pub fn with_condition(mut self, condition: ExitCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// State flag under which a successful perception reveals this exit
    pub fn reveal_flag(&self) -> String {
        let slug: String = self
            .direction
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("exit_{slug}_revealed")
    }
}

/// Properties attached to a SPACE chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceProperties {
    chunk_id: ChunkId,
    pub name: String,
    pub description: String,
    pub exits: Vec<Exit>,
    /// 0 = pitch black, 100 = daylight
    pub brightness: u8,
    pub terrain: Terrain,
    pub traps: Vec<Trap>,
    pub resources: Vec<ResourceNode>,
    /// Authoritative presence set
    entities: Vec<EntityId>,
    /// Items dropped on the floor
    pub dropped_items: Vec<ItemInstance>,
    /// Arbitrary boolean state flags (revealed exits, quest switches, ...)
    flags: BTreeMap<String, bool>,
    pub is_safe_zone: bool,
    pub is_treasure_room: bool,
}

impl SpaceProperties {
    pub fn new(chunk_id: ChunkId, name: impl Into<String>) -> Self {
        Self {
            chunk_id,
            name: name.into(),
            description: String::new(),
            exits: Vec::new(),
            brightness: 60,
            terrain: Terrain::Normal,
            traps: Vec::new(),
            resources: Vec::new(),
            entities: Vec::new(),
            dropped_items: Vec::new(),
            flags: BTreeMap::new(),
            is_safe_zone: false,
            is_treasure_room: false,
        }
    }

    /// Reconstruct from storage (database hydration)
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        chunk_id: ChunkId,
        name: String,
        description: String,
        exits: Vec<Exit>,
        brightness: u8,
        terrain: Terrain,
        traps: Vec<Trap>,
        resources: Vec<ResourceNode>,
        entities: Vec<EntityId>,
        dropped_items: Vec<ItemInstance>,
        flags: BTreeMap<String, bool>,
        is_safe_zone: bool,
        is_treasure_room: bool,
    ) -> Self {
        Self {
            chunk_id,
            name,
            description,
            exits,
            brightness,
            terrain,
            traps,
            resources,
            entities,
            dropped_items,
            flags,
            is_safe_zone,
            is_treasure_room,
        }
    }

    pub fn chunk_id(&self) -> ChunkId {
        self.chunk_id
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Replace the full flag map (repository hydration)
    pub fn set_flags(&mut self, flags: BTreeMap<String, bool>) {
        self.flags = flags;
    }

    pub fn add_entity(&mut self, id: EntityId) {
        if !self.entities.contains(&id) {
            self.entities.push(id);
        }
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.entities.retain(|e| *e != id);
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Exits visible without a perception roll: not hidden, or already revealed
    pub fn visible_exits(&self) -> impl Iterator<Item = &Exit> {
        self.exits
            .iter()
            .filter(|e| !e.hidden || self.flag(&e.reveal_flag()))
    }

    /// Hidden exits that have not yet been revealed
    pub fn unrevealed_exits(&self) -> impl Iterator<Item = &Exit> {
        self.exits
            .iter()
            .filter(|e| e.hidden && !self.flag(&e.reveal_flag()))
    }

    pub fn exit_in_direction(&self, direction: &str) -> Option<&Exit> {
        self.exits.iter().find(|e| e.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space_with_hidden_exit() -> SpaceProperties {
        let mut space = SpaceProperties::new(ChunkId::new(), "Dusty Hall");
        space
            .exits
            .push(Exit::open(ChunkId::new(), "north", "an open arch"));
        space.exits.push(
            Exit::open(ChunkId::new(), "hidden passage", "a crack in the wall").hidden(15),
        );
        space
    }

    #[test]
    fn test_hidden_exit_filtered_until_revealed() {
        let mut space = space_with_hidden_exit();
        assert_eq!(space.visible_exits().count(), 1);
        assert_eq!(space.unrevealed_exits().count(), 1);

        let flag = space.exits[1].reveal_flag();
        space.set_flag(flag, true);
        assert_eq!(space.visible_exits().count(), 2);
        assert_eq!(space.unrevealed_exits().count(), 0);
    }

    #[test]
    fn test_reveal_flag_slug() {
        let exit = Exit::open(ChunkId::new(), "hidden passage", "").hidden(15);
        assert_eq!(exit.reveal_flag(), "exit_hidden_passage_revealed");
    }

    #[test]
    fn test_presence_set_deduplicates() {
        let mut space = SpaceProperties::new(ChunkId::new(), "Cell");
        let id = EntityId::new();
        space.add_entity(id);
        space.add_entity(id);
        assert_eq!(space.entities().len(), 1);
        space.remove_entity(id);
        assert!(!space.contains_entity(id));
    }

    #[test]
    fn test_terrain_passability() {
        assert!(Terrain::Normal.is_passable());
        assert!(Terrain::Hazardous.is_passable());
        assert!(!Terrain::Impassable.is_passable());
    }
}
