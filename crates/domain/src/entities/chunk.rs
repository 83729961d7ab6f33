//! World chunk hierarchy
//!
//! Every location is a node in a tree of exactly five levels:
//! `WORLD ⊃ REGION ⊃ ZONE ⊃ SUBZONE ⊃ SPACE`. Chunks are created lazily by
//! the generator, persisted on creation, and never deleted. Parent/child and
//! adjacency links are id-to-id relations; the repository layer owns them,
//! there are no pointer cycles in memory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ChunkId, GameError, GameResult};

/// Level of a chunk in the world tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkLevel {
    World,
    Region,
    Zone,
    SubZone,
    Space,
}

impl ChunkLevel {
    /// Depth in the tree, WORLD = 0
    pub fn depth(&self) -> u8 {
        match self {
            Self::World => 0,
            Self::Region => 1,
            Self::Zone => 2,
            Self::SubZone => 3,
            Self::Space => 4,
        }
    }

    /// Level of this chunk's children, if any
    pub fn child_level(&self) -> Option<Self> {
        match self {
            Self::World => Some(Self::Region),
            Self::Region => Some(Self::Zone),
            Self::Zone => Some(Self::SubZone),
            Self::SubZone => Some(Self::Space),
            Self::Space => None,
        }
    }
}

impl std::fmt::Display for ChunkLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::World => write!(f, "WORLD"),
            Self::Region => write!(f, "REGION"),
            Self::Zone => write!(f, "ZONE"),
            Self::SubZone => write!(f, "SUBZONE"),
            Self::Space => write!(f, "SPACE"),
        }
    }
}

/// A node in the hierarchical world tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldChunk {
    id: ChunkId,
    level: ChunkLevel,
    /// Null only for WORLD
    parent: Option<ChunkId>,
    /// Ordered child identifiers
    children: Vec<ChunkId>,
    /// Freeform lore, expanded from ancestor lore by the LLM
    lore: String,
    biome_theme: String,
    /// Rough count of spaces this subtree should hold
    size_estimate: u32,
    /// Mob density, clamped to 0.0..=1.0
    mob_density: f32,
    /// Difficulty tier, clamped to 1..=20
    difficulty: u8,
    /// Inter-subtree travel: direction -> neighbor chunk id at the same level
    adjacency: BTreeMap<String, ChunkId>,
}

impl WorldChunk {
    pub fn new(level: ChunkLevel, parent: Option<ChunkId>) -> GameResult<Self> {
        if level == ChunkLevel::World && parent.is_some() {
            return Err(GameError::invalid("WORLD chunk cannot have a parent"));
        }
        if level != ChunkLevel::World && parent.is_none() {
            return Err(GameError::invalid(format!(
                "{level} chunk requires a parent"
            )));
        }
        Ok(Self {
            id: ChunkId::new(),
            level,
            parent,
            children: Vec::new(),
            lore: String::new(),
            biome_theme: String::new(),
            size_estimate: 0,
            mob_density: 0.0,
            difficulty: 1,
            adjacency: BTreeMap::new(),
        })
    }

    // Read accessors
    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn level(&self) -> ChunkLevel {
        self.level
    }

    pub fn parent(&self) -> Option<ChunkId> {
        self.parent
    }

    pub fn children(&self) -> &[ChunkId] {
        &self.children
    }

    pub fn lore(&self) -> &str {
        &self.lore
    }

    pub fn biome_theme(&self) -> &str {
        &self.biome_theme
    }

    pub fn size_estimate(&self) -> u32 {
        self.size_estimate
    }

    pub fn mob_density(&self) -> f32 {
        self.mob_density
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    pub fn adjacency(&self) -> &BTreeMap<String, ChunkId> {
        &self.adjacency
    }

    pub fn neighbor(&self, direction: &str) -> Option<ChunkId> {
        self.adjacency.get(direction).copied()
    }

    // Builder methods
    pub fn with_id(mut self, id: ChunkId) -> Self {
        self.id = id;
        self
    }

    pub fn with_lore(mut self, lore: impl Into<String>) -> Self {
        self.lore = lore.into();
        self
    }

    pub fn with_biome_theme(mut self, theme: impl Into<String>) -> Self {
        self.biome_theme = theme.into();
        self
    }

    pub fn with_size_estimate(mut self, estimate: u32) -> Self {
        self.size_estimate = estimate;
        self
    }

    pub fn with_mob_density(mut self, density: f32) -> Self {
        self.mob_density = density.clamp(0.0, 1.0);
        self
    }

    pub fn with_difficulty(mut self, tier: u8) -> Self {
        self.difficulty = tier.clamp(1, 20);
        self
    }

    // Mutators
    pub fn push_child(&mut self, child: ChunkId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn set_lore(&mut self, lore: impl Into<String>) {
        self.lore = lore.into();
    }

    pub fn link_neighbor(&mut self, direction: impl Into<String>, neighbor: ChunkId) {
        self.adjacency.insert(direction.into(), neighbor);
    }

    pub fn is_space(&self) -> bool {
        self.level == ChunkLevel::Space
    }
}

/// Singleton root of a world database: seed string, global lore, and the
/// space a new player starts in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSeed {
    pub seed: String,
    pub global_lore: String,
    pub starting_space: ChunkId,
}

impl WorldSeed {
    pub fn new(seed: impl Into<String>, global_lore: impl Into<String>, starting_space: ChunkId) -> Self {
        Self {
            seed: seed.into(),
            global_lore: global_lore.into(),
            starting_space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_chain() {
        assert_eq!(ChunkLevel::World.child_level(), Some(ChunkLevel::Region));
        assert_eq!(ChunkLevel::SubZone.child_level(), Some(ChunkLevel::Space));
        assert_eq!(ChunkLevel::Space.child_level(), None);
        assert_eq!(ChunkLevel::Space.depth(), 4);
    }

    #[test]
    fn test_world_chunk_rejects_parent() {
        assert!(WorldChunk::new(ChunkLevel::World, Some(ChunkId::new())).is_err());
        assert!(WorldChunk::new(ChunkLevel::World, None).is_ok());
    }

    #[test]
    fn test_non_world_chunk_requires_parent() {
        assert!(WorldChunk::new(ChunkLevel::Zone, None).is_err());
    }

    #[test]
    fn test_density_and_difficulty_clamped() {
        let parent = ChunkId::new();
        let chunk = WorldChunk::new(ChunkLevel::Zone, Some(parent))
            .expect("valid chunk")
            .with_mob_density(3.5)
            .with_difficulty(45);
        assert_eq!(chunk.mob_density(), 1.0);
        assert_eq!(chunk.difficulty(), 20);
    }

    #[test]
    fn test_push_child_deduplicates() {
        let mut chunk = WorldChunk::new(ChunkLevel::World, None).expect("valid chunk");
        let child = ChunkId::new();
        chunk.push_child(child);
        chunk.push_child(child);
        assert_eq!(chunk.children().len(), 1);
    }

    #[test]
    fn test_adjacency() {
        let mut chunk = WorldChunk::new(ChunkLevel::World, None).expect("valid chunk");
        let neighbor = ChunkId::new();
        chunk.link_neighbor("north", neighbor);
        assert_eq!(chunk.neighbor("north"), Some(neighbor));
        assert_eq!(chunk.neighbor("south"), None);
    }
}
