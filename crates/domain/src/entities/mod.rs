//! Domain entities

pub mod chunk;
pub mod corpse;
pub mod entity;
pub mod graph;
pub mod item;
pub mod player;
pub mod quest;
pub mod space;
pub mod treasure;

pub use chunk::{ChunkLevel, WorldChunk, WorldSeed};
pub use corpse::Corpse;
pub use entity::{Entity, EntityKind};
pub use graph::{GraphEdge, GraphNode, NodeType};
pub use item::{EquipSlot, ItemInstance, ItemTemplate, ItemTemplateId, Rarity};
pub use player::{Ability, AbilityScores, PlayerState};
pub use quest::{ObjectiveKind, Quest, QuestObjective, QuestReward, QuestStatus};
pub use space::{Exit, ExitCondition, ResourceNode, SpaceProperties, Terrain, Trap};
pub use treasure::{Pedestal, PedestalState, TreasureRoom};
