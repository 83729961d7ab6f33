//! Delver Domain - core types, components, and invariants
//!
//! Pure data and rules: no I/O, no global state, no ambient entropy. The
//! engine crate owns persistence, generation, and the event loop; tests
//! instantiate these types directly.

pub mod components;
pub mod dice;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;

pub use components::{
    CombatComponent, CombatState, Component, ComponentKind, InventoryComponent,
    KnowledgeComponent, KnowledgeEntry, ResourcePool, ResourceType, SkillBuff, SkillComponent,
    SkillState, SocialChallenge, SocialChallengeKind, SocialComponent, SocialEventRecord,
    TradingComponent,
};
pub use dice::{roll_d100, roll_range, CheckOutcome, D20Roll};
pub use entities::{
    Ability, AbilityScores, ChunkLevel, Corpse, Entity, EntityKind, EquipSlot, Exit,
    ExitCondition, GraphEdge, GraphNode, ItemInstance, ItemTemplate, ItemTemplateId, NodeType,
    ObjectiveKind, Pedestal, PedestalState, PlayerState, Quest, QuestObjective, QuestReward,
    QuestStatus, Rarity, ResourceNode, SpaceProperties, Terrain, Trap, TreasureRoom, WorldChunk,
    WorldSeed,
};
pub use error::{GameError, GameResult};
pub use events::{
    EventStamp, GameEvent, QuestAction, SkillEvent, SocialEventKind, StampedEvent, SystemLevel,
    UnlockMethod,
};
pub use ids::{
    ChunkId, CorpseId, EntityId, GraphNodeId, ItemInstanceId, PedestalId, QuestId, TreasureRoomId,
};
