//! Repository layer
//!
//! Durable reflection of world state over SQLite. Every method is a single
//! transaction and returns a structured error; foreign key and singleton
//! violations surface as failures, never panics.

mod chunks;
mod corpses;
mod database;
mod graph_nodes;
mod items;
mod skills;
mod spaces;
mod treasure_rooms;
mod world_seed;

pub use chunks::WorldChunkRepository;
pub use corpses::CorpseRepository;
pub use database::Database;
pub use graph_nodes::GraphNodeRepository;
pub use items::{ItemOwner, ItemRepository};
pub use skills::SkillRepository;
pub use spaces::SpacePropertiesRepository;
pub use treasure_rooms::TreasureRoomRepository;
pub use world_seed::WorldSeedRepository;
