//! Delver Engine - world generation, persistence, and the game loop
//!
//! The engine drives a persistent, procedurally generated underground world:
//! lazy hierarchical generation over a SQLite world database, a two-layer
//! intent pipeline with an LLM fallback, turn-based combat, use-based skill
//! progression, NPC disposition and knowledge, and a persistence coordinator
//! with autosave.

pub mod catalog;
pub mod combat;
pub mod config;
pub mod coordinator;
pub mod events;
pub(crate) mod handlers;
pub mod intent;
pub mod items;
pub mod llm;
pub mod nav;
pub mod persistence;
pub mod rag;
pub mod skills;
pub mod social;
pub mod store;
pub mod world;
pub mod worldgen;

pub use catalog::ItemCatalog;
pub use config::GameConfig;
pub use coordinator::{AutosavePolicy, DEFAULT_SAVE, SCHEMA_VERSION};
pub use events::EventBus;
pub use intent::{parse_intent, Intent};
pub use llm::{ChatRequest, ChatResponse, LlmPort, OpenAiClient, StubLlm};
pub use persistence::Database;
pub use rag::MemoryStore;
pub use store::EntityStore;
pub use world::World;
