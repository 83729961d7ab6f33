//! Sealed event unions
//!
//! All switches over these enums must be exhaustive; adding a variant is a
//! compile-time broadcast to every handler.

mod game_events;
mod skill_events;
mod social_events;

pub use game_events::{EventStamp, GameEvent, StampedEvent, SystemLevel};
pub use skill_events::{SkillEvent, UnlockMethod};
pub use social_events::{QuestAction, SocialEventKind};
