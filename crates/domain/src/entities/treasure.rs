//! Treasure rooms: one-shot pedestal rewards
//!
//! A treasure room presents a themed set of pedestals; the player may take
//! one item, which locks the remaining pedestals and marks the room looted.

use serde::{Deserialize, Serialize};

use crate::entities::item::ItemTemplateId;
use crate::{ChunkId, GameError, GameResult, PedestalId, TreasureRoomId};

/// Lifecycle of a single pedestal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PedestalState {
    Available,
    Locked,
    Empty,
}

/// One pedestal holding one offered item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pedestal {
    id: PedestalId,
    pub treasure_room_id: TreasureRoomId,
    pub item_template_id: ItemTemplateId,
    pub state: PedestalState,
    pub pedestal_index: u32,
    pub theme_description: String,
}

impl Pedestal {
    pub fn new(
        treasure_room_id: TreasureRoomId,
        item_template_id: ItemTemplateId,
        pedestal_index: u32,
        theme_description: impl Into<String>,
    ) -> Self {
        Self {
            id: PedestalId::new(),
            treasure_room_id,
            item_template_id,
            state: PedestalState::Available,
            pedestal_index,
            theme_description: theme_description.into(),
        }
    }

    pub fn id(&self) -> PedestalId {
        self.id
    }

    pub fn with_id(mut self, id: PedestalId) -> Self {
        self.id = id;
        self
    }
}

/// A space flagged to present pedestal items as a one-shot reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasureRoom {
    id: TreasureRoomId,
    pub space_id: ChunkId,
    pub room_type: String,
    pub biome_theme: String,
    /// Item currently lifted off a pedestal but not yet carried out
    pub currently_taken_item: Option<ItemTemplateId>,
    pub has_been_looted: bool,
    pub pedestals: Vec<Pedestal>,
}

impl TreasureRoom {
    pub fn new(space_id: ChunkId, room_type: impl Into<String>, biome_theme: impl Into<String>) -> Self {
        Self {
            id: TreasureRoomId::new(),
            space_id,
            room_type: room_type.into(),
            biome_theme: biome_theme.into(),
            currently_taken_item: None,
            has_been_looted: false,
            pedestals: Vec::new(),
        }
    }

    pub fn id(&self) -> TreasureRoomId {
        self.id
    }

    pub fn with_id(mut self, id: TreasureRoomId) -> Self {
        self.id = id;
        self
    }

    pub fn with_pedestal(mut self, pedestal: Pedestal) -> Self {
        self.pedestals.push(pedestal);
        self
    }

    /// Take the item from one pedestal. Empties it, locks the rest, and marks
    /// the room looted.
    pub fn take_from(&mut self, pedestal_index: u32) -> GameResult<ItemTemplateId> {
        if self.has_been_looted {
            return Err(GameError::condition("the treasure here is already claimed"));
        }
        let chosen = self
            .pedestals
            .iter_mut()
            .find(|p| p.pedestal_index == pedestal_index)
            .ok_or_else(|| GameError::not_found("Pedestal", pedestal_index))?;
        if chosen.state != PedestalState::Available {
            return Err(GameError::condition("that pedestal is sealed"));
        }
        chosen.state = PedestalState::Empty;
        let template = chosen.item_template_id.clone();

        for pedestal in &mut self.pedestals {
            if pedestal.state == PedestalState::Available {
                pedestal.state = PedestalState::Locked;
            }
        }
        self.has_been_looted = true;
        self.currently_taken_item = Some(template.clone());
        Ok(template)
    }
}
