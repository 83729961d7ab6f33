//! Player death artifacts
//!
//! A corpse freezes the inventory, equipment, and gold at the moment of
//! death. Created exactly once per death, deleted on loot or decay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::item::{EquipSlot, ItemInstance};
use crate::{ChunkId, CorpseId, EntityId, ItemInstanceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpse {
    id: CorpseId,
    pub player_id: EntityId,
    pub space_id: ChunkId,
    /// Frozen snapshot of held items
    pub items: Vec<ItemInstance>,
    /// Frozen snapshot of the equip map
    pub equipped: BTreeMap<EquipSlot, ItemInstanceId>,
    pub gold: i64,
    /// Monotonic world tick after which the corpse decays
    pub decay_at_tick: u64,
    pub looted: bool,
}

impl Corpse {
    pub fn new(
        player_id: EntityId,
        space_id: ChunkId,
        items: Vec<ItemInstance>,
        equipped: BTreeMap<EquipSlot, ItemInstanceId>,
        gold: i64,
        decay_at_tick: u64,
    ) -> Self {
        Self {
            id: CorpseId::new(),
            player_id,
            space_id,
            items,
            equipped,
            gold,
            decay_at_tick,
            looted: false,
        }
    }

    pub fn id(&self) -> CorpseId {
        self.id
    }

    pub fn with_id(mut self, id: CorpseId) -> Self {
        self.id = id;
        self
    }

    pub fn is_decayed(&self, now_tick: u64) -> bool {
        now_tick >= self.decay_at_tick
    }

    /// Drain the snapshot for looting; marks the corpse looted.
    pub fn loot(&mut self) -> (Vec<ItemInstance>, i64) {
        self.looted = true;
        let gold = self.gold;
        self.gold = 0;
        (std::mem::take(&mut self.items), gold)
    }
}
