//! Inventory component (item model V2)
//!
//! Maintains the weight invariant (`currentWeight <= capacityWeight` after
//! every mutation - violating mutations fail with `Overweight`), the equip
//! slot map (equipped ids are always a subset of held items), and gold.
//!
//! Weight comes from templates, which live in the engine's catalog; weighing
//! operations take a resolver closure so this component stays free of I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::item::{EquipSlot, ItemInstance, ItemTemplateId};
use crate::{GameError, GameResult, ItemInstanceId};

/// Default carry capacity in kilograms
pub const DEFAULT_CAPACITY_KG: f32 = 50.0;

/// Items, equipment, and gold carried by one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryComponent {
    items: Vec<ItemInstance>,
    equipped: BTreeMap<EquipSlot, ItemInstanceId>,
    gold: i64,
    capacity_weight_kg: f32,
}

impl InventoryComponent {
    pub fn new(capacity_weight_kg: f32) -> Self {
        Self {
            items: Vec::new(),
            equipped: BTreeMap::new(),
            gold: 0,
            capacity_weight_kg,
        }
    }

    // Read accessors
    pub fn items(&self) -> &[ItemInstance] {
        &self.items
    }

    pub fn gold(&self) -> i64 {
        self.gold
    }

    pub fn capacity_weight_kg(&self) -> f32 {
        self.capacity_weight_kg
    }

    pub fn get(&self, id: ItemInstanceId) -> Option<&ItemInstance> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: ItemInstanceId) -> Option<&mut ItemInstance> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// First held instance of a template
    pub fn find_by_template(&self, template_id: &ItemTemplateId) -> Option<&ItemInstance> {
        self.items.iter().find(|i| &i.template_id == template_id)
    }

    pub fn has_template(&self, template_id: &ItemTemplateId) -> bool {
        self.find_by_template(template_id).is_some()
    }

    pub fn equipped(&self) -> &BTreeMap<EquipSlot, ItemInstanceId> {
        &self.equipped
    }

    pub fn equipped_in(&self, slot: EquipSlot) -> Option<&ItemInstance> {
        let id = self.equipped.get(&slot)?;
        self.get(*id)
    }

    pub fn is_equipped(&self, id: ItemInstanceId) -> bool {
        self.equipped.values().any(|e| *e == id)
    }

    /// Total carried weight under the given per-unit template weights
    pub fn current_weight(&self, weigh: impl Fn(&ItemTemplateId) -> f32) -> f32 {
        self.items
            .iter()
            .map(|i| weigh(&i.template_id) * i.quantity as f32)
            .sum()
    }

    // Mutators

    /// Add an instance, stacking onto an identical-template same-quality
    /// uncharged stack when possible. Fails with `Overweight` when the
    /// addition would exceed capacity.
    pub fn add(
        &mut self,
        instance: ItemInstance,
        weigh: impl Fn(&ItemTemplateId) -> f32,
    ) -> GameResult<()> {
        let added = weigh(&instance.template_id) * instance.quantity as f32;
        if self.current_weight(&weigh) + added > self.capacity_weight_kg {
            return Err(GameError::Overweight);
        }

        let stackable = instance.charges.is_none();
        if stackable {
            if let Some(stack) = self.items.iter_mut().find(|i| {
                i.template_id == instance.template_id
                    && i.quality == instance.quality
                    && i.charges.is_none()
            }) {
                stack.quantity += instance.quantity;
                return Ok(());
            }
        }
        self.items.push(instance);
        Ok(())
    }

    /// Remove one whole instance. Unequips it first if necessary.
    pub fn remove(&mut self, id: ItemInstanceId) -> GameResult<ItemInstance> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| GameError::not_found("ItemInstance", id))?;
        self.equipped.retain(|_, equipped| *equipped != id);
        Ok(self.items.remove(index))
    }

    /// Decrement a stack by `count`, removing it when it reaches zero
    pub fn consume(&mut self, id: ItemInstanceId, count: u32) -> GameResult<()> {
        let instance = self
            .get_mut(id)
            .ok_or_else(|| GameError::not_found("ItemInstance", id))?;
        if instance.quantity < count {
            return Err(GameError::condition("not enough of that item"));
        }
        instance.quantity -= count;
        if instance.quantity == 0 {
            self.remove(id)?;
        }
        Ok(())
    }

    /// Equip a held instance into a slot. `template_slot` is the slot the
    /// item's template allows; mismatches fail with `Invalid`. An occupied
    /// slot swaps: the previous occupant stays in the bag. Returns the
    /// displaced instance id, if any.
    pub fn equip(
        &mut self,
        id: ItemInstanceId,
        slot: EquipSlot,
        template_slot: Option<EquipSlot>,
    ) -> GameResult<Option<ItemInstanceId>> {
        if self.get(id).is_none() {
            return Err(GameError::not_found("ItemInstance", id));
        }
        match template_slot {
            Some(allowed) if allowed == slot => {}
            Some(allowed) => {
                return Err(GameError::invalid(format!(
                    "that goes in the {allowed}, not the {slot}"
                )))
            }
            None => return Err(GameError::invalid("that item cannot be equipped")),
        }
        let displaced = self.equipped.insert(slot, id);
        Ok(displaced)
    }

    /// Unequip a slot; the item remains in the bag. Round-trips with `equip`.
    pub fn unequip(&mut self, slot: EquipSlot) -> GameResult<ItemInstanceId> {
        self.equipped
            .remove(&slot)
            .ok_or_else(|| GameError::condition(format!("nothing equipped on {slot}")))
    }

    pub fn add_gold(&mut self, amount: i64) {
        self.gold += amount.max(0);
    }

    pub fn spend_gold(&mut self, amount: i64) -> GameResult<()> {
        if amount < 0 {
            return Err(GameError::invalid("negative gold amount"));
        }
        if self.gold < amount {
            return Err(GameError::condition("not enough gold"));
        }
        self.gold -= amount;
        Ok(())
    }

    /// Repository hydration
    pub fn from_parts(
        items: Vec<ItemInstance>,
        equipped: BTreeMap<EquipSlot, ItemInstanceId>,
        gold: i64,
        capacity_weight_kg: f32,
    ) -> Self {
        Self {
            items,
            equipped,
            gold,
            capacity_weight_kg,
        }
    }
}

impl Default for InventoryComponent {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_KG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_weight(_: &ItemTemplateId) -> f32 {
        2.0
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut inv = InventoryComponent::new(5.0);
        assert!(inv.add(ItemInstance::new("rock", 5), flat_weight).is_ok());
        assert!(inv.add(ItemInstance::new("rock", 5), flat_weight).is_ok());
        // third 2kg rock would hit 6kg > 5kg
        assert_eq!(
            inv.add(ItemInstance::new("rock", 5), flat_weight),
            Err(GameError::Overweight)
        );
        assert!(inv.current_weight(flat_weight) <= inv.capacity_weight_kg());
    }

    #[test]
    fn test_stacking_same_template_and_quality() {
        let mut inv = InventoryComponent::new(100.0);
        inv.add(ItemInstance::new("arrow", 5), flat_weight).expect("add");
        inv.add(ItemInstance::new("arrow", 5), flat_weight).expect("add");
        inv.add(ItemInstance::new("arrow", 7), flat_weight).expect("add");
        assert_eq!(inv.items().len(), 2);
        assert_eq!(inv.items()[0].quantity, 2);
    }

    #[test]
    fn test_equip_unequip_roundtrip() {
        let mut inv = InventoryComponent::new(100.0);
        let sword = ItemInstance::new("iron_sword", 7);
        let id = sword.id;
        inv.add(sword, flat_weight).expect("add");

        let displaced = inv
            .equip(id, EquipSlot::HandsMain, Some(EquipSlot::HandsMain))
            .expect("equip");
        assert_eq!(displaced, None);
        assert!(inv.is_equipped(id));

        let unequipped = inv.unequip(EquipSlot::HandsMain).expect("unequip");
        assert_eq!(unequipped, id);
        assert!(inv.get(id).is_some());
        assert!(!inv.is_equipped(id));
    }

    #[test]
    fn test_equip_slot_mismatch() {
        let mut inv = InventoryComponent::new(100.0);
        let helm = ItemInstance::new("iron_helm", 5);
        let id = helm.id;
        inv.add(helm, flat_weight).expect("add");
        let result = inv.equip(id, EquipSlot::HandsMain, Some(EquipSlot::Head));
        assert!(matches!(result, Err(GameError::Invalid(_))));
    }

    #[test]
    fn test_equip_swaps_occupied_slot() {
        let mut inv = InventoryComponent::new(100.0);
        let first = ItemInstance::new("iron_sword", 5);
        let second = ItemInstance::new("steel_sword", 8);
        let (a, b) = (first.id, second.id);
        inv.add(first, flat_weight).expect("add");
        inv.add(second, flat_weight).expect("add");

        inv.equip(a, EquipSlot::HandsMain, Some(EquipSlot::HandsMain)).expect("equip");
        let displaced = inv
            .equip(b, EquipSlot::HandsMain, Some(EquipSlot::HandsMain))
            .expect("equip");
        assert_eq!(displaced, Some(a));
        // displaced item stays in the bag
        assert!(inv.get(a).is_some());
        assert!(!inv.is_equipped(a));
    }

    #[test]
    fn test_remove_unequips() {
        let mut inv = InventoryComponent::new(100.0);
        let sword = ItemInstance::new("iron_sword", 7);
        let id = sword.id;
        inv.add(sword, flat_weight).expect("add");
        inv.equip(id, EquipSlot::HandsMain, Some(EquipSlot::HandsMain)).expect("equip");

        inv.remove(id).expect("remove");
        assert!(inv.equipped().is_empty());
    }

    #[test]
    fn test_gold() {
        let mut inv = InventoryComponent::default();
        inv.add_gold(100);
        assert!(inv.spend_gold(60).is_ok());
        assert_eq!(inv.gold(), 40);
        assert!(matches!(inv.spend_gold(60), Err(GameError::ConditionNotMet(_))));
    }

    #[test]
    fn test_consume_stack() {
        let mut inv = InventoryComponent::new(100.0);
        let arrows = ItemInstance::new("arrow", 5).with_quantity(3);
        let id = arrows.id;
        inv.add(arrows, flat_weight).expect("add");
        inv.consume(id, 2).expect("consume");
        assert_eq!(inv.get(id).map(|i| i.quantity), Some(1));
        inv.consume(id, 1).expect("consume");
        assert!(inv.get(id).is_none());
    }
}
