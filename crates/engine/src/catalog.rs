//! Item template catalog
//!
//! The authored template set shared by loot tables, crafting, and merchants.
//! Loaded into memory at world start and persisted through the item
//! repository so saves are self-describing.

use std::collections::HashMap;

use delver_domain::{EquipSlot, GameError, GameResult, ItemTemplate, ItemTemplateId, Rarity};

/// Immutable template lookup
pub struct ItemCatalog {
    templates: HashMap<ItemTemplateId, ItemTemplate>,
}

impl ItemCatalog {
    pub fn from_templates(templates: Vec<ItemTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.id().clone(), t))
                .collect(),
        }
    }

    /// The built-in authored set
    pub fn builtin() -> Self {
        Self::from_templates(builtin_templates())
    }

    pub fn get(&self, id: &ItemTemplateId) -> Option<&ItemTemplate> {
        self.templates.get(id)
    }

    pub fn require(&self, id: &ItemTemplateId) -> GameResult<&ItemTemplate> {
        self.get(id)
            .ok_or_else(|| GameError::not_found("ItemTemplate", id))
    }

    pub fn weight_of(&self, id: &ItemTemplateId) -> f32 {
        self.get(id).map(|t| t.weight_kg()).unwrap_or(0.5)
    }

    pub fn templates(&self) -> impl Iterator<Item = &ItemTemplate> {
        self.templates.values()
    }

    /// Find a template by (case-insensitive) display name or id
    pub fn find_by_name(&self, name: &str) -> Option<&ItemTemplate> {
        let lowered = name.to_lowercase();
        self.templates
            .values()
            .find(|t| t.name().to_lowercase() == lowered || t.id().as_str() == lowered)
    }
}

fn builtin_templates() -> Vec<ItemTemplate> {
    vec![
        // Weapons
        ItemTemplate::new("rusty_dagger", "Rusty Dagger", "weapon")
            .with_description("More tetanus than threat.")
            .with_property("damage", "4")
            .with_property("weight_kg", "0.8")
            .with_property("value", "3")
            .with_tag("sharp")
            .with_equip_slot(EquipSlot::HandsMain),
        ItemTemplate::new("iron_sword", "Iron Sword", "weapon")
            .with_description("A plain, dependable blade.")
            .with_property("damage", "10")
            .with_property("weight_kg", "3.0")
            .with_property("value", "25")
            .with_tag("sharp")
            .with_rarity(Rarity::Uncommon)
            .with_equip_slot(EquipSlot::HandsMain),
        ItemTemplate::new("ember_blade", "Ember Blade", "weapon")
            .with_description("Heat shimmers along its edge.")
            .with_property("damage", "14")
            .with_property("weight_kg", "2.5")
            .with_property("value", "120")
            .with_tag("sharp")
            .with_tag("flammable")
            .with_rarity(Rarity::Rare)
            .with_equip_slot(EquipSlot::HandsMain),
        ItemTemplate::new("frost_axe", "Frost Axe", "weapon")
            .with_description("Rime never melts from the bit.")
            .with_property("damage", "13")
            .with_property("weight_kg", "4.0")
            .with_property("value", "110")
            .with_tag("sharp")
            .with_rarity(Rarity::Rare)
            .with_equip_slot(EquipSlot::HandsMain),
        ItemTemplate::new("bone_blade", "Bone Blade", "weapon")
            .with_description("Carved from one enormous femur.")
            .with_property("damage", "12")
            .with_property("weight_kg", "1.8")
            .with_property("value", "90")
            .with_tag("sharp")
            .with_rarity(Rarity::Rare)
            .with_equip_slot(EquipSlot::HandsMain),
        ItemTemplate::new("cudgel", "Cudgel", "weapon")
            .with_description("A length of hard wood.")
            .with_property("damage", "6")
            .with_property("weight_kg", "2.0")
            .with_property("value", "5")
            .with_tag("blunt")
            .with_equip_slot(EquipSlot::HandsMain),
        // Armor
        ItemTemplate::new("leather_jerkin", "Leather Jerkin", "armor")
            .with_description("Scuffed but serviceable.")
            .with_property("defense", "3")
            .with_property("weight_kg", "4.0")
            .with_property("value", "15")
            .with_equip_slot(EquipSlot::Chest),
        ItemTemplate::new("iron_helm", "Iron Helm", "armor")
            .with_description("Dented by a previous owner.")
            .with_property("defense", "2")
            .with_property("weight_kg", "2.5")
            .with_property("value", "18")
            .with_equip_slot(EquipSlot::Head),
        ItemTemplate::new("marrow_ring", "Marrow Ring", "armor")
            .with_description("Cold against the skin.")
            .with_property("defense", "1")
            .with_property("weight_kg", "0.1")
            .with_property("value", "75")
            .with_rarity(Rarity::Rare)
            .with_equip_slot(EquipSlot::RingL),
        // Tools and consumables
        ItemTemplate::new("torch", "Torch", "tool")
            .with_description("Pitch-soaked and ready.")
            .with_property("weight_kg", "1.0")
            .with_property("value", "2")
            .with_tag("light_source")
            .with_tag("flammable"),
        ItemTemplate::new("rope", "Hempen Rope", "tool")
            .with_description("Fifty feet, slightly frayed.")
            .with_property("weight_kg", "5.0")
            .with_property("value", "4")
            .with_tag("climbable"),
        ItemTemplate::new("healing_draught", "Healing Draught", "consumable")
            .with_description("Tastes of copper and mint.")
            .with_property("weight_kg", "0.3")
            .with_property("value", "20")
            .with_property("heal", "25")
            .with_tag("liquid")
            .with_tag("fragile"),
        ItemTemplate::new("smoke_bomb", "Smoke Bomb", "consumable")
            .with_description("A clay sphere with a short fuse.")
            .with_property("weight_kg", "0.4")
            .with_property("value", "12")
            .with_tag("throwable")
            .with_tag("explosive"),
        ItemTemplate::new("lockpick", "Lockpick", "tool")
            .with_description("Thin, springy steel.")
            .with_property("weight_kg", "0.1")
            .with_property("value", "8"),
        ItemTemplate::new("glow_moss", "Glow Moss", "material")
            .with_description("Faintly luminous clumps.")
            .with_property("weight_kg", "0.2")
            .with_property("value", "6")
            .with_tag("light_source"),
        ItemTemplate::new("iron_ore", "Iron Ore", "material")
            .with_description("Heavy, rust-streaked stone.")
            .with_property("weight_kg", "2.0")
            .with_property("value", "5"),
        ItemTemplate::new("trail_rations", "Trail Rations", "consumable")
            .with_description("Hard bread, harder cheese.")
            .with_property("weight_kg", "0.5")
            .with_property("value", "3")
            .with_property("heal", "5"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_well_formed() {
        let catalog = ItemCatalog::builtin();
        assert!(catalog.templates().count() >= 15);
        // every weapon has damage, every armor has defense
        for template in catalog.templates() {
            match template.item_type() {
                "weapon" => assert!(template.damage_bonus() > 0, "{}", template.id()),
                "armor" => assert!(template.armor_defense() > 0, "{}", template.id()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_find_by_name() {
        let catalog = ItemCatalog::builtin();
        assert!(catalog.find_by_name("Iron Sword").is_some());
        assert!(catalog.find_by_name("iron_sword").is_some());
        assert!(catalog.find_by_name("vorpal blade").is_none());
    }

    #[test]
    fn test_require_missing_is_not_found() {
        let catalog = ItemCatalog::builtin();
        let missing = ItemTemplateId::new("vorpal_blade");
        assert!(matches!(
            catalog.require(&missing),
            Err(GameError::NotFound { .. })
        ));
    }
}
