//! Item templates and instances
//!
//! Templates are immutable and shared (authored content, loot tables);
//! instances are the things a player actually holds, with quality, charges,
//! and stack quantity. Numeric stats live in the template `properties` map as
//! strings and are parsed on read; effective bonuses scale by instance
//! quality.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ItemInstanceId;

/// String key of an item template (e.g., "iron_sword")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTemplateId(String);

impl ItemTemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemTemplateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemTemplateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Closed set of equipment slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipSlot {
    HandsMain,
    HandsOff,
    Head,
    Chest,
    Legs,
    Feet,
    Back,
    RingL,
    RingR,
    Neck,
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HandsMain => "main hand",
            Self::HandsOff => "off hand",
            Self::Head => "head",
            Self::Chest => "chest",
            Self::Legs => "legs",
            Self::Feet => "feet",
            Self::Back => "back",
            Self::RingL => "left ring",
            Self::RingR => "right ring",
            Self::Neck => "neck",
        };
        write!(f, "{name}")
    }
}

/// Item rarity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Default for Rarity {
    fn default() -> Self {
        Self::Common
    }
}

/// Immutable, shared item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    id: ItemTemplateId,
    name: String,
    /// Coarse kind (e.g., "weapon", "armor", "consumable", "key", "material")
    item_type: String,
    /// Behavior tags driving use dispatch ("flammable", "light_source", ...)
    tags: Vec<String>,
    /// Free-form stats as strings, parsed on read ("damage" -> "10")
    properties: BTreeMap<String, String>,
    rarity: Rarity,
    description: String,
    equip_slot: Option<EquipSlot>,
}

impl ItemTemplate {
    pub fn new(id: impl Into<ItemTemplateId>, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: item_type.into(),
            tags: Vec::new(),
            properties: BTreeMap::new(),
            rarity: Rarity::Common,
            description: String::new(),
            equip_slot: None,
        }
    }

    // Read accessors
    pub fn id(&self) -> &ItemTemplateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn equip_slot(&self) -> Option<EquipSlot> {
        self.equip_slot
    }

    /// Parse a numeric property, None when absent or malformed
    pub fn numeric_property(&self, key: &str) -> Option<f32> {
        self.properties.get(key).and_then(|v| v.parse().ok())
    }

    /// Base weapon damage bonus, 0 when the template has none
    pub fn damage_bonus(&self) -> i32 {
        self.numeric_property("damage").unwrap_or(0.0) as i32
    }

    /// Base armor defense, 0 when the template has none
    pub fn armor_defense(&self) -> i32 {
        self.numeric_property("defense").unwrap_or(0.0) as i32
    }

    /// Weight of one unit in kilograms
    pub fn weight_kg(&self) -> f32 {
        self.numeric_property("weight_kg").unwrap_or(0.5)
    }

    /// Base value in gold
    pub fn base_value(&self) -> i64 {
        self.numeric_property("value").unwrap_or(1.0) as i64
    }

    // Builder methods
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_equip_slot(mut self, slot: EquipSlot) -> Self {
        self.equip_slot = Some(slot);
        self
    }
}

/// A concrete item held somewhere in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    pub id: ItemInstanceId,
    pub template_id: ItemTemplateId,
    /// Craft/drop quality, clamped to 1..=10
    pub quality: u8,
    /// Remaining uses for charged items
    pub charges: Option<u32>,
    pub quantity: u32,
}

impl ItemInstance {
    pub fn new(template_id: impl Into<ItemTemplateId>, quality: u8) -> Self {
        Self {
            id: ItemInstanceId::new(),
            template_id: template_id.into(),
            quality: quality.clamp(1, 10),
            charges: None,
            quantity: 1,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    pub fn with_charges(mut self, charges: u32) -> Self {
        self.charges = Some(charges);
        self
    }

    /// Quality scalar applied to template bonuses (quality 7 -> 0.7)
    pub fn quality_scalar(&self) -> f32 {
        f32::from(self.quality) / 10.0
    }

    /// Effective weapon bonus: template damage x quality scalar
    pub fn effective_damage_bonus(&self, template: &ItemTemplate) -> i32 {
        (template.damage_bonus() as f32 * self.quality_scalar()).round() as i32
    }

    /// Effective armor defense: template defense x quality scalar
    pub fn effective_armor_defense(&self, template: &ItemTemplate) -> i32 {
        (template.armor_defense() as f32 * self.quality_scalar()).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword() -> ItemTemplate {
        ItemTemplate::new("iron_sword", "Iron Sword", "weapon")
            .with_property("damage", "10")
            .with_property("weight_kg", "3.0")
            .with_equip_slot(EquipSlot::HandsMain)
            .with_tag("sharp")
    }

    #[test]
    fn test_quality_scales_damage() {
        let template = sword();
        let instance = ItemInstance::new("iron_sword", 7);
        // 10 x 0.7 = 7
        assert_eq!(instance.effective_damage_bonus(&template), 7);
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(ItemInstance::new("x", 0).quality, 1);
        assert_eq!(ItemInstance::new("x", 14).quality, 10);
    }

    #[test]
    fn test_numeric_property_malformed() {
        let template = ItemTemplate::new("torch", "Torch", "tool").with_property("damage", "lots");
        assert_eq!(template.numeric_property("damage"), None);
        assert_eq!(template.damage_bonus(), 0);
    }

    #[test]
    fn test_tags() {
        let template = sword();
        assert!(template.has_tag("sharp"));
        assert!(!template.has_tag("flammable"));
    }

    #[test]
    fn test_default_weight() {
        let template = ItemTemplate::new("pebble", "Pebble", "junk");
        assert_eq!(template.weight_kg(), 0.5);
    }
}
