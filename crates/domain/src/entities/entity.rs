//! Polymorphic entities with typed attribute bags
//!
//! No open hierarchy: an entity is a kind tag plus a bag of components keyed
//! by the closed [`ComponentKind`] enum. Adding a component kind adds one
//! enum arm and one record type. Components are attached by replacement -
//! `with_component` consumes and returns a new entity, so readers holding a
//! snapshot keep seeing the old value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Component, ComponentKind};
use crate::{ChunkId, EntityId};

/// Entity variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Npc,
    /// Item instance placed in the world as its own entity
    Item,
    /// Scenery, harvestable, or container
    Feature,
}

/// A record with a stable identifier, display name, description, and a typed
/// attribute bag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    name: String,
    description: String,
    /// The SPACE chunk this entity stands in; None only during construction
    space_id: Option<ChunkId>,
    components: BTreeMap<ComponentKind, Component>,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            name: name.into(),
            description: String::new(),
            space_id: None,
            components: BTreeMap::new(),
        }
    }

    // Read accessors
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn space_id(&self) -> Option<ChunkId> {
        self.space_id
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.get_mut(&kind)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn component_kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    // Builder methods
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_space(mut self, space_id: ChunkId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    /// Attach by replacement: returns a new entity with the component set
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.insert(component.kind(), component);
        self
    }

    /// Detach by replacement: returns a new entity without the component
    pub fn without_component(mut self, kind: ComponentKind) -> Self {
        self.components.remove(&kind);
        self
    }

    // Mutators used by the store
    pub fn set_space(&mut self, space_id: ChunkId) {
        self.space_id = Some(space_id);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn attach(&mut self, component: Component) {
        self.components.insert(component.kind(), component);
    }

    pub fn detach(&mut self, kind: ComponentKind) -> Option<Component> {
        self.components.remove(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SocialComponent;

    #[test]
    fn test_attach_by_replacement_preserves_identity() {
        let npc = Entity::new(EntityKind::Npc, "Gruff Merchant");
        let id = npc.id();
        let npc = npc.with_component(Component::Social(SocialComponent::new("gruff")));
        assert_eq!(npc.id(), id);
        assert!(npc.has_component(ComponentKind::Social));
    }

    #[test]
    fn test_detach() {
        let mut npc = Entity::new(EntityKind::Npc, "Guard")
            .with_component(Component::Social(SocialComponent::new("stoic")));
        assert!(npc.detach(ComponentKind::Social).is_some());
        assert!(npc.detach(ComponentKind::Social).is_none());
        assert!(!npc.has_component(ComponentKind::Social));
    }

    #[test]
    fn test_replacement_overwrites_same_kind() {
        let npc = Entity::new(EntityKind::Npc, "Witch")
            .with_component(Component::Social(SocialComponent::new("sly")))
            .with_component(Component::Social(SocialComponent::new("warm")));
        let Some(Component::Social(social)) = npc.component(ComponentKind::Social) else {
            panic!("expected social component");
        };
        assert_eq!(social.personality(), "warm");
    }
}
