//! Entity/component store
//!
//! In-memory authority for entities: O(1) lookup by id, per-space iteration
//! through a maintained index, snapshot replacement via `Arc`. Durable
//! reflection is the repository layer's job.

use std::collections::HashMap;
use std::sync::Arc;

use delver_domain::{ChunkId, Component, ComponentKind, Entity, EntityId, GameError, GameResult};

/// In-memory entity store with a per-space index
#[derive(Default)]
pub struct EntityStore {
    entities: HashMap<EntityId, Arc<Entity>>,
    by_space: HashMap<ChunkId, Vec<EntityId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(&id).cloned()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Component of an entity, by kind
    pub fn component_of(&self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        self.entities.get(&id)?.component(kind).cloned()
    }

    /// Entities currently present in a space
    pub fn entities_in_space(&self, space_id: ChunkId) -> impl Iterator<Item = Arc<Entity>> + '_ {
        self.by_space
            .get(&space_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id).cloned())
    }

    /// Insert a new entity. Fails on duplicate id.
    pub fn insert(&mut self, entity: Entity) -> GameResult<()> {
        if self.entities.contains_key(&entity.id()) {
            return Err(GameError::conflict("Entity", entity.id()));
        }
        self.index(&entity);
        self.entities.insert(entity.id(), Arc::new(entity));
        Ok(())
    }

    /// Snapshot replacement: previous readers keep their `Arc` handle.
    /// The space index follows the new entity's space.
    pub fn replace(&mut self, entity: Entity) -> GameResult<()> {
        let id = entity.id();
        let previous = self
            .entities
            .get(&id)
            .ok_or_else(|| GameError::not_found("Entity", id))?;
        if previous.space_id() != entity.space_id() {
            self.unindex(previous.space_id(), id);
            self.index(&entity);
        }
        self.entities.insert(id, Arc::new(entity));
        Ok(())
    }

    /// Attach a component by replacement
    pub fn attach(&mut self, id: EntityId, component: Component) -> GameResult<()> {
        let entity = self
            .entities
            .get(&id)
            .ok_or_else(|| GameError::not_found("Entity", id))?;
        let updated = (**entity).clone().with_component(component);
        self.entities.insert(id, Arc::new(updated));
        Ok(())
    }

    /// Detach a component by replacement
    pub fn detach(&mut self, id: EntityId, kind: ComponentKind) -> GameResult<()> {
        let entity = self
            .entities
            .get(&id)
            .ok_or_else(|| GameError::not_found("Entity", id))?;
        let updated = (**entity).clone().without_component(kind);
        self.entities.insert(id, Arc::new(updated));
        Ok(())
    }

    /// Update an entity in place through a closure, preserving snapshot
    /// semantics for existing readers.
    pub fn update(&mut self, id: EntityId, mutate: impl FnOnce(&mut Entity)) -> GameResult<()> {
        let entity = self
            .entities
            .get(&id)
            .ok_or_else(|| GameError::not_found("Entity", id))?;
        let mut updated = (**entity).clone();
        let old_space = updated.space_id();
        mutate(&mut updated);
        if old_space != updated.space_id() {
            self.unindex(old_space, id);
            self.index(&updated);
        }
        self.entities.insert(id, Arc::new(updated));
        Ok(())
    }

    /// Remove an entity entirely (NPC death, item pickup)
    pub fn remove(&mut self, id: EntityId) -> Option<Arc<Entity>> {
        let entity = self.entities.remove(&id)?;
        self.unindex(entity.space_id(), id);
        Some(entity)
    }

    /// Move an entity between spaces, keeping the index consistent
    pub fn move_to(&mut self, id: EntityId, space_id: ChunkId) -> GameResult<()> {
        self.update(id, |e| e.set_space(space_id))
    }

    fn index(&mut self, entity: &Entity) {
        if let Some(space) = entity.space_id() {
            let ids = self.by_space.entry(space).or_default();
            if !ids.contains(&entity.id()) {
                ids.push(entity.id());
            }
        }
    }

    fn unindex(&mut self, space: Option<ChunkId>, id: EntityId) {
        if let Some(space) = space {
            if let Some(ids) = self.by_space.get_mut(&space) {
                ids.retain(|e| *e != id);
                if ids.is_empty() {
                    self.by_space.remove(&space);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_domain::{EntityKind, SocialComponent};

    fn npc_in(space: ChunkId) -> Entity {
        Entity::new(EntityKind::Npc, "Lurker").with_space(space)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = EntityStore::new();
        let space = ChunkId::new();
        let npc = npc_in(space);
        let id = npc.id();
        store.insert(npc).expect("insert");
        assert!(store.get(id).is_some());
        assert_eq!(store.entities_in_space(space).count(), 1);
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let mut store = EntityStore::new();
        let npc = npc_in(ChunkId::new());
        let copy = npc.clone();
        store.insert(npc).expect("insert");
        assert!(matches!(store.insert(copy), Err(GameError::Conflict { .. })));
    }

    #[test]
    fn test_snapshot_replacement_keeps_old_handles() {
        let mut store = EntityStore::new();
        let npc = npc_in(ChunkId::new());
        let id = npc.id();
        store.insert(npc).expect("insert");

        let before = store.get(id).expect("entity");
        store
            .attach(id, Component::Social(SocialComponent::new("wary")))
            .expect("attach");

        // earlier reader still sees the component-less snapshot
        assert!(!before.has_component(ComponentKind::Social));
        let after = store.get(id).expect("entity");
        assert!(after.has_component(ComponentKind::Social));
    }

    #[test]
    fn test_move_updates_space_index() {
        let mut store = EntityStore::new();
        let (a, b) = (ChunkId::new(), ChunkId::new());
        let npc = npc_in(a);
        let id = npc.id();
        store.insert(npc).expect("insert");

        store.move_to(id, b).expect("move");
        assert_eq!(store.entities_in_space(a).count(), 0);
        assert_eq!(store.entities_in_space(b).count(), 1);
    }

    #[test]
    fn test_entity_in_exactly_one_space() {
        let mut store = EntityStore::new();
        let (a, b) = (ChunkId::new(), ChunkId::new());
        let npc = npc_in(a);
        let id = npc.id();
        store.insert(npc).expect("insert");
        store.move_to(id, b).expect("move");

        let appearances: usize = [a, b]
            .iter()
            .map(|s| store.entities_in_space(*s).filter(|e| e.id() == id).count())
            .sum();
        assert_eq!(appearances, 1);
    }

    #[test]
    fn test_remove_unindexes() {
        let mut store = EntityStore::new();
        let space = ChunkId::new();
        let npc = npc_in(space);
        let id = npc.id();
        store.insert(npc).expect("insert");
        assert!(store.remove(id).is_some());
        assert_eq!(store.entities_in_space(space).count(), 0);
        assert!(store.remove(id).is_none());
    }

    #[test]
    fn test_detach() {
        let mut store = EntityStore::new();
        let npc = npc_in(ChunkId::new())
            .with_component(Component::Social(SocialComponent::new("dour")));
        let id = npc.id();
        store.insert(npc).expect("insert");
        store.detach(id, ComponentKind::Social).expect("detach");
        assert!(store.component_of(id, ComponentKind::Social).is_none());
    }
}
