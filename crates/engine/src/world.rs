//! The world aggregate
//!
//! Owns the entity store, repository handles, seeded rng, configuration,
//! and the event sink. There is no global mutable state: tests instantiate
//! worlds, the CLI owns one. All mutation happens on the single task that
//! owns this value, so intents apply whole or not at all.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use delver_domain::{
    ChunkId, ChunkLevel, Component, ComponentKind, Entity, EntityId, GameError, GameResult,
    GraphNode, PlayerState, Quest, QuestId, SpaceProperties, SystemLevel, WorldChunk, WorldSeed,
};

use crate::catalog::ItemCatalog;
use crate::config::GameConfig;
use crate::coordinator::AutosavePolicy;
use crate::events::EventBus;
use crate::intent::{parse_intent, Intent, IntentContext, LlmIntentFallback};
use crate::llm::LlmPort;
use crate::persistence::Database;
use crate::rag::MemoryStore;
use crate::store::EntityStore;
use crate::worldgen::WorldGenerator;

pub struct World {
    pub config: GameConfig,
    pub db: Database,
    pub llm: Arc<dyn LlmPort>,
    pub catalog: ItemCatalog,
    pub store: EntityStore,
    pub events: EventBus,
    pub memory: MemoryStore,
    pub rng: StdRng,
    pub player: PlayerState,
    pub quests: HashMap<QuestId, Quest>,
    /// Realized chunks and spaces, keyed by chunk id
    pub chunks: HashMap<ChunkId, WorldChunk>,
    pub spaces: HashMap<ChunkId, SpaceProperties>,
    pub(crate) seed: WorldSeed,
    /// Monotonic world tick, advanced by movement and combat
    pub(crate) tick: u64,
    pub(crate) dirty_chunks: HashSet<ChunkId>,
    pub(crate) dirty_spaces: HashSet<ChunkId>,
    pub autosave: AutosavePolicy,
    /// Directory save files live in
    pub(crate) save_dir: PathBuf,
    pub quit_requested: bool,
}

impl World {
    /// Open or create a world on the given database
    pub async fn create(
        config: GameConfig,
        llm: Arc<dyn LlmPort>,
        db: Database,
        save_dir: PathBuf,
    ) -> GameResult<Self> {
        let autosave = AutosavePolicy::new(config.autosave_moves, config.autosave_interval);
        let seed_string = config
            .world_seed
            .clone()
            .unwrap_or_else(|| format!("world-{}", uuid::Uuid::new_v4()));

        let existing = db.seed.get().await?;
        let memory = MemoryStore::new(&config.llm_embed_model);

        let mut world = if let Some(seed) = existing {
            let rng = StdRng::seed_from_u64(seed_hash(&seed.seed));
            let player = PlayerState::new("Delver", seed.starting_space);
            let mut world = Self {
                config,
                db,
                llm,
                catalog: ItemCatalog::builtin(),
                store: EntityStore::new(),
                events: EventBus::new(),
                memory,
                rng,
                player,
                quests: HashMap::new(),
                chunks: HashMap::new(),
                spaces: HashMap::new(),
                seed,
                tick: 0,
                dirty_chunks: HashSet::new(),
                dirty_spaces: HashSet::new(),
                autosave,
                save_dir,
                quit_requested: false,
            };
            world.seed_player_defaults();
            world.seed_starter_quest();
            world
        } else {
            let mut world = Self {
                rng: StdRng::seed_from_u64(seed_hash(&seed_string)),
                seed: WorldSeed::new(seed_string.clone(), String::new(), ChunkId::new()),
                config,
                db,
                llm,
                catalog: ItemCatalog::builtin(),
                store: EntityStore::new(),
                events: EventBus::new(),
                memory,
                player: PlayerState::new("Delver", ChunkId::new()),
                quests: HashMap::new(),
                chunks: HashMap::new(),
                spaces: HashMap::new(),
                tick: 0,
                dirty_chunks: HashSet::new(),
                dirty_spaces: HashSet::new(),
                autosave,
                save_dir,
                quit_requested: false,
            };
            world.bootstrap().await?;
            world
        };

        world.hydrate_starting_area().await?;
        Ok(world)
    }

    /// Fresh world: WORLD + REGION lore eagerly, first zone chain realized
    /// so the player has somewhere to stand.
    async fn bootstrap(&mut self) -> GameResult<()> {
        tracing::info!(seed = %self.seed.seed, "bootstrapping fresh world");

        let generator = WorldGenerator::new(self.llm.as_ref(), &self.config, &self.seed.seed);
        let global_lore = generator
            .expand_lore(ChunkLevel::World, "ancient_abyss", &[])
            .await;
        let mut world_chunk = WorldChunk::new(ChunkLevel::World, None)?
            .with_id(ChunkId::from_uuid(uuid::Uuid::from_u128(
                generator.root_rng().gen(),
            )))
            .with_biome_theme("ancient_abyss")
            .with_lore(global_lore.clone())
            .with_size_estimate(12)
            .with_mob_density(0.4);

        // regions get lore eagerly, nothing deeper
        let mut regions = generator.child_chunks(&world_chunk)?;
        for region in &mut regions {
            let lore = generator
                .expand_lore(ChunkLevel::Region, region.biome_theme(), &[&global_lore])
                .await;
            region.set_lore(lore);
            world_chunk.push_child(region.id());
        }

        // first zone chain down to spaces; sibling zones and subzones are
        // persisted unrealized so frontier traversal can pick them up later
        let first_region = regions
            .first_mut()
            .ok_or_else(|| GameError::internal("generator produced no regions"))?;
        let mut zones = generator.child_chunks(first_region)?;
        for zone in &zones {
            first_region.push_child(zone.id());
        }
        let first_zone = zones
            .first_mut()
            .ok_or_else(|| GameError::internal("generator produced no zones"))?;

        let mut subzones = generator.child_chunks(first_zone)?;
        for subzone in &subzones {
            first_zone.push_child(subzone.id());
        }
        let first_subzone = subzones
            .first_mut()
            .ok_or_else(|| GameError::internal("generator produced no subzones"))?;

        let realized = generator.realize_subzone(first_subzone)?;
        tracing::info!(
            subzone = %first_subzone.id(),
            nodes = realized.report.node_count,
            avg_degree = realized.report.avg_degree,
            "starting subzone realized"
        );

        // persist the chain
        self.db.chunks.save(&world_chunk).await?;
        for region in &regions {
            self.db.chunks.save(region).await?;
        }
        for zone in &zones {
            self.db.chunks.save(zone).await?;
        }
        for subzone in &subzones {
            self.db.chunks.save(subzone).await?;
        }
        for chunk in &realized.space_chunks {
            self.db.chunks.save(chunk).await?;
        }
        for node in &realized.nodes {
            self.db.graph_nodes.save(node).await?;
        }
        for space in &realized.spaces {
            self.db.spaces.save(space).await?;
        }
        for template in self.catalog.templates() {
            self.db.items.save_template(template).await?;
        }

        self.seed = WorldSeed::new(self.seed.seed.clone(), global_lore, realized.entry_space);
        self.db.seed.save(&self.seed).await?;

        // cache what we just built
        self.chunks.insert(world_chunk.id(), world_chunk);
        for region in regions {
            self.chunks.insert(region.id(), region);
        }
        for zone in zones {
            self.chunks.insert(zone.id(), zone);
        }
        for subzone in subzones {
            self.chunks.insert(subzone.id(), subzone);
        }
        for chunk in realized.space_chunks {
            self.chunks.insert(chunk.id(), chunk);
        }
        for space in realized.spaces {
            self.spaces.insert(space.chunk_id(), space);
        }

        self.player = PlayerState::new("Delver", self.seed.starting_space);
        self.seed_player_defaults();
        self.seed_starter_quest();
        Ok(())
    }

    fn seed_player_defaults(&mut self) {
        use delver_domain::SkillState;
        self.player
            .skills
            .insert(SkillState::new("Perception").unlocked_at(1).with_tag("awareness"));
        self.player
            .skills
            .insert(SkillState::new("Dodge").unlocked_at(0).with_tag("combat"));
        self.player.inventory.add_gold(25);
        let torch = delver_domain::ItemInstance::new("torch", 5);
        let catalog = &self.catalog;
        let _ = self.player.inventory.add(torch, |id| catalog.weight_of(id));
    }

    fn seed_starter_quest(&mut self) {
        use delver_domain::{ObjectiveKind, QuestObjective, QuestReward};
        let quest = Quest::new("First Blood", "Something stirs in the first dark. Put it down.")
            .with_objective(QuestObjective::new(
                ObjectiveKind::KillNpc { npc_name: "Pale Lurker".into() },
                1,
            ))
            .with_reward(QuestReward { xp: 100, gold: 20, items: vec!["healing_draught".into()] });
        self.player.available_quests.push(quest.id());
        self.quests.insert(quest.id(), quest);
    }

    /// Hydrate the player's space and prefetch its exit neighbors
    async fn hydrate_starting_area(&mut self) -> GameResult<()> {
        let space_id = self.player.space_id;
        self.ensure_space_cached(space_id).await?;
        let neighbors: Vec<ChunkId> = self
            .spaces
            .get(&space_id)
            .map(|s| s.exits.iter().map(|e| e.target).collect())
            .unwrap_or_default();
        for neighbor in neighbors {
            // best effort: frontier targets are subzones and may not be spaces yet
            let _ = self.ensure_space_cached(neighbor).await;
        }
        self.ensure_space_content(space_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cache management
    // ------------------------------------------------------------------

    pub(crate) async fn ensure_chunk_cached(&mut self, id: ChunkId) -> GameResult<()> {
        if self.chunks.contains_key(&id) {
            return Ok(());
        }
        let chunk = self
            .db
            .chunks
            .find_by_id(id)
            .await?
            .ok_or_else(|| GameError::not_found("WorldChunk", id))?;
        self.chunks.insert(id, chunk);
        Ok(())
    }

    pub(crate) async fn ensure_space_cached(&mut self, id: ChunkId) -> GameResult<()> {
        if self.spaces.contains_key(&id) {
            return Ok(());
        }
        let space = self
            .db
            .spaces
            .find_by_chunk_id(id)
            .await?
            .ok_or_else(|| GameError::not_found("SpaceProperties", id))?;
        self.spaces.insert(id, space);
        self.ensure_chunk_cached(id).await
    }

    pub fn current_space(&self) -> GameResult<&SpaceProperties> {
        self.spaces
            .get(&self.player.space_id)
            .ok_or_else(|| GameError::not_found("SpaceProperties", self.player.space_id))
    }

    pub(crate) fn space_mut(&mut self, id: ChunkId) -> GameResult<&mut SpaceProperties> {
        self.dirty_spaces.insert(id);
        self.spaces
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found("SpaceProperties", id))
    }

    pub(crate) fn mark_space_dirty(&mut self, id: ChunkId) {
        self.dirty_spaces.insert(id);
    }

    pub(crate) fn advance_tick(&mut self, by: u64) {
        self.tick += by;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> &WorldSeed {
        &self.seed
    }

    /// Realize per-space content on first entry
    pub(crate) async fn ensure_space_content(&mut self, space_id: ChunkId) -> GameResult<()> {
        self.ensure_space_cached(space_id).await?;
        let realized_flag = self
            .spaces
            .get(&space_id)
            .map(|s| s.flag("content_realized"))
            .unwrap_or(false);
        if realized_flag {
            // a reloaded process lost the in-memory entities; the seeded rng
            // regenerates the same inhabitants
            return self.rehydrate_entities(space_id).await;
        }

        let chunk = self
            .chunks
            .get(&space_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("WorldChunk", space_id))?;
        let ancestor_lore = self.ancestor_lore(&chunk).await?;
        let node = self.graph_node_for_space(space_id).await?;
        let node_type = node
            .as_ref()
            .map(|n| n.node_type())
            .unwrap_or(delver_domain::NodeType::Linear);
        let entry_distance = match &node {
            Some(node) => self.entry_distance(node).await?,
            None => 0,
        };
        let treasure_already = self.db.treasure_rooms.find_by_space(space_id).await?.is_some()
            || self.spaces.values().any(|s| s.is_treasure_room);

        let generator = WorldGenerator::new(self.llm.as_ref(), &self.config, &self.seed.seed);
        let space_snapshot = self
            .spaces
            .get(&space_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("SpaceProperties", space_id))?;
        let lore_refs: Vec<&str> = ancestor_lore.iter().map(String::as_str).collect();
        let content = generator
            .realize_space_content(
                &space_snapshot,
                &chunk,
                node_type,
                entry_distance,
                treasure_already,
                &lore_refs,
            )
            .await?;

        for npc in content.npcs {
            let id = npc.id();
            self.store.insert(npc)?;
            if let Ok(space) = self.space_mut(space_id) {
                space.add_entity(id);
            }
        }
        for feature in content.features {
            let id = feature.id();
            self.store.insert(feature)?;
            if let Ok(space) = self.space_mut(space_id) {
                space.add_entity(id);
            }
        }
        if let Some(room) = &content.treasure {
            self.db.treasure_rooms.save(room).await?;
        }
        {
            let space = self.space_mut(space_id)?;
            space.description = content.description;
            space.dropped_items.extend(content.dropped);
            if content.treasure.is_some() {
                space.is_treasure_room = true;
            }
            space.set_flag("content_realized", true);
        }
        self.db
            .spaces
            .save(self.spaces.get(&space_id).ok_or_else(|| {
                GameError::not_found("SpaceProperties", space_id)
            })?)
            .await?;
        Ok(())
    }

    /// Respawn a realized space's inhabitants after a process restart. The
    /// content rng is keyed by seed + chunk id, so the same NPCs and
    /// features come back; persisted floor items and treasure are left as
    /// the repositories have them.
    async fn rehydrate_entities(&mut self, space_id: ChunkId) -> GameResult<()> {
        if self.store.entities_in_space(space_id).next().is_some() {
            return Ok(());
        }
        let stale: Vec<EntityId> = self
            .spaces
            .get(&space_id)
            .map(|s| s.entities().to_vec())
            .unwrap_or_default();
        if stale.is_empty() {
            return Ok(());
        }

        let chunk = self
            .chunks
            .get(&space_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("WorldChunk", space_id))?;
        let node = self.graph_node_for_space(space_id).await?;
        let node_type = node
            .as_ref()
            .map(|n| n.node_type())
            .unwrap_or(delver_domain::NodeType::Linear);
        let space_snapshot = self
            .spaces
            .get(&space_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("SpaceProperties", space_id))?;

        let generator = WorldGenerator::new(self.llm.as_ref(), &self.config, &self.seed.seed);
        let content = generator
            .realize_space_content(&space_snapshot, &chunk, node_type, 0, true, &[])
            .await?;

        let player_here = self.player.space_id == space_id;
        {
            let space = self.space_mut(space_id)?;
            for id in stale {
                space.remove_entity(id);
            }
        }
        let player_id = self.player.id();
        for entity in content.npcs.into_iter().chain(content.features) {
            let id = entity.id();
            self.store.insert(entity)?;
            if let Ok(space) = self.space_mut(space_id) {
                space.add_entity(id);
            }
        }
        if player_here {
            if let Ok(space) = self.space_mut(space_id) {
                space.add_entity(player_id);
            }
        }
        Ok(())
    }

    /// Lore of every ancestor, depth order (world first)
    pub(crate) async fn ancestor_lore(&mut self, chunk: &WorldChunk) -> GameResult<Vec<String>> {
        let mut chain = Vec::new();
        let mut cursor = chunk.parent();
        while let Some(id) = cursor {
            self.ensure_chunk_cached(id).await?;
            let parent = self
                .chunks
                .get(&id)
                .ok_or_else(|| GameError::not_found("WorldChunk", id))?;
            chain.push(parent.lore().to_string());
            cursor = parent.parent();
        }
        chain.reverse();
        Ok(chain)
    }

    pub(crate) async fn graph_node_for_space(
        &mut self,
        space_id: ChunkId,
    ) -> GameResult<Option<GraphNode>> {
        self.ensure_chunk_cached(space_id).await?;
        let Some(subzone_id) = self.chunks.get(&space_id).and_then(|c| c.parent()) else {
            return Ok(None);
        };
        let nodes = self.db.graph_nodes.find_by_chunk(subzone_id).await?;
        Ok(nodes.into_iter().find(|n| n.space_id() == Some(space_id)))
    }

    /// BFS distance from the subzone entry node to this node
    async fn entry_distance(&mut self, node: &GraphNode) -> GameResult<usize> {
        let nodes = self.db.graph_nodes.find_by_chunk(node.chunk_id()).await?;
        let entry = nodes
            .iter()
            .find(|n| n.node_type() == delver_domain::NodeType::Hub)
            .map(|n| n.id());
        let Some(entry) = entry else {
            return Ok(0);
        };
        // BFS over node ids
        let mut depth = HashMap::new();
        let mut queue = std::collections::VecDeque::new();
        depth.insert(entry, 0usize);
        queue.push_back(entry);
        while let Some(current) = queue.pop_front() {
            let Some(current_node) = nodes.iter().find(|n| n.id() == current) else {
                continue;
            };
            let d = depth.get(&current).copied().unwrap_or(0);
            for edge in current_node.edges() {
                if !depth.contains_key(&edge.target) {
                    depth.insert(edge.target, d + 1);
                    queue.push_back(edge.target);
                }
            }
        }
        Ok(depth.get(&node.id()).copied().unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Entity helpers
    // ------------------------------------------------------------------

    /// Find a visible NPC (or feature) in the player's space by name prefix
    pub fn find_in_space(&self, name: &str) -> Option<Arc<Entity>> {
        let lowered = name.trim().to_lowercase();
        let trimmed = lowered.trim_start_matches("the ").trim();
        self.store
            .entities_in_space(self.player.space_id)
            .find(|e| {
                let entity_name = e.name().to_lowercase();
                entity_name == trimmed || entity_name.contains(trimmed)
            })
    }

    /// Clone a component off an entity, by kind
    pub fn component_of(&self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        self.store.component_of(id, kind)
    }

    // ------------------------------------------------------------------
    // Intent entry point
    // ------------------------------------------------------------------

    /// Process one line of player input. Domain errors become `System`
    /// events; `Internal`/`Corrupt` abort the intent with an ERROR event but
    /// leave the world playable.
    pub async fn execute(&mut self, input: &str) -> GameResult<()> {
        let mut intent = parse_intent(input);
        if matches!(intent, Intent::Unknown { .. }) && self.config.llm_enabled() {
            let context = self.intent_context();
            let fallback = LlmIntentFallback::new(self.llm.as_ref(), &self.config);
            intent = fallback.classify(input, &context).await;
        }
        tracing::debug!(intent = intent.tag(), "routing intent");

        match crate::handlers::route(self, intent).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_domain() => {
                self.events.system(SystemLevel::Warning, err.to_string());
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "intent aborted");
                self.events.system(
                    SystemLevel::Error,
                    "Something went wrong beneath the world. The moment passes.",
                );
                Ok(())
            }
        }
    }

    fn intent_context(&self) -> IntentContext {
        let exits = self
            .current_space()
            .map(|s| s.visible_exits().map(|e| e.direction.clone()).collect())
            .unwrap_or_default();
        let entities = self
            .store
            .entities_in_space(self.player.space_id)
            .map(|e| e.name().to_string())
            .collect();
        let inventory = self
            .player
            .inventory
            .items()
            .iter()
            .filter_map(|i| self.catalog.get(&i.template_id).map(|t| t.name().to_string()))
            .collect();
        IntentContext {
            exits,
            entities,
            inventory,
        }
    }
}

fn seed_hash(seed: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    hasher.finish()
}
