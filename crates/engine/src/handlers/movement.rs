//! Movement handling: resolution, gating, terrain, frontier expansion

use delver_domain::{
    ChunkId, ChunkLevel, ComponentKind, Exit, GameError, GameResult, GameEvent, SystemLevel,
};

use crate::nav::{check_conditions, movement_cost, ExitResolver, Resolution};
use crate::skills::SkillEngine;
use crate::world::World;
use crate::worldgen::WorldGenerator;

pub(crate) async fn handle_move(world: &mut World, direction: &str) -> GameResult<()> {
    if world.player.in_combat() {
        return Err(GameError::condition("you cannot simply walk away from a fight - flee"));
    }

    // resolve against a snapshot of the current space
    let space = world.current_space()?.clone();
    let resolver = ExitResolver::new(world.llm.as_ref(), &world.config);
    let exit = match resolver.resolve(direction, &space).await {
        Resolution::Success(exit) => exit,
        Resolution::Failure(reason) => return Err(GameError::condition(reason)),
        Resolution::Ambiguous(options) => {
            world.events.system(
                SystemLevel::Info,
                format!("Which way? ({})", options.join(", ")),
            );
            return Ok(());
        }
    };

    // condition gating
    {
        let engine = SkillEngine::new(&world.config);
        let space_ref = world.current_space()?.clone();
        check_conditions(
            &exit.conditions,
            &world.player,
            &space_ref,
            &engine,
            &world.catalog,
            &mut world.rng,
        )?;
    }

    // frontier exits target the subzone itself; expand before traveling
    let destination = resolve_destination(world, &exit).await?;

    world.ensure_space_cached(destination).await?;
    let terrain = world
        .spaces
        .get(&destination)
        .map(|s| s.terrain)
        .ok_or_else(|| GameError::not_found("SpaceProperties", destination))?;
    let cost = movement_cost(terrain, &world.player.skills, &mut world.rng);
    if !cost.success {
        return Err(GameError::condition("the way is impassable"));
    }

    // damage lands before the position update; dying movers do not arrive
    if cost.damage > 0 {
        let remaining = world.player.take_damage(cost.damage);
        world.events.emit(GameEvent::status(
            Some(remaining),
            Some(world.player.max_health),
            None,
        ));
        world.events.narrative(format!(
            "The ground takes its toll as you push through ({} damage).",
            cost.damage
        ));
        if world.player.is_dead() {
            super::combat::handle_player_death(world).await?;
            return Ok(());
        }
    }

    // depart
    let origin = world.player.space_id;
    let player_id = world.player.id();
    if let Ok(space) = world.space_mut(origin) {
        space.remove_entity(player_id);
    }

    // arrive
    world.player.space_id = destination;
    world.advance_tick(u64::from(cost.ticks));
    world.ensure_space_content(destination).await?;
    if let Ok(space) = world.space_mut(destination) {
        space.add_entity(player_id);
    }

    world
        .events
        .narrative(format!("You move {}.", exit.direction));
    describe_current_space(world)?;
    world.events.emit(GameEvent::status(
        None,
        None,
        world.spaces.get(&destination).map(|s| s.name.clone()),
    ));

    spring_traps(world).await?;
    if world.player.is_dead() {
        super::combat::handle_player_death(world).await?;
        return Ok(());
    }
    aggro_check(world).await?;

    // narrative continuity: remember where we have been (best effort)
    let fragment = world
        .spaces
        .get(&destination)
        .map(|s| format!("Visited {}: {}", s.name, s.description));
    if let Some(fragment) = fragment {
        let llm = world.llm.clone();
        if let Err(err) = world
            .memory
            .remember(llm.as_ref(), fragment, Default::default())
            .await
        {
            tracing::debug!(%err, "memory skipped");
        }
    }

    // autosave by move count
    if world.autosave.note_move() {
        world.save_snapshot("default").await?;
        world.events.system(SystemLevel::Info, "Autosaved.");
    }
    Ok(())
}

/// Turn a frontier exit (targeting a SUBZONE chunk) into a real space id,
/// realizing the neighboring subzone on first traversal.
async fn resolve_destination(world: &mut World, exit: &Exit) -> GameResult<ChunkId> {
    world.ensure_chunk_cached(exit.target).await.ok();
    let level = world.chunks.get(&exit.target).map(|c| c.level());
    match level {
        Some(ChunkLevel::Space) | None => Ok(exit.target),
        _ => expand_frontier(world, exit).await,
    }
}

/// Realize the next unrealized sibling subzone and retarget the exit at its
/// entry. When the whole zone is spent the passage folds back to the
/// current subzone's entry.
async fn expand_frontier(world: &mut World, exit: &Exit) -> GameResult<ChunkId> {
    let current_space = world.player.space_id;
    world.ensure_chunk_cached(current_space).await?;
    let subzone_id = world
        .chunks
        .get(&current_space)
        .and_then(|c| c.parent())
        .ok_or_else(|| GameError::not_found("WorldChunk", current_space))?;
    world.ensure_chunk_cached(subzone_id).await?;
    let zone_id = world
        .chunks
        .get(&subzone_id)
        .and_then(|c| c.parent())
        .ok_or_else(|| GameError::not_found("WorldChunk", subzone_id))?;

    // find an unrealized sibling (no children yet)
    let siblings = world.db.chunks.find_by_parent(zone_id).await?;
    let target = siblings
        .into_iter()
        .find(|s| s.id() != subzone_id && s.children().is_empty());

    let Some(mut target) = target else {
        tracing::debug!(zone = %zone_id, "no unrealized subzones left; folding back");
        return world
            .chunks
            .get(&subzone_id)
            .and_then(|c| c.children().first().copied())
            .ok_or_else(|| GameError::not_found("WorldChunk", subzone_id));
    };

    tracing::info!(subzone = %target.id(), "expanding frontier");
    let seed = world.seed().seed.clone();
    let generator = WorldGenerator::new(world.llm.as_ref(), &world.config, &seed);
    let lore = generator
        .expand_lore(ChunkLevel::SubZone, target.biome_theme(), &[])
        .await;
    target.set_lore(lore);
    let realized = generator.realize_subzone(&mut target)?;

    world.db.chunks.save(&target).await?;
    for chunk in &realized.space_chunks {
        world.db.chunks.save(chunk).await?;
    }
    for node in &realized.nodes {
        world.db.graph_nodes.save(node).await?;
    }
    for space in &realized.spaces {
        world.db.spaces.save(space).await?;
    }

    let entry = realized.entry_space;
    world.chunks.insert(target.id(), target);
    for chunk in realized.space_chunks {
        world.chunks.insert(chunk.id(), chunk);
    }
    for space in realized.spaces {
        world.spaces.insert(space.chunk_id(), space);
    }

    // retarget the frontier exit and add the way back
    let direction = exit.direction.clone();
    {
        let space = world.space_mut(current_space)?;
        if let Some(stored) = space.exits.iter_mut().find(|e| e.direction == direction) {
            stored.target = entry;
        }
    }
    {
        let entry_space = world.space_mut(entry)?;
        entry_space.exits.push(Exit::open(
            current_space,
            "back the way you came",
            "The passage you arrived through.",
        ));
    }
    world
        .db
        .spaces
        .save(world.spaces.get(&current_space).ok_or_else(|| {
            GameError::not_found("SpaceProperties", current_space)
        })?)
        .await?;
    world
        .db
        .spaces
        .save(world.spaces.get(&entry).ok_or_else(|| {
            GameError::not_found("SpaceProperties", entry)
        })?)
        .await?;

    Ok(entry)
}

/// Emit the room description block: prose, exits, occupants, floor items
pub(crate) fn describe_current_space(world: &mut World) -> GameResult<()> {
    let space = world.current_space()?;
    let mut lines = vec![format!("{}\n{}", space.name, space.description)];

    let exits: Vec<String> = space.visible_exits().map(|e| e.direction.clone()).collect();
    if !exits.is_empty() {
        lines.push(format!("Exits: {}.", exits.join(", ")));
    }

    let player_id = world.player.id();
    let occupants: Vec<String> = world
        .store
        .entities_in_space(space.chunk_id())
        .filter(|e| e.id() != player_id)
        .map(|e| e.name().to_string())
        .collect();
    if !occupants.is_empty() {
        lines.push(format!("Here: {}.", occupants.join(", ")));
    }

    let floor: Vec<String> = space
        .dropped_items
        .iter()
        .filter_map(|i| world.catalog.get(&i.template_id).map(|t| t.name().to_string()))
        .collect();
    if !floor.is_empty() {
        lines.push(format!("On the ground: {}.", floor.join(", ")));
    }
    if space.is_safe_zone {
        lines.push("A stillness here keeps violence at bay.".to_string());
    }
    if space.is_treasure_room {
        lines.push(
            "Stone pedestals stand in a ring, each bearing an offering. Take one and the rest seal."
                .to_string(),
        );
    }

    let text = lines.join("\n");
    world.events.narrative(text);
    Ok(())
}

/// Untriggered traps spring on arrival: a DEX save against the trap's
/// difficulty, damage on failure, one shot either way.
async fn spring_traps(world: &mut World) -> GameResult<()> {
    let space_id = world.player.space_id;
    let pending: Vec<(String, u8)> = world
        .spaces
        .get(&space_id)
        .map(|s| {
            s.traps
                .iter()
                .filter(|t| !t.triggered)
                .map(|t| (t.id.clone(), t.difficulty))
                .collect()
        })
        .unwrap_or_default();
    if pending.is_empty() {
        return Ok(());
    }

    for (trap_id, difficulty) in pending {
        let dex = world.player.abilities.modifier(delver_domain::Ability::Dex);
        let engine = SkillEngine::new(&world.config);
        let result = engine.check_with_modifier(dex, i32::from(difficulty), &mut world.rng);
        if result.outcome.is_success() {
            world
                .events
                .narrative("You spot a trap a heartbeat before it fires and step clear.");
        } else {
            let damage = 5 + i32::from(difficulty) / 2;
            let remaining = world.player.take_damage(damage);
            world
                .events
                .narrative(format!("A trap snaps shut on you ({damage} damage)."));
            world.events.emit(GameEvent::status(
                Some(remaining),
                Some(world.player.max_health),
                None,
            ));
        }
        if let Ok(space) = world.space_mut(space_id) {
            if let Some(trap) = space.traps.iter_mut().find(|t| t.id == trap_id) {
                trap.triggered = true;
            }
        }
        if world.player.is_dead() {
            break;
        }
    }
    Ok(())
}

/// Hostile NPCs attack on sight when the player walks in
async fn aggro_check(world: &mut World) -> GameResult<()> {
    let player_id = world.player.id();
    let space_id = world.player.space_id;
    let safe = world.spaces.get(&space_id).map(|s| s.is_safe_zone).unwrap_or(false);
    if safe {
        return Ok(());
    }

    let hostile: Option<delver_domain::EntityId> = world
        .store
        .entities_in_space(space_id)
        .find(|e| {
            e.component(ComponentKind::Social)
                .and_then(|c| c.as_social())
                .map(|s| s.is_hostile_toward(player_id))
                .unwrap_or(false)
                && e.component(ComponentKind::Combat)
                    .and_then(|c| c.as_combat())
                    .map(|c| !c.is_dead())
                    .unwrap_or(false)
        })
        .map(|e| e.id());

    if let Some(npc_id) = hostile {
        let name = world
            .store
            .get(npc_id)
            .map(|e| e.name().to_string())
            .unwrap_or_else(|| "something".to_string());
        world
            .events
            .combat(format!("{name} attacks on sight!"));
        super::combat::engage(world, npc_id).await?;
        super::combat::npc_counter_attack(world, npc_id).await?;
    }
    Ok(())
}
