//! Combat handlers: attack, flee, NPC counters, death and respawn

use delver_domain::{
    CombatState, ComponentKind, Corpse, EntityId, GameError, GameEvent, GameResult, QuestAction,
    SocialEventKind, SystemLevel,
};

use crate::combat::CombatResolver;
use crate::world::World;

/// Ticks a fresh corpse survives before decaying
const CORPSE_DECAY_TICKS: u64 = 500;

/// Fraction of carried gold lost on death
const DEATH_GOLD_LOSS: f64 = 0.25;

pub(crate) async fn handle_attack(world: &mut World, target: &str) -> GameResult<()> {
    let space = world.current_space()?;
    if space.is_safe_zone {
        // no-op narrative plus a warning, by contract
        world
            .events
            .narrative("Violence feels far away in this place.");
        world
            .events
            .system(SystemLevel::Warning, "You cannot fight inside a safe zone.");
        return Ok(());
    }

    let npc = world
        .find_in_space(target)
        .ok_or_else(|| GameError::condition(format!("there is no {target} here")))?;
    let npc_id = npc.id();
    if npc
        .component(ComponentKind::Combat)
        .and_then(|c| c.as_combat())
        .is_none()
    {
        return Err(GameError::condition(format!(
            "{} cannot be fought",
            npc.name()
        )));
    }

    engage(world, npc_id).await?;
    player_strike(world, npc_id).await?;

    // the defender answers if still standing
    let still_up = world
        .store
        .get(npc_id)
        .and_then(|e| e.component(ComponentKind::Combat).and_then(|c| c.as_combat().cloned()))
        .map(|c| !c.is_dead())
        .unwrap_or(false);
    if still_up {
        npc_counter_attack(world, npc_id).await?;
    }
    world.advance_tick(1);
    Ok(())
}

/// Mark both sides as engaged and record the attack socially
pub(crate) async fn engage(world: &mut World, npc_id: EntityId) -> GameResult<()> {
    let player_id = world.player.id();
    world.player.combat = Some(CombatState::InCombat { opponent: npc_id });
    world.store.update(npc_id, |entity| {
        if let Some(combat) = entity
            .component_mut(ComponentKind::Combat)
            .and_then(|c| c.as_combat_mut())
        {
            if !combat.in_combat() {
                combat.engage(player_id);
            }
        }
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, SocialEventKind::Attacked, chrono::Utc::now());
        }
    })?;
    Ok(())
}

async fn player_strike(world: &mut World, npc_id: EntityId) -> GameResult<()> {
    let npc = world
        .store
        .get(npc_id)
        .ok_or_else(|| GameError::not_found("Entity", npc_id))?;
    let npc_name = npc.name().to_string();
    let mut combat = npc
        .component(ComponentKind::Combat)
        .and_then(|c| c.as_combat().cloned())
        .ok_or_else(|| GameError::condition("that cannot be fought"))?;
    let mut npc_skills = npc
        .component(ComponentKind::Skill)
        .and_then(|c| c.as_skill().cloned());

    let resolver = CombatResolver::new(&world.config);
    let (result, skill_events) = resolver.player_strike(
        &world.player,
        &mut combat,
        npc_skills.as_mut(),
        &world.catalog,
        &mut world.rng,
    );

    if result.missed {
        world
            .events
            .combat(format!("You swing wide of the {npc_name}. ({})", result.attack_roll.breakdown()));
    } else if let Some(skill) = &result.defended_with {
        world.events.combat(format!(
            "The {npc_name} turns your blow aside with a {}.",
            skill.to_lowercase()
        ));
    } else {
        let flourish = if result.critical { " A devastating hit!" } else { "" };
        world.events.combat(format!(
            "You strike the {npc_name} for {} damage.{flourish}",
            result.damage
        ));
    }

    // write back the mutated components
    let dead = combat.is_dead();
    world.store.update(npc_id, |entity| {
        entity.attach(delver_domain::Component::Combat(combat.clone()));
        if let Some(skills) = npc_skills.clone() {
            entity.attach(delver_domain::Component::Skill(skills));
        }
    })?;
    for event in &skill_events {
        world.db.skills.log_event(npc_id, event).await?;
    }

    if dead {
        on_npc_defeated(world, npc_id, &npc_name).await?;
    }
    Ok(())
}

/// NPC counter-attack using symmetric rules
pub(crate) async fn npc_counter_attack(world: &mut World, npc_id: EntityId) -> GameResult<()> {
    let Some(npc) = world.store.get(npc_id) else {
        return Ok(());
    };
    let npc_name = npc.name().to_string();
    let Some(combat) = npc
        .component(ComponentKind::Combat)
        .and_then(|c| c.as_combat().cloned())
    else {
        return Ok(());
    };
    if combat.is_dead() || !combat.in_combat() {
        return Ok(());
    }

    let resolver = CombatResolver::new(&world.config);
    let (result, skill_events) =
        resolver.npc_strike(&combat, &mut world.player, &world.catalog, &mut world.rng);

    if result.missed {
        world
            .events
            .combat(format!("The {npc_name} lunges and misses."));
    } else if let Some(skill) = &result.defended_with {
        world.events.combat(format!(
            "You {} the {npc_name}'s attack.",
            skill.to_lowercase()
        ));
    } else {
        world.events.combat(format!(
            "The {npc_name} hits you for {} damage.",
            result.damage
        ));
        world.events.emit(GameEvent::status(
            Some(world.player.health),
            Some(world.player.max_health),
            None,
        ));
    }
    for event in &skill_events {
        world.db.skills.log_event(world.player.id(), event).await?;
    }

    if world.player.is_dead() {
        handle_player_death(world).await?;
    }
    Ok(())
}

async fn on_npc_defeated(world: &mut World, npc_id: EntityId, npc_name: &str) -> GameResult<()> {
    world
        .events
        .combat(format!("The {npc_name} collapses."));
    world.player.combat = Some(CombatState::Victor);

    // remove from the space and the store; loot falls to the floor
    let space_id = world.player.space_id;
    let _ = world.store.remove(npc_id);
    if let Ok(space) = world.space_mut(space_id) {
        space.remove_entity(npc_id);
    }

    // modest drop so combat feeds the economy
    let drop = delver_domain::ItemInstance::new("trail_rations", 3);
    if let Ok(space) = world.space_mut(space_id) {
        space.dropped_items.push(drop);
    }

    super::quests::apply_quest_action(
        world,
        &QuestAction::KilledNpc {
            npc: npc_id,
            npc_name: npc_name.to_string(),
        },
    );
    Ok(())
}

pub(crate) async fn handle_flee(world: &mut World) -> GameResult<()> {
    let Some(CombatState::InCombat { opponent }) = world.player.combat else {
        return Err(GameError::condition("you are not fighting anything"));
    };

    let resolver = CombatResolver::new(&world.config);
    if resolver.roll_flee(&mut world.rng) {
        world.player.combat = Some(CombatState::Fled);
        world.store.update(opponent, |entity| {
            if let Some(combat) = entity
                .component_mut(ComponentKind::Combat)
                .and_then(|c| c.as_combat_mut())
            {
                combat.resolve(CombatState::Idle);
            }
        })?;
        world
            .events
            .narrative("You break away and put distance between you.");
    } else {
        world
            .events
            .combat("You turn to run and leave yourself open!");
        npc_counter_attack(world, opponent).await?;
    }
    Ok(())
}

/// Player death: freeze a corpse, respawn at the nearest safe zone with
/// reduced health and partial gold loss. Quest progress is untouched.
pub(crate) async fn handle_player_death(world: &mut World) -> GameResult<()> {
    let space_id = world.player.space_id;
    let player_id = world.player.id();

    // frozen snapshots
    let items = world.player.inventory.items().to_vec();
    let equipped = world.player.inventory.equipped().clone();
    let gold = world.player.inventory.gold();
    let lost_gold = (gold as f64 * DEATH_GOLD_LOSS).floor() as i64;

    let corpse = Corpse::new(
        player_id,
        space_id,
        items,
        equipped,
        lost_gold,
        world.tick() + CORPSE_DECAY_TICKS,
    );
    world.db.corpses.save(&corpse).await?;

    world.events.emit(GameEvent::status(Some(0), Some(world.player.max_health), None));
    world
        .events
        .narrative("Darkness takes you. You wake somewhere quieter, lighter of purse.");

    // strip to the bone: items stay on the corpse
    world.player.inventory = delver_domain::InventoryComponent::default();
    world.player.inventory.add_gold(gold - lost_gold);
    world.player.health = (world.player.max_health / 2).max(1);
    world.player.combat = None;

    // nearest safe zone: any cached safe space, else the world start
    let respawn = world
        .spaces
        .values()
        .find(|s| s.is_safe_zone)
        .map(|s| s.chunk_id())
        .unwrap_or(world.seed().starting_space);
    if let Ok(space) = world.space_mut(space_id) {
        space.remove_entity(player_id);
    }
    world.player.space_id = respawn;
    world.ensure_space_content(respawn).await?;
    if let Ok(space) = world.space_mut(respawn) {
        space.add_entity(player_id);
    }
    world.events.emit(GameEvent::status(
        Some(world.player.health),
        Some(world.player.max_health),
        world.spaces.get(&respawn).map(|s| s.name.clone()),
    ));
    Ok(())
}
