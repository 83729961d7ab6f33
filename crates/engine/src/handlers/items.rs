//! Item handlers: floor pickup, equipment, use, crafting, trading, stealth,
//! corpse looting

use chrono::Utc;

use delver_domain::{
    Component, ComponentKind, EquipSlot, GameError, GameEvent, GameResult, ItemInstance,
    QuestAction, SocialEventKind,
};

use crate::items::{
    buy_item, craft, loot_corpse, recipes, sell_item, stealth_attempt, use_item, UseAction,
};
use crate::skills::SkillEngine;
use crate::world::World;

fn find_on_floor(world: &World, name: &str) -> Option<ItemInstance> {
    let lowered = name.trim().to_lowercase();
    let space = world.current_space().ok()?;
    space
        .dropped_items
        .iter()
        .find(|instance| {
            world
                .catalog
                .get(&instance.template_id)
                .map(|t| {
                    t.name().to_lowercase() == lowered
                        || t.name().to_lowercase().contains(&lowered)
                        || instance.template_id.as_str() == lowered
                })
                .unwrap_or(false)
        })
        .cloned()
}

fn find_held(world: &World, name: &str) -> Option<ItemInstance> {
    let lowered = name.trim().to_lowercase();
    world
        .player
        .inventory
        .items()
        .iter()
        .find(|instance| {
            world
                .catalog
                .get(&instance.template_id)
                .map(|t| {
                    t.name().to_lowercase() == lowered
                        || t.name().to_lowercase().contains(&lowered)
                        || instance.template_id.as_str() == lowered
                })
                .unwrap_or(false)
        })
        .cloned()
}

pub(crate) async fn handle_take(world: &mut World, item: &str) -> GameResult<()> {
    if let Some(instance) = find_on_floor(world, item) {
        return take_instance(world, instance).await;
    }
    if try_take_from_pedestal(world, item).await? {
        return Ok(());
    }
    if try_harvest(world, item).await? {
        return Ok(());
    }
    Err(GameError::condition(format!("there is no {item} to take")))
}

/// Treasure rooms: taking a pedestal item is the one-shot reward
async fn try_take_from_pedestal(world: &mut World, item: &str) -> GameResult<bool> {
    let space_id = world.player.space_id;
    if !world.current_space()?.is_treasure_room {
        return Ok(false);
    }
    let Some(mut room) = world.db.treasure_rooms.find_by_space(space_id).await? else {
        return Ok(false);
    };
    let lowered = item.trim().to_lowercase();
    let Some(index) = room.pedestals.iter().find_map(|p| {
        world.catalog.get(&p.item_template_id).and_then(|t| {
            (t.name().to_lowercase().contains(&lowered)
                || p.item_template_id.as_str() == lowered)
                .then_some(p.pedestal_index)
        })
    }) else {
        return Ok(false);
    };

    let template_id = room.take_from(index)?;
    world.db.treasure_rooms.save(&room).await?;

    let instance = ItemInstance::new(template_id.clone(), 8);
    {
        let catalog = &world.catalog;
        world
            .player
            .inventory
            .add(instance, |id| catalog.weight_of(id))?;
    }
    let name = world
        .catalog
        .get(&template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| template_id.to_string());
    world.events.narrative(format!(
        "You lift the {name} from its pedestal. Stone grinds as the others seal shut."
    ));
    super::quests::apply_quest_action(world, &QuestAction::CollectedItem { template_id });
    Ok(true)
}

/// Harvest from a matching resource node in the space
async fn try_harvest(world: &mut World, item: &str) -> GameResult<bool> {
    let space_id = world.player.space_id;
    let lowered = item.trim().to_lowercase();
    let found = world.current_space()?.resources.iter().find_map(|node| {
        let named = world
            .catalog
            .get(&node.template_id)
            .map(|t| t.name().to_lowercase().contains(&lowered))
            .unwrap_or(false);
        (node.quantity > 0 && (named || node.template_id.as_str() == lowered))
            .then(|| (node.id.clone(), node.template_id.clone()))
    });
    let Some((node_id, template_id)) = found else {
        return Ok(false);
    };

    let instance = ItemInstance::new(template_id.clone(), 5);
    {
        let catalog = &world.catalog;
        world
            .player
            .inventory
            .add(instance, |id| catalog.weight_of(id))?;
    }
    {
        let space = world.space_mut(space_id)?;
        if let Some(node) = space.resources.iter_mut().find(|n| n.id == node_id) {
            node.quantity -= 1;
        }
    }
    let name = world
        .catalog
        .get(&template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| template_id.to_string());
    world.events.narrative(format!("You harvest some {name}."));
    super::quests::apply_quest_action(world, &QuestAction::CollectedItem { template_id });
    Ok(true)
}

async fn take_instance(world: &mut World, instance: ItemInstance) -> GameResult<()> {
    let name = world
        .catalog
        .get(&instance.template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| instance.template_id.to_string());
    let template_id = instance.template_id.clone();
    let instance_id = instance.id;

    // weight check happens inside add; Overweight propagates untouched
    {
        let catalog = &world.catalog;
        world
            .player
            .inventory
            .add(instance, |id| catalog.weight_of(id))?;
    }
    let space_id = world.player.space_id;
    {
        let space = world.space_mut(space_id)?;
        space.dropped_items.retain(|i| i.id != instance_id);
    }
    world
        .db
        .spaces
        .save(world.spaces.get(&space_id).ok_or_else(|| {
            GameError::not_found("SpaceProperties", space_id)
        })?)
        .await?;

    world.events.narrative(format!("You take the {name}."));
    super::quests::apply_quest_action(world, &QuestAction::CollectedItem { template_id });
    Ok(())
}

pub(crate) async fn handle_take_all(world: &mut World) -> GameResult<()> {
    let floor = world.current_space()?.dropped_items.clone();
    if floor.is_empty() {
        return Err(GameError::condition("there is nothing here to take"));
    }
    let mut taken = 0usize;
    for instance in floor {
        match take_instance(world, instance).await {
            Ok(()) => taken += 1,
            Err(GameError::Overweight) => {
                world.events.system(
                    delver_domain::SystemLevel::Warning,
                    "You cannot carry any more.",
                );
                break;
            }
            Err(other) => return Err(other),
        }
    }
    if taken == 0 {
        return Err(GameError::Overweight);
    }
    Ok(())
}

pub(crate) async fn handle_drop(world: &mut World, item: &str) -> GameResult<()> {
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let name = world
        .catalog
        .get(&instance.template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| instance.template_id.to_string());

    let removed = world.player.inventory.remove(instance.id)?;
    let space_id = world.player.space_id;
    {
        let space = world.space_mut(space_id)?;
        space.dropped_items.push(removed);
    }
    world
        .db
        .spaces
        .save(world.spaces.get(&space_id).ok_or_else(|| {
            GameError::not_found("SpaceProperties", space_id)
        })?)
        .await?;
    world.events.narrative(format!("You set the {name} down."));
    Ok(())
}

pub(crate) async fn handle_give(world: &mut World, item: &str, npc: &str) -> GameResult<()> {
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let entity = world
        .find_in_space(npc)
        .ok_or_else(|| GameError::condition(format!("there is no {npc} here")))?;
    let npc_id = entity.id();
    let npc_name = entity.name().to_string();

    let removed = world.player.inventory.remove(instance.id)?;
    let template_id = removed.template_id.clone();
    let player_id = world.player.id();

    world.store.update(npc_id, |entity| {
        // gifts go into the recipient's stock or a fresh inventory
        match entity
            .component_mut(ComponentKind::Trading)
            .and_then(|c| c.as_trading_mut())
        {
            Some(trading) => trading.add_stock(removed.clone()),
            None => {
                let mut inventory = entity
                    .component(ComponentKind::Inventory)
                    .and_then(|c| c.as_inventory().cloned())
                    .unwrap_or_default();
                let _ = inventory.add(removed.clone(), |_| 0.0);
                entity.attach(Component::Inventory(inventory));
            }
        }
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, SocialEventKind::ItemGiven, Utc::now());
        }
    })?;

    let name = world
        .catalog
        .get(&template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| template_id.to_string());
    world
        .events
        .narrative(format!("You hand the {name} to {npc_name}."));
    super::quests::apply_quest_action(
        world,
        &QuestAction::DeliveredItem {
            template_id,
            npc: npc_id,
        },
    );
    Ok(())
}

pub(crate) fn handle_equip(world: &mut World, item: &str) -> GameResult<()> {
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let template = world.catalog.require(&instance.template_id)?;
    let slot = template
        .equip_slot()
        .ok_or_else(|| GameError::invalid(format!("the {} cannot be equipped", template.name())))?;
    let name = template.name().to_string();

    let displaced = world
        .player
        .inventory
        .equip(instance.id, slot, Some(slot))?;
    match displaced {
        Some(old) => {
            let old_name = world
                .player
                .inventory
                .get(old)
                .and_then(|i| world.catalog.get(&i.template_id))
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| "previous gear".to_string());
            world.events.narrative(format!(
                "You swap the {old_name} for the {name} ({slot})."
            ));
        }
        None => {
            world
                .events
                .narrative(format!("You equip the {name} ({slot})."));
        }
    }
    Ok(())
}

pub(crate) fn handle_unequip(world: &mut World, slot: EquipSlot) -> GameResult<()> {
    let instance_id = world.player.inventory.unequip(slot)?;
    let name = world
        .player
        .inventory
        .get(instance_id)
        .and_then(|i| world.catalog.get(&i.template_id))
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| "the gear".to_string());
    world
        .events
        .narrative(format!("You unequip the {name} from your {slot}."));
    Ok(())
}

pub(crate) async fn handle_use(
    world: &mut World,
    item: &str,
    action: Option<&str>,
) -> GameResult<()> {
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let template = world.catalog.require(&instance.template_id)?.clone();
    let action = action.map(UseAction::parse).unwrap_or(UseAction::Apply);

    let outcome = use_item(&template, action)?;
    if outcome.consumed {
        world.player.inventory.consume(instance.id, 1)?;
    }
    if outcome.heal > 0 {
        let healed = world.player.heal(outcome.heal);
        world
            .events
            .emit(GameEvent::status(Some(healed), Some(world.player.max_health), None));
    }
    world.events.narrative(outcome.narrative);
    Ok(())
}

pub(crate) async fn handle_craft(world: &mut World, recipe: &str) -> GameResult<()> {
    let recipe_id = recipes()
        .iter()
        .find(|r| r.id == recipe || r.output == recipe || r.id.contains(recipe))
        .map(|r| r.id)
        .ok_or_else(|| GameError::not_found("Recipe", recipe))?;

    let engine = SkillEngine::new(&world.config);
    let (output, events) = {
        // split borrows: craft needs player + catalog + rng
        let World {
            player,
            catalog,
            rng,
            ..
        } = world;
        craft(player, recipe_id, catalog, &engine, rng)?
    };
    let name = world
        .catalog
        .get(&output.template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| output.template_id.to_string());
    world.events.narrative(format!(
        "You craft a {name} (quality {}).",
        output.quality
    ));
    for event in &events {
        world.db.skills.log_event(world.player.id(), event).await?;
    }
    Ok(())
}

fn find_merchant(world: &World) -> GameResult<delver_domain::EntityId> {
    world
        .store
        .entities_in_space(world.player.space_id)
        .find(|e| e.component(ComponentKind::Trading).is_some())
        .map(|e| e.id())
        .ok_or_else(|| GameError::condition("no one here is selling"))
}

pub(crate) fn handle_list_stock(world: &mut World) -> GameResult<()> {
    let merchant_id = find_merchant(world)?;
    let entity = world
        .store
        .get(merchant_id)
        .ok_or_else(|| GameError::not_found("Entity", merchant_id))?;
    let trading = entity
        .component(ComponentKind::Trading)
        .and_then(|c| c.as_trading())
        .ok_or_else(|| GameError::condition("no one here is selling"))?;
    let disposition = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social())
        .map(|s| s.disposition_toward(world.player.id()))
        .unwrap_or(0);

    let mut lines = vec![format!("{} offers:", entity.name())];
    for instance in trading.stock() {
        if let Some(template) = world.catalog.get(&instance.template_id) {
            let price = trading.price_to_player(template.base_value(), disposition);
            lines.push(format!(
                "  {} (quality {}) - {price} gold",
                template.name(),
                instance.quality
            ));
        }
    }
    if trading.stock().is_empty() {
        lines.push("  ...nothing at all.".to_string());
    }
    world.events.narrative(lines.join("\n"));
    Ok(())
}

pub(crate) async fn handle_buy(world: &mut World, item: &str) -> GameResult<()> {
    let merchant_id = find_merchant(world)?;
    let entity = world
        .store
        .get(merchant_id)
        .ok_or_else(|| GameError::not_found("Entity", merchant_id))?;
    let npc_name = entity.name().to_string();
    let mut trading = entity
        .component(ComponentKind::Trading)
        .and_then(|c| c.as_trading().cloned())
        .ok_or_else(|| GameError::condition("no one here is selling"))?;
    let disposition = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social())
        .map(|s| s.disposition_toward(world.player.id()))
        .unwrap_or(0);

    let lowered = item.trim().to_lowercase();
    let wanted = trading
        .stock()
        .iter()
        .find(|i| {
            world
                .catalog
                .get(&i.template_id)
                .map(|t| t.name().to_lowercase().contains(&lowered))
                .unwrap_or(false)
        })
        .map(|i| i.id)
        .ok_or_else(|| GameError::condition(format!("{npc_name} has no {item}")))?;

    let (bought, price) = {
        let World {
            player, catalog, ..
        } = world;
        buy_item(player, &mut trading, wanted, disposition, catalog)?
    };
    let player_id = world.player.id();
    world.store.update(merchant_id, |entity| {
        entity.attach(Component::Trading(trading.clone()));
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, SocialEventKind::TradeCompleted, Utc::now());
        }
    })?;

    let name = world
        .catalog
        .get(&bought.template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| bought.template_id.to_string());
    world
        .events
        .narrative(format!("You buy the {name} for {price} gold."));
    Ok(())
}

pub(crate) async fn handle_sell(world: &mut World, item: &str) -> GameResult<()> {
    let merchant_id = find_merchant(world)?;
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let entity = world
        .store
        .get(merchant_id)
        .ok_or_else(|| GameError::not_found("Entity", merchant_id))?;
    let mut trading = entity
        .component(ComponentKind::Trading)
        .and_then(|c| c.as_trading().cloned())
        .ok_or_else(|| GameError::condition("no one here is buying"))?;
    let disposition = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social())
        .map(|s| s.disposition_toward(world.player.id()))
        .unwrap_or(0);

    let name = world
        .catalog
        .get(&instance.template_id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| instance.template_id.to_string());
    let price = {
        let World {
            player, catalog, ..
        } = world;
        sell_item(player, &mut trading, instance.id, disposition, catalog)?
    };
    let player_id = world.player.id();
    world.store.update(merchant_id, |entity| {
        entity.attach(Component::Trading(trading.clone()));
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, SocialEventKind::TradeCompleted, Utc::now());
        }
    })?;
    world
        .events
        .narrative(format!("You sell the {name} for {price} gold."));
    Ok(())
}

pub(crate) async fn handle_pickpocket(world: &mut World, npc: &str) -> GameResult<()> {
    let entity = world
        .find_in_space(npc)
        .ok_or_else(|| GameError::condition(format!("there is no {npc} here")))?;
    let npc_id = entity.id();
    let npc_name = entity.name().to_string();
    let npc_skills = entity
        .component(ComponentKind::Skill)
        .and_then(|c| c.as_skill().cloned())
        .unwrap_or_default();

    let engine = SkillEngine::new(&world.config);
    let outcome = stealth_attempt(&world.player, &npc_skills, &engine, &mut world.rng);
    let player_id = world.player.id();

    if outcome.success {
        // quiet transfer of a little coin
        let lifted = 5i64;
        world.player.inventory.add_gold(lifted);
        world
            .events
            .narrative(format!("You slip {lifted} gold from {npc_name} unnoticed."));
    } else {
        world.store.update(npc_id, |entity| {
            if let Some(social) = entity
                .component_mut(ComponentKind::Social)
                .and_then(|c| c.as_social_mut())
            {
                social.apply_event(player_id, SocialEventKind::TheftDetected, Utc::now());
            }
        })?;
        world
            .events
            .narrative(format!("{npc_name} catches your hand in the act!"));
    }
    Ok(())
}

pub(crate) async fn handle_plant(world: &mut World, item: &str, npc: &str) -> GameResult<()> {
    let instance = find_held(world, item)
        .ok_or_else(|| GameError::condition(format!("you are not carrying {item}")))?;
    let entity = world
        .find_in_space(npc)
        .ok_or_else(|| GameError::condition(format!("there is no {npc} here")))?;
    let npc_id = entity.id();
    let npc_name = entity.name().to_string();
    let npc_skills = entity
        .component(ComponentKind::Skill)
        .and_then(|c| c.as_skill().cloned())
        .unwrap_or_default();

    let engine = SkillEngine::new(&world.config);
    let outcome = stealth_attempt(&world.player, &npc_skills, &engine, &mut world.rng);
    let player_id = world.player.id();

    if outcome.success {
        let removed = world.player.inventory.remove(instance.id)?;
        world.store.update(npc_id, |entity| {
            let mut inventory = entity
                .component(ComponentKind::Inventory)
                .and_then(|c| c.as_inventory().cloned())
                .unwrap_or_default();
            let _ = inventory.add(removed.clone(), |_| 0.0);
            entity.attach(Component::Inventory(inventory));
        })?;
        world
            .events
            .narrative(format!("You slip it into {npc_name}'s belongings unseen."));
    } else {
        world.store.update(npc_id, |entity| {
            if let Some(social) = entity
                .component_mut(ComponentKind::Social)
                .and_then(|c| c.as_social_mut())
            {
                social.apply_event(player_id, SocialEventKind::TheftDetected, Utc::now());
            }
        })?;
        world
            .events
            .narrative(format!("{npc_name} notices you fumbling at their pack."));
    }
    Ok(())
}

pub(crate) async fn handle_loot(world: &mut World) -> GameResult<()> {
    let space_id = world.player.space_id;
    let corpses = world.db.corpses.find_by_space_id(space_id).await?;
    let mut corpse = corpses
        .into_iter()
        .find(|c| !c.looted)
        .ok_or_else(|| GameError::condition("there is nothing here to loot"))?;

    let (taken, gold, left) = {
        let World {
            player, catalog, ..
        } = world;
        loot_corpse(player, &mut corpse, catalog)?
    };
    world.db.corpses.save(&corpse).await?;
    world.db.corpses.mark_looted(corpse.id()).await?;

    let mut lines = Vec::new();
    if gold > 0 {
        lines.push(format!("You recover {gold} gold."));
    }
    for instance in &taken {
        if let Some(template) = world.catalog.get(&instance.template_id) {
            lines.push(format!("You recover the {}.", template.name()));
        }
    }
    if !left.is_empty() {
        lines.push(format!(
            "{} item(s) were too heavy to carry away.",
            left.len()
        ));
    }
    if lines.is_empty() {
        lines.push("Nothing remains worth taking.".to_string());
    }
    world.events.narrative(lines.join("\n"));
    Ok(())
}

pub(crate) fn handle_inventory(world: &mut World) -> GameResult<()> {
    let inventory = &world.player.inventory;
    let mut lines = vec![format!(
        "Gold: {}. Carrying {:.1}/{:.1} kg.",
        inventory.gold(),
        inventory.current_weight(|id| world.catalog.weight_of(id)),
        inventory.capacity_weight_kg()
    )];
    for instance in inventory.items() {
        let name = world
            .catalog
            .get(&instance.template_id)
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| instance.template_id.to_string());
        let equipped = if inventory.is_equipped(instance.id) {
            " [equipped]"
        } else {
            ""
        };
        let quantity = if instance.quantity > 1 {
            format!(" x{}", instance.quantity)
        } else {
            String::new()
        };
        lines.push(format!(
            "  {name}{quantity} (quality {}){equipped}",
            instance.quality
        ));
    }
    if inventory.items().is_empty() {
        lines.push("  Your pack is empty.".to_string());
    }
    world.events.narrative(lines.join("\n"));
    Ok(())
}
