//! Observation handlers: look, search, interact, check

use delver_domain::{ComponentKind, GameError, GameResult};

use crate::nav::perceive_hidden_exits;
use crate::skills::SkillEngine;
use crate::world::World;
use crate::worldgen::resource_node_from;

/// Look never rolls perception; hidden exits stay hidden
pub(crate) async fn handle_look(world: &mut World) -> GameResult<()> {
    super::movement::describe_current_space(world)
}

/// Search rolls perception against each unrevealed exit and surfaces
/// features and resources. Revealed flags persist.
pub(crate) async fn handle_search(world: &mut World) -> GameResult<()> {
    let space_id = world.player.space_id;
    let engine = SkillEngine::new(&world.config);

    let revealed = {
        let mut space = world
            .spaces
            .get(&space_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("SpaceProperties", space_id))?;
        let revealed = perceive_hidden_exits(&mut space, &world.player, &engine, &mut world.rng);
        world.spaces.insert(space_id, space);
        world.mark_space_dirty(space_id);
        revealed
    };

    if revealed.is_empty() {
        world
            .events
            .narrative("You search the place over and find nothing new.");
    } else {
        for direction in &revealed {
            world
                .events
                .narrative(format!("You discover a way you had missed: {direction}."));
        }
        // revealed flags survive saves
        let flags = world
            .spaces
            .get(&space_id)
            .map(|s| s.flags().clone())
            .unwrap_or_default();
        world.db.spaces.update_flags(space_id, &flags).await?;
    }

    // features and their harvestables
    let features: Vec<(String, Option<String>)> = world
        .store
        .entities_in_space(space_id)
        .filter(|e| e.kind() == delver_domain::EntityKind::Feature)
        .map(|e| (e.name().to_string(), Some(e.description().to_string())))
        .collect();
    for (name, description) in features {
        let detail = description.filter(|d| !d.is_empty());
        match detail {
            Some(detail) => world.events.narrative(format!("{name}: {detail}")),
            None => world.events.narrative(format!("You note the {name}.")),
        }
    }

    let resources: Vec<String> = world
        .current_space()?
        .resources
        .iter()
        .map(|r| r.template_id.to_string())
        .collect();
    if !resources.is_empty() {
        world
            .events
            .narrative(format!("Harvestable here: {}.", resources.join(", ")));
    }
    Ok(())
}

/// Interact with a named feature or entity
pub(crate) async fn handle_interact(world: &mut World, target: &str) -> GameResult<()> {
    let entity = world
        .find_in_space(target)
        .ok_or_else(|| GameError::condition(format!("there is no {target} here")))?;
    let name = entity.name().to_string();
    let description = entity.description().to_string();

    if description.is_empty() {
        world
            .events
            .narrative(format!("The {name} yields nothing to prodding."));
    } else {
        world.events.narrative(format!("{name}: {description}"));
    }

    // harvestable features feed the resource list once
    if entity.kind() == delver_domain::EntityKind::Feature {
        let space_id = world.player.space_id;
        let flag = format!("harvest_{}", entity.id());
        let already = world.current_space()?.flag(&flag);
        if !already {
            if let Some(template) = harvest_yield(&name) {
                let feature_spec = crate::worldgen::content::FeatureSpec {
                    name: "harvest",
                    description: "",
                    yields: Some(template),
                };
                if let Some(node) = resource_node_from(&feature_spec, 0) {
                    let space = world.space_mut(space_id)?;
                    space.resources.push(node);
                    space.set_flag(flag, true);
                    world
                        .events
                        .narrative(format!("The {name} could be harvested."));
                }
            }
        }
    }
    Ok(())
}

fn harvest_yield(feature_name: &str) -> Option<&'static str> {
    match feature_name {
        "ore vein" => Some("iron_ore"),
        "moss bed" | "moss-grown sarcophagus" => Some("glow_moss"),
        "supply cache" => Some("trail_rations"),
        _ => None,
    }
}

/// Check a target: NPC disposition and health, or item details
pub(crate) fn handle_check(world: &mut World, target: &str) -> GameResult<()> {
    if let Some(entity) = world.find_in_space(target) {
        let mut lines = vec![format!("{}: {}", entity.name(), entity.description())];
        if let Some(combat) = entity
            .component(ComponentKind::Combat)
            .and_then(|c| c.as_combat())
        {
            lines.push(format!("Condition: {}/{} hp.", combat.health, combat.max_health));
            if combat.is_boss {
                lines.push("This one radiates authority over the place.".to_string());
            }
        }
        if let Some(social) = entity
            .component(ComponentKind::Social)
            .and_then(|c| c.as_social())
        {
            let disposition = social.disposition_toward(world.player.id());
            let mood = match crate::social::DispositionBand::of(disposition) {
                crate::social::DispositionBand::Hostile => "hostile",
                crate::social::DispositionBand::Unfriendly => "unfriendly",
                crate::social::DispositionBand::Neutral => "indifferent",
                crate::social::DispositionBand::Friendly => "friendly",
                crate::social::DispositionBand::Devoted => "devoted",
            };
            lines.push(format!("They seem {mood} toward you."));
        }
        world.events.narrative(lines.join("\n"));
        return Ok(());
    }

    // fall back to inventory items
    if let Some(template) = world.catalog.find_by_name(target) {
        world.events.narrative(format!(
            "{}: {} ({})",
            template.name(),
            template.description(),
            template.item_type()
        ));
        return Ok(());
    }
    Err(GameError::condition(format!("you see no {target} to size up")))
}
