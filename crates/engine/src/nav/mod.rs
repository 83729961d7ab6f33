//! Navigation: exit resolution, condition gating, terrain costing

mod resolver;
mod terrain;

pub use resolver::{edit_distance, normalize_direction, ExitResolver, Resolution};
pub use terrain::{movement_cost, MoveCost};

use rand::rngs::StdRng;

use delver_domain::{
    Ability, CheckOutcome, ExitCondition, GameError, GameResult, PlayerState,
    SpaceProperties,
};

use crate::catalog::ItemCatalog;
use crate::skills::SkillEngine;

/// Evaluate an exit's conditions against the player, in order. The first
/// failing condition aborts with `ConditionNotMet`.
pub fn check_conditions(
    conditions: &[ExitCondition],
    player: &PlayerState,
    space: &SpaceProperties,
    engine: &SkillEngine<'_>,
    catalog: &ItemCatalog,
    rng: &mut StdRng,
) -> GameResult<()> {
    for condition in conditions {
        match condition {
            ExitCondition::SkillCheck { skill, dc } => {
                let result = match Ability::parse(skill) {
                    Some(ability) => engine.check_with_modifier(
                        player.abilities.modifier(ability),
                        i32::from(*dc),
                        rng,
                    ),
                    None => engine.check(&player.skills, skill, i32::from(*dc), rng),
                };
                if !result.outcome.is_success() {
                    return Err(GameError::condition(format!(
                        "the way is barred ({skill} check failed, {})",
                        result.roll.breakdown()
                    )));
                }
            }
            ExitCondition::ItemRequired { template_id } => {
                // presence at the moment of the check; nothing is consumed
                if !player.inventory.has_template(template_id) {
                    let name = catalog
                        .get(template_id)
                        .map(|t| t.name().to_string())
                        .unwrap_or_else(|| template_id.to_string());
                    return Err(GameError::condition(format!("you need {name} to pass")));
                }
            }
            ExitCondition::FlagEquals { flag, value } => {
                if space.flag(flag) != *value {
                    return Err(GameError::condition("something still blocks the way"));
                }
            }
        }
    }
    Ok(())
}

/// Roll perception once against each still-hidden exit; successful rolls
/// reveal the exit by raising its flag on the space. Returns the directions
/// revealed this pass.
pub fn perceive_hidden_exits(
    space: &mut SpaceProperties,
    player: &PlayerState,
    engine: &SkillEngine<'_>,
    rng: &mut StdRng,
) -> Vec<String> {
    let pending: Vec<(String, u8, String)> = space
        .unrevealed_exits()
        .map(|e| {
            (
                e.direction.clone(),
                e.hidden_difficulty.unwrap_or(10),
                e.reveal_flag(),
            )
        })
        .collect();

    let mut revealed = Vec::new();
    for (direction, dc, flag) in pending {
        let result = if player.skills.effective_level("Perception") > 0 {
            engine.check(&player.skills, "Perception", i32::from(dc), rng)
        } else {
            engine.check_with_modifier(
                player.abilities.modifier(Ability::Wis),
                i32::from(dc),
                rng,
            )
        };
        if matches!(
            result.outcome,
            CheckOutcome::Success { .. } | CheckOutcome::CriticalSuccess
        ) {
            space.set_flag(flag, true);
            revealed.push(direction);
        }
    }
    revealed
}
