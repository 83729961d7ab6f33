//! Item interactions: tag-dispatched use, crafting, trading, stealth, looting
//!
//! Inventory arithmetic (weight, slots, gold) lives on the domain component;
//! this module supplies the behavior around it.

use rand::rngs::StdRng;

use delver_domain::{
    Corpse, GameError, GameResult, ItemInstance, ItemTemplate, ItemTemplateId, PlayerState,
    SkillEvent, TradingComponent,
};

use crate::catalog::ItemCatalog;
use crate::skills::SkillEngine;

/// What the player is trying to do with an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseAction {
    Bash,
    Throw,
    Burn,
    Break,
    Pour,
    Climb,
    /// Default: drink/apply/activate by item type
    Apply,
}

impl UseAction {
    pub fn parse(verb: &str) -> Self {
        match verb {
            "bash" | "smash" | "hit" => Self::Bash,
            "throw" | "toss" | "hurl" => Self::Throw,
            "burn" | "light" | "ignite" => Self::Burn,
            "break" | "crack" | "shatter" => Self::Break,
            "pour" | "spill" => Self::Pour,
            "climb" | "scale" => Self::Climb,
            _ => Self::Apply,
        }
    }
}

/// Result of using an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseOutcome {
    pub narrative: String,
    /// One unit is consumed from the stack
    pub consumed: bool,
    /// Healing applied, for consumables
    pub heal: i32,
}

/// Dispatch a use attempt on the item's tags and the requested action
pub fn use_item(template: &ItemTemplate, action: UseAction) -> GameResult<UseOutcome> {
    let name = template.name();
    let outcome = match action {
        UseAction::Burn if template.has_tag("flammable") => UseOutcome {
            narrative: format!("The {name} catches and burns away."),
            consumed: true,
            heal: 0,
        },
        UseAction::Burn => {
            return Err(GameError::condition(format!("the {name} will not burn")))
        }
        UseAction::Throw if template.has_tag("explosive") => UseOutcome {
            narrative: format!("The {name} detonates in a bloom of smoke."),
            consumed: true,
            heal: 0,
        },
        UseAction::Throw if template.has_tag("throwable") || template.has_tag("fragile") => {
            UseOutcome {
                narrative: format!("The {name} sails off and clatters somewhere dark."),
                consumed: true,
                heal: 0,
            }
        }
        UseAction::Throw => UseOutcome {
            narrative: format!("You half-heartedly lob the {name} and pick it back up."),
            consumed: false,
            heal: 0,
        },
        UseAction::Bash if template.has_tag("blunt") => UseOutcome {
            narrative: format!("You give it a solid whack with the {name}."),
            consumed: false,
            heal: 0,
        },
        UseAction::Bash => {
            return Err(GameError::condition(format!(
                "the {name} is no good for bashing"
            )))
        }
        UseAction::Break if template.has_tag("fragile") => UseOutcome {
            narrative: format!("The {name} shatters."),
            consumed: true,
            heal: 0,
        },
        UseAction::Break => {
            return Err(GameError::condition(format!("the {name} resists breaking")))
        }
        UseAction::Pour if template.has_tag("liquid") => UseOutcome {
            narrative: format!("You pour out the {name}."),
            consumed: true,
            heal: 0,
        },
        UseAction::Pour => {
            return Err(GameError::condition(format!("nothing to pour from the {name}")))
        }
        UseAction::Climb if template.has_tag("climbable") => UseOutcome {
            narrative: format!("You secure the {name} and test your weight against it."),
            consumed: false,
            heal: 0,
        },
        UseAction::Climb => {
            return Err(GameError::condition(format!("you can't climb the {name}")))
        }
        UseAction::Apply => match template.item_type() {
            "consumable" => {
                let heal = template.numeric_property("heal").unwrap_or(0.0) as i32;
                UseOutcome {
                    narrative: format!("You consume the {name}."),
                    consumed: true,
                    heal,
                }
            }
            _ if template.has_tag("light_source") => UseOutcome {
                narrative: format!("The {name} pushes the dark back a little."),
                consumed: false,
                heal: 0,
            },
            _ => {
                return Err(GameError::condition(format!(
                    "nothing obvious happens with the {name}"
                )))
            }
        },
    };
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Crafting
// ---------------------------------------------------------------------------

/// A crafting recipe: inputs consumed, output produced at skill-driven quality
#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: &'static str,
    pub inputs: &'static [(&'static str, u32)],
    pub output: &'static str,
    pub skill: &'static str,
}

/// The authored recipe book
pub fn recipes() -> &'static [Recipe] {
    const RECIPES: &[Recipe] = &[
        Recipe {
            id: "forge_iron_sword",
            inputs: &[("iron_ore", 2), ("torch", 1)],
            output: "iron_sword",
            skill: "Smithing",
        },
        Recipe {
            id: "twist_rope",
            inputs: &[("glow_moss", 3)],
            output: "rope",
            skill: "Survival",
        },
        Recipe {
            id: "brew_draught",
            inputs: &[("glow_moss", 2), ("trail_rations", 1)],
            output: "healing_draught",
            skill: "Alchemy",
        },
    ];
    RECIPES
}

/// Craft a recipe: consume inputs from the player's inventory, add the
/// output at a quality determined by the relevant skill.
pub fn craft(
    player: &mut PlayerState,
    recipe_id: &str,
    catalog: &ItemCatalog,
    engine: &SkillEngine<'_>,
    rng: &mut StdRng,
) -> GameResult<(ItemInstance, Vec<SkillEvent>)> {
    let recipe = recipes()
        .iter()
        .find(|r| r.id == recipe_id)
        .ok_or_else(|| GameError::not_found("Recipe", recipe_id))?;

    // verify inputs before consuming anything
    let mut to_consume = Vec::new();
    for (template, count) in recipe.inputs {
        let template_id = ItemTemplateId::new(*template);
        let held = player
            .inventory
            .find_by_template(&template_id)
            .filter(|i| i.quantity >= *count)
            .ok_or_else(|| {
                GameError::condition(format!("you need {count}x {template} to craft that"))
            })?;
        to_consume.push((held.id, *count));
    }
    for (instance_id, count) in to_consume {
        player.inventory.consume(instance_id, count)?;
    }

    // quality rides the crafting skill: 3 base, +1 per 2 levels, capped
    let level = player.skills.effective_level(recipe.skill).max(0);
    let quality = (3 + level / 2).clamp(1, 10) as u8;
    let output = ItemInstance::new(recipe.output, quality);
    player
        .inventory
        .add(output.clone(), |id| catalog.weight_of(id))?;

    let events = engine.grant_xp(&mut player.skills, recipe.skill, 40, true, rng);
    Ok((output, events))
}

// ---------------------------------------------------------------------------
// Trading
// ---------------------------------------------------------------------------

/// Buy an instance out of a merchant's stock
pub fn buy_item(
    player: &mut PlayerState,
    trading: &mut TradingComponent,
    instance_id: delver_domain::ItemInstanceId,
    disposition: i32,
    catalog: &ItemCatalog,
) -> GameResult<(ItemInstance, i64)> {
    let in_stock = trading
        .stock()
        .iter()
        .find(|i| i.id == instance_id)
        .ok_or_else(|| GameError::not_found("ItemInstance", instance_id))?;
    let base_value = catalog
        .get(&in_stock.template_id)
        .map(|t| t.base_value())
        .unwrap_or(1);
    let price = trading.price_to_player(base_value, disposition);

    player.inventory.spend_gold(price)?;
    let instance = trading
        .take_stock(instance_id)
        .ok_or_else(|| GameError::not_found("ItemInstance", instance_id))?;
    if let Err(err) = player
        .inventory
        .add(instance.clone(), |id| catalog.weight_of(id))
    {
        // roll the purchase back rather than strand the item
        trading.add_stock(instance);
        player.inventory.add_gold(price);
        return Err(err);
    }
    trading.add_gold(price);
    Ok((instance, price))
}

/// Sell one of the player's items to a merchant
pub fn sell_item(
    player: &mut PlayerState,
    trading: &mut TradingComponent,
    instance_id: delver_domain::ItemInstanceId,
    disposition: i32,
    catalog: &ItemCatalog,
) -> GameResult<i64> {
    let held = player
        .inventory
        .get(instance_id)
        .ok_or_else(|| GameError::not_found("ItemInstance", instance_id))?;
    let base_value = catalog
        .get(&held.template_id)
        .map(|t| t.base_value())
        .unwrap_or(1);
    let price = trading.price_from_player(base_value, disposition);
    if !trading.spend_gold(price) {
        return Err(GameError::condition("the merchant cannot afford that"));
    }
    let instance = player.inventory.remove(instance_id)?;
    trading.add_stock(instance);
    player.inventory.add_gold(price);
    Ok(price)
}

// ---------------------------------------------------------------------------
// Stealth
// ---------------------------------------------------------------------------

/// Outcome of a pickpocket or plant attempt
#[derive(Debug, Clone)]
pub struct StealthOutcome {
    pub success: bool,
    /// The victim noticed; disposition consequences follow
    pub detected: bool,
}

/// Opposed Stealth vs Perception. Success moves the item quietly; failure
/// with detection is the caller's cue to apply `TheftDetected`.
pub fn stealth_attempt(
    player: &PlayerState,
    npc_skills: &delver_domain::SkillComponent,
    engine: &SkillEngine<'_>,
    rng: &mut StdRng,
) -> StealthOutcome {
    let result = engine.opposed(&player.skills, "Stealth", npc_skills, "Perception", rng);
    StealthOutcome {
        success: result.attacker_wins,
        detected: !result.attacker_wins,
    }
}

// ---------------------------------------------------------------------------
// Corpse looting
// ---------------------------------------------------------------------------

/// Move a corpse's frozen snapshot into the player's live inventory.
/// Items that would overflow the weight budget stay on the corpse.
pub fn loot_corpse(
    player: &mut PlayerState,
    corpse: &mut Corpse,
    catalog: &ItemCatalog,
) -> GameResult<(Vec<ItemInstance>, i64, Vec<ItemInstance>)> {
    if corpse.looted {
        return Err(GameError::condition("the corpse has already been picked clean"));
    }
    let (items, gold) = corpse.loot();
    player.inventory.add_gold(gold);

    let mut taken = Vec::new();
    let mut left = Vec::new();
    for item in items {
        match player.inventory.add(item.clone(), |id| catalog.weight_of(id)) {
            Ok(()) => taken.push(item),
            Err(GameError::Overweight) => left.push(item),
            Err(other) => return Err(other),
        }
    }
    // overflow stays with the corpse, which remains looted
    corpse.items = left.clone();
    Ok((taken, gold, left))
}
