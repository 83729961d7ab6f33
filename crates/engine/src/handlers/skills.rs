//! Skill handlers: checks, training, perks, the skill sheet

use delver_domain::{
    ComponentKind, GameError, GameResult, QuestAction, SkillEvent, UnlockMethod,
};

use crate::skills::{available_perks, SkillEngine};
use crate::world::World;

/// Ad-hoc skill use against a flat DC, with use-based progression
pub(crate) async fn handle_use_skill(
    world: &mut World,
    skill: &str,
    target: Option<&str>,
) -> GameResult<()> {
    let skill = canonical_skill_name(skill);
    let unlocked = world
        .player
        .skills
        .skill(&skill)
        .map(|s| s.unlocked)
        .unwrap_or(false);
    if !unlocked {
        return Err(GameError::condition(format!(
            "you have not learned {skill}"
        )));
    }

    // skills bound to a resource pool spend from it per use
    let resource = world
        .player
        .skills
        .skill(&skill)
        .and_then(|s| s.resource);
    if let Some(resource) = resource {
        let pool = world.player.skills.pool_mut(resource);
        if !pool.spend(1) {
            return Err(GameError::condition(format!(
                "you are too drained to use {skill}"
            )));
        }
    }

    let engine = SkillEngine::new(&world.config);
    let dc = 12;
    let result = engine.check(&world.player.skills, &skill, dc, &mut world.rng);
    let success = result.outcome.is_success();

    let target_text = target.map(|t| format!(" on the {t}")).unwrap_or_default();
    world.events.narrative(format!(
        "You try {skill}{target_text}: {} ({})",
        if success { "success" } else { "failure" },
        result.roll.breakdown()
    ));

    let events = engine.grant_xp(&mut world.player.skills, &skill, 30, success, &mut world.rng);
    emit_skill_events(world, &events).await?;
    if success {
        super::quests::apply_quest_action(world, &QuestAction::SkillCheckPassed { skill });
    }
    Ok(())
}

/// Train with an NPC in the space that can teach the skill
pub(crate) async fn handle_train(world: &mut World, skill: &str) -> GameResult<()> {
    let skill = canonical_skill_name(skill);
    // any social NPC may tutor; the trainer buff is what matters
    let trainer = world
        .store
        .entities_in_space(world.player.space_id)
        .find(|e| e.component(ComponentKind::Social).is_some())
        .ok_or_else(|| GameError::condition("no one here can train you"))?;
    let trainer_id = trainer.id();
    let trainer_name = trainer.name().to_string();

    let engine = SkillEngine::new(&world.config);
    let event = engine.unlock(
        &mut world.player.skills,
        &skill,
        UnlockMethod::Training { trainer: trainer_id },
        &mut world.rng,
    )?;

    match event {
        Some(event) => {
            world.events.narrative(format!(
                "{trainer_name} drills you in the basics of {skill}."
            ));
            emit_skill_events(world, &[event]).await?;
        }
        None => {
            world
                .events
                .narrative(format!("The lesson in {skill} does not take."));
        }
    }
    Ok(())
}

pub(crate) async fn handle_choose_perk(
    world: &mut World,
    skill: &str,
    perk: &str,
) -> GameResult<()> {
    let skill = canonical_skill_name(skill);
    let engine = SkillEngine::new(&world.config);
    let event = engine.choose_perk(&mut world.player.skills, &skill, perk)?;
    world
        .events
        .narrative(format!("You take the {perk} perk for {skill}."));
    emit_skill_events(world, &[event]).await?;
    Ok(())
}

pub(crate) fn handle_view_skills(world: &mut World) -> GameResult<()> {
    let mut lines = vec!["Your skills:".to_string()];
    for state in world.player.skills.skills() {
        if !state.unlocked {
            continue;
        }
        let next = delver_domain::components::xp_to_next(state.level);
        let mut line = format!(
            "  {} - level {} ({} / {next} xp)",
            state.name, state.level, state.xp
        );
        if !state.perks.is_empty() {
            line.push_str(&format!(" [{}]", state.perks.join(", ")));
        }
        if state.is_at_perk_milestone() && state.perks.len() < (state.level / 10) as usize {
            let options = available_perks(state).join(", ");
            line.push_str(&format!(" - perk available: {options}"));
        }
        lines.push(line);
    }
    if lines.len() == 1 {
        lines.push("  Nothing yet. The world will teach you.".to_string());
    }
    world.events.narrative(lines.join("\n"));
    Ok(())
}

fn canonical_skill_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => trimmed.to_string(),
    }
}

/// Persist and surface skill events
pub(crate) async fn emit_skill_events(
    world: &mut World,
    events: &[SkillEvent],
) -> GameResult<()> {
    let player_id = world.player.id();
    for event in events {
        world.db.skills.log_event(player_id, event).await?;
        match event {
            SkillEvent::XpGained { skill, amount, .. } => {
                world
                    .events
                    .narrative(format!("({skill} +{amount} xp)"));
            }
            SkillEvent::LevelUp {
                skill,
                new_level,
                is_at_perk_milestone,
                via_lucky_promotion,
            } => {
                let how = if *via_lucky_promotion {
                    " in a flash of insight"
                } else {
                    ""
                };
                world.events.narrative(format!(
                    "Your {skill} rises to level {new_level}{how}!"
                ));
                if *is_at_perk_milestone {
                    world.events.narrative(format!(
                        "A perk awaits: choose one with 'perk {} <name>'.",
                        skill.to_lowercase()
                    ));
                }
            }
            SkillEvent::SkillUnlocked { skill, .. } => {
                world
                    .events
                    .narrative(format!("You have unlocked {skill}."));
            }
            SkillEvent::PerkChosen { .. } => {}
        }
    }
    Ok(())
}
