//! Quest handlers and objective progression

use delver_domain::{GameError, GameEvent, GameResult, QuestAction, QuestStatus};

use crate::world::World;

pub(crate) fn handle_list(world: &mut World) -> GameResult<()> {
    let mut lines = Vec::new();

    if !world.player.active_quests.is_empty() {
        lines.push("Active quests:".to_string());
        for quest_id in &world.player.active_quests {
            if let Some(quest) = world.quests.get(quest_id) {
                let status = match quest.status {
                    QuestStatus::Completed => " (complete - claim your reward)",
                    QuestStatus::Failed => " (failed)",
                    _ => "",
                };
                lines.push(format!("  {}{status}", quest.title));
                for objective in &quest.objectives {
                    lines.push(format!(
                        "    - {}/{}",
                        objective.progress, objective.required_count
                    ));
                }
            }
        }
    }
    if !world.player.available_quests.is_empty() {
        lines.push("Offered to you:".to_string());
        for quest_id in &world.player.available_quests {
            if let Some(quest) = world.quests.get(quest_id) {
                lines.push(format!("  {} - {}", quest.title, quest.description));
            }
        }
    }
    if lines.is_empty() {
        lines.push("No quests weigh on you.".to_string());
    }
    world.events.narrative(lines.join("\n"));
    Ok(())
}

fn find_quest_by_title(world: &World, title: &str) -> Option<delver_domain::QuestId> {
    let lowered = title.trim().to_lowercase();
    world
        .quests
        .values()
        .find(|q| q.title.to_lowercase() == lowered || q.title.to_lowercase().contains(&lowered))
        .map(|q| q.id())
}

pub(crate) fn handle_accept(world: &mut World, title: &str) -> GameResult<()> {
    let quest_id = find_quest_by_title(world, title)
        .ok_or_else(|| GameError::not_found("Quest", title))?;
    let position = world
        .player
        .available_quests
        .iter()
        .position(|id| *id == quest_id)
        .ok_or_else(|| GameError::condition("that quest is not on offer"))?;

    world.player.available_quests.remove(position);
    world.player.active_quests.push(quest_id);
    let title = world
        .quests
        .get(&quest_id)
        .map(|q| q.title.clone())
        .unwrap_or_default();
    world.events.emit(GameEvent::quest(
        Some(quest_id),
        format!("Quest accepted: {title}"),
    ));
    Ok(())
}

pub(crate) fn handle_abandon(world: &mut World, title: &str) -> GameResult<()> {
    let quest_id = find_quest_by_title(world, title)
        .ok_or_else(|| GameError::not_found("Quest", title))?;
    let position = world
        .player
        .active_quests
        .iter()
        .position(|id| *id == quest_id)
        .ok_or_else(|| GameError::condition("you are not on that quest"))?;

    world.player.active_quests.remove(position);
    if let Some(quest) = world.quests.get_mut(&quest_id) {
        quest.status = QuestStatus::Failed;
    }
    world
        .events
        .emit(GameEvent::quest(Some(quest_id), "Quest abandoned."));
    Ok(())
}

pub(crate) async fn handle_claim(world: &mut World, title: &str) -> GameResult<()> {
    let quest_id = find_quest_by_title(world, title)
        .ok_or_else(|| GameError::not_found("Quest", title))?;
    let reward = {
        let quest = world
            .quests
            .get_mut(&quest_id)
            .ok_or_else(|| GameError::not_found("Quest", title))?;
        if !quest.claim() {
            return Err(GameError::condition("that quest is not complete"));
        }
        quest.reward.clone()
    };

    world.player.experience += reward.xp;
    world.player.inventory.add_gold(reward.gold);
    let mut granted = Vec::new();
    for template_id in &reward.items {
        let instance = delver_domain::ItemInstance::new(template_id.clone(), 5);
        let catalog = &world.catalog;
        match world.player.inventory.add(instance, |id| catalog.weight_of(id)) {
            Ok(()) => {
                if let Some(template) = world.catalog.get(template_id) {
                    granted.push(template.name().to_string());
                }
            }
            Err(GameError::Overweight) => {
                world.events.system(
                    delver_domain::SystemLevel::Warning,
                    "A reward was too heavy to carry and was left behind.",
                );
            }
            Err(other) => return Err(other),
        }
    }

    world.player.active_quests.retain(|id| *id != quest_id);
    let mut message = format!("Reward claimed: {} xp, {} gold", reward.xp, reward.gold);
    if !granted.is_empty() {
        message.push_str(&format!(", {}", granted.join(", ")));
    }
    world.events.emit(GameEvent::quest(Some(quest_id), message));
    Ok(())
}

/// Advance every active quest that matches the action; emits quest events
/// on progress and completion.
pub(crate) fn apply_quest_action(world: &mut World, action: &QuestAction) {
    let active: Vec<delver_domain::QuestId> = world.player.active_quests.clone();
    for quest_id in active {
        let Some(quest) = world.quests.get_mut(&quest_id) else {
            continue;
        };
        if quest.apply_action(action) {
            let title = quest.title.clone();
            let completed = quest.status == QuestStatus::Completed;
            if completed {
                world.events.emit(GameEvent::quest(
                    Some(quest_id),
                    format!("Quest complete: {title}! Claim your reward."),
                ));
            } else {
                world
                    .events
                    .emit(GameEvent::quest(Some(quest_id), format!("Progress: {title}")));
            }
        }
    }
}
