//! Social handlers: talk, say, questions, emotes, persuasion

use chrono::Utc;

use delver_domain::{
    Component, ComponentKind, EntityId, GameError, GameResult, KnowledgeComponent, QuestAction,
    SocialChallengeKind, SocialEventKind,
};

use crate::llm::ChatRequest;
use crate::skills::SkillEngine;
use crate::social::{emote_outcome, DispositionBand, SocialEngine};
use crate::world::World;

fn require_social_npc(world: &World, name: &str) -> GameResult<EntityId> {
    let entity = world
        .find_in_space(name)
        .ok_or_else(|| GameError::condition(format!("there is no {name} here")))?;
    if entity.component(ComponentKind::Social).is_none() {
        return Err(GameError::condition(format!(
            "{} has nothing to say to you",
            entity.name()
        )));
    }
    Ok(entity.id())
}

pub(crate) async fn handle_talk(world: &mut World, npc: &str) -> GameResult<()> {
    let npc_id = require_social_npc(world, npc)?;
    let entity = world
        .store
        .get(npc_id)
        .ok_or_else(|| GameError::not_found("Entity", npc_id))?;
    let npc_name = entity.name().to_string();
    let personality = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social())
        .map(|s| s.personality().to_string())
        .unwrap_or_default();

    let greeting = if world.config.llm_enabled() {
        let request = ChatRequest::new(
            &world.config.llm_model,
            format!(
                "You are {npc_name}, {personality}, an NPC underground. Greet the approaching \
                 stranger in one short line of dialogue. Output only the spoken words."
            ),
            "A dusty traveler approaches and hails you.",
        )
        .with_max_tokens(60);
        match world.llm.chat_completion(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                format!("{npc_name} says: \"{}\"", response.content.trim())
            }
            Ok(_) | Err(_) => canned_greeting(&npc_name, &personality),
        }
    } else {
        canned_greeting(&npc_name, &personality)
    };

    world.player.last_conversation_partner = Some(npc_id);
    world.events.narrative(greeting);
    super::quests::apply_quest_action(
        world,
        &QuestAction::TalkedToNpc {
            npc: npc_id,
            npc_name,
        },
    );
    Ok(())
}

fn canned_greeting(npc_name: &str, personality: &str) -> String {
    if personality.is_empty() {
        format!("{npc_name} regards you in silence.")
    } else {
        format!("{npc_name} gives you a {personality} nod.")
    }
}

pub(crate) async fn handle_say(world: &mut World, text: &str) -> GameResult<()> {
    world
        .events
        .emit(delver_domain::GameEvent::player_action(format!(
            "You say: \"{text}\""
        )));
    let Some(partner) = world.player.last_conversation_partner else {
        world
            .events
            .narrative("Your words carry into the dark and are not answered.");
        return Ok(());
    };
    let Some(entity) = world.store.get(partner) else {
        world.player.last_conversation_partner = None;
        world
            .events
            .narrative("Whoever you were talking to is gone.");
        return Ok(());
    };
    let npc_name = entity.name().to_string();

    let reply = if world.config.llm_enabled() {
        let personality = entity
            .component(ComponentKind::Social)
            .and_then(|c| c.as_social())
            .map(|s| s.personality().to_string())
            .unwrap_or_default();
        let request = ChatRequest::new(
            &world.config.llm_model,
            format!(
                "You are {npc_name}, {personality}, an NPC underground. Reply to the player in \
                 one or two lines of dialogue. Output only the spoken words."
            ),
            format!("The player says: \"{text}\""),
        )
        .with_max_tokens(80);
        match world.llm.chat_completion(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                format!("{npc_name} says: \"{}\"", response.content.trim())
            }
            Ok(_) | Err(_) => format!("{npc_name} grunts noncommittally."),
        }
    } else {
        format!("{npc_name} grunts noncommittally.")
    };
    world.events.narrative(reply);
    Ok(())
}

pub(crate) async fn handle_ask(
    world: &mut World,
    npc: Option<&str>,
    topic: &str,
) -> GameResult<()> {
    let npc_id = match npc {
        Some(name) => require_social_npc(world, name)?,
        None => world
            .player
            .last_conversation_partner
            .ok_or_else(|| GameError::condition("ask whom? talk to someone first"))?,
    };
    let entity = world
        .store
        .get(npc_id)
        .ok_or_else(|| GameError::not_found("Entity", npc_id))?;
    let npc_name = entity.name().to_string();
    let social = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social().cloned())
        .ok_or_else(|| GameError::condition(format!("{npc_name} will not be questioned")))?;
    let mut knowledge = entity
        .component(ComponentKind::Knowledge)
        .and_then(|c| c.as_knowledge().cloned())
        .unwrap_or_else(KnowledgeComponent::new);

    let player_id = world.player.id();
    let disposition = social.disposition_toward(player_id);
    let mut space_context = world
        .current_space()
        .map(|s| format!("{} - {}", s.name, s.description))
        .unwrap_or_default();

    // ground the answer in remembered events, when memory is reachable
    if let Ok(recalled) = world.memory.recall(world.llm.as_ref(), topic, 2).await {
        if !recalled.is_empty() {
            space_context.push_str("\nRemembered: ");
            space_context.push_str(&recalled.join("; "));
        }
    }

    let engine = SocialEngine::new(world.llm.as_ref(), &world.config);
    let (answer, from_cache) = engine
        .ask_question(
            &npc_name,
            &social,
            &mut knowledge,
            disposition,
            topic,
            &space_context,
        )
        .await?;

    // cache and disposition bookkeeping back onto the entity
    world.store.update(npc_id, |entity| {
        entity.attach(Component::Knowledge(knowledge.clone()));
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, SocialEventKind::QuestionAsked, Utc::now());
        }
    })?;

    world.player.last_conversation_partner = Some(npc_id);
    if from_cache {
        tracing::debug!(topic, "knowledge cache hit");
    }
    world
        .events
        .narrative(format!("{npc_name} says: \"{answer}\""));
    Ok(())
}

pub(crate) async fn handle_emote(
    world: &mut World,
    keyword: &str,
    target: Option<&str>,
) -> GameResult<()> {
    let Some(target) = target else {
        world
            .events
            .emit(delver_domain::GameEvent::player_action(format!(
                "You {keyword} at no one in particular."
            )));
        return Ok(());
    };
    let npc_id = require_social_npc(world, target)?;
    let entity = world
        .store
        .get(npc_id)
        .ok_or_else(|| GameError::not_found("Entity", npc_id))?;
    let npc_name = entity.name().to_string();
    let player_id = world.player.id();
    let disposition = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social())
        .map(|s| s.disposition_toward(player_id))
        .unwrap_or(0);

    // unknown keywords fail softly
    let Some(outcome) = emote_outcome(keyword, &npc_name, DispositionBand::of(disposition)) else {
        world
            .events
            .narrative(format!("Your attempt at a {keyword} goes unnoticed."));
        return Ok(());
    };

    let kind = SocialEventKind::EmoteReceived {
        emote: keyword.to_string(),
        delta: outcome.delta,
    };
    world.store.update(npc_id, |entity| {
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            social.apply_event(player_id, kind.clone(), Utc::now());
        }
    })?;
    world.events.narrative(outcome.narrative);
    Ok(())
}

pub(crate) async fn handle_challenge(
    world: &mut World,
    target: &str,
    kind: SocialChallengeKind,
) -> GameResult<()> {
    let npc_id = require_social_npc(world, target)?;
    let entity = world
        .store
        .get(npc_id)
        .ok_or_else(|| GameError::not_found("Entity", npc_id))?;
    let npc_name = entity.name().to_string();
    let is_boss = entity
        .component(ComponentKind::Combat)
        .and_then(|c| c.as_combat())
        .map(|c| c.is_boss)
        .unwrap_or(false);
    let mut social = entity
        .component(ComponentKind::Social)
        .and_then(|c| c.as_social().cloned())
        .ok_or_else(|| GameError::condition(format!("{npc_name} cannot be swayed")))?;

    let social_engine = SocialEngine::new(world.llm.as_ref(), &world.config);
    let skill_engine = SkillEngine::new(&world.config);
    let outcome = social_engine.attempt_challenge(
        kind,
        &world.player,
        &npc_name,
        &mut social,
        is_boss,
        &skill_engine,
        &mut world.rng,
    )?;

    let player_id = world.player.id();
    let delta = outcome.disposition_delta;
    let event_kind = match kind {
        SocialChallengeKind::Persuade => SocialEventKind::Persuaded,
        SocialChallengeKind::Intimidate => SocialEventKind::Intimidated,
    };
    world.store.update(npc_id, |entity| {
        entity.attach(Component::Social(social.clone()));
        if let Some(social) = entity
            .component_mut(ComponentKind::Social)
            .and_then(|c| c.as_social_mut())
        {
            if outcome.success {
                social.apply_event(player_id, event_kind.clone(), Utc::now());
            }
            social.adjust_disposition(player_id, delta);
        }
    })?;

    if let Some(flag) = &outcome.unlock_flag {
        let space_id = world.player.space_id;
        let space = world.space_mut(space_id)?;
        space.set_flag(flag.clone(), true);
        let flags = space.flags().clone();
        world.db.spaces.update_flags(space_id, &flags).await?;
    }
    world.events.narrative(outcome.narrative);
    Ok(())
}
