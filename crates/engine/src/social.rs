//! Social interaction: emotes, knowledge querying, persuasion
//!
//! Disposition deltas are applied through the social component (which clamps
//! and logs); this module supplies the emote table, the LLM-backed question
//! answering with per-topic caching, and the one-shot CHA challenges.

use chrono::Utc;
use rand::rngs::StdRng;

use delver_domain::{
    Ability, GameError, GameResult, KnowledgeComponent, PlayerState, SocialChallenge,
    SocialChallengeKind, SocialComponent,
};

use crate::config::GameConfig;
use crate::llm::{ChatRequest, LlmPort};
use crate::skills::SkillEngine;

/// Disposition bands used by the emote table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionBand {
    Hostile,
    Unfriendly,
    Neutral,
    Friendly,
    Devoted,
}

impl DispositionBand {
    pub fn of(disposition: i32) -> Self {
        match disposition {
            i32::MIN..=-51 => Self::Hostile,
            -50..=-11 => Self::Unfriendly,
            -10..=10 => Self::Neutral,
            11..=50 => Self::Friendly,
            _ => Self::Devoted,
        }
    }
}

/// Emote outcome: narrative line plus disposition delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteOutcome {
    pub narrative: String,
    pub delta: i32,
}

/// (keyword x band) -> outcome. Unknown keywords return None (soft failure).
pub fn emote_outcome(keyword: &str, npc_name: &str, band: DispositionBand) -> Option<EmoteOutcome> {
    use DispositionBand::*;
    let (narrative, delta): (String, i32) = match (keyword, band) {
        ("smile", Hostile) => (format!("{npc_name} bares teeth at your smile."), -1),
        ("smile", Unfriendly) => (format!("{npc_name} eyes you warily."), 1),
        ("smile", _) => (format!("{npc_name} returns your smile."), 2),
        ("wave", Hostile) => (format!("{npc_name} ignores your wave."), 0),
        ("wave", _) => (format!("{npc_name} nods in acknowledgement."), 1),
        ("bow", Hostile | Unfriendly) => (format!("{npc_name} snorts at the courtesy."), 1),
        ("bow", _) => (format!("{npc_name} inclines their head, pleased."), 3),
        ("laugh", Hostile) => (format!("{npc_name} takes your laughter badly."), -4),
        ("laugh", Unfriendly) => (format!("{npc_name} does not see the joke."), -2),
        ("laugh", _) => (format!("{npc_name} chuckles along."), 2),
        ("scowl", Friendly | Devoted) => (format!("{npc_name} looks hurt by your scowl."), -3),
        ("scowl", _) => (format!("{npc_name} scowls right back."), -2),
        ("threaten", Devoted) => (format!("{npc_name} laughs off your threat."), -2),
        ("threaten", _) => (format!("{npc_name} stiffens at your threat."), -8),
        ("dance", Hostile) => (format!("{npc_name} watches your dance, unmoved."), 0),
        ("dance", _) => (format!("{npc_name} claps at your dance."), 2),
        _ => return None,
    };
    Some(EmoteOutcome { narrative, delta })
}

/// Result of a social challenge attempt
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    pub success: bool,
    pub narrative: String,
    /// Space flag raised on success, when the challenge unlocks one
    pub unlock_flag: Option<String>,
    pub disposition_delta: i32,
}

pub struct SocialEngine<'a> {
    llm: &'a dyn LlmPort,
    config: &'a GameConfig,
}

impl<'a> SocialEngine<'a> {
    pub fn new(llm: &'a dyn LlmPort, config: &'a GameConfig) -> Self {
        Self { llm, config }
    }

    /// Answer a question about a topic, reusing the NPC's knowledge cache.
    /// Returns the answer and whether it came from cache.
    pub async fn ask_question(
        &self,
        npc_name: &str,
        social: &SocialComponent,
        knowledge: &mut KnowledgeComponent,
        disposition: i32,
        topic: &str,
        space_context: &str,
    ) -> GameResult<(String, bool)> {
        if let Some(entry) = knowledge.get(topic) {
            return Ok((entry.answer.clone(), true));
        }

        let answer = if self.config.llm_enabled() {
            let request = ChatRequest::new(
                &self.config.llm_model,
                format!(
                    "You are {npc_name}, an NPC in a dungeon world. Personality: {}. Traits: {}. \
                     Your disposition toward the asker is {disposition} on a -100..100 scale. \
                     Answer in character, in one or two sentences.",
                    social.personality(),
                    social.traits().join(", "),
                ),
                format!("Scene: {space_context}\nThe asker wants to know about: {topic}"),
            )
            .with_max_tokens(120);
            match self.llm.chat_completion(request).await {
                Ok(response) if !response.content.trim().is_empty() => {
                    response.content.trim().to_string()
                }
                Ok(_) | Err(_) => canned_answer(npc_name, topic),
            }
        } else {
            canned_answer(npc_name, topic)
        };

        knowledge.insert(topic, format!("about {topic}"), answer.clone(), Utc::now());
        Ok((answer, false))
    }

    /// Attempt a declared persuasion/intimidation challenge. Opposed CHA
    /// check; one attempt per challenge per NPC.
    pub fn attempt_challenge(
        &self,
        kind: SocialChallengeKind,
        player: &PlayerState,
        npc_name: &str,
        social: &mut SocialComponent,
        is_boss: bool,
        engine: &SkillEngine<'_>,
        rng: &mut StdRng,
    ) -> GameResult<ChallengeOutcome> {
        if is_boss {
            // bosses never de-escalate
            return Err(GameError::condition(format!(
                "{npc_name} is beyond words"
            )));
        }
        let Some(challenge) = social.challenge(kind) else {
            return Err(GameError::condition(format!(
                "{npc_name} has no interest in this contest"
            )));
        };
        if challenge.attempted {
            return Err(GameError::condition("you have already tried that"));
        }
        let SocialChallenge {
            dc,
            success_delta,
            unlock_flag,
            ..
        } = social
            .consume_challenge(kind)
            .ok_or_else(|| GameError::condition("you have already tried that"))?;

        let result =
            engine.check_with_modifier(player.abilities.modifier(Ability::Cha), i32::from(dc), rng);
        if result.outcome.is_success() {
            let verb = match kind {
                SocialChallengeKind::Persuade => "is persuaded",
                SocialChallengeKind::Intimidate => "backs down",
            };
            Ok(ChallengeOutcome {
                success: true,
                narrative: format!("{npc_name} {verb}. ({})", result.roll.breakdown()),
                unlock_flag,
                disposition_delta: success_delta,
            })
        } else {
            Ok(ChallengeOutcome {
                success: false,
                narrative: format!(
                    "{npc_name} is unmoved. ({})",
                    result.roll.breakdown()
                ),
                unlock_flag: None,
                disposition_delta: match kind {
                    SocialChallengeKind::Persuade => -2,
                    SocialChallengeKind::Intimidate => -6,
                },
            })
        }
    }
}

fn canned_answer(npc_name: &str, topic: &str) -> String {
    format!("{npc_name} shrugs. \"Couldn't say much about {topic}.\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StubLlm;
    use delver_domain::EntityId;

    #[test]
    fn test_bands() {
        assert_eq!(DispositionBand::of(-100), DispositionBand::Hostile);
        assert_eq!(DispositionBand::of(-30), DispositionBand::Unfriendly);
        assert_eq!(DispositionBand::of(0), DispositionBand::Neutral);
        assert_eq!(DispositionBand::of(30), DispositionBand::Friendly);
        assert_eq!(DispositionBand::of(80), DispositionBand::Devoted);
    }

    #[test]
    fn test_emote_table_varies_by_band() {
        let friendly = emote_outcome("smile", "Mara", DispositionBand::Friendly).expect("known");
        let hostile = emote_outcome("smile", "Mara", DispositionBand::Hostile).expect("known");
        assert!(friendly.delta > hostile.delta);
    }

    #[test]
    fn test_unknown_emote_fails_softly() {
        assert!(emote_outcome("yodel", "Mara", DispositionBand::Neutral).is_none());
    }

    #[tokio::test]
    async fn test_question_cached_after_first_ask() {
        let stub = StubLlm::new().respond_with("wares", "Only the finest salvage.");
        let config = GameConfig {
            openai_api_key: Some("key".into()),
            ..GameConfig::default()
        };
        let engine = SocialEngine::new(&stub, &config);
        let social = SocialComponent::new("gruff merchant");
        let mut knowledge = KnowledgeComponent::new();

        let (first, cached) = engine
            .ask_question("Merchant", &social, &mut knowledge, 0, "Wares", "a stall")
            .await
            .expect("ask");
        assert!(!cached);
        assert_eq!(first, "Only the finest salvage.");
        assert_eq!(stub.call_count(), 1);

        // re-asking under a different spelling hits the cache, no LLM call
        let (second, cached) = engine
            .ask_question("Merchant", &social, &mut knowledge, 0, "  wares ", "a stall")
            .await
            .expect("ask");
        assert!(cached);
        assert_eq!(second, first);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_question_fallback_without_llm() {
        let stub = StubLlm::new();
        let config = GameConfig::default();
        let engine = SocialEngine::new(&stub, &config);
        let social = SocialComponent::new("taciturn");
        let mut knowledge = KnowledgeComponent::new();

        let (answer, cached) = engine
            .ask_question("Hermit", &social, &mut knowledge, 0, "the abyss", "a cave")
            .await
            .expect("ask");
        assert!(!cached);
        assert!(answer.contains("the abyss"));
        assert_eq!(stub.call_count(), 0);
    }

    #[test]
    fn test_challenge_single_attempt_and_boss_pin() {
        let stub = StubLlm::new();
        let config = GameConfig::default();
        let social_engine = SocialEngine::new(&stub, &config);
        let skill_engine = SkillEngine::new(&config);
        let player = PlayerState::new("Tavi", delver_domain::ChunkId::new());
        let mut rng: StdRng = rand::SeedableRng::seed_from_u64(4);

        let mut social = SocialComponent::new("stubborn").with_challenge(SocialChallenge {
            kind: SocialChallengeKind::Persuade,
            dc: 10,
            success_delta: 20,
            unlock_flag: Some("gate_opened".into()),
            attempted: false,
        });

        // boss pin rejects before the roll
        let boss_attempt = social_engine.attempt_challenge(
            SocialChallengeKind::Persuade,
            &player,
            "Warden",
            &mut social,
            true,
            &skill_engine,
            &mut rng,
        );
        assert!(matches!(boss_attempt, Err(GameError::ConditionNotMet(_))));

        let first = social_engine
            .attempt_challenge(
                SocialChallengeKind::Persuade,
                &player,
                "Guard",
                &mut social,
                false,
                &skill_engine,
                &mut rng,
            )
            .expect("attempt");
        let _ = first.success;

        let second = social_engine.attempt_challenge(
            SocialChallengeKind::Persuade,
            &player,
            "Guard",
            &mut social,
            false,
            &skill_engine,
            &mut rng,
        );
        assert!(matches!(second, Err(GameError::ConditionNotMet(_))));
    }

    #[test]
    fn test_disposition_delta_applies_via_component() {
        let mut social = SocialComponent::new("touchy");
        let actor = EntityId::new();
        let band = DispositionBand::of(social.disposition_toward(actor));
        let outcome = emote_outcome("threaten", "Guard", band).expect("known");
        let after = social.adjust_disposition(actor, outcome.delta);
        assert_eq!(after, -8);
    }
}
