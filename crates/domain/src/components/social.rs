//! Social component: per-actor disposition, personality, and event memory
//!
//! Disposition is an integer in [-100, +100] describing this NPC's opinion of
//! a specific actor, clamped on every update. -100 means attack on sight.
//! Boss NPCs have hostility pinned and never de-escalate.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::SocialEventKind;
use crate::EntityId;

/// Disposition bounds
pub const DISPOSITION_MIN: i32 = -100;
pub const DISPOSITION_MAX: i32 = 100;

/// Attack-on-sight threshold
pub const HOSTILITY_THRESHOLD: i32 = -100;

/// How many social events an NPC remembers
const EVENT_LOG_CAPACITY: usize = 20;

/// One remembered social event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialEventRecord {
    pub actor: EntityId,
    pub kind: SocialEventKind,
    pub delta: i32,
    pub at: DateTime<Utc>,
}

/// Kind of social challenge declared on an NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialChallengeKind {
    Persuade,
    Intimidate,
}

/// A one-shot CHA challenge declared on an NPC; one attempt per challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialChallenge {
    pub kind: SocialChallengeKind,
    pub dc: u8,
    /// Disposition bonus granted on success
    pub success_delta: i32,
    /// State flag raised on the space on success (reveals exits, skips combat)
    pub unlock_flag: Option<String>,
    pub attempted: bool,
}

/// Per-NPC social state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialComponent {
    /// actor -> disposition, absent means 0
    dispositions: BTreeMap<EntityId, i32>,
    personality: String,
    traits: Vec<String>,
    /// Bounded FIFO of recent events
    recent_events: VecDeque<SocialEventRecord>,
    /// Pending social challenges, by kind
    challenges: Vec<SocialChallenge>,
}

impl SocialComponent {
    pub fn new(personality: impl Into<String>) -> Self {
        Self {
            dispositions: BTreeMap::new(),
            personality: personality.into(),
            traits: Vec::new(),
            recent_events: VecDeque::new(),
            challenges: Vec::new(),
        }
    }

    // Read accessors
    pub fn personality(&self) -> &str {
        &self.personality
    }

    pub fn traits(&self) -> &[String] {
        &self.traits
    }

    pub fn recent_events(&self) -> impl Iterator<Item = &SocialEventRecord> {
        self.recent_events.iter()
    }

    /// Disposition toward a specific actor, 0 for strangers
    pub fn disposition_toward(&self, actor: EntityId) -> i32 {
        self.dispositions.get(&actor).copied().unwrap_or(0)
    }

    /// Attack-on-sight check
    pub fn is_hostile_toward(&self, actor: EntityId) -> bool {
        self.disposition_toward(actor) <= HOSTILITY_THRESHOLD
    }

    pub fn challenges(&self) -> &[SocialChallenge] {
        &self.challenges
    }

    pub fn challenge(&self, kind: SocialChallengeKind) -> Option<&SocialChallenge> {
        self.challenges.iter().find(|c| c.kind == kind)
    }

    // Builder methods
    pub fn with_trait(mut self, value: impl Into<String>) -> Self {
        self.traits.push(value.into());
        self
    }

    pub fn with_disposition(mut self, actor: EntityId, value: i32) -> Self {
        self.dispositions
            .insert(actor, value.clamp(DISPOSITION_MIN, DISPOSITION_MAX));
        self
    }

    pub fn with_challenge(mut self, challenge: SocialChallenge) -> Self {
        self.challenges.push(challenge);
        self
    }

    // Mutators

    /// Apply a signed delta to the disposition toward an actor, clamped, and
    /// append the event to the bounded log. Returns the new disposition.
    pub fn apply_event(
        &mut self,
        actor: EntityId,
        kind: SocialEventKind,
        at: DateTime<Utc>,
    ) -> i32 {
        let delta = kind.disposition_delta();
        let current = self.disposition_toward(actor);
        let updated = (current + delta).clamp(DISPOSITION_MIN, DISPOSITION_MAX);
        self.dispositions.insert(actor, updated);

        if self.recent_events.len() == EVENT_LOG_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(SocialEventRecord {
            actor,
            kind,
            delta,
            at,
        });
        updated
    }

    /// Apply an explicit delta (challenge rewards, scripted shifts)
    pub fn adjust_disposition(&mut self, actor: EntityId, delta: i32) -> i32 {
        let updated =
            (self.disposition_toward(actor) + delta).clamp(DISPOSITION_MIN, DISPOSITION_MAX);
        self.dispositions.insert(actor, updated);
        updated
    }

    /// Mark a challenge as spent. Returns false when already attempted or absent.
    pub fn consume_challenge(&mut self, kind: SocialChallengeKind) -> Option<SocialChallenge> {
        let challenge = self
            .challenges
            .iter_mut()
            .find(|c| c.kind == kind && !c.attempted)?;
        challenge.attempted = true;
        Some(challenge.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        chrono::TimeZone::timestamp_opt(&Utc, 1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_disposition_clamped_on_every_update() {
        let mut social = SocialComponent::new("volatile");
        let actor = EntityId::new();
        for _ in 0..50 {
            social.apply_event(actor, SocialEventKind::Attacked, now());
        }
        assert_eq!(social.disposition_toward(actor), DISPOSITION_MIN);

        for _ in 0..200 {
            social.apply_event(actor, SocialEventKind::ItemGiven, now());
        }
        assert_eq!(social.disposition_toward(actor), DISPOSITION_MAX);
    }

    #[test]
    fn test_event_log_bounded() {
        let mut social = SocialComponent::new("chatty");
        let actor = EntityId::new();
        for _ in 0..40 {
            social.apply_event(actor, SocialEventKind::QuestionAsked, now());
        }
        assert_eq!(social.recent_events().count(), 20);
    }

    #[test]
    fn test_question_asked_is_neutral() {
        let mut social = SocialComponent::new("gruff merchant");
        let actor = EntityId::new();
        let after = social.apply_event(actor, SocialEventKind::QuestionAsked, now());
        assert_eq!(after, 0);
    }

    #[test]
    fn test_hostility_threshold() {
        let actor = EntityId::new();
        let social = SocialComponent::new("feral").with_disposition(actor, -100);
        assert!(social.is_hostile_toward(actor));
        let social = SocialComponent::new("wary").with_disposition(actor, -99);
        assert!(!social.is_hostile_toward(actor));
    }

    #[test]
    fn test_challenge_single_attempt() {
        let mut social = SocialComponent::new("stubborn").with_challenge(SocialChallenge {
            kind: SocialChallengeKind::Persuade,
            dc: 14,
            success_delta: 20,
            unlock_flag: None,
            attempted: false,
        });
        assert!(social.consume_challenge(SocialChallengeKind::Persuade).is_some());
        assert!(social.consume_challenge(SocialChallengeKind::Persuade).is_none());
    }

    #[test]
    fn test_strangers_start_at_zero() {
        let social = SocialComponent::new("aloof");
        assert_eq!(social.disposition_toward(EntityId::new()), 0);
    }
}
