//! Skill and perk engine
//!
//! Checks, opposed checks, use-based XP with lucky promotion, perk
//! milestones, and unlock methods. All rolls go through the caller's seeded
//! rng; all state changes happen on the passed component so level changes
//! stay atomic with xp updates.

use rand::rngs::StdRng;

use delver_domain::{
    roll_d100, CheckOutcome, D20Roll, GameError, GameResult, SkillBuff, SkillComponent,
    SkillEvent, SkillState, UnlockMethod,
};

use crate::config::GameConfig;

/// Fraction of base XP granted on a failed use
const FAILURE_XP_FRACTION: f64 = 0.2;

/// Chance an unlocked-by-attempt roll succeeds (d100 <= this)
const ATTEMPT_UNLOCK_CHANCE: u8 = 10;

/// Result of a single skill check
#[derive(Debug, Clone, Copy)]
pub struct SkillCheckResult {
    pub roll: D20Roll,
    pub outcome: CheckOutcome,
    pub dc: i32,
}

/// Result of an opposed check; ties go to the defender
#[derive(Debug, Clone, Copy)]
pub struct OpposedResult {
    pub attacker_roll: D20Roll,
    pub defender_roll: D20Roll,
    pub attacker_wins: bool,
}

pub struct SkillEngine<'a> {
    config: &'a GameConfig,
}

impl<'a> SkillEngine<'a> {
    pub fn new(config: &'a GameConfig) -> Self {
        Self { config }
    }

    /// d20 + effective level vs DC. Natural 20 always succeeds, natural 1
    /// always fails.
    pub fn check(
        &self,
        skills: &SkillComponent,
        skill_name: &str,
        dc: i32,
        rng: &mut StdRng,
    ) -> SkillCheckResult {
        let roll = D20Roll::roll(rng, skills.effective_level(skill_name));
        SkillCheckResult {
            roll,
            outcome: CheckOutcome::classify(roll, dc),
            dc,
        }
    }

    /// Check against a flat modifier (ability checks, legacy paths)
    pub fn check_with_modifier(&self, modifier: i32, dc: i32, rng: &mut StdRng) -> SkillCheckResult {
        let roll = D20Roll::roll(rng, modifier);
        SkillCheckResult {
            roll,
            outcome: CheckOutcome::classify(roll, dc),
            dc,
        }
    }

    /// Opposed totals; the defender keeps ties
    pub fn opposed(
        &self,
        attacker: &SkillComponent,
        attacker_skill: &str,
        defender: &SkillComponent,
        defender_skill: &str,
        rng: &mut StdRng,
    ) -> OpposedResult {
        let attacker_roll = D20Roll::roll(rng, attacker.effective_level(attacker_skill));
        let defender_roll = D20Roll::roll(rng, defender.effective_level(defender_skill));
        OpposedResult {
            attacker_roll,
            defender_roll,
            attacker_wins: attacker_roll.total > defender_roll.total,
        }
    }

    /// Grant use-based XP, with the lucky-promotion path rolled first.
    ///
    /// Returns the events produced, in order. Multiple level thresholds may
    /// be crossed by one grant.
    pub fn grant_xp(
        &self,
        skills: &mut SkillComponent,
        skill_name: &str,
        base_xp: u64,
        success: bool,
        rng: &mut StdRng,
    ) -> Vec<SkillEvent> {
        let mut events = Vec::new();
        let skill = skills.skill_entry(skill_name);
        if !skill.unlocked {
            return events;
        }

        // Lucky promotion: d100 against floor(base / sqrt(level + 1))
        if self.config.skill_enable_lucky_progression {
            let threshold = (f64::from(self.config.skill_base_lucky_chance)
                / f64::from(skill.level + 1).sqrt())
            .floor() as u8;
            if threshold > 0 && roll_d100(rng) <= threshold {
                skill.promote();
                events.push(SkillEvent::LevelUp {
                    skill: skill.name.clone(),
                    new_level: skill.level,
                    is_at_perk_milestone: skill.is_at_perk_milestone(),
                    via_lucky_promotion: true,
                });
                return events;
            }
        }

        let fraction = if success { 1.0 } else { FAILURE_XP_FRACTION };
        let amount = (base_xp as f64 * fraction * self.config.skill_xp_multiplier).round() as u64;
        if amount == 0 {
            return events;
        }
        let gained = skill.grant_xp(amount);
        events.push(SkillEvent::XpGained {
            skill: skill.name.clone(),
            amount,
            current_xp: skill.xp,
            level: skill.level,
        });
        for offset in 0..gained {
            let reached = skill.level - gained + offset + 1;
            events.push(SkillEvent::LevelUp {
                skill: skill.name.clone(),
                new_level: reached,
                is_at_perk_milestone: reached > 0 && reached % 10 == 0,
                via_lucky_promotion: false,
            });
        }
        events
    }

    /// Try to unlock a skill by one of the four methods
    pub fn unlock(
        &self,
        skills: &mut SkillComponent,
        skill_name: &str,
        method: UnlockMethod,
        rng: &mut StdRng,
    ) -> GameResult<Option<SkillEvent>> {
        // prerequisite is read-only; evaluate before borrowing the entry
        if let UnlockMethod::Prerequisite { skill, level } = &method {
            let met = skills
                .skill(skill)
                .map(|s| s.unlocked && s.level >= *level)
                .unwrap_or(false);
            if !met {
                return Err(GameError::condition(format!(
                    "requires {skill} at level {level}"
                )));
            }
        }

        let state = skills.skill_entry(skill_name);
        if state.unlocked {
            return Err(GameError::conflict("Skill", skill_name));
        }

        match &method {
            UnlockMethod::Attempt => {
                if roll_d100(rng) > ATTEMPT_UNLOCK_CHANCE {
                    return Ok(None);
                }
                state.unlocked = true;
            }
            UnlockMethod::Observation { .. } => {
                state.unlocked = true;
                state.add_buff(SkillBuff {
                    amount: 5,
                    source: "observation".into(),
                    remaining_uses: Some(10),
                });
            }
            UnlockMethod::Training { .. } => {
                state.unlocked = true;
                state.level = state.level.max(1);
                state.add_buff(SkillBuff {
                    amount: 10,
                    source: "training".into(),
                    remaining_uses: Some(10),
                });
            }
            UnlockMethod::Prerequisite { .. } => {
                state.unlocked = true;
            }
        }

        Ok(Some(SkillEvent::SkillUnlocked {
            skill: skill_name.to_string(),
            method,
        }))
    }

    /// Record a perk choice at a milestone
    pub fn choose_perk(
        &self,
        skills: &mut SkillComponent,
        skill_name: &str,
        perk: &str,
    ) -> GameResult<SkillEvent> {
        let state = skills
            .skill_mut(skill_name)
            .ok_or_else(|| GameError::not_found("Skill", skill_name))?;
        if !state.is_at_perk_milestone() {
            return Err(GameError::condition("no perk milestone pending"));
        }
        if !available_perks(state).contains(&perk) {
            return Err(GameError::invalid(format!("unknown perk '{perk}'")));
        }
        if state.has_perk(perk) {
            return Err(GameError::conflict("Perk", perk));
        }
        state.add_perk(perk);
        Ok(SkillEvent::PerkChosen {
            skill: skill_name.to_string(),
            perk: perk.to_string(),
        })
    }
}

/// Data-driven perk sets, keyed by skill tag
pub fn available_perks(skill: &SkillState) -> Vec<&'static str> {
    let mut perks: Vec<&'static str> = Vec::new();
    if skill.tags.iter().any(|t| t == "combat") {
        perks.extend(["heavy_hand", "riposte", "iron_skin"]);
    }
    if skill.tags.iter().any(|t| t == "magic") {
        perks.extend(["deep_well", "twin_cast"]);
    }
    if skill.tags.iter().any(|t| t == "social") {
        perks.extend(["silver_tongue", "cold_read"]);
    }
    if perks.is_empty() {
        perks.extend(["steady_hands", "second_wind"]);
    }
    perks
}
