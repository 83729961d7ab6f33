//! Dice rolling value objects
//!
//! All combat and skill randomness flows through this module so that a world
//! seeded with a fixed RNG replays deterministically. Rolls take a
//! caller-provided [`Rng`] instead of reaching for thread-local entropy.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Result of a single d20 roll with a modifier applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct D20Roll {
    /// The raw die face, 1..=20
    pub natural: u8,
    /// Modifier added after the roll
    pub modifier: i32,
    /// natural + modifier
    pub total: i32,
}

impl D20Roll {
    pub fn roll(rng: &mut impl Rng, modifier: i32) -> Self {
        let natural = rng.gen_range(1..=20u8);
        Self {
            natural,
            modifier,
            total: i32::from(natural) + modifier,
        }
    }

    pub fn is_natural_20(&self) -> bool {
        self.natural == 20
    }

    pub fn is_natural_1(&self) -> bool {
        self.natural == 1
    }

    /// Format as a breakdown string (e.g., "d20(14) + 5 = 19")
    pub fn breakdown(&self) -> String {
        if self.modifier == 0 {
            format!("d20({}) = {}", self.natural, self.total)
        } else if self.modifier > 0 {
            format!("d20({}) + {} = {}", self.natural, self.modifier, self.total)
        } else {
            format!("d20({}) - {} = {}", self.natural, -self.modifier, self.total)
        }
    }
}

/// Roll a d100, 1..=100
pub fn roll_d100(rng: &mut impl Rng) -> u8 {
    rng.gen_range(1..=100u8)
}

/// Roll uniformly in `lo..=hi`
pub fn roll_range(rng: &mut impl Rng, lo: i32, hi: i32) -> i32 {
    if lo >= hi {
        return lo;
    }
    rng.gen_range(lo..=hi)
}

/// Outcome of a check against a difficulty class
///
/// Natural 20 always succeeds and natural 1 always fails, regardless of
/// modifiers or DC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckOutcome {
    CriticalSuccess,
    Success { margin: i32 },
    Failure { margin: i32 },
    CriticalFailure,
}

impl CheckOutcome {
    /// Classify a d20 roll against a DC
    pub fn classify(roll: D20Roll, dc: i32) -> Self {
        if roll.is_natural_20() {
            Self::CriticalSuccess
        } else if roll.is_natural_1() {
            Self::CriticalFailure
        } else if roll.total >= dc {
            Self::Success {
                margin: roll.total - dc,
            }
        } else {
            Self::Failure {
                margin: dc - roll.total,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success { .. })
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::CriticalFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_d20_roll_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let roll = D20Roll::roll(&mut rng, 0);
            assert!((1..=20).contains(&roll.natural));
            assert_eq!(roll.total, i32::from(roll.natural));
        }
    }

    #[test]
    fn test_d20_roll_with_modifier() {
        let mut rng = StdRng::seed_from_u64(7);
        let roll = D20Roll::roll(&mut rng, 5);
        assert_eq!(roll.total, i32::from(roll.natural) + 5);
    }

    #[test]
    fn test_seeded_rolls_are_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(D20Roll::roll(&mut a, 3), D20Roll::roll(&mut b, 3));
        }
    }

    #[test]
    fn test_natural_20_always_succeeds() {
        let roll = D20Roll {
            natural: 20,
            modifier: -30,
            total: -10,
        };
        assert_eq!(CheckOutcome::classify(roll, 50), CheckOutcome::CriticalSuccess);
    }

    #[test]
    fn test_natural_1_always_fails() {
        let roll = D20Roll {
            natural: 1,
            modifier: 40,
            total: 41,
        };
        assert_eq!(CheckOutcome::classify(roll, 5), CheckOutcome::CriticalFailure);
    }

    #[test]
    fn test_margins() {
        let roll = D20Roll {
            natural: 12,
            modifier: 3,
            total: 15,
        };
        assert_eq!(
            CheckOutcome::classify(roll, 10),
            CheckOutcome::Success { margin: 5 }
        );
        assert_eq!(
            CheckOutcome::classify(roll, 18),
            CheckOutcome::Failure { margin: 3 }
        );
    }

    #[test]
    fn test_roll_range_degenerate() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_range(&mut rng, 5, 5), 5);
        assert_eq!(roll_range(&mut rng, 9, 2), 9);
    }

    #[test]
    fn test_breakdown_formats() {
        let roll = D20Roll {
            natural: 14,
            modifier: 5,
            total: 19,
        };
        assert_eq!(roll.breakdown(), "d20(14) + 5 = 19");
        let neg = D20Roll {
            natural: 14,
            modifier: -2,
            total: 12,
        };
        assert_eq!(neg.breakdown(), "d20(14) - 2 = 12");
    }
}
