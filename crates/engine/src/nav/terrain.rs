//! Terrain movement costing
//!
//! Cost and risk of stepping into a space, shaped by the mover's skills.
//! Damage is applied before the position update; a mover reduced to 0 HP
//! dies mid-move and does not arrive.

use rand::rngs::StdRng;

use delver_domain::{roll_range, SkillComponent, Terrain};

/// Outcome of a movement cost calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCost {
    /// World ticks the move consumes
    pub ticks: u32,
    /// Damage taken on entry, already rolled
    pub damage: i32,
    pub success: bool,
}

/// Cost of moving into terrain with the given skills
pub fn movement_cost(terrain: Terrain, skills: &SkillComponent, rng: &mut StdRng) -> MoveCost {
    match terrain {
        Terrain::Normal => MoveCost {
            ticks: 1,
            damage: 0,
            success: true,
        },
        Terrain::Difficult => {
            // practiced climbers push through at normal speed
            let ticks = if skills.effective_level("Athletics") >= 5 { 1 } else { 2 };
            MoveCost {
                ticks,
                damage: 0,
                success: true,
            }
        }
        Terrain::Hazardous => {
            let raw = roll_range(rng, 2, 8);
            let mitigation = skills.effective_level("Survival").clamp(0, 6);
            MoveCost {
                ticks: 2,
                damage: (raw - mitigation).max(0),
                success: true,
            }
        }
        Terrain::Impassable => MoveCost {
            ticks: 0,
            damage: 0,
            success: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_domain::SkillState;
    use rand::SeedableRng;

    fn skills_with(name: &str, level: u32) -> SkillComponent {
        let mut skills = SkillComponent::new();
        skills.insert(SkillState::new(name).unlocked_at(level));
        skills
    }

    #[test]
    fn test_normal_terrain_is_free() {
        let mut rng = StdRng::seed_from_u64(1);
        let cost = movement_cost(Terrain::Normal, &SkillComponent::new(), &mut rng);
        assert_eq!(cost, MoveCost { ticks: 1, damage: 0, success: true });
    }

    #[test]
    fn test_impassable_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let cost = movement_cost(Terrain::Impassable, &SkillComponent::new(), &mut rng);
        assert!(!cost.success);
    }

    #[test]
    fn test_athletics_speeds_difficult_ground() {
        let mut rng = StdRng::seed_from_u64(1);
        let slow = movement_cost(Terrain::Difficult, &SkillComponent::new(), &mut rng);
        let fast = movement_cost(Terrain::Difficult, &skills_with("Athletics", 6), &mut rng);
        assert_eq!(slow.ticks, 2);
        assert_eq!(fast.ticks, 1);
    }

    #[test]
    fn test_survival_mitigates_hazard_damage() {
        // same seed, same raw roll; the skilled mover takes less
        let unskilled =
            movement_cost(Terrain::Hazardous, &SkillComponent::new(), &mut StdRng::seed_from_u64(3));
        let skilled = movement_cost(
            Terrain::Hazardous,
            &skills_with("Survival", 6),
            &mut StdRng::seed_from_u64(3),
        );
        assert!(skilled.damage <= unskilled.damage);
        assert!(unskilled.damage >= 0);
    }
}
