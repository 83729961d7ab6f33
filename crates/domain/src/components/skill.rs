//! Skill component: per-skill progression state and resource pools
//!
//! Use-based progression: xp is granted per attempt and levels are crossed at
//! `xpToNext(level) = 100 x (level+1)^2`. Xp is monotonically non-decreasing
//! within a level band and level changes are atomic with xp updates - both
//! happen inside [`SkillState::grant_xp`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resource pool types skills may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Mana,
    Stamina,
    Focus,
}

/// A depletable pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePool {
    pub current: i32,
    pub max: i32,
}

impl ResourcePool {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn spend(&mut self, amount: i32) -> bool {
        if self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    pub fn restore(&mut self, amount: i32) {
        self.current = (self.current + amount.max(0)).min(self.max);
    }
}

/// A temporary additive modifier to effective level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillBuff {
    pub amount: i32,
    pub source: String,
    /// Uses remaining before the buff expires, None = until rest
    pub remaining_uses: Option<u32>,
}

/// Xp required to go from `level` to `level + 1`
pub fn xp_to_next(level: u32) -> u64 {
    100 * u64::from(level + 1) * u64::from(level + 1)
}

/// Perk milestone cadence: every 10 levels
pub const PERK_MILESTONE_INTERVAL: u32 = 10;

/// Progression state for one skill on one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillState {
    pub name: String,
    pub level: u32,
    /// Xp accumulated toward the next level
    pub xp: u64,
    pub unlocked: bool,
    /// Grouping tags: "combat", "magic", "social", ...
    pub tags: Vec<String>,
    pub perks: Vec<String>,
    pub resource: Option<ResourceType>,
    pub buffs: Vec<SkillBuff>,
}

impl SkillState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: 0,
            xp: 0,
            unlocked: false,
            tags: Vec::new(),
            perks: Vec::new(),
            resource: None,
            buffs: Vec::new(),
        }
    }

    pub fn unlocked_at(mut self, level: u32) -> Self {
        self.unlocked = true;
        self.level = level;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceType) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Base level plus temporary buffs
    pub fn effective_level(&self) -> i32 {
        self.level as i32 + self.buffs.iter().map(|b| b.amount).sum::<i32>()
    }

    /// Add xp, crossing as many level thresholds as the amount covers.
    /// Returns the number of levels gained.
    pub fn grant_xp(&mut self, amount: u64) -> u32 {
        self.xp += amount;
        let mut gained = 0;
        while self.xp >= xp_to_next(self.level) {
            self.xp -= xp_to_next(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// Level up without touching xp (lucky promotion)
    pub fn promote(&mut self) {
        self.level += 1;
    }

    pub fn is_at_perk_milestone(&self) -> bool {
        self.level > 0 && self.level % PERK_MILESTONE_INTERVAL == 0
    }

    pub fn add_buff(&mut self, buff: SkillBuff) {
        self.buffs.push(buff);
    }

    /// Decrement per-use buffs, dropping the spent ones
    pub fn tick_buffs(&mut self) {
        for buff in &mut self.buffs {
            if let Some(uses) = &mut buff.remaining_uses {
                *uses = uses.saturating_sub(1);
            }
        }
        self.buffs.retain(|b| b.remaining_uses != Some(0));
    }

    pub fn add_perk(&mut self, perk: impl Into<String>) {
        let perk = perk.into();
        if !self.perks.contains(&perk) {
            self.perks.push(perk);
        }
    }

    pub fn has_perk(&self, perk: &str) -> bool {
        self.perks.iter().any(|p| p == perk)
    }
}

/// Aggregate of all skills and resource pools on one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillComponent {
    skills: BTreeMap<String, SkillState>,
    resources: BTreeMap<ResourceType, ResourcePool>,
}

impl SkillComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skill(&self, name: &str) -> Option<&SkillState> {
        self.skills.get(name)
    }

    pub fn skill_mut(&mut self, name: &str) -> Option<&mut SkillState> {
        self.skills.get_mut(name)
    }

    /// Get or create a skill entry (created locked at level 0)
    pub fn skill_entry(&mut self, name: &str) -> &mut SkillState {
        self.skills
            .entry(name.to_string())
            .or_insert_with(|| SkillState::new(name))
    }

    pub fn insert(&mut self, skill: SkillState) {
        self.skills.insert(skill.name.clone(), skill);
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillState> {
        self.skills.values()
    }

    /// Effective level for checks; locked or unknown skills roll at 0
    pub fn effective_level(&self, name: &str) -> i32 {
        self.skills
            .get(name)
            .filter(|s| s.unlocked)
            .map(|s| s.effective_level())
            .unwrap_or(0)
    }

    pub fn pool(&self, resource: ResourceType) -> Option<ResourcePool> {
        self.resources.get(&resource).copied()
    }

    pub fn pool_mut(&mut self, resource: ResourceType) -> &mut ResourcePool {
        self.resources
            .entry(resource)
            .or_insert_with(|| ResourcePool::full(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_thresholds() {
        assert_eq!(xp_to_next(0), 100);
        assert_eq!(xp_to_next(1), 400);
        assert_eq!(xp_to_next(2), 900);
    }

    #[test]
    fn test_grant_xp_single_level() {
        let mut skill = SkillState::new("Mining").unlocked_at(0);
        assert_eq!(skill.grant_xp(150), 1);
        assert_eq!(skill.level, 1);
        assert_eq!(skill.xp, 50);
    }

    #[test]
    fn test_grant_xp_multiple_levels() {
        let mut skill = SkillState::new("Mining").unlocked_at(0);
        // 100 + 400 = 500 to reach level 2
        assert_eq!(skill.grant_xp(520), 2);
        assert_eq!(skill.level, 2);
        assert_eq!(skill.xp, 20);
    }

    #[test]
    fn test_grant_below_threshold_keeps_level() {
        let mut skill = SkillState::new("Perception").unlocked_at(1);
        assert_eq!(skill.grant_xp(200), 0);
        assert_eq!(skill.level, 1);
        assert_eq!(skill.xp, 200);
    }

    #[test]
    fn test_effective_level_with_buffs() {
        let mut skill = SkillState::new("Dodge").unlocked_at(3);
        skill.add_buff(SkillBuff {
            amount: 5,
            source: "mentor".into(),
            remaining_uses: Some(2),
        });
        assert_eq!(skill.effective_level(), 8);

        skill.tick_buffs();
        assert_eq!(skill.effective_level(), 8);
        skill.tick_buffs();
        assert_eq!(skill.effective_level(), 3);
    }

    #[test]
    fn test_perk_milestones() {
        let mut skill = SkillState::new("Smithing").unlocked_at(9);
        skill.promote();
        assert!(skill.is_at_perk_milestone());
        skill.promote();
        assert!(!skill.is_at_perk_milestone());
    }

    #[test]
    fn test_locked_skill_rolls_at_zero() {
        let mut component = SkillComponent::new();
        component.insert(SkillState::new("Lockpicking"));
        assert_eq!(component.effective_level("Lockpicking"), 0);
        assert_eq!(component.effective_level("Unheard Of"), 0);
    }

    #[test]
    fn test_resource_pool() {
        let mut pool = ResourcePool::full(20);
        assert!(pool.spend(15));
        assert!(!pool.spend(10));
        pool.restore(100);
        assert_eq!(pool.current, 20);
    }
}
