//! Player intent pipeline
//!
//! Layer 1 is deterministic pattern matching over tokenized input; layer 2
//! is an LLM fallback used only when layer 1 yields `Unknown`. Both layers
//! produce the same sealed `Intent` union, and every handler switch over it
//! is exhaustive.

mod llm_fallback;
mod parser;

pub use llm_fallback::{IntentContext, LlmIntentFallback};
pub use parser::parse_intent;

use delver_domain::EquipSlot;

/// The closed set of player intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Move { direction: String },
    Look,
    Search,
    Interact { target: String },
    Take { item: String },
    TakeAll,
    Drop { item: String },
    Give { item: String, npc: String },
    Equip { item: String },
    Unequip { slot: EquipSlot },
    Use { item: String, action: Option<String> },
    Attack { target: String },
    Flee,
    Talk { npc: String },
    Say { text: String },
    AskQuestion { npc: Option<String>, topic: String },
    Emote { keyword: String, target: Option<String> },
    Persuade { target: String },
    Intimidate { target: String },
    Check { target: String },
    UseSkill { skill: String, target: Option<String> },
    TrainSkill { skill: String },
    ChoosePerk { skill: String, perk: String },
    ViewSkills,
    Quests,
    AcceptQuest { title: String },
    AbandonQuest { title: String },
    ClaimReward { title: String },
    Inventory,
    Craft { recipe: String },
    BuyItem { item: String },
    SellItem { item: String },
    ListStock,
    Pickpocket { npc: String },
    Plant { item: String, npc: String },
    Loot,
    Save { name: String },
    Load { name: String },
    Help,
    Quit,
    Unknown { raw: String },
}

impl Intent {
    /// Tag used by the LLM fallback contract
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Move { .. } => "Move",
            Self::Look => "Look",
            Self::Search => "Search",
            Self::Interact { .. } => "Interact",
            Self::Take { .. } => "Take",
            Self::TakeAll => "TakeAll",
            Self::Drop { .. } => "Drop",
            Self::Give { .. } => "Give",
            Self::Equip { .. } => "Equip",
            Self::Unequip { .. } => "Unequip",
            Self::Use { .. } => "Use",
            Self::Attack { .. } => "Attack",
            Self::Flee => "Flee",
            Self::Talk { .. } => "Talk",
            Self::Say { .. } => "Say",
            Self::AskQuestion { .. } => "AskQuestion",
            Self::Emote { .. } => "Emote",
            Self::Persuade { .. } => "Persuade",
            Self::Intimidate { .. } => "Intimidate",
            Self::Check { .. } => "Check",
            Self::UseSkill { .. } => "UseSkill",
            Self::TrainSkill { .. } => "TrainSkill",
            Self::ChoosePerk { .. } => "ChoosePerk",
            Self::ViewSkills => "ViewSkills",
            Self::Quests => "Quests",
            Self::AcceptQuest { .. } => "AcceptQuest",
            Self::AbandonQuest { .. } => "AbandonQuest",
            Self::ClaimReward { .. } => "ClaimReward",
            Self::Inventory => "Inventory",
            Self::Craft { .. } => "Craft",
            Self::BuyItem { .. } => "BuyItem",
            Self::SellItem { .. } => "SellItem",
            Self::ListStock => "ListStock",
            Self::Pickpocket { .. } => "Pickpocket",
            Self::Plant { .. } => "Plant",
            Self::Loot => "Loot",
            Self::Save { .. } => "Save",
            Self::Load { .. } => "Load",
            Self::Help => "Help",
            Self::Quit => "Quit",
            Self::Unknown { .. } => "Unknown",
        }
    }
}
