//! LLM intent fallback (layer 2)
//!
//! Invoked only when layer 1 yields `Unknown` and the LLM is available. The
//! model is shown the current exits, visible entities, and inventory, and
//! must answer with a JSON tag from the closed intent set; the reply is
//! re-validated through the same domain rules before it becomes an intent.

use serde::Deserialize;

use crate::config::GameConfig;
use crate::llm::{ChatRequest, LlmPort};

use super::Intent;

/// Context snippet handed to the model
#[derive(Debug, Clone, Default)]
pub struct IntentContext {
    pub exits: Vec<String>,
    pub entities: Vec<String>,
    pub inventory: Vec<String>,
}

#[derive(Deserialize)]
struct LlmIntentReply {
    intent: String,
    #[serde(default)]
    arg: Option<String>,
    #[serde(default)]
    second: Option<String>,
}

pub struct LlmIntentFallback<'a> {
    llm: &'a dyn LlmPort,
    config: &'a GameConfig,
}

impl<'a> LlmIntentFallback<'a> {
    pub fn new(llm: &'a dyn LlmPort, config: &'a GameConfig) -> Self {
        Self { llm, config }
    }

    /// Classify free text. Always returns something; failure modes collapse
    /// to `Unknown`.
    pub async fn classify(&self, raw: &str, context: &IntentContext) -> Intent {
        if !self.config.llm_enabled() {
            return Intent::Unknown { raw: raw.to_string() };
        }

        let request = ChatRequest::new(
            &self.config.llm_model,
            "Classify a text-adventure command. Reply with only a JSON object \
             {\"intent\": TAG, \"arg\": string?, \"second\": string?} where TAG is one of: \
             Move, Look, Search, Interact, Take, TakeAll, Drop, Give, Equip, Unequip, Use, \
             Attack, Flee, Talk, Say, AskQuestion, Emote, Persuade, Intimidate, Check, \
             UseSkill, TrainSkill, ChoosePerk, ViewSkills, Quests, AcceptQuest, AbandonQuest, \
             ClaimReward, Inventory, Craft, BuyItem, SellItem, ListStock, Pickpocket, Plant, \
             Loot, Save, Load, Help, Quit, Unknown. \
             Use arg for the object (direction, item, npc, topic) and second for a secondary \
             object (the npc in Give/Plant, the perk in ChoosePerk).",
            format!(
                "Exits: {}\nVisible: {}\nCarrying: {}\nCommand: {raw}",
                context.exits.join(", "),
                context.entities.join(", "),
                context.inventory.join(", "),
            ),
        )
        .with_max_tokens(80)
        .with_temperature(0.0);

        let content = match self.llm.chat_completion(request).await {
            Ok(response) => response.content,
            Err(err) => {
                tracing::warn!(%err, "intent fallback unavailable");
                return Intent::Unknown { raw: raw.to_string() };
            }
        };

        let reply: LlmIntentReply = match serde_json::from_str(extract_json(&content)) {
            Ok(reply) => reply,
            Err(_) => return Intent::Unknown { raw: raw.to_string() },
        };
        validate(reply, raw)
    }
}

/// Tolerate replies that wrap the JSON in prose or code fences
fn extract_json(content: &str) -> &str {
    let start = content.find('{').unwrap_or(0);
    let end = content.rfind('}').map(|i| i + 1).unwrap_or(content.len());
    content.get(start..end).unwrap_or(content)
}

/// Re-validate the model's choice against the closed set and its arity rules
fn validate(reply: LlmIntentReply, raw: &str) -> Intent {
    let arg = reply.arg.unwrap_or_default();
    let second = reply.second.unwrap_or_default();
    let unknown = || Intent::Unknown { raw: raw.to_string() };

    match reply.intent.as_str() {
        "Move" if !arg.is_empty() => Intent::Move { direction: arg },
        "Look" => Intent::Look,
        "Search" => Intent::Search,
        "Interact" if !arg.is_empty() => Intent::Interact { target: arg },
        "Take" if !arg.is_empty() => Intent::Take { item: arg },
        "TakeAll" => Intent::TakeAll,
        "Drop" if !arg.is_empty() => Intent::Drop { item: arg },
        "Give" if !arg.is_empty() && !second.is_empty() => Intent::Give { item: arg, npc: second },
        "Equip" if !arg.is_empty() => Intent::Equip { item: arg },
        "Use" if !arg.is_empty() => Intent::Use { item: arg, action: None },
        "Attack" if !arg.is_empty() => Intent::Attack { target: arg },
        "Flee" => Intent::Flee,
        "Talk" if !arg.is_empty() => Intent::Talk { npc: arg },
        "Say" if !arg.is_empty() => Intent::Say { text: arg },
        "AskQuestion" if !arg.is_empty() => Intent::AskQuestion {
            npc: (!second.is_empty()).then_some(second),
            topic: arg,
        },
        "Emote" if !arg.is_empty() => Intent::Emote {
            keyword: arg,
            target: (!second.is_empty()).then_some(second),
        },
        "Persuade" if !arg.is_empty() => Intent::Persuade { target: arg },
        "Intimidate" if !arg.is_empty() => Intent::Intimidate { target: arg },
        "Check" if !arg.is_empty() => Intent::Check { target: arg },
        "UseSkill" if !arg.is_empty() => Intent::UseSkill {
            skill: arg,
            target: (!second.is_empty()).then_some(second),
        },
        "TrainSkill" if !arg.is_empty() => Intent::TrainSkill { skill: arg },
        "ChoosePerk" if !arg.is_empty() && !second.is_empty() => Intent::ChoosePerk {
            skill: arg,
            perk: second,
        },
        "ViewSkills" => Intent::ViewSkills,
        "Quests" => Intent::Quests,
        "AcceptQuest" if !arg.is_empty() => Intent::AcceptQuest { title: arg },
        "AbandonQuest" if !arg.is_empty() => Intent::AbandonQuest { title: arg },
        "ClaimReward" if !arg.is_empty() => Intent::ClaimReward { title: arg },
        "Inventory" => Intent::Inventory,
        "Craft" if !arg.is_empty() => Intent::Craft { recipe: arg },
        "BuyItem" if !arg.is_empty() => Intent::BuyItem { item: arg },
        "SellItem" if !arg.is_empty() => Intent::SellItem { item: arg },
        "ListStock" => Intent::ListStock,
        "Pickpocket" if !arg.is_empty() => Intent::Pickpocket { npc: arg },
        "Plant" if !arg.is_empty() && !second.is_empty() => Intent::Plant { item: arg, npc: second },
        "Loot" => Intent::Loot,
        "Save" => Intent::Save {
            name: if arg.is_empty() { "default".to_string() } else { arg },
        },
        "Load" => Intent::Load {
            name: if arg.is_empty() { "default".to_string() } else { arg },
        },
        "Help" => Intent::Help,
        "Quit" => Intent::Quit,
        _ => unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, MockLlmPort};

    fn online_config() -> GameConfig {
        GameConfig {
            openai_api_key: Some("key".into()),
            ..GameConfig::default()
        }
    }

    fn mock_replying(json: &'static str) -> MockLlmPort {
        let mut mock = MockLlmPort::new();
        mock.expect_chat_completion().returning(move |_| {
            Ok(ChatResponse {
                content: json.to_string(),
                finish_reason: "stop".to_string(),
            })
        });
        mock
    }

    #[tokio::test]
    async fn test_valid_reply_maps_to_intent() {
        let mock = mock_replying(r#"{"intent": "Move", "arg": "north"}"#);
        let config = online_config();
        let fallback = LlmIntentFallback::new(&mock, &config);
        let intent = fallback
            .classify("wander northward", &IntentContext::default())
            .await;
        assert_eq!(intent, Intent::Move { direction: "north".into() });
    }

    #[tokio::test]
    async fn test_fenced_json_tolerated() {
        let mock = mock_replying("Sure! ```json\n{\"intent\": \"Look\"}\n```");
        let config = online_config();
        let fallback = LlmIntentFallback::new(&mock, &config);
        let intent = fallback
            .classify("what do I see", &IntentContext::default())
            .await;
        assert_eq!(intent, Intent::Look);
    }

    #[tokio::test]
    async fn test_invented_tag_rejected() {
        let mock = mock_replying(r#"{"intent": "Teleport", "arg": "anywhere"}"#);
        let config = online_config();
        let fallback = LlmIntentFallback::new(&mock, &config);
        let intent = fallback.classify("teleport", &IntentContext::default()).await;
        assert!(matches!(intent, Intent::Unknown { .. }));
    }

    #[tokio::test]
    async fn test_missing_required_arg_rejected() {
        let mock = mock_replying(r#"{"intent": "Attack"}"#);
        let config = online_config();
        let fallback = LlmIntentFallback::new(&mock, &config);
        let intent = fallback.classify("violence", &IntentContext::default()).await;
        assert!(matches!(intent, Intent::Unknown { .. }));
    }

    #[tokio::test]
    async fn test_offline_stays_unknown() {
        let mock = MockLlmPort::new();
        let config = GameConfig::default();
        let fallback = LlmIntentFallback::new(&mock, &config);
        let intent = fallback.classify("gibberish", &IntentContext::default()).await;
        assert!(matches!(intent, Intent::Unknown { .. }));
    }
}
