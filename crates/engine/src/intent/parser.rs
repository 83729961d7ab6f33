//! Deterministic intent recognition (layer 1)
//!
//! Ordered rules against lowercase tokenized input; the first matching rule
//! wins. Anything unmatched becomes `Unknown` for the LLM fallback.

use regex_lite::Regex;

use delver_domain::EquipSlot;

use super::Intent;

/// Bare compass words and aliases accepted as movement without a verb
const BARE_DIRECTIONS: &[&str] = &[
    "north", "south", "east", "west", "northeast", "northwest", "southeast", "southwest",
    "up", "down", "n", "s", "e", "w", "ne", "nw", "se", "sw", "u", "d",
];

fn rest_after(tokens: &[&str], n: usize) -> String {
    tokens[n..].join(" ")
}

fn parse_slot(token: &str) -> Option<EquipSlot> {
    match token {
        "mainhand" | "main" | "weapon" => Some(EquipSlot::HandsMain),
        "offhand" | "off" | "shield" => Some(EquipSlot::HandsOff),
        "head" | "helm" | "helmet" => Some(EquipSlot::Head),
        "chest" | "body" | "armor" => Some(EquipSlot::Chest),
        "legs" => Some(EquipSlot::Legs),
        "feet" | "boots" => Some(EquipSlot::Feet),
        "back" | "cloak" => Some(EquipSlot::Back),
        "neck" | "amulet" => Some(EquipSlot::Neck),
        "ring" => Some(EquipSlot::RingL),
        _ => None,
    }
}

/// Recognize one line of player input
pub fn parse_intent(input: &str) -> Intent {
    let lowered = input.trim().to_lowercase();
    if lowered.is_empty() {
        return Intent::Unknown { raw: String::new() };
    }

    // phrase rules first: they would be mangled by token splitting
    let give = Regex::new(r"^give\s+(.+?)\s+to\s+(.+)$").expect("static pattern");
    if let Some(captures) = give.captures(&lowered) {
        return Intent::Give {
            item: captures[1].to_string(),
            npc: captures[2].to_string(),
        };
    }
    let plant = Regex::new(r"^plant\s+(.+?)\s+on\s+(.+)$").expect("static pattern");
    if let Some(captures) = plant.captures(&lowered) {
        return Intent::Plant {
            item: captures[1].to_string(),
            npc: captures[2].to_string(),
        };
    }
    let ask_npc = Regex::new(r"^ask\s+(.+?)\s+about\s+(.+)$").expect("static pattern");
    if let Some(captures) = ask_npc.captures(&lowered) {
        return Intent::AskQuestion {
            npc: Some(captures[1].to_string()),
            topic: captures[2].to_string(),
        };
    }
    let ask = Regex::new(r"^ask\s+about\s+(.+)$").expect("static pattern");
    if let Some(captures) = ask.captures(&lowered) {
        return Intent::AskQuestion {
            npc: None,
            topic: captures[1].to_string(),
        };
    }

    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    let (head, rest) = (tokens[0], &tokens[1..]);

    // bare direction is a move
    if tokens.len() == 1 && BARE_DIRECTIONS.contains(&head) {
        return Intent::Move {
            direction: head.to_string(),
        };
    }

    match (head, rest) {
        ("go" | "move" | "walk" | "head", rest) if !rest.is_empty() => Intent::Move {
            direction: rest.join(" "),
        },
        ("look" | "l" | "examine", []) => Intent::Look,
        ("search" | "investigate", _) => Intent::Search,
        ("look" | "examine" | "inspect", rest) => Intent::Interact {
            target: rest.join(" "),
        },
        ("interact" | "touch" | "open" | "pull" | "push", rest) if !rest.is_empty() => {
            Intent::Interact {
                target: rest.join(" "),
            }
        }
        ("take" | "get" | "grab" | "pick", rest) => match rest {
            ["all"] | ["up", "all"] | ["everything"] => Intent::TakeAll,
            ["up", item @ ..] if !item.is_empty() => Intent::Take {
                item: item.join(" "),
            },
            [] => Intent::Unknown { raw: lowered.clone() },
            item => Intent::Take {
                item: item.join(" "),
            },
        },
        ("drop" | "discard", rest) if !rest.is_empty() => Intent::Drop {
            item: rest.join(" "),
        },
        ("equip" | "wield" | "wear", rest) if !rest.is_empty() => Intent::Equip {
            item: rest.join(" "),
        },
        ("unequip" | "remove" | "doff", [slot]) if parse_slot(slot).is_some() => Intent::Unequip {
            slot: parse_slot(slot).unwrap_or(EquipSlot::HandsMain),
        },
        ("use" | "apply" | "drink" | "eat", rest) if !rest.is_empty() => Intent::Use {
            item: rest.join(" "),
            action: None,
        },
        ("bash" | "throw" | "burn" | "break" | "pour" | "climb" | "light", rest)
            if !rest.is_empty() =>
        {
            Intent::Use {
                item: rest.join(" "),
                action: Some(head.to_string()),
            }
        }
        ("attack" | "fight" | "kill" | "hit" | "strike", rest) if !rest.is_empty() => {
            Intent::Attack {
                target: rest.join(" "),
            }
        }
        ("flee" | "run" | "escape", _) => Intent::Flee,
        ("talk" | "greet", rest) => {
            let npc = match rest {
                ["to", npc @ ..] => npc.join(" "),
                npc => npc.join(" "),
            };
            if npc.is_empty() {
                Intent::Unknown { raw: lowered.clone() }
            } else {
                Intent::Talk { npc }
            }
        }
        ("say" | "shout" | "whisper", rest) if !rest.is_empty() => Intent::Say {
            text: rest.join(" "),
        },
        ("emote", [keyword, rest @ ..]) => Intent::Emote {
            keyword: (*keyword).to_string(),
            target: (!rest.is_empty()).then(|| {
                match rest {
                    ["at", target @ ..] => target.join(" "),
                    target => target.join(" "),
                }
            }),
        },
        ("smile" | "wave" | "bow" | "laugh" | "scowl" | "dance" | "threaten", rest) => {
            Intent::Emote {
                keyword: head.to_string(),
                target: (!rest.is_empty()).then(|| match rest {
                    ["at", target @ ..] => target.join(" "),
                    target => target.join(" "),
                }),
            }
        }
        ("persuade" | "convince", rest) if !rest.is_empty() => Intent::Persuade {
            target: rest.join(" "),
        },
        ("intimidate" | "menace", rest) if !rest.is_empty() => Intent::Intimidate {
            target: rest.join(" "),
        },
        ("check", rest) if !rest.is_empty() => Intent::Check {
            target: rest.join(" "),
        },
        ("skill", [skill, target @ ..]) => Intent::UseSkill {
            skill: (*skill).to_string(),
            target: (!target.is_empty()).then(|| target.join(" ")),
        },
        ("train", rest) if !rest.is_empty() => Intent::TrainSkill {
            skill: rest.join(" "),
        },
        ("perk", [skill, perk]) => Intent::ChoosePerk {
            skill: (*skill).to_string(),
            perk: (*perk).to_string(),
        },
        ("skills", _) => Intent::ViewSkills,
        ("quests" | "journal", _) => Intent::Quests,
        ("accept", rest) if !rest.is_empty() => Intent::AcceptQuest {
            title: rest.join(" "),
        },
        ("abandon", rest) if !rest.is_empty() => Intent::AbandonQuest {
            title: rest.join(" "),
        },
        ("claim", rest) if !rest.is_empty() => Intent::ClaimReward {
            title: rest.join(" "),
        },
        ("inventory" | "inv" | "i", _) => Intent::Inventory,
        ("craft" | "forge" | "brew", rest) if !rest.is_empty() => Intent::Craft {
            recipe: rest.join(" "),
        },
        ("buy" | "purchase", rest) if !rest.is_empty() => Intent::BuyItem {
            item: rest.join(" "),
        },
        ("sell", rest) if !rest.is_empty() => Intent::SellItem {
            item: rest.join(" "),
        },
        ("stock" | "browse" | "shop", _) => Intent::ListStock,
        ("pickpocket" | "steal", rest) if !rest.is_empty() => Intent::Pickpocket {
            npc: rest.join(" "),
        },
        ("loot", _) => Intent::Loot,
        ("save", rest) => Intent::Save {
            name: if rest.is_empty() {
                "default".to_string()
            } else {
                rest_after(&tokens, 1)
            },
        },
        ("load", rest) => Intent::Load {
            name: if rest.is_empty() {
                "default".to_string()
            } else {
                rest_after(&tokens, 1)
            },
        },
        ("help" | "?", _) => Intent::Help,
        ("quit" | "exit", _) => Intent::Quit,
        _ => Intent::Unknown { raw: lowered.clone() },
    }
}
