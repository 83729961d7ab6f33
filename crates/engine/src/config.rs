//! Engine configuration
//!
//! A single key=value file plus equivalent environment variables. Environment
//! wins over file; both win over defaults. `.env` files are honored via
//! `dotenvy` before the environment is read.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use delver_domain::{GameError, GameResult};

/// Recognized configuration, with defaults applied
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Enables LLM features; absence forces fallback mode
    pub openai_api_key: Option<String>,
    /// Chat model id
    pub llm_model: String,
    /// Embedding model id
    pub llm_embed_model: String,
    /// Deadline for a single LLM call
    pub llm_timeout: Duration,
    /// Autosave wall-clock interval
    pub autosave_interval: Duration,
    /// Autosave move-count threshold
    pub autosave_moves: u32,
    pub skill_xp_multiplier: f64,
    /// Percent chance (0-100) before the level divisor is applied
    pub skill_base_lucky_chance: u8,
    pub skill_enable_lucky_progression: bool,
    /// Forced world seed, random when absent
    pub world_seed: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            llm_embed_model: "text-embedding-3-small".to_string(),
            llm_timeout: Duration::from_secs(30),
            autosave_interval: Duration::from_secs(120),
            autosave_moves: 5,
            skill_xp_multiplier: 1.0,
            skill_base_lucky_chance: 15,
            skill_enable_lucky_progression: true,
            world_seed: None,
        }
    }
}

impl GameConfig {
    /// Load from an optional config file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> GameResult<Self> {
        dotenvy::dotenv().ok();

        let mut pairs = HashMap::new();
        if let Some(path) = path {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                GameError::invalid(format!("cannot read config {}: {e}", path.display()))
            })?;
            parse_key_values(&contents, &mut pairs)?;
        }

        // Environment overrides: the literal key, or DELVER_ + upper-snake
        for key in RECOGNIZED_KEYS {
            let env_key = format!("DELVER_{}", key.replace('.', "_").to_uppercase());
            if let Ok(value) = std::env::var(&env_key).or_else(|_| std::env::var(key)) {
                pairs.insert((*key).to_string(), value);
            }
        }

        Self::from_pairs(&pairs)
    }

    /// Build from parsed pairs; unknown keys are ignored with a warning.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> GameResult<Self> {
        let mut config = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "openai.api.key" => config.openai_api_key = Some(value.clone()),
                "llm.model" => config.llm_model = value.clone(),
                "llm.embedModel" => config.llm_embed_model = value.clone(),
                "llm.timeoutSeconds" => {
                    config.llm_timeout = Duration::from_secs(parse_num(key, value)?)
                }
                "autosave.interval" => {
                    config.autosave_interval = parse_duration(value)
                        .ok_or_else(|| bad_value(key, value))?
                }
                "autosave.moves" => config.autosave_moves = parse_num(key, value)?,
                "skill.xpMultiplier" => config.skill_xp_multiplier = parse_num(key, value)?,
                "skill.baseLuckyChance" => {
                    let chance: u8 = parse_num(key, value)?;
                    if chance > 100 {
                        return Err(bad_value(key, value));
                    }
                    config.skill_base_lucky_chance = chance;
                }
                "skill.enableLuckyProgression" => {
                    config.skill_enable_lucky_progression = parse_bool(value)
                        .ok_or_else(|| bad_value(key, value))?
                }
                "world.seed" => config.world_seed = Some(value.clone()),
                other => {
                    tracing::warn!(key = other, "unrecognized config key ignored");
                }
            }
        }
        Ok(config)
    }

    /// LLM features are available only with an API key
    pub fn llm_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

const RECOGNIZED_KEYS: &[&str] = &[
    "openai.api.key",
    "llm.model",
    "llm.embedModel",
    "llm.timeoutSeconds",
    "autosave.interval",
    "autosave.moves",
    "skill.xpMultiplier",
    "skill.baseLuckyChance",
    "skill.enableLuckyProgression",
    "world.seed",
];

fn parse_key_values(contents: &str, into: &mut HashMap<String, String>) -> GameResult<()> {
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            GameError::invalid(format!("config line {}: expected key=value", line_no + 1))
        })?;
        into.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> GameResult<T> {
    value.parse().map_err(|_| bad_value(key, value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parse "2m", "120s", "90" (seconds), "1h"
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let (num, unit) = value.split_at(value.len().checked_sub(1)?);
    let num: u64 = num.trim().parse().ok()?;
    match unit {
        "s" => Some(Duration::from_secs(num)),
        "m" => Some(Duration::from_secs(num * 60)),
        "h" => Some(Duration::from_secs(num * 3600)),
        _ => None,
    }
}

fn bad_value(key: &str, value: &str) -> GameError {
    GameError::invalid(format!("config {key}: bad value '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.autosave_moves, 5);
        assert_eq!(config.autosave_interval, Duration::from_secs(120));
        assert_eq!(config.skill_base_lucky_chance, 15);
        assert!(config.skill_enable_lucky_progression);
        assert!(!config.llm_enabled());
    }

    #[test]
    fn test_from_pairs() {
        let mut pairs = HashMap::new();
        pairs.insert("autosave.moves".to_string(), "9".to_string());
        pairs.insert("autosave.interval".to_string(), "5m".to_string());
        pairs.insert("skill.enableLuckyProgression".to_string(), "false".to_string());
        pairs.insert("world.seed".to_string(), "gloomy-cellar".to_string());

        let config = GameConfig::from_pairs(&pairs).expect("valid config");
        assert_eq!(config.autosave_moves, 9);
        assert_eq!(config.autosave_interval, Duration::from_secs(300));
        assert!(!config.skill_enable_lucky_progression);
        assert_eq!(config.world_seed.as_deref(), Some("gloomy-cellar"));
    }

    #[test]
    fn test_bad_lucky_chance_rejected() {
        let mut pairs = HashMap::new();
        pairs.insert("skill.baseLuckyChance".to_string(), "150".to_string());
        assert!(GameConfig::from_pairs(&pairs).is_err());
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_key_value_parsing() {
        let mut pairs = HashMap::new();
        parse_key_values("# comment\n\nllm.model = mistral\n", &mut pairs).expect("parse");
        assert_eq!(pairs.get("llm.model").map(String::as_str), Some("mistral"));
        assert!(parse_key_values("no equals here", &mut pairs).is_err());
    }
}
