//! Three-phase direction matching: exact, fuzzy, LLM-assisted
//!
//! Resolution is side-effect free: resolving the same phrase twice against
//! the same space yields the same result (the LLM phase re-validates its
//! answer against the exit list, and a failed LLM leaves us at `Failure`).

use delver_domain::{Exit, SpaceProperties};

use crate::config::GameConfig;
use crate::llm::{ChatRequest, LlmPort};

/// Maximum edit distance accepted by the fuzzy phase
const FUZZY_THRESHOLD: usize = 2;

/// Outcome of resolving a direction phrase
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Success(Exit),
    Failure(String),
    Ambiguous(Vec<String>),
}

/// Lowercase, collapse whitespace, and expand one-letter compass aliases
pub fn normalize_direction(input: &str) -> String {
    let collapsed = input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    match collapsed.as_str() {
        "n" => "north".to_string(),
        "s" => "south".to_string(),
        "e" => "east".to_string(),
        "w" => "west".to_string(),
        "ne" => "northeast".to_string(),
        "nw" => "northwest".to_string(),
        "se" => "southeast".to_string(),
        "sw" => "southwest".to_string(),
        "u" => "up".to_string(),
        "d" => "down".to_string(),
        _ => collapsed,
    }
}

/// Classic two-row Levenshtein distance
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

pub struct ExitResolver<'a> {
    llm: &'a dyn LlmPort,
    config: &'a GameConfig,
}

impl<'a> ExitResolver<'a> {
    pub fn new(llm: &'a dyn LlmPort, config: &'a GameConfig) -> Self {
        Self { llm, config }
    }

    /// Resolve a phrase against the space's visible exits
    pub async fn resolve(&self, phrase: &str, space: &SpaceProperties) -> Resolution {
        let normalized = normalize_direction(phrase);
        let visible: Vec<&Exit> = space.visible_exits().collect();
        if visible.is_empty() {
            return Resolution::Failure("there is no way out of here".to_string());
        }

        // Phase 1: exact match on canonical direction strings
        if let Some(exit) = visible
            .iter()
            .find(|e| normalize_direction(&e.direction) == normalized)
        {
            return Resolution::Success((*exit).clone());
        }

        // Phase 2: fuzzy match, tie-break by shortest distance
        let mut scored: Vec<(usize, &Exit)> = visible
            .iter()
            .map(|e| (edit_distance(&normalize_direction(&e.direction), &normalized), *e))
            .filter(|(distance, _)| *distance <= FUZZY_THRESHOLD)
            .collect();
        scored.sort_by_key(|(distance, _)| *distance);
        match scored.as_slice() {
            [] => {}
            [(_, exit)] => return Resolution::Success((*exit).clone()),
            [(best, exit), (second, _), ..] if best < second => {
                return Resolution::Success((*exit).clone())
            }
            ties => {
                let best = ties[0].0;
                return Resolution::Ambiguous(
                    ties.iter()
                        .filter(|(d, _)| *d == best)
                        .map(|(_, e)| e.direction.clone())
                        .collect(),
                );
            }
        }

        // Phase 3: LLM parse, re-validated against the list
        if self.config.llm_enabled() {
            if let Some(direction) = self.llm_pick(&normalized, &visible).await {
                if let Some(exit) = visible
                    .iter()
                    .find(|e| normalize_direction(&e.direction) == direction)
                {
                    return Resolution::Success((*exit).clone());
                }
            }
        }

        Resolution::Failure(format!("you can't go \"{phrase}\" from here"))
    }

    async fn llm_pick(&self, phrase: &str, visible: &[&Exit]) -> Option<String> {
        let options: Vec<String> = visible.iter().map(|e| e.direction.clone()).collect();
        let request = ChatRequest::new(
            &self.config.llm_model,
            "You map a player's words onto one of the listed exit directions. Reply with \
             exactly one direction from the list, or NONE.",
            format!("Exits: {}\nPlayer said: {phrase}", options.join(", ")),
        )
        .with_max_tokens(20)
        .with_temperature(0.0);

        match self.llm.chat_completion(request).await {
            Ok(response) => {
                let answer = normalize_direction(response.content.trim());
                if answer == "none" {
                    None
                } else {
                    Some(answer)
                }
            }
            Err(err) => {
                tracing::warn!(%err, "LLM direction parse unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmPort, StubLlm};
    use delver_domain::ChunkId;

    fn space_with_exits(directions: &[&str]) -> SpaceProperties {
        let mut space = SpaceProperties::new(ChunkId::new(), "Test Hall");
        for direction in directions {
            space
                .exits
                .push(Exit::open(ChunkId::new(), *direction, "a passage"));
        }
        space
    }

    fn offline() -> GameConfig {
        GameConfig::default()
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("north", "north"), 0);
        assert_eq!(edit_distance("north", "nort"), 1);
        assert_eq!(edit_distance("north", "nroth"), 2);
        assert_eq!(edit_distance("", "ab"), 2);
    }

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize_direction("  N "), "north");
        assert_eq!(normalize_direction("Climb   The LADDER"), "climb the ladder");
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let stub = StubLlm::new();
        let config = offline();
        let resolver = ExitResolver::new(&stub, &config);
        let space = space_with_exits(&["north", "climb the ladder"]);

        let result = resolver.resolve("n", &space).await;
        assert!(matches!(result, Resolution::Success(exit) if exit.direction == "north"));
    }

    #[tokio::test]
    async fn test_fuzzy_match_with_typo() {
        let stub = StubLlm::new();
        let config = offline();
        let resolver = ExitResolver::new(&stub, &config);
        let space = space_with_exits(&["north", "south"]);

        let result = resolver.resolve("norht", &space).await;
        assert!(matches!(result, Resolution::Success(exit) if exit.direction == "north"));
    }

    #[tokio::test]
    async fn test_ambiguous_tie() {
        let stub = StubLlm::new();
        let config = offline();
        let resolver = ExitResolver::new(&stub, &config);
        // "xast" is distance 1 from "east" and "wast" -> craft real tie: east/west vs "eest"
        let space = space_with_exits(&["east", "west"]);

        let result = resolver.resolve("est", &space).await;
        match result {
            Resolution::Ambiguous(options) => {
                assert_eq!(options.len(), 2);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hidden_exit_invisible_to_resolution() {
        let stub = StubLlm::new();
        let config = offline();
        let resolver = ExitResolver::new(&stub, &config);
        let mut space = space_with_exits(&["north"]);
        space.exits.push(
            Exit::open(ChunkId::new(), "hidden passage", "a crack").hidden(15),
        );

        let result = resolver.resolve("hidden passage", &space).await;
        assert!(matches!(result, Resolution::Failure(_)));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let stub = StubLlm::new();
        let config = offline();
        let resolver = ExitResolver::new(&stub, &config);
        let space = space_with_exits(&["north", "south"]);

        let first = resolver.resolve("norh", &space).await;
        let second = resolver.resolve("norh", &space).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_llm_phase_revalidates_answer() {
        let mut mock = MockLlmPort::new();
        mock.expect_chat_completion().returning(|_| {
            Ok(crate::llm::ChatResponse {
                content: "the moon".to_string(),
                finish_reason: "stop".to_string(),
            })
        });
        let config = GameConfig {
            openai_api_key: Some("key".to_string()),
            ..GameConfig::default()
        };
        let resolver = ExitResolver::new(&mock, &config);
        let space = space_with_exits(&["north"]);

        // hallucinated direction is rejected, not trusted
        let result = resolver.resolve("toward the cheese", &space).await;
        assert!(matches!(result, Resolution::Failure(_)));
    }

    #[tokio::test]
    async fn test_llm_phase_accepts_listed_direction() {
        let mut mock = MockLlmPort::new();
        mock.expect_chat_completion().returning(|_| {
            Ok(crate::llm::ChatResponse {
                content: "climb the ladder".to_string(),
                finish_reason: "stop".to_string(),
            })
        });
        let config = GameConfig {
            openai_api_key: Some("key".to_string()),
            ..GameConfig::default()
        };
        let resolver = ExitResolver::new(&mock, &config);
        let space = space_with_exits(&["climb the ladder", "north"]);

        let result = resolver.resolve("go on up", &space).await;
        assert!(
            matches!(result, Resolution::Success(exit) if exit.direction == "climb the ladder")
        );
    }
}
