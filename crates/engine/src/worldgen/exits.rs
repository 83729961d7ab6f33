//! Exit synthesis
//!
//! Turns graph edges into a space's explicit exit list: cardinal directions
//! derived from grid positions, natural phrases on flavorful edges, and the
//! occasional hidden exit with a Perception DC.

use rand::rngs::StdRng;
use rand::Rng;

use delver_domain::{ChunkId, Exit, NodeType};

use super::assign::AssignedGraph;

/// Compass direction of travel from `a` to `b` (+y is north)
pub fn direction_between(a: (i32, i32), b: (i32, i32)) -> String {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let ns = if dy > 0 {
        "north"
    } else if dy < 0 {
        "south"
    } else {
        ""
    };
    let ew = if dx > 0 {
        "east"
    } else if dx < 0 {
        "west"
    } else {
        ""
    };
    let combined = format!("{ns}{ew}");
    if combined.is_empty() {
        "beyond".to_string()
    } else {
        combined
    }
}

/// Phrase used instead of a compass direction for notable destinations
fn phrase_for(target_type: NodeType, rng: &mut StdRng) -> Option<String> {
    match target_type {
        NodeType::Boss => Some("descend the worn stair".to_string()),
        NodeType::Questable => Some("through the carved door".to_string()),
        NodeType::Linear | NodeType::Branching if rng.gen_bool(0.1) => {
            Some("squeeze through the crevice".to_string())
        }
        _ => None,
    }
}

/// Chance an edge into a DeadEnd is concealed
const HIDDEN_EXIT_CHANCE: f64 = 0.25;

/// Perception DC for a hidden exit at the given difficulty tier
pub fn hidden_difficulty(difficulty: u8) -> u8 {
    10 + difficulty / 2
}

/// Build the exit list for one node of the subzone graph.
///
/// `space_ids[i]` is the SPACE chunk realized from node `i`.
pub fn synthesize_exits(
    graph: &AssignedGraph,
    node_index: usize,
    space_ids: &[ChunkId],
    difficulty: u8,
    rng: &mut StdRng,
) -> Vec<Exit> {
    let mut exits = Vec::new();
    let origin = graph.positions[node_index];

    for edge in &graph.edges {
        let target_index = if edge.a == node_index {
            edge.b
        } else if edge.b == node_index {
            edge.a
        } else {
            continue;
        };
        let target_type = graph.types[target_index];
        let target_space = space_ids[target_index];

        let direction = phrase_for(target_type, rng)
            .unwrap_or_else(|| direction_between(origin, graph.positions[target_index]));
        let description = match target_type {
            NodeType::Boss => "The air grows heavier that way.".to_string(),
            NodeType::Frontier => "A passage runs on into unbroken dark.".to_string(),
            _ => format!("A passage leads {direction}."),
        };

        let mut exit = Exit::open(target_space, direction, description);
        if target_type == NodeType::DeadEnd && rng.gen_bool(HIDDEN_EXIT_CHANCE) {
            exit = exit.hidden(hidden_difficulty(difficulty));
        }
        exits.push(exit);
    }
    exits
}
