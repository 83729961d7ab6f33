//! Space-graph nodes inside a SUBZONE
//!
//! The generator lays out nodes, connects them with an MST plus loop edges,
//! and assigns types. Invariants checked by the graph validator: every node
//! reachable from the entry, at least one cycle, average degree >= 3.0 over
//! non-DeadEnd nodes, and at least two Frontier nodes per subzone.

use serde::{Deserialize, Serialize};

use crate::entities::space::ExitCondition;
use crate::{ChunkId, GameError, GameResult, GraphNodeId};

/// Graph node type tags governing content placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Central connector, exactly one per subzone
    Hub,
    /// Degree-2 corridor node
    Linear,
    /// Internal node with degree >= 3
    Branching,
    /// Leaf with nothing beyond it
    DeadEnd,
    /// Deepest leaf, hosts the subzone boss
    Boss,
    /// Boundary leaf pointing toward an unmaterialized neighbor subzone
    Frontier,
    /// Reserved for quest content
    Questable,
}

impl NodeType {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::DeadEnd | Self::Boss | Self::Frontier)
    }
}

/// An edge between two graph nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub target: GraphNodeId,
    pub direction: String,
    pub hidden: bool,
    pub conditions: Vec<ExitCondition>,
}

impl GraphEdge {
    pub fn new(target: GraphNodeId, direction: impl Into<String>) -> Self {
        Self {
            target,
            direction: direction.into(),
            hidden: false,
            conditions: Vec::new(),
        }
    }
}

/// A node in a subzone's space graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    id: GraphNodeId,
    /// The SUBZONE chunk this node belongs to
    chunk_id: ChunkId,
    /// Grid position assigned by the layout, when the layout is positional
    position: Option<(i32, i32)>,
    node_type: NodeType,
    edges: Vec<GraphEdge>,
    /// The SPACE chunk realized from this node, once materialized
    space_id: Option<ChunkId>,
}

impl GraphNode {
    pub fn new(chunk_id: ChunkId, node_type: NodeType) -> Self {
        Self {
            id: GraphNodeId::new(),
            chunk_id,
            position: None,
            node_type,
            edges: Vec::new(),
            space_id: None,
        }
    }

    // Read accessors
    pub fn id(&self) -> GraphNodeId {
        self.id
    }

    pub fn chunk_id(&self) -> ChunkId {
        self.chunk_id
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub fn space_id(&self) -> Option<ChunkId> {
        self.space_id
    }

    // Builder methods
    pub fn with_id(mut self, id: GraphNodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    // Mutators
    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type;
    }

    pub fn set_space_id(&mut self, space_id: ChunkId) {
        self.space_id = Some(space_id);
    }

    /// Add an edge. Rejects self-edges and duplicate targets.
    pub fn add_edge(&mut self, edge: GraphEdge) -> GameResult<()> {
        if edge.target == self.id {
            return Err(GameError::invalid("graph edge to self"));
        }
        if self.edges.iter().any(|e| e.target == edge.target) {
            return Err(GameError::conflict("GraphEdge", edge.target));
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, target: GraphNodeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.target != target);
        self.edges.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_rejects_self() {
        let mut node = GraphNode::new(ChunkId::new(), NodeType::Linear);
        let id = node.id();
        assert!(node.add_edge(GraphEdge::new(id, "north")).is_err());
    }

    #[test]
    fn test_add_edge_rejects_duplicate_target() {
        let mut node = GraphNode::new(ChunkId::new(), NodeType::Hub);
        let target = GraphNodeId::new();
        assert!(node.add_edge(GraphEdge::new(target, "north")).is_ok());
        assert!(node.add_edge(GraphEdge::new(target, "up")).is_err());
        assert_eq!(node.degree(), 1);
    }

    #[test]
    fn test_remove_edge() {
        let mut node = GraphNode::new(ChunkId::new(), NodeType::Hub);
        let target = GraphNodeId::new();
        node.add_edge(GraphEdge::new(target, "east")).expect("edge");
        assert!(node.remove_edge(target));
        assert!(!node.remove_edge(target));
    }

    #[test]
    fn test_leaf_types() {
        assert!(NodeType::DeadEnd.is_leaf());
        assert!(NodeType::Frontier.is_leaf());
        assert!(NodeType::Boss.is_leaf());
        assert!(!NodeType::Hub.is_leaf());
        assert!(!NodeType::Linear.is_leaf());
    }
}
