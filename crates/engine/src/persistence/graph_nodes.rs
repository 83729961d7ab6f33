//! Graph node repository
//!
//! Edge lists are JSON-encoded. Duplicate edges and edges to self are
//! rejected (by the domain type, surfaced here as failures).

use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use delver_domain::{
    ChunkId, GameError, GameResult, GraphEdge, GraphNode, GraphNodeId, NodeType,
};

use super::database::{corrupt, db_err};

pub struct GraphNodeRepository {
    pool: SqlitePool,
}

impl GraphNodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, node: &GraphNode) -> GameResult<()> {
        let edges = serde_json::to_string(node.edges())
            .map_err(|e| GameError::internal(format!("encode edges: {e}")))?;
        let (pos_x, pos_y) = match node.position() {
            Some((x, y)) => (Some(i64::from(x)), Some(i64::from(y))),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO graph_nodes (id, chunk_id, pos_x, pos_y, node_type, edges, space_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                pos_x = excluded.pos_x,
                pos_y = excluded.pos_y,
                node_type = excluded.node_type,
                edges = excluded.edges,
                space_id = excluded.space_id
            "#,
        )
        .bind(node.id().to_string())
        .bind(node.chunk_id().to_string())
        .bind(pos_x)
        .bind(pos_y)
        .bind(node_type_str(node.node_type()))
        .bind(edges)
        .bind(node.space_id().map(|s| s.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: GraphNodeId) -> GameResult<Option<GraphNode>> {
        let row = sqlx::query("SELECT * FROM graph_nodes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(decode_node).transpose()
    }

    /// All nodes of one subzone's graph
    pub async fn find_by_chunk(&self, chunk_id: ChunkId) -> GameResult<Vec<GraphNode>> {
        let rows = sqlx::query("SELECT * FROM graph_nodes WHERE chunk_id = ? ORDER BY id")
            .bind(chunk_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(decode_node).collect()
    }

    /// Full-row update; same statement as save
    pub async fn update(&self, node: &GraphNode) -> GameResult<()> {
        self.save(node).await
    }

    pub async fn delete(&self, id: GraphNodeId) -> GameResult<()> {
        sqlx::query("DELETE FROM graph_nodes WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Add one edge to a stored node. Self-edges and duplicate targets fail.
    pub async fn add_edge(&self, id: GraphNodeId, edge: GraphEdge) -> GameResult<()> {
        let mut node = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| GameError::not_found("GraphNode", id))?;
        node.add_edge(edge)?;
        self.save(&node).await
    }

    pub async fn remove_edge(&self, id: GraphNodeId, target: GraphNodeId) -> GameResult<()> {
        let mut node = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| GameError::not_found("GraphNode", id))?;
        if !node.remove_edge(target) {
            return Err(GameError::not_found("GraphEdge", target));
        }
        self.save(&node).await
    }

    pub async fn get_all(&self) -> GameResult<Vec<GraphNode>> {
        let rows = sqlx::query("SELECT * FROM graph_nodes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(decode_node).collect()
    }
}

fn node_type_str(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Hub => "Hub",
        NodeType::Linear => "Linear",
        NodeType::Branching => "Branching",
        NodeType::DeadEnd => "DeadEnd",
        NodeType::Boss => "Boss",
        NodeType::Frontier => "Frontier",
        NodeType::Questable => "Questable",
    }
}

fn parse_node_type(value: &str) -> Option<NodeType> {
    match value {
        "Hub" => Some(NodeType::Hub),
        "Linear" => Some(NodeType::Linear),
        "Branching" => Some(NodeType::Branching),
        "DeadEnd" => Some(NodeType::DeadEnd),
        "Boss" => Some(NodeType::Boss),
        "Frontier" => Some(NodeType::Frontier),
        "Questable" => Some(NodeType::Questable),
        _ => None,
    }
}

fn decode_node(row: sqlx::sqlite::SqliteRow) -> GameResult<GraphNode> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let chunk_id: String = row.try_get("chunk_id").map_err(db_err)?;
    let pos_x: Option<i64> = row.try_get("pos_x").map_err(db_err)?;
    let pos_y: Option<i64> = row.try_get("pos_y").map_err(db_err)?;
    let node_type: String = row.try_get("node_type").map_err(db_err)?;
    let edges: String = row.try_get("edges").map_err(db_err)?;
    let space_id: Option<String> = row.try_get("space_id").map_err(db_err)?;

    let node_id =
        GraphNodeId::from_str(&id).map_err(|_| GameError::corrupt("GraphNode", &id))?;
    let chunk =
        ChunkId::from_str(&chunk_id).map_err(|_| GameError::corrupt("GraphNode", &id))?;
    let node_type =
        parse_node_type(&node_type).ok_or_else(|| GameError::corrupt("GraphNode", &id))?;
    let edges: Vec<GraphEdge> =
        serde_json::from_str(&edges).map_err(corrupt("GraphNode", &id))?;

    let mut node = GraphNode::new(chunk, node_type).with_id(node_id);
    if let (Some(x), Some(y)) = (pos_x, pos_y) {
        node = node.with_position(x as i32, y as i32);
    }
    for edge in edges {
        node.add_edge(edge)?;
    }
    if let Some(space) = space_id {
        let space =
            ChunkId::from_str(&space).map_err(|_| GameError::corrupt("GraphNode", &id))?;
        node.set_space_id(space);
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{ChunkId, GameError, GraphEdge, GraphNode, NodeType};

    #[tokio::test]
    async fn test_node_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let chunk = ChunkId::new();
        let mut node = GraphNode::new(chunk, NodeType::Hub).with_position(3, -1);
        let other = GraphNode::new(chunk, NodeType::Linear);
        node.add_edge(GraphEdge::new(other.id(), "north")).expect("edge");

        db.graph_nodes.save(&node).await.expect("save");
        db.graph_nodes.save(&other).await.expect("save");

        let loaded = db
            .graph_nodes
            .find_by_id(node.id())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.node_type(), NodeType::Hub);
        assert_eq!(loaded.position(), Some((3, -1)));
        assert_eq!(loaded.edges().len(), 1);

        let in_chunk = db.graph_nodes.find_by_chunk(chunk).await.expect("by chunk");
        assert_eq!(in_chunk.len(), 2);
    }

    #[tokio::test]
    async fn test_add_edge_rejects_duplicates_and_self() {
        let db = Database::in_memory().await.expect("db");
        let chunk = ChunkId::new();
        let a = GraphNode::new(chunk, NodeType::Hub);
        let b = GraphNode::new(chunk, NodeType::Linear);
        db.graph_nodes.save(&a).await.expect("save");
        db.graph_nodes.save(&b).await.expect("save");

        db.graph_nodes
            .add_edge(a.id(), GraphEdge::new(b.id(), "east"))
            .await
            .expect("first edge");
        let duplicate = db
            .graph_nodes
            .add_edge(a.id(), GraphEdge::new(b.id(), "up"))
            .await;
        assert!(matches!(duplicate, Err(GameError::Conflict { .. })));

        let self_edge = db
            .graph_nodes
            .add_edge(a.id(), GraphEdge::new(a.id(), "down"))
            .await;
        assert!(matches!(self_edge, Err(GameError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_remove_edge() {
        let db = Database::in_memory().await.expect("db");
        let chunk = ChunkId::new();
        let a = GraphNode::new(chunk, NodeType::Hub);
        let b = GraphNode::new(chunk, NodeType::Linear);
        db.graph_nodes.save(&a).await.expect("save");
        db.graph_nodes.save(&b).await.expect("save");
        db.graph_nodes
            .add_edge(a.id(), GraphEdge::new(b.id(), "east"))
            .await
            .expect("edge");

        db.graph_nodes.remove_edge(a.id(), b.id()).await.expect("remove");
        let missing = db.graph_nodes.remove_edge(a.id(), b.id()).await;
        assert!(matches!(missing, Err(GameError::NotFound { .. })));
    }
}
