//! World chunk repository
//!
//! Children list and adjacency map are JSON-encoded; the parent id is a
//! foreign key into the same table.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use delver_domain::{ChunkId, ChunkLevel, GameError, GameResult, WorldChunk};

use super::database::{corrupt, db_err};

/// Row shape used for JSON (de)serialization of a chunk
#[derive(Serialize, Deserialize)]
struct StoredChunk {
    id: ChunkId,
    level: ChunkLevel,
    parent: Option<ChunkId>,
    children: Vec<ChunkId>,
    lore: String,
    biome_theme: String,
    size_estimate: u32,
    mob_density: f32,
    difficulty: u8,
    adjacency: BTreeMap<String, ChunkId>,
}

pub struct WorldChunkRepository {
    pool: SqlitePool,
}

impl WorldChunkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, chunk: &WorldChunk) -> GameResult<()> {
        let children = serde_json::to_string(chunk.children())
            .map_err(|e| GameError::internal(format!("encode children: {e}")))?;
        let adjacency = serde_json::to_string(chunk.adjacency())
            .map_err(|e| GameError::internal(format!("encode adjacency: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO world_chunks
                (id, level, parent_id, children, lore, biome_theme, size_estimate, mob_density, difficulty, adjacency)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                children = excluded.children,
                lore = excluded.lore,
                biome_theme = excluded.biome_theme,
                size_estimate = excluded.size_estimate,
                mob_density = excluded.mob_density,
                difficulty = excluded.difficulty,
                adjacency = excluded.adjacency
            "#,
        )
        .bind(chunk.id().to_string())
        .bind(chunk.level().to_string())
        .bind(chunk.parent().map(|p| p.to_string()))
        .bind(children)
        .bind(chunk.lore())
        .bind(chunk.biome_theme())
        .bind(chunk.size_estimate())
        .bind(chunk.mob_density())
        .bind(i64::from(chunk.difficulty()))
        .bind(adjacency)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: ChunkId) -> GameResult<Option<WorldChunk>> {
        let row = sqlx::query("SELECT * FROM world_chunks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(decode_chunk).transpose()
    }

    pub async fn find_by_parent(&self, parent: ChunkId) -> GameResult<Vec<WorldChunk>> {
        let rows = sqlx::query("SELECT * FROM world_chunks WHERE parent_id = ? ORDER BY id")
            .bind(parent.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(decode_chunk).collect()
    }

    /// Neighbor of `current` in `direction`, through the adjacency map
    pub async fn find_adjacent(
        &self,
        current: ChunkId,
        direction: &str,
    ) -> GameResult<Option<WorldChunk>> {
        let Some(chunk) = self.find_by_id(current).await? else {
            return Err(GameError::not_found("WorldChunk", current));
        };
        match chunk.neighbor(direction) {
            Some(neighbor) => self.find_by_id(neighbor).await,
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: ChunkId) -> GameResult<()> {
        sqlx::query("DELETE FROM world_chunks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn get_all(&self) -> GameResult<Vec<WorldChunk>> {
        let rows = sqlx::query("SELECT * FROM world_chunks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(decode_chunk).collect()
    }
}

fn parse_level(value: &str) -> Option<ChunkLevel> {
    match value {
        "WORLD" => Some(ChunkLevel::World),
        "REGION" => Some(ChunkLevel::Region),
        "ZONE" => Some(ChunkLevel::Zone),
        "SUBZONE" => Some(ChunkLevel::SubZone),
        "SPACE" => Some(ChunkLevel::Space),
        _ => None,
    }
}

fn decode_chunk(row: sqlx::sqlite::SqliteRow) -> GameResult<WorldChunk> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let level: String = row.try_get("level").map_err(db_err)?;
    let parent: Option<String> = row.try_get("parent_id").map_err(db_err)?;
    let children: String = row.try_get("children").map_err(db_err)?;
    let lore: String = row.try_get("lore").map_err(db_err)?;
    let biome_theme: String = row.try_get("biome_theme").map_err(db_err)?;
    let size_estimate: i64 = row.try_get("size_estimate").map_err(db_err)?;
    let mob_density: f64 = row.try_get("mob_density").map_err(db_err)?;
    let difficulty: i64 = row.try_get("difficulty").map_err(db_err)?;
    let adjacency: String = row.try_get("adjacency").map_err(db_err)?;

    let stored = StoredChunk {
        id: ChunkId::from_str(&id).map_err(|_| GameError::corrupt("WorldChunk", &id))?,
        level: parse_level(&level).ok_or_else(|| GameError::corrupt("WorldChunk", &id))?,
        parent: parent
            .map(|p| ChunkId::from_str(&p).map_err(|_| GameError::corrupt("WorldChunk", &p)))
            .transpose()?,
        children: serde_json::from_str(&children).map_err(corrupt("WorldChunk", &id))?,
        lore,
        biome_theme,
        size_estimate: size_estimate as u32,
        mob_density: mob_density as f32,
        difficulty: difficulty as u8,
        adjacency: serde_json::from_str(&adjacency).map_err(corrupt("WorldChunk", &id))?,
    };

    let mut chunk = WorldChunk::new(stored.level, stored.parent)?
        .with_id(stored.id)
        .with_lore(stored.lore)
        .with_biome_theme(stored.biome_theme)
        .with_size_estimate(stored.size_estimate)
        .with_mob_density(stored.mob_density)
        .with_difficulty(stored.difficulty);
    for child in stored.children {
        chunk.push_child(child);
    }
    for (direction, neighbor) in stored.adjacency {
        chunk.link_neighbor(direction, neighbor);
    }
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{ChunkLevel, WorldChunk};

    #[tokio::test]
    async fn test_chunk_roundtrip_with_hierarchy() {
        let db = Database::in_memory().await.expect("db");

        let mut world = WorldChunk::new(ChunkLevel::World, None)
            .expect("chunk")
            .with_lore("The first dark")
            .with_biome_theme("ancient_abyss");
        let region = WorldChunk::new(ChunkLevel::Region, Some(world.id()))
            .expect("chunk")
            .with_difficulty(4)
            .with_mob_density(0.3);
        world.push_child(region.id());

        db.chunks.save(&world).await.expect("save world");
        db.chunks.save(&region).await.expect("save region");

        let loaded = db
            .chunks
            .find_by_id(region.id())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.level(), ChunkLevel::Region);
        assert_eq!(loaded.parent(), Some(world.id()));
        assert_eq!(loaded.difficulty(), 4);

        let children = db.chunks.find_by_parent(world.id()).await.expect("children");
        assert_eq!(children.len(), 1);
    }

    #[tokio::test]
    async fn test_find_adjacent() {
        let db = Database::in_memory().await.expect("db");
        let mut a = WorldChunk::new(ChunkLevel::World, None).expect("chunk");
        let b = WorldChunk::new(ChunkLevel::World, None).expect("chunk");
        a.link_neighbor("east", b.id());

        db.chunks.save(&a).await.expect("save");
        db.chunks.save(&b).await.expect("save");

        let neighbor = db
            .chunks
            .find_adjacent(a.id(), "east")
            .await
            .expect("adjacent");
        assert_eq!(neighbor.map(|c| c.id()), Some(b.id()));
        assert!(db
            .chunks
            .find_adjacent(a.id(), "west")
            .await
            .expect("adjacent")
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_chunk_is_none() {
        let db = Database::in_memory().await.expect("db");
        let ghost = delver_domain::ChunkId::new();
        assert!(db.chunks.find_by_id(ghost).await.expect("find").is_none());
    }
}
