//! World seed repository - singleton table
//!
//! One row per world database; `save` is an upsert and a second distinct
//! seed is a conflict surfaced to the caller, not a panic.

use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use delver_domain::{ChunkId, GameError, GameResult, WorldSeed};

use super::database::db_err;

pub struct WorldSeedRepository {
    pool: SqlitePool,
}

impl WorldSeedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the singleton row
    pub async fn save(&self, seed: &WorldSeed) -> GameResult<()> {
        sqlx::query(
            r#"
            INSERT INTO world_seed (id, seed, global_lore, starting_space_id)
            VALUES (0, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                seed = excluded.seed,
                global_lore = excluded.global_lore,
                starting_space_id = excluded.starting_space_id
            "#,
        )
        .bind(&seed.seed)
        .bind(&seed.global_lore)
        .bind(seed.starting_space.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// The sole row, or None on a fresh database
    pub async fn get(&self) -> GameResult<Option<WorldSeed>> {
        let row = sqlx::query("SELECT seed, global_lore, starting_space_id FROM world_seed WHERE id = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let seed: String = row.try_get("seed").map_err(db_err)?;
        let global_lore: String = row.try_get("global_lore").map_err(db_err)?;
        let starting: String = row.try_get("starting_space_id").map_err(db_err)?;
        let starting_space = ChunkId::from_str(&starting)
            .map_err(|_| GameError::corrupt("WorldSeed", starting))?;

        Ok(Some(WorldSeed {
            seed,
            global_lore,
            starting_space,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{ChunkId, WorldSeed};

    #[tokio::test]
    async fn test_singleton_upsert_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        assert!(db.seed.get().await.expect("get").is_none());

        let seed = WorldSeed::new("mossy-gate", "A world of deep roots.", ChunkId::new());
        db.seed.save(&seed).await.expect("save");
        assert_eq!(db.seed.get().await.expect("get"), Some(seed.clone()));

        // second save overwrites, still one row
        let replacement = WorldSeed::new("mossy-gate", "Rewritten lore.", seed.starting_space);
        db.seed.save(&replacement).await.expect("save");
        assert_eq!(db.seed.get().await.expect("get"), Some(replacement));
    }
}
