//! Corpse repository
//!
//! Bulk queries order by decay timer ascending so load-time cleanup removes
//! the oldest first.

use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use delver_domain::{
    ChunkId, Corpse, CorpseId, EntityId, EquipSlot, GameError, GameResult, ItemInstance,
    ItemInstanceId,
};

use super::database::{corrupt, db_err};

pub struct CorpseRepository {
    pool: SqlitePool,
}

impl CorpseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, corpse: &Corpse) -> GameResult<()> {
        let items = serde_json::to_string(&corpse.items)
            .map_err(|e| GameError::internal(format!("encode corpse items: {e}")))?;
        let equipped = serde_json::to_string(&corpse.equipped)
            .map_err(|e| GameError::internal(format!("encode corpse equipment: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO corpses (id, player_id, space_id, items, equipped, gold, decay_at_tick, looted)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                items = excluded.items,
                equipped = excluded.equipped,
                gold = excluded.gold,
                looted = excluded.looted
            "#,
        )
        .bind(corpse.id().to_string())
        .bind(corpse.player_id.to_string())
        .bind(corpse.space_id.to_string())
        .bind(items)
        .bind(equipped)
        .bind(corpse.gold)
        .bind(corpse.decay_at_tick as i64)
        .bind(corpse.looted)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: CorpseId) -> GameResult<Option<Corpse>> {
        let row = sqlx::query("SELECT * FROM corpses WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(decode_corpse).transpose()
    }

    pub async fn find_by_player_id(&self, player_id: EntityId) -> GameResult<Vec<Corpse>> {
        let rows =
            sqlx::query("SELECT * FROM corpses WHERE player_id = ? ORDER BY decay_at_tick ASC")
                .bind(player_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(decode_corpse).collect()
    }

    pub async fn find_by_space_id(&self, space_id: ChunkId) -> GameResult<Vec<Corpse>> {
        let rows =
            sqlx::query("SELECT * FROM corpses WHERE space_id = ? ORDER BY decay_at_tick ASC")
                .bind(space_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(decode_corpse).collect()
    }

    /// Corpses whose decay deadline has passed
    pub async fn find_decayed(&self, now_tick: u64) -> GameResult<Vec<Corpse>> {
        let rows =
            sqlx::query("SELECT * FROM corpses WHERE decay_at_tick <= ? ORDER BY decay_at_tick ASC")
                .bind(now_tick as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(decode_corpse).collect()
    }

    pub async fn mark_looted(&self, id: CorpseId) -> GameResult<()> {
        let result = sqlx::query("UPDATE corpses SET looted = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(GameError::not_found("Corpse", id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: CorpseId) -> GameResult<()> {
        sqlx::query("DELETE FROM corpses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete_by_space_id(&self, space_id: ChunkId) -> GameResult<u64> {
        let result = sqlx::query("DELETE FROM corpses WHERE space_id = ?")
            .bind(space_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn decode_corpse(row: sqlx::sqlite::SqliteRow) -> GameResult<Corpse> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let player_id: String = row.try_get("player_id").map_err(db_err)?;
    let space_id: String = row.try_get("space_id").map_err(db_err)?;
    let items: String = row.try_get("items").map_err(db_err)?;
    let equipped: String = row.try_get("equipped").map_err(db_err)?;
    let gold: i64 = row.try_get("gold").map_err(db_err)?;
    let decay_at: i64 = row.try_get("decay_at_tick").map_err(db_err)?;
    let looted: bool = row.try_get("looted").map_err(db_err)?;

    let corpse_id = CorpseId::from_str(&id).map_err(|_| GameError::corrupt("Corpse", &id))?;
    let player =
        EntityId::from_str(&player_id).map_err(|_| GameError::corrupt("Corpse", &id))?;
    let space = ChunkId::from_str(&space_id).map_err(|_| GameError::corrupt("Corpse", &id))?;
    let items: Vec<ItemInstance> =
        serde_json::from_str(&items).map_err(corrupt("Corpse", &id))?;
    let equipped: BTreeMap<EquipSlot, ItemInstanceId> =
        serde_json::from_str(&equipped).map_err(corrupt("Corpse", &id))?;

    let mut corpse =
        Corpse::new(player, space, items, equipped, gold, decay_at as u64).with_id(corpse_id);
    corpse.looted = looted;
    Ok(corpse)
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{ChunkId, Corpse, EntityId, ItemInstance};
    use std::collections::BTreeMap;

    fn corpse_at(tick: u64) -> Corpse {
        Corpse::new(
            EntityId::new(),
            ChunkId::new(),
            vec![ItemInstance::new("iron_sword", 7)],
            BTreeMap::new(),
            30,
            tick,
        )
    }

    #[tokio::test]
    async fn test_corpse_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let corpse = corpse_at(100);
        db.corpses.save(&corpse).await.expect("save");

        let loaded = db
            .corpses
            .find_by_player_id(corpse.player_id)
            .await
            .expect("find");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].gold, 30);
        assert_eq!(loaded[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_decayed_ordering() {
        let db = Database::in_memory().await.expect("db");
        let late = corpse_at(500);
        let early = corpse_at(50);
        db.corpses.save(&late).await.expect("save");
        db.corpses.save(&early).await.expect("save");

        let decayed = db.corpses.find_decayed(600).await.expect("find");
        assert_eq!(decayed.len(), 2);
        assert_eq!(decayed[0].id(), early.id());

        let none_yet = db.corpses.find_decayed(10).await.expect("find");
        assert!(none_yet.is_empty());
    }

    #[tokio::test]
    async fn test_mark_looted() {
        let db = Database::in_memory().await.expect("db");
        let corpse = corpse_at(10);
        db.corpses.save(&corpse).await.expect("save");
        db.corpses.mark_looted(corpse.id()).await.expect("mark");

        let loaded = db
            .corpses
            .find_by_id(corpse.id())
            .await
            .expect("find")
            .expect("present");
        assert!(loaded.looted);
    }

    #[tokio::test]
    async fn test_delete_by_space() {
        let db = Database::in_memory().await.expect("db");
        let corpse = corpse_at(10);
        db.corpses.save(&corpse).await.expect("save");
        let removed = db
            .corpses
            .delete_by_space_id(corpse.space_id)
            .await
            .expect("delete");
        assert_eq!(removed, 1);
    }
}
