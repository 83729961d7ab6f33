//! Treasure room repository with child pedestal rows

use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use delver_domain::{
    ChunkId, GameError, GameResult, ItemTemplateId, Pedestal, PedestalId, PedestalState,
    TreasureRoom, TreasureRoomId,
};

use super::database::db_err;

pub struct TreasureRoomRepository {
    pool: SqlitePool,
}

impl TreasureRoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save the room and all pedestals in one transaction
    pub async fn save(&self, room: &TreasureRoom) -> GameResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO treasure_rooms
                (id, space_id, room_type, biome_theme, currently_taken_item, has_been_looted)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                currently_taken_item = excluded.currently_taken_item,
                has_been_looted = excluded.has_been_looted
            "#,
        )
        .bind(room.id().to_string())
        .bind(room.space_id.to_string())
        .bind(&room.room_type)
        .bind(&room.biome_theme)
        .bind(room.currently_taken_item.as_ref().map(|t| t.to_string()))
        .bind(room.has_been_looted)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for pedestal in &room.pedestals {
            sqlx::query(
                r#"
                INSERT INTO pedestals
                    (id, treasure_room_id, item_template_id, state, pedestal_index, theme_description)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET state = excluded.state
                "#,
            )
            .bind(pedestal.id().to_string())
            .bind(pedestal.treasure_room_id.to_string())
            .bind(pedestal.item_template_id.to_string())
            .bind(state_str(pedestal.state))
            .bind(i64::from(pedestal.pedestal_index))
            .bind(&pedestal.theme_description)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_space(&self, space_id: ChunkId) -> GameResult<Option<TreasureRoom>> {
        let row = sqlx::query("SELECT * FROM treasure_rooms WHERE space_id = ?")
            .bind(space_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(self.hydrate(row).await?))
    }

    pub async fn find_by_id(&self, id: TreasureRoomId) -> GameResult<Option<TreasureRoom>> {
        let row = sqlx::query("SELECT * FROM treasure_rooms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(self.hydrate(row).await?))
    }

    pub async fn delete(&self, id: TreasureRoomId) -> GameResult<()> {
        sqlx::query("DELETE FROM treasure_rooms WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn hydrate(&self, row: sqlx::sqlite::SqliteRow) -> GameResult<TreasureRoom> {
        let id: String = row.try_get("id").map_err(db_err)?;
        let space_id: String = row.try_get("space_id").map_err(db_err)?;
        let room_type: String = row.try_get("room_type").map_err(db_err)?;
        let biome_theme: String = row.try_get("biome_theme").map_err(db_err)?;
        let taken: Option<String> = row.try_get("currently_taken_item").map_err(db_err)?;
        let looted: bool = row.try_get("has_been_looted").map_err(db_err)?;

        let room_id =
            TreasureRoomId::from_str(&id).map_err(|_| GameError::corrupt("TreasureRoom", &id))?;
        let space = ChunkId::from_str(&space_id)
            .map_err(|_| GameError::corrupt("TreasureRoom", &id))?;

        let pedestal_rows = sqlx::query(
            "SELECT * FROM pedestals WHERE treasure_room_id = ? ORDER BY pedestal_index",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut room = TreasureRoom::new(space, room_type, biome_theme).with_id(room_id);
        room.currently_taken_item = taken.map(ItemTemplateId::from);
        room.has_been_looted = looted;

        for pedestal_row in pedestal_rows {
            let pid: String = pedestal_row.try_get("id").map_err(db_err)?;
            let template: String = pedestal_row.try_get("item_template_id").map_err(db_err)?;
            let state: String = pedestal_row.try_get("state").map_err(db_err)?;
            let index: i64 = pedestal_row.try_get("pedestal_index").map_err(db_err)?;
            let theme: String = pedestal_row.try_get("theme_description").map_err(db_err)?;

            let mut pedestal = Pedestal::new(room_id, ItemTemplateId::from(template), index as u32, theme)
                .with_id(
                    PedestalId::from_str(&pid)
                        .map_err(|_| GameError::corrupt("Pedestal", &pid))?,
                );
            pedestal.state =
                parse_state(&state).ok_or_else(|| GameError::corrupt("Pedestal", &pid))?;
            room.pedestals.push(pedestal);
        }
        Ok(room)
    }
}

fn state_str(state: PedestalState) -> &'static str {
    match state {
        PedestalState::Available => "AVAILABLE",
        PedestalState::Locked => "LOCKED",
        PedestalState::Empty => "EMPTY",
    }
}

fn parse_state(value: &str) -> Option<PedestalState> {
    match value {
        "AVAILABLE" => Some(PedestalState::Available),
        "LOCKED" => Some(PedestalState::Locked),
        "EMPTY" => Some(PedestalState::Empty),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{ChunkId, Pedestal, PedestalState, TreasureRoom};

    fn sample_room() -> TreasureRoom {
        let mut room = TreasureRoom::new(ChunkId::new(), "vault", "magma_cave");
        let id = room.id();
        room.pedestals
            .push(Pedestal::new(id, "ember_blade".into(), 0, "wreathed in sparks"));
        room.pedestals
            .push(Pedestal::new(id, "cinder_ring".into(), 1, "still warm"));
        room
    }

    #[tokio::test]
    async fn test_room_roundtrip_with_pedestals() {
        let db = Database::in_memory().await.expect("db");
        let room = sample_room();
        db.treasure_rooms.save(&room).await.expect("save");

        let loaded = db
            .treasure_rooms
            .find_by_space(room.space_id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.pedestals.len(), 2);
        assert_eq!(loaded.pedestals[0].state, PedestalState::Available);
        assert!(!loaded.has_been_looted);
    }

    #[tokio::test]
    async fn test_loot_state_persists() {
        let db = Database::in_memory().await.expect("db");
        let mut room = sample_room();
        db.treasure_rooms.save(&room).await.expect("save");

        room.take_from(0).expect("take");
        db.treasure_rooms.save(&room).await.expect("save");

        let loaded = db
            .treasure_rooms
            .find_by_id(room.id())
            .await
            .expect("find")
            .expect("present");
        assert!(loaded.has_been_looted);
        assert_eq!(loaded.pedestals[0].state, PedestalState::Empty);
        assert_eq!(loaded.pedestals[1].state, PedestalState::Locked);
    }
}
