//! Space properties repository
//!
//! Non-singular collections are JSON-encoded columns; the chunk id is a
//! foreign key. Targeted updates avoid rewriting the whole row for the hot
//! paths (description regeneration, flag flips, floor drops).

use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use delver_domain::{
    ChunkId, EntityId, Exit, GameError, GameResult, ItemInstance, ResourceNode, SpaceProperties,
    Terrain, Trap,
};

use super::database::{corrupt, db_err};

pub struct SpacePropertiesRepository {
    pool: SqlitePool,
}

impl SpacePropertiesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, space: &SpaceProperties) -> GameResult<()> {
        let json = |v: serde_json::Result<String>| {
            v.map_err(|e| GameError::internal(format!("encode space: {e}")))
        };

        let exits = json(serde_json::to_string(&space.exits))?;
        let traps = json(serde_json::to_string(&space.traps))?;
        let resources = json(serde_json::to_string(&space.resources))?;
        let entities = json(serde_json::to_string(space.entities()))?;
        let dropped = json(serde_json::to_string(&space.dropped_items))?;
        let flags = json(serde_json::to_string(space.flags()))?;

        sqlx::query(
            r#"
            INSERT INTO space_properties
                (chunk_id, name, description, exits, brightness, terrain, traps,
                 resources, entities, dropped_items, flags, is_safe_zone, is_treasure_room)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                exits = excluded.exits,
                brightness = excluded.brightness,
                terrain = excluded.terrain,
                traps = excluded.traps,
                resources = excluded.resources,
                entities = excluded.entities,
                dropped_items = excluded.dropped_items,
                flags = excluded.flags,
                is_safe_zone = excluded.is_safe_zone,
                is_treasure_room = excluded.is_treasure_room
            "#,
        )
        .bind(space.chunk_id().to_string())
        .bind(&space.name)
        .bind(&space.description)
        .bind(exits)
        .bind(i64::from(space.brightness))
        .bind(terrain_str(space.terrain))
        .bind(traps)
        .bind(resources)
        .bind(entities)
        .bind(dropped)
        .bind(flags)
        .bind(space.is_safe_zone)
        .bind(space.is_treasure_room)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_chunk_id(&self, chunk_id: ChunkId) -> GameResult<Option<SpaceProperties>> {
        let row = sqlx::query("SELECT * FROM space_properties WHERE chunk_id = ?")
            .bind(chunk_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(decode_space).transpose()
    }

    pub async fn update_description(&self, chunk_id: ChunkId, description: &str) -> GameResult<()> {
        self.targeted_update(chunk_id, "description", description.to_string())
            .await
    }

    pub async fn update_flags(
        &self,
        chunk_id: ChunkId,
        flags: &BTreeMap<String, bool>,
    ) -> GameResult<()> {
        let encoded = serde_json::to_string(flags)
            .map_err(|e| GameError::internal(format!("encode flags: {e}")))?;
        self.targeted_update(chunk_id, "flags", encoded).await
    }

    /// Append items to the floor without rewriting the rest of the row
    pub async fn add_items(&self, chunk_id: ChunkId, items: &[ItemInstance]) -> GameResult<()> {
        let Some(mut space) = self.find_by_chunk_id(chunk_id).await? else {
            return Err(GameError::not_found("SpaceProperties", chunk_id));
        };
        space.dropped_items.extend_from_slice(items);
        let encoded = serde_json::to_string(&space.dropped_items)
            .map_err(|e| GameError::internal(format!("encode dropped items: {e}")))?;
        self.targeted_update(chunk_id, "dropped_items", encoded).await
    }

    pub async fn delete(&self, chunk_id: ChunkId) -> GameResult<()> {
        sqlx::query("DELETE FROM space_properties WHERE chunk_id = ?")
            .bind(chunk_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn targeted_update(
        &self,
        chunk_id: ChunkId,
        column: &'static str,
        value: String,
    ) -> GameResult<()> {
        let query = format!("UPDATE space_properties SET {column} = ? WHERE chunk_id = ?");
        let result = sqlx::query(&query)
            .bind(value)
            .bind(chunk_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(GameError::not_found("SpaceProperties", chunk_id));
        }
        Ok(())
    }
}

fn terrain_str(terrain: Terrain) -> &'static str {
    match terrain {
        Terrain::Normal => "NORMAL",
        Terrain::Difficult => "DIFFICULT",
        Terrain::Hazardous => "HAZARDOUS",
        Terrain::Impassable => "IMPASSABLE",
    }
}

fn parse_terrain(value: &str) -> Option<Terrain> {
    match value {
        "NORMAL" => Some(Terrain::Normal),
        "DIFFICULT" => Some(Terrain::Difficult),
        "HAZARDOUS" => Some(Terrain::Hazardous),
        "IMPASSABLE" => Some(Terrain::Impassable),
        _ => None,
    }
}

fn decode_space(row: sqlx::sqlite::SqliteRow) -> GameResult<SpaceProperties> {
    let chunk_id: String = row.try_get("chunk_id").map_err(db_err)?;
    let name: String = row.try_get("name").map_err(db_err)?;
    let description: String = row.try_get("description").map_err(db_err)?;
    let exits: String = row.try_get("exits").map_err(db_err)?;
    let brightness: i64 = row.try_get("brightness").map_err(db_err)?;
    let terrain: String = row.try_get("terrain").map_err(db_err)?;
    let traps: String = row.try_get("traps").map_err(db_err)?;
    let resources: String = row.try_get("resources").map_err(db_err)?;
    let entities: String = row.try_get("entities").map_err(db_err)?;
    let dropped: String = row.try_get("dropped_items").map_err(db_err)?;
    let flags: String = row.try_get("flags").map_err(db_err)?;
    let is_safe_zone: bool = row.try_get("is_safe_zone").map_err(db_err)?;
    let is_treasure_room: bool = row.try_get("is_treasure_room").map_err(db_err)?;

    let id = ChunkId::from_str(&chunk_id)
        .map_err(|_| GameError::corrupt("SpaceProperties", &chunk_id))?;
    let exits: Vec<Exit> =
        serde_json::from_str(&exits).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let traps: Vec<Trap> =
        serde_json::from_str(&traps).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let resources: Vec<ResourceNode> =
        serde_json::from_str(&resources).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let entities: Vec<EntityId> =
        serde_json::from_str(&entities).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let dropped: Vec<ItemInstance> =
        serde_json::from_str(&dropped).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let flags: BTreeMap<String, bool> =
        serde_json::from_str(&flags).map_err(corrupt("SpaceProperties", &chunk_id))?;
    let terrain =
        parse_terrain(&terrain).ok_or_else(|| GameError::corrupt("SpaceProperties", &chunk_id))?;

    Ok(SpaceProperties::from_storage(
        id,
        name,
        description,
        exits,
        brightness.clamp(0, 100) as u8,
        terrain,
        traps,
        resources,
        entities,
        dropped,
        flags,
        is_safe_zone,
        is_treasure_room,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{
        ChunkId, ChunkLevel, EntityId, Exit, ItemInstance, SpaceProperties, Terrain, WorldChunk,
    };

    async fn seeded_space(db: &Database) -> SpaceProperties {
        let world = WorldChunk::new(ChunkLevel::World, None).expect("chunk");
        db.chunks.save(&world).await.expect("save chunk");
        let mut space = SpaceProperties::new(world.id(), "Mushroom Grotto");
        space.description = "Pale caps glow along the walls.".to_string();
        space.terrain = Terrain::Difficult;
        space.exits.push(Exit::open(ChunkId::new(), "north", "a mossy arch"));
        space.add_entity(EntityId::new());
        space.set_flag("lantern_lit", true);
        db.spaces.save(&space).await.expect("save space");
        space
    }

    #[tokio::test]
    async fn test_space_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let space = seeded_space(&db).await;

        let loaded = db
            .spaces
            .find_by_chunk_id(space.chunk_id())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.name, "Mushroom Grotto");
        assert_eq!(loaded.terrain, Terrain::Difficult);
        assert_eq!(loaded.exits.len(), 1);
        assert_eq!(loaded.entities().len(), 1);
        assert!(loaded.flag("lantern_lit"));
    }

    #[tokio::test]
    async fn test_targeted_updates() {
        let db = Database::in_memory().await.expect("db");
        let mut space = seeded_space(&db).await;

        db.spaces
            .update_description(space.chunk_id(), "The glow has dimmed.")
            .await
            .expect("update");

        space.set_flag("lantern_lit", false);
        db.spaces
            .update_flags(space.chunk_id(), space.flags())
            .await
            .expect("update flags");

        db.spaces
            .add_items(space.chunk_id(), &[ItemInstance::new("torch", 3)])
            .await
            .expect("add items");

        let loaded = db
            .spaces
            .find_by_chunk_id(space.chunk_id())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.description, "The glow has dimmed.");
        assert!(!loaded.flag("lantern_lit"));
        assert_eq!(loaded.dropped_items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_space_fails() {
        let db = Database::in_memory().await.expect("db");
        let result = db.spaces.update_description(ChunkId::new(), "nope").await;
        assert!(matches!(
            result,
            Err(delver_domain::GameError::NotFound { .. })
        ));
    }
}
