//! World database connection and schema
//!
//! One SQLite database per save. Every repository method is a single
//! transaction; multi-statement writes open one explicitly.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use delver_domain::{GameError, GameResult};

use super::{
    CorpseRepository, GraphNodeRepository, ItemRepository, SkillRepository,
    SpacePropertiesRepository, TreasureRoomRepository, WorldChunkRepository, WorldSeedRepository,
};

/// Map a driver error to the unified error vocabulary
pub(crate) fn db_err(err: sqlx::Error) -> GameError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            GameError::conflict("Row", db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            GameError::invalid(format!("foreign key violation: {}", db.message()))
        }
        _ => GameError::internal(format!("database: {err}")),
    }
}

/// Map a JSON column decode failure to a corrupt-data error
pub(crate) fn corrupt(kind: &'static str, id: impl ToString) -> impl FnOnce(serde_json::Error) -> GameError {
    let id = id.to_string();
    move |err| {
        tracing::error!(kind, id, %err, "corrupt persisted value");
        GameError::Corrupt { kind, id }
    }
}

/// Bundle of repositories over one world database
pub struct Database {
    pool: SqlitePool,
    pub seed: WorldSeedRepository,
    pub chunks: WorldChunkRepository,
    pub spaces: SpacePropertiesRepository,
    pub graph_nodes: GraphNodeRepository,
    pub treasure_rooms: TreasureRoomRepository,
    pub corpses: CorpseRepository,
    pub skills: SkillRepository,
    pub items: ItemRepository,
}

impl Database {
    /// Open (creating if missing) a world database file
    pub async fn open(path: &str) -> GameResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        Self::from_pool(pool).await
    }

    /// In-memory database for tests. The single connection is pinned open;
    /// letting it close would drop the whole database.
    pub async fn in_memory() -> GameResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> GameResult<Self> {
        init_schema(&pool).await?;
        Ok(Self {
            seed: WorldSeedRepository::new(pool.clone()),
            chunks: WorldChunkRepository::new(pool.clone()),
            spaces: SpacePropertiesRepository::new(pool.clone()),
            graph_nodes: GraphNodeRepository::new(pool.clone()),
            treasure_rooms: TreasureRoomRepository::new(pool.clone()),
            corpses: CorpseRepository::new(pool.clone()),
            skills: SkillRepository::new(pool.clone()),
            items: ItemRepository::new(pool.clone()),
            pool,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn init_schema(pool: &SqlitePool) -> GameResult<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS world_seed (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            seed TEXT NOT NULL,
            global_lore TEXT NOT NULL,
            starting_space_id TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS world_chunks (
            id TEXT PRIMARY KEY,
            level TEXT NOT NULL,
            parent_id TEXT REFERENCES world_chunks(id),
            children TEXT NOT NULL,
            lore TEXT NOT NULL,
            biome_theme TEXT NOT NULL,
            size_estimate INTEGER NOT NULL,
            mob_density REAL NOT NULL,
            difficulty INTEGER NOT NULL,
            adjacency TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_world_chunks_parent ON world_chunks(parent_id)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS space_properties (
            chunk_id TEXT PRIMARY KEY REFERENCES world_chunks(id),
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            exits TEXT NOT NULL,
            brightness INTEGER NOT NULL,
            terrain TEXT NOT NULL,
            traps TEXT NOT NULL,
            resources TEXT NOT NULL,
            entities TEXT NOT NULL,
            dropped_items TEXT NOT NULL,
            flags TEXT NOT NULL,
            is_safe_zone INTEGER NOT NULL DEFAULT 0,
            is_treasure_room INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS graph_nodes (
            id TEXT PRIMARY KEY,
            chunk_id TEXT NOT NULL,
            pos_x INTEGER,
            pos_y INTEGER,
            node_type TEXT NOT NULL,
            edges TEXT NOT NULL,
            space_id TEXT
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_graph_nodes_chunk ON graph_nodes(chunk_id)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS treasure_rooms (
            id TEXT PRIMARY KEY,
            space_id TEXT NOT NULL,
            room_type TEXT NOT NULL,
            biome_theme TEXT NOT NULL,
            currently_taken_item TEXT,
            has_been_looted INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pedestals (
            id TEXT PRIMARY KEY,
            treasure_room_id TEXT NOT NULL REFERENCES treasure_rooms(id) ON DELETE CASCADE,
            item_template_id TEXT NOT NULL,
            state TEXT NOT NULL,
            pedestal_index INTEGER NOT NULL,
            theme_description TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS corpses (
            id TEXT PRIMARY KEY,
            player_id TEXT NOT NULL,
            space_id TEXT NOT NULL,
            items TEXT NOT NULL,
            equipped TEXT NOT NULL,
            gold INTEGER NOT NULL,
            decay_at_tick INTEGER NOT NULL,
            looted INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS skills (
            entity_id TEXT NOT NULL,
            skill_name TEXT NOT NULL,
            state TEXT NOT NULL,
            PRIMARY KEY (entity_id, skill_name)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS skill_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS item_templates (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS item_instances (
            id TEXT PRIMARY KEY,
            owner_kind TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            payload TEXT NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await.map_err(db_err)?;
    }
    Ok(())
}
