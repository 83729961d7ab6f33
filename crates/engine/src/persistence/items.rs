//! Item repository: templates and instance placement
//!
//! Instances are stored with their owner (a space floor, an entity, or a
//! corpse) so loot can be rebuilt on load.

use sqlx::{Row, SqlitePool};

use delver_domain::{GameError, GameResult, ItemInstance, ItemInstanceId, ItemTemplate, ItemTemplateId};

use super::database::{corrupt, db_err};

/// Who currently holds an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOwner {
    Space(String),
    Entity(String),
    Corpse(String),
}

impl ItemOwner {
    fn kind(&self) -> &'static str {
        match self {
            Self::Space(_) => "space",
            Self::Entity(_) => "entity",
            Self::Corpse(_) => "corpse",
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Space(id) | Self::Entity(id) | Self::Corpse(id) => id,
        }
    }
}

pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save_template(&self, template: &ItemTemplate) -> GameResult<()> {
        let payload = serde_json::to_string(template)
            .map_err(|e| GameError::internal(format!("encode template: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO item_templates (id, payload)
            VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET payload = excluded.payload
            "#,
        )
        .bind(template.id().to_string())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_template(&self, id: &ItemTemplateId) -> GameResult<Option<ItemTemplate>> {
        let row = sqlx::query("SELECT payload FROM item_templates WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(db_err)?;
        let template =
            serde_json::from_str(&payload).map_err(corrupt("ItemTemplate", id.as_str()))?;
        Ok(Some(template))
    }

    pub async fn all_templates(&self) -> GameResult<Vec<ItemTemplate>> {
        let rows = sqlx::query("SELECT id, payload FROM item_templates ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(db_err)?;
                let payload: String = row.try_get("payload").map_err(db_err)?;
                serde_json::from_str(&payload).map_err(corrupt("ItemTemplate", id))
            })
            .collect()
    }

    pub async fn save_instance(&self, instance: &ItemInstance, owner: &ItemOwner) -> GameResult<()> {
        let payload = serde_json::to_string(instance)
            .map_err(|e| GameError::internal(format!("encode instance: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO item_instances (id, owner_kind, owner_id, payload)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_kind = excluded.owner_kind,
                owner_id = excluded.owner_id,
                payload = excluded.payload
            "#,
        )
        .bind(instance.id.to_string())
        .bind(owner.kind())
        .bind(owner.id())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_by_owner(&self, owner: &ItemOwner) -> GameResult<Vec<ItemInstance>> {
        let rows = sqlx::query(
            "SELECT id, payload FROM item_instances WHERE owner_kind = ? AND owner_id = ? ORDER BY id",
        )
        .bind(owner.kind())
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(db_err)?;
                let payload: String = row.try_get("payload").map_err(db_err)?;
                serde_json::from_str(&payload).map_err(corrupt("ItemInstance", id))
            })
            .collect()
    }

    pub async fn delete_instance(&self, id: ItemInstanceId) -> GameResult<()> {
        sqlx::query("DELETE FROM item_instances WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use super::ItemOwner;
    use delver_domain::{EquipSlot, ItemInstance, ItemTemplate, Rarity};

    fn sword_template() -> ItemTemplate {
        ItemTemplate::new("iron_sword", "Iron Sword", "weapon")
            .with_property("damage", "10")
            .with_rarity(Rarity::Uncommon)
            .with_equip_slot(EquipSlot::HandsMain)
    }

    #[tokio::test]
    async fn test_template_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let template = sword_template();
        db.items.save_template(&template).await.expect("save");

        let loaded = db
            .items
            .find_template(template.id())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.name(), "Iron Sword");
        assert_eq!(loaded.rarity(), Rarity::Uncommon);
        assert_eq!(loaded.equip_slot(), Some(EquipSlot::HandsMain));
    }

    #[tokio::test]
    async fn test_instance_ownership_moves() {
        let db = Database::in_memory().await.expect("db");
        let instance = ItemInstance::new("iron_sword", 7);
        let floor = ItemOwner::Space("space-1".into());
        let pocket = ItemOwner::Entity("player-1".into());

        db.items.save_instance(&instance, &floor).await.expect("save");
        assert_eq!(db.items.find_by_owner(&floor).await.expect("find").len(), 1);

        db.items.save_instance(&instance, &pocket).await.expect("move");
        assert!(db.items.find_by_owner(&floor).await.expect("find").is_empty());
        assert_eq!(db.items.find_by_owner(&pocket).await.expect("find").len(), 1);
    }
}
