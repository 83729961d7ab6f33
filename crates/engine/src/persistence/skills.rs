//! Skill repository
//!
//! Per-(entity, skill) rows plus whole-component load/save, and an
//! append-only skill event log queried in reverse chronological order.

use std::str::FromStr;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use delver_domain::{EntityId, GameError, GameResult, SkillComponent, SkillEvent, SkillState};

use super::database::{corrupt, db_err};

pub struct SkillRepository {
    pool: SqlitePool,
}

impl SkillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert one skill row
    pub async fn save(&self, entity_id: EntityId, skill: &SkillState) -> GameResult<()> {
        let state = serde_json::to_string(skill)
            .map_err(|e| GameError::internal(format!("encode skill: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO skills (entity_id, skill_name, state)
            VALUES (?, ?, ?)
            ON CONFLICT(entity_id, skill_name) DO UPDATE SET state = excluded.state
            "#,
        )
        .bind(entity_id.to_string())
        .bind(&skill.name)
        .bind(state)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find(
        &self,
        entity_id: EntityId,
        skill_name: &str,
    ) -> GameResult<Option<SkillState>> {
        let row = sqlx::query("SELECT state FROM skills WHERE entity_id = ? AND skill_name = ?")
            .bind(entity_id.to_string())
            .bind(skill_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let state: String = row.try_get("state").map_err(db_err)?;
        let skill =
            serde_json::from_str(&state).map_err(corrupt("SkillState", entity_id))?;
        Ok(Some(skill))
    }

    /// Load the full aggregate component for one entity
    pub async fn load_component(&self, entity_id: EntityId) -> GameResult<SkillComponent> {
        let rows = sqlx::query("SELECT state FROM skills WHERE entity_id = ? ORDER BY skill_name")
            .bind(entity_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut component = SkillComponent::new();
        for row in rows {
            let state: String = row.try_get("state").map_err(db_err)?;
            let skill: SkillState =
                serde_json::from_str(&state).map_err(corrupt("SkillState", entity_id))?;
            component.insert(skill);
        }
        Ok(component)
    }

    /// Save every skill of the aggregate in one transaction
    pub async fn save_component(
        &self,
        entity_id: EntityId,
        component: &SkillComponent,
    ) -> GameResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for skill in component.skills() {
            let state = serde_json::to_string(skill)
                .map_err(|e| GameError::internal(format!("encode skill: {e}")))?;
            sqlx::query(
                r#"
                INSERT INTO skills (entity_id, skill_name, state)
                VALUES (?, ?, ?)
                ON CONFLICT(entity_id, skill_name) DO UPDATE SET state = excluded.state
                "#,
            )
            .bind(entity_id.to_string())
            .bind(&skill.name)
            .bind(state)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// Append to the skill event log
    pub async fn log_event(&self, entity_id: EntityId, event: &SkillEvent) -> GameResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| GameError::internal(format!("encode skill event: {e}")))?;
        sqlx::query("INSERT INTO skill_events (entity_id, payload, created_at) VALUES (?, ?, ?)")
            .bind(entity_id.to_string())
            .bind(payload)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Most recent events first
    pub async fn recent_events(
        &self,
        entity_id: EntityId,
        limit: u32,
    ) -> GameResult<Vec<SkillEvent>> {
        let rows = sqlx::query(
            "SELECT payload FROM skill_events WHERE entity_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(entity_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                let payload: String = row.try_get("payload").map_err(db_err)?;
                serde_json::from_str(&payload).map_err(corrupt("SkillEvent", entity_id))
            })
            .collect()
    }

    pub async fn delete_for_entity(&self, entity_id: EntityId) -> GameResult<()> {
        sqlx::query("DELETE FROM skills WHERE entity_id = ?")
            .bind(entity_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use delver_domain::{EntityId, SkillComponent, SkillEvent, SkillState};

    #[tokio::test]
    async fn test_skill_row_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let entity = EntityId::new();
        let mut skill = SkillState::new("Mining").unlocked_at(2).with_tag("labor");
        skill.grant_xp(50);

        db.skills.save(entity, &skill).await.expect("save");
        let loaded = db
            .skills
            .find(entity, "Mining")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded, skill);
    }

    #[tokio::test]
    async fn test_component_roundtrip() {
        let db = Database::in_memory().await.expect("db");
        let entity = EntityId::new();
        let mut component = SkillComponent::new();
        component.insert(SkillState::new("Dodge").unlocked_at(1));
        component.insert(SkillState::new("Parry").unlocked_at(3));

        db.skills.save_component(entity, &component).await.expect("save");
        let loaded = db.skills.load_component(entity).await.expect("load");
        assert_eq!(loaded, component);
    }

    #[tokio::test]
    async fn test_event_log_reverse_chronological() {
        let db = Database::in_memory().await.expect("db");
        let entity = EntityId::new();
        for amount in [10u64, 20, 30] {
            db.skills
                .log_event(
                    entity,
                    &SkillEvent::XpGained {
                        skill: "Mining".into(),
                        amount,
                        current_xp: amount,
                        level: 1,
                    },
                )
                .await
                .expect("log");
        }

        let events = db.skills.recent_events(entity, 2).await.expect("events");
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SkillEvent::XpGained { amount: 30, .. }
        ));
        assert!(matches!(
            &events[1],
            SkillEvent::XpGained { amount: 20, .. }
        ));
    }
}
