//! Entity snapshot metadata operations

use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::EntityMeta;

impl Database {
    /// Upsert snapshot metadata for one entity.
    pub fn upsert_entity(&self, meta: &EntityMeta) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO entities (entity_id, domain, device_class, friendly_name, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(entity_id) DO UPDATE SET
                 domain = excluded.domain,
                 device_class = COALESCE(excluded.device_class, entities.device_class),
                 friendly_name = COALESCE(excluded.friendly_name, entities.friendly_name),
                 updated_at = excluded.updated_at",
            params![
                meta.entity_id,
                meta.domain,
                meta.device_class,
                meta.friendly_name,
                format_datetime(meta.updated_at)
            ],
        )?;
        Ok(())
    }

    /// Fetch metadata for one entity.
    pub fn get_entity(&self, entity_id: &str) -> Result<Option<EntityMeta>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT entity_id, domain, device_class, friendly_name, updated_at
             FROM entities WHERE entity_id = ?1",
            params![entity_id],
            row_to_meta,
        );
        match result {
            Ok(meta) => Ok(Some(meta)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All known entity metadata, keyed for classification during synthesis.
    pub fn list_entities(&self) -> Result<Vec<EntityMeta>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT entity_id, domain, device_class, friendly_name, updated_at
             FROM entities ORDER BY entity_id",
        )?;
        let rows = stmt.query_map([], row_to_meta)?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }
}

fn row_to_meta(row: &rusqlite::Row) -> rusqlite::Result<EntityMeta> {
    let updated_at: String = row.get(4)?;
    Ok(EntityMeta {
        entity_id: row.get(0)?,
        domain: row.get(1)?,
        device_class: row.get(2)?,
        friendly_name: row.get(3)?,
        updated_at: parse_datetime(&updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_upsert_and_get_entity() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();

        let meta = EntityMeta {
            entity_id: "binary_sensor.front_door".to_string(),
            domain: "binary_sensor".to_string(),
            device_class: Some("door".to_string()),
            friendly_name: Some("Front Door".to_string()),
            updated_at: now,
        };
        db.upsert_entity(&meta).unwrap();

        let stored = db.get_entity("binary_sensor.front_door").unwrap().unwrap();
        assert_eq!(stored.device_class.as_deref(), Some("door"));

        // A later upsert without device_class keeps the known one
        let partial = EntityMeta {
            device_class: None,
            friendly_name: None,
            ..meta
        };
        db.upsert_entity(&partial).unwrap();
        let stored = db.get_entity("binary_sensor.front_door").unwrap().unwrap();
        assert_eq!(stored.device_class.as_deref(), Some("door"));
        assert_eq!(stored.friendly_name.as_deref(), Some("Front Door"));
    }

    #[test]
    fn test_list_entities() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_entities().unwrap().is_empty());

        for id in ["light.kitchen", "light.hallway"] {
            db.upsert_entity(&EntityMeta::from_entity_id(id, Utc::now()).unwrap())
                .unwrap();
        }
        assert_eq!(db.list_entities().unwrap().len(), 2);
    }
}
