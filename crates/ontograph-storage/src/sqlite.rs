//! SQLite storage backend

use crate::error::{StorageError, StorageResult};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use ontograph_core::{
    EntityId, EntityLookup, EntityRef, EntityType, GraphBackend, Relation, Triple,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_tables()?;

        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_tables()?;

        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS relations (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                relation_type TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (source, target, relation_type)
            );

            CREATE INDEX IF NOT EXISTS idx_relations_target ON relations(target);
            "#,
        )?;

        Ok(())
    }

    fn insert(&self, relation: &Relation) -> StorageResult<bool> {
        let data = serde_json::to_string(relation)?;
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        let changed = conn.execute(
            "INSERT OR IGNORE INTO relations (source, target, relation_type, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                relation.source.as_str(),
                relation.target.as_str(),
                relation.relation_type,
                data
            ],
        )?;
        Ok(changed == 1)
    }

    fn remove(&self, triple: &Triple) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        let changed = conn.execute(
            "DELETE FROM relations WHERE source = ?1 AND target = ?2 AND relation_type = ?3",
            params![
                triple.source.as_str(),
                triple.target.as_str(),
                triple.relation_type
            ],
        )?;
        Ok(changed == 1)
    }

    fn query_relations(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Relation>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

        let mut relations = Vec::new();
        for data in rows {
            relations.push(serde_json::from_str(&data?)?);
        }
        Ok(relations)
    }

    fn entity_type(&self, id: &EntityId) -> StorageResult<Option<EntityType>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT entity_type FROM entities WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|t| parse_entity_type(&t)).transpose()
    }
}

fn parse_entity_type(raw: &str) -> StorageResult<EntityType> {
    raw.parse()
        .map_err(|e: ontograph_core::UnknownEntityType| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl GraphBackend for SqliteStorage {
    async fn insert_edge(&self, relation: &Relation) -> ontograph_core::Result<bool> {
        Ok(self.insert(relation)?)
    }

    async fn remove_edge(&self, triple: &Triple) -> ontograph_core::Result<bool> {
        Ok(self.remove(triple)?)
    }

    async fn incident_edges(&self, entity: &EntityId) -> ontograph_core::Result<Vec<Relation>> {
        Ok(self.query_relations(
            "SELECT data FROM relations WHERE source = ?1 OR target = ?1 ORDER BY source, target, relation_type",
            params![entity.as_str()],
        )?)
    }

    async fn all_edges(&self) -> ontograph_core::Result<Vec<Relation>> {
        Ok(self.query_relations(
            "SELECT data FROM relations ORDER BY source, target, relation_type",
            [],
        )?)
    }
}

#[async_trait]
impl EntityLookup for SqliteStorage {
    async fn type_of(&self, id: &EntityId) -> ontograph_core::Result<Option<EntityType>> {
        Ok(self.entity_type(id)?)
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(true)
    }

    async fn save_entity(&self, entity: &EntityRef) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        conn.execute(
            "INSERT OR REPLACE INTO entities (id, entity_type) VALUES (?1, ?2)",
            params![entity.id.as_str(), entity.entity_type.as_str()],
        )?;

        Ok(())
    }

    async fn get_entity(&self, id: &EntityId) -> StorageResult<Option<EntityRef>> {
        Ok(self
            .entity_type(id)?
            .map(|t| EntityRef::new(id.clone(), t)))
    }

    async fn get_all_entities(&self) -> StorageResult<Vec<EntityRef>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let mut stmt = conn.prepare("SELECT id, entity_type FROM entities ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entities = Vec::new();
        for row in rows {
            let (id, raw_type) = row?;
            entities.push(EntityRef::new(id, parse_entity_type(&raw_type)?));
        }
        Ok(entities)
    }

    async fn delete_entity(&self, id: &EntityId) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let changed = conn.execute("DELETE FROM entities WHERE id = ?1", params![id.as_str()])?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_storage() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.initialize().await.unwrap();
        assert!(storage.health_check().await.unwrap());

        let kora = EntityRef::new("Instrument#1", EntityType::Instrument);
        storage.save_entity(&kora).await.unwrap();
        assert_eq!(storage.get_entity(&kora.id).await.unwrap(), Some(kora.clone()));

        assert!(storage.delete_entity(&kora.id).await.unwrap());
        assert!(storage.get_entity(&kora.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_edges() {
        let storage = SqliteStorage::in_memory().unwrap();
        let relation = Relation::new("kora", "calabash", "madeOf");

        assert!(storage.insert_edge(&relation).await.unwrap());
        assert!(!storage.insert_edge(&relation).await.unwrap());

        let incident = storage
            .incident_edges(&EntityId::new("calabash"))
            .await
            .unwrap();
        assert_eq!(incident, vec![relation.clone()]);

        assert!(storage.remove_edge(&relation.triple()).await.unwrap());
        assert!(storage.all_edges().await.unwrap().is_empty());
    }
}
