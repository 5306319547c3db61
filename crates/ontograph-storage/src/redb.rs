//! ReDB storage backend

use crate::error::{StorageError, StorageResult};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use ontograph_core::{
    EntityId, EntityLookup, EntityRef, EntityType, GraphBackend, Relation, Triple,
};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

// Table definitions
const RELATIONS: TableDefinition<(&str, &str, &str), &[u8]> = TableDefinition::new("relations");
/// `(target, source, type)` index for incoming lookups
const RELATIONS_BY_TARGET: TableDefinition<(&str, &str, &str), ()> =
    TableDefinition::new("relations_by_target");
const ENTITIES: TableDefinition<&str, &str> = TableDefinition::new("entities");

/// ReDB storage backend
///
/// Every edge write is one write transaction covering both the relation and
/// its incoming index entry.
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(RELATIONS)?;
            write_txn.open_table(RELATIONS_BY_TARGET)?;
            write_txn.open_table(ENTITIES)?;
        }
        write_txn.commit()?;

        tracing::debug!("Opened redb storage at {}", path.display());
        Ok(Self { db })
    }

    fn insert(&self, relation: &Relation) -> StorageResult<bool> {
        let value = serde_json::to_vec(relation)?;
        let (source, target, relation_type) = (
            relation.source.as_str(),
            relation.target.as_str(),
            relation.relation_type.as_str(),
        );

        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut relations = write_txn.open_table(RELATIONS)?;
            if relations.get((source, target, relation_type))?.is_some() {
                false
            } else {
                relations.insert((source, target, relation_type), value.as_slice())?;
                let mut incoming = write_txn.open_table(RELATIONS_BY_TARGET)?;
                incoming.insert((target, source, relation_type), ())?;
                true
            }
        };

        if inserted {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    fn remove(&self, triple: &Triple) -> StorageResult<bool> {
        let (source, target, relation_type) = (
            triple.source.as_str(),
            triple.target.as_str(),
            triple.relation_type.as_str(),
        );

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut relations = write_txn.open_table(RELATIONS)?;
            let existed = relations.remove((source, target, relation_type))?.is_some();
            if existed {
                let mut incoming = write_txn.open_table(RELATIONS_BY_TARGET)?;
                incoming.remove((target, source, relation_type))?;
            }
            existed
        };

        if removed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    fn incident(&self, entity: &EntityId) -> StorageResult<Vec<Relation>> {
        let id = entity.as_str();
        let read_txn = self.db.begin_read()?;
        let relations = read_txn.open_table(RELATIONS)?;
        let incoming = read_txn.open_table(RELATIONS_BY_TARGET)?;

        let mut found = Vec::new();
        for entry in relations.range((id, "", "")..)? {
            let (key, value) = entry?;
            if key.value().0 != id {
                break;
            }
            found.push(serde_json::from_slice(value.value())?);
        }

        for entry in incoming.range((id, "", "")..)? {
            let (key, _) = entry?;
            let (target, source, relation_type) = key.value();
            if target != id {
                break;
            }
            // Self-loops were read with the outgoing edges
            if source == id {
                continue;
            }
            match relations.get((source, target, relation_type))? {
                Some(value) => found.push(serde_json::from_slice(value.value())?),
                None => {
                    return Err(StorageError::InvalidData(format!(
                        "dangling index entry {} -[{}]-> {}",
                        source, relation_type, target
                    )))
                }
            }
        }

        Ok(found)
    }

    fn all(&self) -> StorageResult<Vec<Relation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELATIONS)?;

        let mut relations = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            relations.push(serde_json::from_slice(value.value())?);
        }
        Ok(relations)
    }

    fn entity_type(&self, id: &EntityId) -> StorageResult<Option<EntityType>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        match table.get(id.as_str())? {
            Some(value) => Ok(Some(parse_entity_type(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of stored relations
    pub fn relation_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELATIONS)?;
        Ok(table.len()?)
    }
}

fn parse_entity_type(raw: &str) -> StorageResult<EntityType> {
    raw.parse()
        .map_err(|e: ontograph_core::UnknownEntityType| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl GraphBackend for RedbStorage {
    async fn insert_edge(&self, relation: &Relation) -> ontograph_core::Result<bool> {
        Ok(self.insert(relation)?)
    }

    async fn remove_edge(&self, triple: &Triple) -> ontograph_core::Result<bool> {
        Ok(self.remove(triple)?)
    }

    async fn incident_edges(&self, entity: &EntityId) -> ontograph_core::Result<Vec<Relation>> {
        Ok(self.incident(entity)?)
    }

    async fn all_edges(&self) -> ontograph_core::Result<Vec<Relation>> {
        Ok(self.all()?)
    }
}

#[async_trait]
impl EntityLookup for RedbStorage {
    async fn type_of(&self, id: &EntityId) -> ontograph_core::Result<Option<EntityType>> {
        Ok(self.entity_type(id)?)
    }
}

#[async_trait]
impl StorageBackend for RedbStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(RELATIONS)?;
        Ok(true)
    }

    async fn save_entity(&self, entity: &EntityRef) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTITIES)?;
            table.insert(entity.id.as_str(), entity.entity_type.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn get_entity(&self, id: &EntityId) -> StorageResult<Option<EntityRef>> {
        Ok(self
            .entity_type(id)?
            .map(|t| EntityRef::new(id.clone(), t)))
    }

    async fn get_all_entities(&self) -> StorageResult<Vec<EntityRef>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        let mut entities = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            entities.push(EntityRef::new(key.value(), parse_entity_type(value.value())?));
        }
        Ok(entities)
    }

    async fn delete_entity(&self, id: &EntityId) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed;
        {
            let mut table = write_txn.open_table(ENTITIES)?;
            removed = table.remove(id.as_str())?.is_some();
        }
        write_txn.commit()?;
        Ok(removed)
    }
}
