//! In-memory storage backend for testing

use crate::error::{StorageError, StorageResult};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use ontograph_core::{
    EntityId, EntityLookup, EntityRef, EntityType, GraphBackend, Relation, Triple,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// In-memory storage backend
///
/// Useful for testing and temporary storage.
pub struct MemoryStorage {
    entities: RwLock<HashMap<EntityId, EntityType>>,
    relations: RwLock<BTreeMap<Triple, Relation>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            relations: RwLock::new(BTreeMap::new()),
        }
    }

    /// Storage pre-populated with an entity catalog
    pub fn with_entities(entities: impl IntoIterator<Item = EntityRef>) -> Self {
        Self {
            entities: RwLock::new(entities.into_iter().map(|e| (e.id, e.entity_type)).collect()),
            relations: RwLock::new(BTreeMap::new()),
        }
    }

    fn insert(&self, relation: &Relation) -> StorageResult<bool> {
        let mut relations = self.relations.write().map_err(StorageError::lock)?;
        let triple = relation.triple();
        if relations.contains_key(&triple) {
            return Ok(false);
        }
        relations.insert(triple, relation.clone());
        Ok(true)
    }

    fn remove(&self, triple: &Triple) -> StorageResult<bool> {
        let mut relations = self.relations.write().map_err(StorageError::lock)?;
        Ok(relations.remove(triple).is_some())
    }

    fn incident(&self, entity: &EntityId) -> StorageResult<Vec<Relation>> {
        let relations = self.relations.read().map_err(StorageError::lock)?;
        Ok(relations
            .values()
            .filter(|r| r.triple().touches(entity))
            .cloned()
            .collect())
    }

    fn all(&self) -> StorageResult<Vec<Relation>> {
        let relations = self.relations.read().map_err(StorageError::lock)?;
        Ok(relations.values().cloned().collect())
    }

    fn entity_type(&self, id: &EntityId) -> StorageResult<Option<EntityType>> {
        let entities = self.entities.read().map_err(StorageError::lock)?;
        Ok(entities.get(id).copied())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphBackend for MemoryStorage {
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
impl EntityLookup for MemoryStorage {
    async fn type_of(&self, id: &EntityId) -> ontograph_core::Result<Option<EntityType>> {
        Ok(self.entity_type(id)?)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn save_entity(&self, entity: &EntityRef) -> StorageResult<()> {
        let mut entities = self.entities.write().map_err(StorageError::lock)?;
        entities.insert(entity.id.clone(), entity.entity_type);
        Ok(())
    }

    async fn get_entity(&self, id: &EntityId) -> StorageResult<Option<EntityRef>> {
        Ok(self
            .entity_type(id)?
            .map(|t| EntityRef::new(id.clone(), t)))
    }

    async fn get_all_entities(&self) -> StorageResult<Vec<EntityRef>> {
        let entities = self.entities.read().map_err(StorageError::lock)?;
        let mut all: Vec<EntityRef> = entities
            .iter()
            .map(|(id, t)| EntityRef::new(id.clone(), *t))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn delete_entity(&self, id: &EntityId) -> StorageResult<bool> {
        let mut entities = self.entities.write().map_err(StorageError::lock)?;
        Ok(entities.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.initialize().await.unwrap();

        let kora = EntityRef::new("Instrument#1", EntityType::Instrument);
        storage.save_entity(&kora).await.unwrap();

        let retrieved = storage.get_entity(&kora.id).await.unwrap();
        assert_eq!(retrieved, Some(kora.clone()));
        assert_eq!(
            storage.type_of(&kora.id).await.unwrap(),
            Some(EntityType::Instrument)
        );

        assert!(storage.delete_entity(&kora.id).await.unwrap());
        assert!(storage.get_entity(&kora.id).await.unwrap().is_none());
        assert!(!storage.delete_entity(&kora.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_edges_are_unique_per_triple() {
        let storage = MemoryStorage::new();
        let relation = Relation::new("Instrument#1", "Material#4", "madeOf");

        assert!(storage.insert_edge(&relation).await.unwrap());
        assert!(!storage.insert_edge(&relation).await.unwrap());
        assert_eq!(storage.all_edges().await.unwrap().len(), 1);

        let incident = storage
            .incident_edges(&EntityId::new("Material#4"))
            .await
            .unwrap();
        assert_eq!(incident, vec![relation.clone()]);

        assert!(storage.remove_edge(&relation.triple()).await.unwrap());
        assert!(!storage.remove_edge(&relation.triple()).await.unwrap());
    }

    #[tokio::test]
    async fn test_entities_listed_by_id() {
        let storage = MemoryStorage::with_entities([
            EntityRef::new("b", EntityType::Family),
            EntityRef::new("a", EntityType::Instrument),
        ]);
        let all = storage.get_all_entities().await.unwrap();
        assert_eq!(all[0].id, EntityId::new("a"));
        assert_eq!(all.len(), 2);

        let b = storage.get_entity(&EntityId::new("b")).await.unwrap();
        assert_eq!(b, Some(EntityRef::new("b", EntityType::Family)));
    }
}
