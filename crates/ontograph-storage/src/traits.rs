//! Storage backend trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use ontograph_core::{EntityId, EntityLookup, EntityRef, GraphBackend};

/// A persistent home for relations and the local entity catalog
///
/// Relations are written only through [`GraphBackend`], which the relation
/// store drives; this trait adds lifecycle and catalog maintenance.
#[async_trait]
pub trait StorageBackend: GraphBackend + EntityLookup {
    /// Initialize the storage (create tables, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Entity Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace an entity
    async fn save_entity(&self, entity: &EntityRef) -> StorageResult<()>;

    async fn get_entity(&self, id: &EntityId) -> StorageResult<Option<EntityRef>>;

    /// All entities ordered by id
    async fn get_all_entities(&self) -> StorageResult<Vec<EntityRef>>;

    /// Remove an entity. Returns `false` if it was not present.
    ///
    /// Relations are left untouched; detach the entity first.
    async fn delete_entity(&self, id: &EntityId) -> StorageResult<bool>;
}
