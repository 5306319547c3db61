//! Relation store: the only writer of edges
//!
//! Every mutation locks the entity ids it touches, re-runs validation while
//! holding those locks and only then writes. Two mutations that share a
//! source or a target therefore serialize, so a cardinality or uniqueness
//! check cannot be invalidated between the check and the write.

use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::graph::{relations_of, GraphBackend, GraphSnapshot};
use crate::relation::{Deleted, Direction, Relation, Triple};
use crate::validator::RelationValidator;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle lock slots are pruned once the table grows past this size
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Per-entity mutation locks
#[derive(Default)]
struct EntityLocks {
    slots: Mutex<HashMap<EntityId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one mutation
struct NeighborhoodGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    /// Lock the given ids in sorted order; duplicates are locked once
    async fn lock(&self, ids: &[&EntityId]) -> Result<NeighborhoodGuard> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let slots: Vec<Arc<AsyncMutex<()>>> = {
            let mut map = self
                .slots
                .lock()
                .map_err(|e| Error::StoreFailure(format!("Lock error: {}", e)))?;
            if map.len() > LOCK_PRUNE_THRESHOLD {
                map.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            ordered
                .iter()
                .map(|id| map.entry((*id).clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            guards.push(slot.lock_owned().await);
        }
        Ok(NeighborhoodGuard { _guards: guards })
    }
}

/// Atomic create/delete of relations over a [`GraphBackend`]
pub struct RelationStore<B: GraphBackend> {
    backend: Arc<B>,
    validator: RelationValidator,
    locks: EntityLocks,
}

impl<B: GraphBackend> RelationStore<B> {
    pub fn new(backend: Arc<B>, validator: RelationValidator) -> Self {
        Self {
            backend,
            validator,
            locks: EntityLocks::default(),
        }
    }

    /// Dry-run validation; takes no locks and writes nothing
    pub async fn validate(&self, triple: &Triple) -> Result<()> {
        self.validator.check(self.backend.as_ref(), triple).await
    }

    /// Validate and persist a relation as one unit
    pub async fn create(&self, triple: Triple) -> Result<Relation> {
        let _guard = self.locks.lock(&[&triple.source, &triple.target]).await?;

        self.validator.check(self.backend.as_ref(), &triple).await?;

        let relation = Relation::from_triple(triple);
        if !self.backend.insert_edge(&relation).await? {
            return Err(Error::DuplicateRelation(relation.triple()));
        }

        tracing::info!("Created relation: {}", relation);
        Ok(relation)
    }

    /// Remove a relation; a missing triple is reported
    pub async fn delete(&self, triple: &Triple) -> Result<Deleted> {
        let _guard = self.locks.lock(&[&triple.source, &triple.target]).await?;

        if !self.backend.remove_edge(triple).await? {
            return Err(Error::RelationNotFound(triple.clone()));
        }

        tracing::info!("Deleted relation: {}", triple);
        Ok(Deleted { deleted: true })
    }

    /// Relations incident to `entity`, ordered by triple
    pub async fn relations_of(
        &self,
        entity: &EntityId,
        relation_type: Option<&str>,
        direction: Direction,
    ) -> Result<Vec<Relation>> {
        relations_of(self.backend.as_ref(), entity, relation_type, direction).await
    }

    /// Remove every relation incident to `entity`
    ///
    /// Each edge removal is atomic on its own. Returns the number removed.
    pub async fn detach(&self, entity: &EntityId) -> Result<usize> {
        let _guard = self.locks.lock(&[entity]).await?;

        let relations = self.backend.incident_edges(entity).await?;
        let mut removed = 0;
        for relation in &relations {
            if self.backend.remove_edge(&relation.triple()).await? {
                removed += 1;
            }
        }

        tracing::info!("Detached {} relations from {}", removed, entity);
        Ok(removed)
    }

    /// Consistent copy of all edges for analytics
    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        let relations = self.backend.all_edges().await?;
        tracing::debug!("Loaded graph snapshot with {} relations", relations.len());
        Ok(GraphSnapshot::new(relations))
    }
}
