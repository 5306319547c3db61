//! In-crate test doubles for the collaborator traits

use crate::entity::{EntityId, EntityLookup, EntityType};
use crate::error::{Error, Result};
use crate::graph::GraphBackend;
use crate::relation::{Relation, Triple};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Edge set behind a lock
#[derive(Default)]
pub struct MemoryGraph {
    edges: RwLock<BTreeMap<Triple, Relation>>,
}

impl MemoryGraph {
    pub fn with_relations(relations: impl IntoIterator<Item = Relation>) -> Self {
        let edges = relations.into_iter().map(|r| (r.triple(), r)).collect();
        Self {
            edges: RwLock::new(edges),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.read().unwrap().len()
    }
}

#[async_trait]
impl GraphBackend for MemoryGraph {
    async fn insert_edge(&self, relation: &Relation) -> Result<bool> {
        let mut edges = self.edges.write().unwrap();
        if edges.contains_key(&relation.triple()) {
            return Ok(false);
        }
        edges.insert(relation.triple(), relation.clone());
        Ok(true)
    }

    async fn remove_edge(&self, triple: &Triple) -> Result<bool> {
        Ok(self.edges.write().unwrap().remove(triple).is_some())
    }

    async fn incident_edges(&self, entity: &EntityId) -> Result<Vec<Relation>> {
        Ok(self
            .edges
            .read()
            .unwrap()
            .values()
            .filter(|r| r.source == *entity || r.target == *entity)
            .cloned()
            .collect())
    }

    async fn all_edges(&self) -> Result<Vec<Relation>> {
        Ok(self.edges.read().unwrap().values().cloned().collect())
    }
}

/// Fixed entity catalog that counts lookups
#[derive(Default)]
pub struct StaticEntities {
    types: HashMap<EntityId, EntityType>,
    pub lookups: AtomicUsize,
}

impl StaticEntities {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, EntityType)>) -> Self {
        Self {
            types: entries
                .into_iter()
                .map(|(id, t)| (EntityId::new(id), t))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EntityLookup for StaticEntities {
    async fn type_of(&self, id: &EntityId) -> Result<Option<EntityType>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.types.get(id).copied())
    }
}

/// Backend whose writes fail a set number of times before delegating
pub struct FlakyGraph {
    inner: MemoryGraph,
    failures_left: AtomicUsize,
    pub write_attempts: AtomicUsize,
}

impl FlakyGraph {
    pub fn failing(times: usize) -> Self {
        Self {
            inner: MemoryGraph::default(),
            failures_left: AtomicUsize::new(times),
            write_attempts: AtomicUsize::new(0),
        }
    }

    fn maybe_fail(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::StoreFailure("disk unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphBackend for FlakyGraph {
    async fn insert_edge(&self, relation: &Relation) -> Result<bool> {
        self.maybe_fail()?;
        self.inner.insert_edge(relation).await
    }

    async fn remove_edge(&self, triple: &Triple) -> Result<bool> {
        self.maybe_fail()?;
        self.inner.remove_edge(triple).await
    }

    async fn incident_edges(&self, entity: &EntityId) -> Result<Vec<Relation>> {
        self.inner.incident_edges(entity).await
    }

    async fn all_edges(&self) -> Result<Vec<Relation>> {
        self.inner.all_edges().await
    }
}
