//! Graph persistence trait and read snapshots

use crate::entity::EntityId;
use crate::error::Result;
use crate::relation::{Direction, Relation, Triple};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Minimal edge storage the relation store writes through
///
/// Backends must make each call atomic: an edge is either fully present or
/// absent to concurrent readers. Only [`RelationStore`](crate::RelationStore)
/// holds a backend; every other component reaches edges through it.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Insert an edge. Returns `false` without writing if the triple exists.
    async fn insert_edge(&self, relation: &Relation) -> Result<bool>;

    /// Remove an edge. Returns `false` if the triple was not present.
    async fn remove_edge(&self, triple: &Triple) -> Result<bool>;

    /// All edges with `entity` as source or target
    async fn incident_edges(&self, entity: &EntityId) -> Result<Vec<Relation>>;

    /// Every edge in the graph, read from one consistent view
    async fn all_edges(&self) -> Result<Vec<Relation>>;
}

/// Incident edges of `entity` filtered by type and direction, ordered by triple
pub(crate) async fn relations_of<B: GraphBackend + ?Sized>(
    backend: &B,
    entity: &EntityId,
    relation_type: Option<&str>,
    direction: Direction,
) -> Result<Vec<Relation>> {
    let mut relations: Vec<Relation> = backend
        .incident_edges(entity)
        .await?
        .into_iter()
        .filter(|r| r.is_incident(entity, direction))
        .filter(|r| relation_type.map_or(true, |t| r.relation_type == t))
        .collect();

    relations.sort();
    relations.dedup();
    Ok(relations)
}

/// Immutable copy of the edge set, ordered by triple
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    relations: Vec<Relation>,
}

impl GraphSnapshot {
    pub fn new(mut relations: Vec<Relation>) -> Self {
        relations.sort();
        relations.dedup();
        Self { relations }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Edge count per relation type
    pub fn counts_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for rel in &self.relations {
            *counts.entry(rel.relation_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}
