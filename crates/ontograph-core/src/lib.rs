//! Ontograph Core - Ontology-constrained relation engine
//!
//! This crate provides the relation types, the ontology schema registry,
//! validation and atomic mutation of relations, and the graph analytics
//! (shortest paths, degree centrality, neighbor similarity) built on them.

pub mod entity;
pub mod error;
pub mod facade;
pub mod graph;
pub mod limits;
pub mod relation;
pub mod schema;
pub mod store;
pub mod traversal;
pub mod validator;

#[cfg(test)]
mod testing;

pub use entity::{EntityId, EntityLookup, EntityRef, EntityType, UnknownEntityType};
pub use error::{EntityRole, Error, ErrorCode, Result, Side};
pub use facade::{RelationService, ServiceOptions};
pub use graph::{GraphBackend, GraphSnapshot};
pub use limits::ValidationError;
pub use relation::{Deleted, Direction, Relation, Triple};
pub use schema::{Bound, Cardinality, OntologySchema, RelationTypeDefinition};
pub use store::RelationStore;
pub use traversal::{
    CentralityScore, CentralityWeights, Deadline, GraphSummary, Path, PathSearch, PathStep,
    SimilarEntity, TraversalEngine, TraversalStats,
};
pub use validator::{RelationValidator, ValidationResult};
