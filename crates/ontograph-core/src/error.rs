//! Error types for Ontograph Core

use crate::entity::{EntityId, EntityType};
use crate::limits::ValidationError;
use crate::relation::Triple;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using Ontograph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which endpoint of a candidate relation a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// The role an unresolved entity played in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    Source,
    Target,
    Query,
}

impl std::fmt::Display for EntityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("Source"),
            Self::Target => f.write_str("Target"),
            Self::Query => f.write_str("Query"),
        }
    }
}

impl From<Side> for EntityRole {
    fn from(side: Side) -> Self {
        match side {
            Side::Source => Self::Source,
            Side::Target => Self::Target,
        }
    }
}

fn type_list(types: &[EntityType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ontograph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown relation type: {0}")]
    UnknownRelationType(String),

    #[error("{role} entity not found: {id}")]
    EntityNotFound { role: EntityRole, id: EntityId },

    #[error(
        "Invalid source type for '{relation_type}': {entity} is {actual}, expected one of [{}]",
        type_list(.allowed)
    )]
    InvalidSourceType {
        relation_type: String,
        entity: EntityId,
        actual: EntityType,
        allowed: Vec<EntityType>,
    },

    #[error(
        "Invalid target type for '{relation_type}': {entity} is {actual}, expected one of [{}]",
        type_list(.allowed)
    )]
    InvalidTargetType {
        relation_type: String,
        entity: EntityId,
        actual: EntityType,
        allowed: Vec<EntityType>,
    },

    #[error(
        "Cardinality violation on {side} side of '{relation_type}': {entity} is already related to {existing}"
    )]
    CardinalityViolation {
        side: Side,
        relation_type: String,
        entity: EntityId,
        existing: EntityId,
    },

    #[error("Relation already exists: {0}")]
    DuplicateRelation(Triple),

    #[error("Relation not found: {0}")]
    RelationNotFound(Triple),

    #[error("Storage failure: {0}")]
    StoreFailure(String),

    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        operation: &'static str,
        elapsed_ms: u64,
    },

    #[error("Limit exceeded: {0}")]
    LimitExceeded(#[from] ValidationError),

    #[error("Invalid ontology schema: {0}")]
    InvalidSchema(String),
}

/// Machine-readable error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    UnknownRelationType,
    EntityNotFound,
    InvalidSourceType,
    InvalidTargetType,
    CardinalityViolation,
    DuplicateRelation,
    RelationNotFound,
    StoreFailure,
    Timeout,
    LimitExceeded,
    InvalidSchema,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownRelationType(_) => ErrorCode::UnknownRelationType,
            Self::EntityNotFound { .. } => ErrorCode::EntityNotFound,
            Self::InvalidSourceType { .. } => ErrorCode::InvalidSourceType,
            Self::InvalidTargetType { .. } => ErrorCode::InvalidTargetType,
            Self::CardinalityViolation { .. } => ErrorCode::CardinalityViolation,
            Self::DuplicateRelation(_) => ErrorCode::DuplicateRelation,
            Self::RelationNotFound(_) => ErrorCode::RelationNotFound,
            Self::StoreFailure(_) => ErrorCode::StoreFailure,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::LimitExceeded(_) => ErrorCode::LimitExceeded,
            Self::InvalidSchema(_) => ErrorCode::InvalidSchema,
        }
    }

    /// Validation outcomes depend only on graph state; only persistence
    /// failures may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreFailure(_))
    }

    /// Whether this is one of the ontology rule failures a validator reports
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownRelationType(_)
                | Self::EntityNotFound { .. }
                | Self::InvalidSourceType { .. }
                | Self::InvalidTargetType { .. }
                | Self::CardinalityViolation { .. }
                | Self::DuplicateRelation(_)
        )
    }
}
