//! Relation (edge) types

use crate::entity::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction for relation queries and path steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "outgoing" | "out" => Ok(Self::Outgoing),
            "incoming" | "in" => Ok(Self::Incoming),
            "both" => Ok(Self::Both),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

/// The `(source, target, type)` key of an edge
///
/// Ordering is lexicographic over the three components; it is the canonical
/// order in which relations are returned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub source: EntityId,
    pub target: EntityId,
    pub relation_type: String,
}

impl Triple {
    pub fn new(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
        }
    }

    /// Whether `entity` is an endpoint of this triple
    pub fn touches(&self, entity: &EntityId) -> bool {
        &self.source == entity || &self.target == entity
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.relation_type, self.target)
    }
}

/// A persisted relation between two entities
///
/// Identity (equality and ordering) is the triple alone; `created_at` is
/// informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity ID
    pub source: EntityId,

    /// Target entity ID
    pub target: EntityId,

    /// Relation type name, a key of the ontology schema
    pub relation_type: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
            created_at: Utc::now(),
        }
    }

    pub fn from_triple(triple: Triple) -> Self {
        Self {
            source: triple.source,
            target: triple.target,
            relation_type: triple.relation_type,
            created_at: Utc::now(),
        }
    }

    pub fn triple(&self) -> Triple {
        Triple {
            source: self.source.clone(),
            target: self.target.clone(),
            relation_type: self.relation_type.clone(),
        }
    }

    /// Whether this relation is incident to `entity` in the given direction
    pub fn is_incident(&self, entity: &EntityId, direction: Direction) -> bool {
        match direction {
            Direction::Outgoing => &self.source == entity,
            Direction::Incoming => &self.target == entity,
            Direction::Both => &self.source == entity || &self.target == entity,
        }
    }

    /// The endpoint opposite to `entity`
    pub fn other_end(&self, entity: &EntityId) -> &EntityId {
        if &self.source == entity {
            &self.target
        } else {
            &self.source
        }
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.relation_type == other.relation_type
    }
}

impl Eq for Relation {}

impl PartialOrd for Relation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Relation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.source, &self.target, &self.relation_type).cmp(&(
            &other.source,
            &other.target,
            &other.relation_type,
        ))
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.relation_type, self.target)
    }
}

/// Outcome of a successful delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}
