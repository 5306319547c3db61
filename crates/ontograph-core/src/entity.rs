//! Entity (node) view used by the relation engine
//!
//! The engine never sees full entity records. It only needs an id and a
//! type label, which the external entity catalog provides through
//! [`EntityLookup`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for EntityId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

/// Entity type classification
///
/// The catalog knows a closed set of entity kinds. Relation type
/// definitions refer to these labels, so an unknown label is rejected as
/// soon as a schema or an entity is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Instrument,
    Family,
    EthnicGroup,
    Locality,
    Material,
    Performer,
    Ensemble,
    Technique,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::Instrument,
        EntityType::Family,
        EntityType::EthnicGroup,
        EntityType::Locality,
        EntityType::Material,
        EntityType::Performer,
        EntityType::Ensemble,
        EntityType::Technique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instrument => "Instrument",
            Self::Family => "Family",
            Self::EthnicGroup => "EthnicGroup",
            Self::Locality => "Locality",
            Self::Material => "Material",
            Self::Performer => "Performer",
            Self::Ensemble => "Ensemble",
            Self::Technique => "Technique",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a type label is not part of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityType(pub String);

impl std::fmt::Display for UnknownEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown entity type: {}", self.0)
    }
}

impl std::error::Error for UnknownEntityType {}

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    /// Case-insensitive; `_`, `-` and spaces are ignored (`ethnic_group`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().to_lowercase() == normalized)
            .ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}

/// The narrow entity view: id plus type label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(id: impl Into<EntityId>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            entity_type,
        }
    }
}

/// Lookup into the external entity catalog
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Type label of an entity, `None` if it does not exist
    async fn type_of(&self, id: &EntityId) -> Result<Option<EntityType>>;

    /// Whether the entity exists
    async fn exists(&self, id: &EntityId) -> Result<bool> {
        Ok(self.type_of(id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("Instrument".parse::<EntityType>().unwrap(), EntityType::Instrument);
        assert_eq!("ethnic_group".parse::<EntityType>().unwrap(), EntityType::EthnicGroup);
        assert_eq!("ETHNIC-GROUP".parse::<EntityType>().unwrap(), EntityType::EthnicGroup);
        assert!("Orchestra".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_id_serializes_as_string() {
        let id = EntityId::new("Instrument#1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Instrument#1\"");
    }
}
