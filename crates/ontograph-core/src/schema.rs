//! Ontology schema registry
//!
//! The registry is the table of relation types the engine accepts: for each
//! type name, the entity types allowed on either end and the cardinality
//! bound per side. It is built once (from TOML or from definitions) and has
//! no mutating API afterwards; share it behind an `Arc`.

use crate::entity::EntityType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Schema compiled into the crate
const BUILTIN_SCHEMA: &str = include_str!("../schema/catalog.toml");

/// Per-side cardinality bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    #[serde(alias = "ONE")]
    One,
    #[default]
    #[serde(alias = "MANY")]
    Many,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => f.write_str("ONE"),
            Self::Many => f.write_str("MANY"),
        }
    }
}

/// `(sourceBound, targetBound)` pair of a relation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cardinality {
    #[serde(default)]
    pub source: Bound,
    #[serde(default)]
    pub target: Bound,
}

impl Cardinality {
    pub const MANY_TO_MANY: Cardinality = Cardinality::new(Bound::Many, Bound::Many);

    pub const fn new(source: Bound, target: Bound) -> Self {
        Self { source, target }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.source, self.target)
    }
}

/// Definition of a single relation type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTypeDefinition {
    /// Unique relation type name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Entity types allowed as source
    pub sources: BTreeSet<EntityType>,

    /// Entity types allowed as target
    pub targets: BTreeSet<EntityType>,

    pub cardinality: Cardinality,
}

impl RelationTypeDefinition {
    pub fn new(
        name: impl Into<String>,
        sources: impl IntoIterator<Item = EntityType>,
        targets: impl IntoIterator<Item = EntityType>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            sources: sources.into_iter().collect(),
            targets: targets.into_iter().collect(),
            cardinality,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn allows_source(&self, entity_type: EntityType) -> bool {
        self.sources.contains(&entity_type)
    }

    pub fn allows_target(&self, entity_type: EntityType) -> bool {
        self.targets.contains(&entity_type)
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    relation: Vec<RawDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
    name: String,
    #[serde(default)]
    description: Option<String>,
    sources: Vec<String>,
    targets: Vec<String>,
    #[serde(default)]
    cardinality: Cardinality,
}

impl RawDefinition {
    fn into_definition(self) -> Result<RelationTypeDefinition> {
        let parse = |labels: &[String], side: &str| -> Result<BTreeSet<EntityType>> {
            labels
                .iter()
                .map(|label| {
                    label.parse::<EntityType>().map_err(|e| {
                        Error::InvalidSchema(format!("relation '{}' {}: {}", self.name, side, e))
                    })
                })
                .collect()
        };

        let sources = parse(&self.sources, "sources")?;
        let targets = parse(&self.targets, "targets")?;

        Ok(RelationTypeDefinition {
            name: self.name,
            description: self.description,
            sources,
            targets,
            cardinality: self.cardinality,
        })
    }
}

/// Immutable registry of relation type definitions
#[derive(Debug, Clone)]
pub struct OntologySchema {
    definitions: BTreeMap<String, RelationTypeDefinition>,
}

impl OntologySchema {
    /// Build a registry from definitions
    ///
    /// Rejects empty names, empty endpoint sets and duplicate names.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RelationTypeDefinition>,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();

        for def in definitions {
            if def.name.trim().is_empty() {
                return Err(Error::InvalidSchema("relation type name cannot be empty".into()));
            }
            if def.sources.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "relation '{}' has no allowed source types",
                    def.name
                )));
            }
            if def.targets.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "relation '{}' has no allowed target types",
                    def.name
                )));
            }
            if map.contains_key(&def.name) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate relation type '{}'",
                    def.name
                )));
            }
            map.insert(def.name.clone(), def);
        }

        tracing::debug!("Loaded ontology schema with {} relation types", map.len());
        Ok(Self { definitions: map })
    }

    /// Parse a TOML schema document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: SchemaFile =
            toml::from_str(source).map_err(|e| Error::InvalidSchema(e.to_string()))?;

        let definitions = file
            .relation
            .into_iter()
            .map(RawDefinition::into_definition)
            .collect::<Result<Vec<_>>>()?;

        Self::from_definitions(definitions)
    }

    /// The instrument catalog schema shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_SCHEMA)
    }

    /// Look up a relation type
    pub fn definition_of(&self, relation_type: &str) -> Result<&RelationTypeDefinition> {
        self.definitions
            .get(relation_type)
            .ok_or_else(|| Error::UnknownRelationType(relation_type.to_string()))
    }

    /// All relation type names, ordered
    pub fn all_types(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// All definitions, ordered by name
    pub fn definitions(&self) -> impl Iterator<Item = &RelationTypeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
