//! Relation validation against the ontology schema
//!
//! Rules are evaluated in a fixed order and the first failure wins:
//!
//! 1. the relation type exists
//! 2. source, then target, resolve in the entity catalog
//! 3. the source type is allowed
//! 4. the target type is allowed
//! 5. a `ONE` source bound is not already used towards another target
//! 6. a `ONE` target bound is not already used by another source
//! 7. the exact triple is not already stored
//!
//! Checks 5 and 6 exclude the candidate's own counterpart, so repeating an
//! existing relation reports `DuplicateRelation` rather than a cardinality
//! violation.

use crate::entity::{EntityId, EntityLookup, EntityType};
use crate::error::{EntityRole, Error, ErrorCode, Result, Side};
use crate::graph::{relations_of, GraphBackend};
use crate::relation::{Direction, Triple};
use crate::schema::{Bound, OntologySchema, RelationTypeDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a dry-run validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            ok: true,
            reason: None,
            detail: None,
        }
    }

    pub fn rejected(error: &Error) -> Self {
        Self {
            ok: false,
            reason: Some(error.code()),
            detail: Some(error.to_string()),
        }
    }
}

impl From<Result<()>> for ValidationResult {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(e) => Self::rejected(&e),
        }
    }
}

/// Checks candidate triples against the schema and the current graph
pub struct RelationValidator {
    schema: Arc<OntologySchema>,
    entities: Arc<dyn EntityLookup>,
}

impl RelationValidator {
    pub fn new(schema: Arc<OntologySchema>, entities: Arc<dyn EntityLookup>) -> Self {
        Self { schema, entities }
    }

    pub fn schema(&self) -> &OntologySchema {
        &self.schema
    }

    /// Resolve an entity's type, naming the role on failure
    pub async fn resolve(&self, id: &EntityId, role: EntityRole) -> Result<EntityType> {
        self.entities
            .type_of(id)
            .await?
            .ok_or_else(|| Error::EntityNotFound {
                role,
                id: id.clone(),
            })
    }

    /// Validate a candidate triple against `backend`'s current edges
    pub async fn check<B: GraphBackend + ?Sized>(
        &self,
        backend: &B,
        triple: &Triple,
    ) -> Result<()> {
        let def = self.schema.definition_of(&triple.relation_type)?;

        let source_type = self.resolve(&triple.source, EntityRole::Source).await?;
        let target_type = self.resolve(&triple.target, EntityRole::Target).await?;

        Self::check_endpoint_types(def, triple, source_type, target_type)?;
        self.check_edges(backend, def, triple).await
    }

    fn check_endpoint_types(
        def: &RelationTypeDefinition,
        triple: &Triple,
        source_type: EntityType,
        target_type: EntityType,
    ) -> Result<()> {
        if !def.allows_source(source_type) {
            return Err(Error::InvalidSourceType {
                relation_type: def.name.clone(),
                entity: triple.source.clone(),
                actual: source_type,
                allowed: def.sources.iter().copied().collect(),
            });
        }
        if !def.allows_target(target_type) {
            return Err(Error::InvalidTargetType {
                relation_type: def.name.clone(),
                entity: triple.target.clone(),
                actual: target_type,
                allowed: def.targets.iter().copied().collect(),
            });
        }
        Ok(())
    }

    async fn check_edges<B: GraphBackend + ?Sized>(
        &self,
        backend: &B,
        def: &RelationTypeDefinition,
        triple: &Triple,
    ) -> Result<()> {
        let outgoing = relations_of(
            backend,
            &triple.source,
            Some(&def.name),
            Direction::Outgoing,
        )
        .await?;

        if def.cardinality.source == Bound::One {
            let existing = outgoing
                .iter()
                .map(|r| &r.target)
                .filter(|target| **target != triple.target)
                .min();
            if let Some(existing) = existing {
                tracing::debug!("Source bound of {} exceeded by {}", def.name, triple);
                return Err(Error::CardinalityViolation {
                    side: Side::Source,
                    relation_type: def.name.clone(),
                    entity: triple.source.clone(),
                    existing: existing.clone(),
                });
            }
        }

        if def.cardinality.target == Bound::One {
            let incoming = relations_of(
                backend,
                &triple.target,
                Some(&def.name),
                Direction::Incoming,
            )
            .await?;
            let existing = incoming
                .iter()
                .map(|r| &r.source)
                .filter(|source| **source != triple.source)
                .min();
            if let Some(existing) = existing {
                tracing::debug!("Target bound of {} exceeded by {}", def.name, triple);
                return Err(Error::CardinalityViolation {
                    side: Side::Target,
                    relation_type: def.name.clone(),
                    entity: triple.target.clone(),
                    existing: existing.clone(),
                });
            }
        }

        if outgoing.iter().any(|r| r.target == triple.target) {
            return Err(Error::DuplicateRelation(triple.clone()));
        }

        Ok(())
    }
}
