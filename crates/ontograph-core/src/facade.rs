//! Query façade composing schema, store and traversal

use crate::entity::{EntityId, EntityLookup};
use crate::error::{EntityRole, Error, Result};
use crate::graph::{GraphBackend, GraphSnapshot};
use crate::limits::{self, DEFAULT_MAX_PATHS, DEFAULT_PATH_DEPTH};
use crate::relation::{Deleted, Direction, Relation, Triple};
use crate::schema::{OntologySchema, RelationTypeDefinition};
use crate::store::RelationStore;
use crate::traversal::{
    CentralityScore, CentralityWeights, Deadline, GraphSummary, PathSearch, SimilarEntity,
    TraversalEngine,
};
use crate::validator::{RelationValidator, ValidationResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for traversal requests
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Depth used when a path request gives none
    pub default_max_depth: u32,

    /// Maximum shortest paths returned per request
    pub max_paths: usize,

    /// Wall-clock limit for one analytic, `None` for unbounded
    pub traversal_timeout: Option<Duration>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_max_depth: DEFAULT_PATH_DEPTH,
            max_paths: DEFAULT_MAX_PATHS,
            traversal_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl ServiceOptions {
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.default_max_depth = depth;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    pub fn with_traversal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.traversal_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        limits::validate_path_depth(self.default_max_depth)?;
        limits::validate_max_paths(self.max_paths)?;
        Ok(())
    }
}

/// Single entry point for relation mutations and graph analytics
pub struct RelationService<B: GraphBackend> {
    schema: Arc<OntologySchema>,
    entities: Arc<dyn EntityLookup>,
    store: RelationStore<B>,
    options: ServiceOptions,
}

impl<B: GraphBackend + EntityLookup + 'static> RelationService<B> {
    /// Build a service whose backend is also the entity catalog
    pub fn from_backend(backend: Arc<B>, schema: Arc<OntologySchema>) -> Self {
        let entities: Arc<dyn EntityLookup> = backend.clone();
        Self::new(backend, schema, entities)
    }
}

impl<B: GraphBackend> RelationService<B> {
    pub fn new(
        backend: Arc<B>,
        schema: Arc<OntologySchema>,
        entities: Arc<dyn EntityLookup>,
    ) -> Self {
        let validator = RelationValidator::new(schema.clone(), entities.clone());
        Self {
            schema,
            entities,
            store: RelationStore::new(backend, validator),
            options: ServiceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ServiceOptions) -> Result<Self> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn schema(&self) -> &OntologySchema {
        &self.schema
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Relations
    // ─────────────────────────────────────────────────────────────────────────

    /// Dry-run the validation rules
    ///
    /// Rule failures come back as a rejected result; only persistence
    /// failures are returned as errors.
    pub async fn validate_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
    ) -> Result<ValidationResult> {
        let outcome = match Self::triple(source, target, relation_type) {
            Ok(triple) => {
                self.with_retry("validate_relation", || self.store.validate(&triple))
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(ValidationResult::valid()),
            Err(e) if e.is_validation() || matches!(e, Error::LimitExceeded(_)) => {
                Ok(ValidationResult::rejected(&e))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
    ) -> Result<Relation> {
        let triple = Self::triple(source, target, relation_type)?;
        self.with_retry("create_relation", || self.store.create(triple.clone()))
            .await
    }

    pub async fn delete_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
    ) -> Result<Deleted> {
        let triple = Self::triple(source, target, relation_type)?;
        self.with_retry("delete_relation", || self.store.delete(&triple))
            .await
    }

    pub async fn relations_of(
        &self,
        entity: &str,
        relation_type: Option<&str>,
        direction: Direction,
    ) -> Result<Vec<Relation>> {
        let id = Self::entity_id(entity)?;
        if let Some(t) = relation_type {
            self.schema.definition_of(t)?;
        }
        self.require(&id, EntityRole::Query).await?;

        self.with_retry("relations_of", || {
            self.store.relations_of(&id, relation_type, direction)
        })
        .await
    }

    /// Every relation, optionally of one type, ordered by triple
    pub async fn all_relations(&self, relation_type: Option<&str>) -> Result<Vec<Relation>> {
        if let Some(t) = relation_type {
            self.schema.definition_of(t)?;
        }

        let snapshot = self
            .with_retry("all_relations", || self.store.snapshot())
            .await?;
        Ok(snapshot
            .relations()
            .iter()
            .filter(|r| relation_type.map_or(true, |t| r.relation_type == t))
            .cloned()
            .collect())
    }

    /// Remove every relation incident to `entity`
    pub async fn detach_entity(&self, entity: &str) -> Result<usize> {
        let id = Self::entity_id(entity)?;
        self.with_retry("detach_entity", || self.store.detach(&id))
            .await
    }

    pub fn relation_types(&self) -> Vec<RelationTypeDefinition> {
        self.schema.definitions().cloned().collect()
    }

    pub fn relation_type(&self, name: &str) -> Result<RelationTypeDefinition> {
        self.schema.definition_of(name).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analytics
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn find_paths(
        &self,
        source: &str,
        target: &str,
        max_depth: Option<u32>,
    ) -> Result<PathSearch> {
        let source = Self::entity_id(source)?;
        let target = Self::entity_id(target)?;
        let depth = max_depth.unwrap_or(self.options.default_max_depth);
        limits::validate_path_depth(depth)?;

        self.require(&source, EntityRole::Source).await?;
        self.require(&target, EntityRole::Target).await?;

        let deadline = Deadline::from_option(self.options.traversal_timeout);
        let snapshot = self.load_snapshot("find_paths", &deadline).await?;
        let search = warn_on_timeout(
            TraversalEngine::new(&snapshot)
                .with_deadline(deadline)
                .find_paths(&source, &target, depth, self.options.max_paths),
        )?;

        if search.stats.truncated {
            tracing::warn!(
                "Path search {} -> {} truncated at {} paths",
                source,
                target,
                self.options.max_paths
            );
        }
        Ok(search)
    }

    pub async fn centrality(&self, limit: usize) -> Result<Vec<CentralityScore>> {
        self.rank_centrality(limit, None).await
    }

    pub async fn weighted_centrality(
        &self,
        limit: usize,
        weights: &CentralityWeights,
    ) -> Result<Vec<CentralityScore>> {
        self.rank_centrality(limit, Some(weights)).await
    }

    async fn rank_centrality(
        &self,
        limit: usize,
        weights: Option<&CentralityWeights>,
    ) -> Result<Vec<CentralityScore>> {
        limits::validate_ranking_limit(limit)?;

        let deadline = Deadline::from_option(self.options.traversal_timeout);
        let snapshot = self.load_snapshot("centrality", &deadline).await?;
        warn_on_timeout(
            TraversalEngine::new(&snapshot)
                .with_deadline(deadline)
                .centrality(limit, weights),
        )
    }

    pub async fn similar_to(&self, entity: &str, limit: usize) -> Result<Vec<SimilarEntity>> {
        let id = Self::entity_id(entity)?;
        limits::validate_ranking_limit(limit)?;
        self.require(&id, EntityRole::Query).await?;

        let deadline = Deadline::from_option(self.options.traversal_timeout);
        let snapshot = self.load_snapshot("similar_to", &deadline).await?;
        warn_on_timeout(
            TraversalEngine::new(&snapshot)
                .with_deadline(deadline)
                .similar_to(&id, limit),
        )
    }

    pub async fn summary(&self) -> Result<GraphSummary> {
        let deadline = Deadline::from_option(self.options.traversal_timeout);
        let snapshot = self.load_snapshot("summary", &deadline).await?;
        Ok(TraversalEngine::new(&snapshot).summary())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn entity_id(raw: &str) -> Result<EntityId> {
        limits::validate_entity_id(raw)?;
        Ok(EntityId::new(raw))
    }

    fn triple(source: &str, target: &str, relation_type: &str) -> Result<Triple> {
        Ok(Triple::new(
            Self::entity_id(source)?,
            Self::entity_id(target)?,
            relation_type,
        ))
    }

    async fn require(&self, id: &EntityId, role: EntityRole) -> Result<()> {
        let exists = self
            .with_retry("entity_lookup", || self.entities.exists(id))
            .await?;
        if !exists {
            return Err(Error::EntityNotFound {
                role,
                id: id.clone(),
            });
        }
        Ok(())
    }

    async fn load_snapshot(
        &self,
        operation: &'static str,
        deadline: &Deadline,
    ) -> Result<GraphSnapshot> {
        let load = self.with_retry(operation, || self.store.snapshot());
        let snapshot = match deadline.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, load)
                .await
                .map_err(|_| deadline.expired(operation)),
            None => Ok(load.await),
        };
        warn_on_timeout(snapshot.and_then(|loaded| loaded))
    }

    /// Run `op`, repeating it once if it fails with a store failure
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(e) if e.is_retryable() => {
                tracing::warn!("{} failed, retrying once: {}", operation, e);
                op().await
            }
            other => other,
        }
    }
}

fn warn_on_timeout<T>(result: Result<T>) -> Result<T> {
    if let Err(e @ Error::Timeout { .. }) = &result {
        tracing::warn!("{}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::error::ErrorCode;
    use crate::testing::{FlakyGraph, MemoryGraph, StaticEntities};
    use std::sync::atomic::Ordering;

    fn catalog() -> Arc<StaticEntities> {
        Arc::new(StaticEntities::new([
            ("Instrument#1", EntityType::Instrument),
            ("Instrument#5", EntityType::Instrument),
            ("Family#2", EntityType::Family),
            ("Family#3", EntityType::Family),
            ("Material#4", EntityType::Material),
        ]))
    }

    fn service_over<B: GraphBackend>(backend: B) -> RelationService<B> {
        let schema = Arc::new(OntologySchema::builtin().unwrap());
        RelationService::new(Arc::new(backend), schema, catalog())
    }

    #[tokio::test]
    async fn test_family_reassignment_scenario() {
        let service = service_over(MemoryGraph::default());

        service
            .create_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();

        let err = service
            .create_relation("Instrument#1", "Family#3", "belongsTo")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CardinalityViolation);

        let deleted = service
            .delete_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();
        assert!(deleted.deleted);

        service
            .create_relation("Instrument#1", "Family#3", "belongsTo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_validate_relation_reports_rule() {
        let service = service_over(MemoryGraph::default());

        let result = service
            .validate_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        assert!(result.ok);

        let result = service
            .validate_relation("Family#2", "Material#4", "madeOf")
            .await
            .unwrap();
        assert!(!result.ok);
        assert_eq!(result.reason, Some(ErrorCode::InvalidSourceType));

        let result = service.validate_relation("", "Material#4", "madeOf").await.unwrap();
        assert_eq!(result.reason, Some(ErrorCode::LimitExceeded));

        // Dry run writes nothing
        assert_eq!(service.summary().await.unwrap().relation_count, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_retried_once() {
        let service = service_over(FlakyGraph::failing(1));
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();

        let service = service_over(FlakyGraph::failing(2));
        let err = service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }

    #[tokio::test]
    async fn test_retry_counts_write_attempts() {
        let backend = Arc::new(FlakyGraph::failing(1));
        let schema = Arc::new(OntologySchema::builtin().unwrap());
        let service = RelationService::new(backend.clone(), schema, catalog());

        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        assert_eq!(backend.write_attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rule_failures_are_not_retried() {
        let entities = catalog();
        let schema = Arc::new(OntologySchema::builtin().unwrap());
        let service =
            RelationService::new(Arc::new(MemoryGraph::default()), schema, entities.clone());

        let err = service
            .create_relation("Instrument#1", "Instrument#5", "belongsTo")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTargetType);

        // One validation pass resolves source and target once each
        assert_eq!(entities.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_relations_of_checks_filter_and_entity() {
        let service = service_over(MemoryGraph::default());
        service
            .create_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();

        let all = service
            .relations_of("Instrument#1", None, Direction::Both)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let made_of = service
            .relations_of("Instrument#1", Some("madeOf"), Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(made_of.len(), 1);

        let err = service
            .relations_of("Instrument#1", Some("inventedBy"), Direction::Both)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownRelationType);

        let err = service
            .relations_of("Instrument#404", None, Direction::Both)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityNotFound { role: EntityRole::Query, .. }));
    }

    #[tokio::test]
    async fn test_find_paths_through_shared_material() {
        let service = service_over(MemoryGraph::default());
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#5", "Material#4", "madeOf")
            .await
            .unwrap();

        let search = service
            .find_paths("Instrument#1", "Instrument#5", None)
            .await
            .unwrap();
        assert_eq!(search.max_depth, DEFAULT_PATH_DEPTH);
        assert_eq!(search.paths.len(), 1);
        assert_eq!(search.paths[0].len(), 2);
        assert_eq!(search.paths[0].steps[1].direction, Direction::Incoming);

        let err = service
            .find_paths("Instrument#1", "Family#404", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityNotFound { role: EntityRole::Target, .. }));

        let err = service
            .find_paths("Instrument#1", "Instrument#5", Some(9))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LimitExceeded);
    }

    #[tokio::test]
    async fn test_traversal_timeout() {
        let service = service_over(MemoryGraph::default())
            .with_options(ServiceOptions::default().with_traversal_timeout(Some(Duration::ZERO)))
            .unwrap();

        let err = service
            .find_paths("Instrument#1", "Family#2", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
    }

    #[tokio::test]
    async fn test_options_are_bounded() {
        let result = service_over(MemoryGraph::default())
            .with_options(ServiceOptions::default().with_max_paths(500));
        assert!(result.is_err());

        // A zero cap would hide every path that exists
        let err = service_over(MemoryGraph::default())
            .with_options(ServiceOptions::default().with_max_paths(0))
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::LimitExceeded);
    }

    #[tokio::test]
    async fn test_centrality_and_similarity() {
        let service = service_over(MemoryGraph::default());
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#5", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();

        let ranked = service.centrality(2).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entity, EntityId::new("Instrument#1"));
        assert_eq!(ranked[1].entity, EntityId::new("Material#4"));

        let weights = CentralityWeights::default().with_weight("madeOf", 3.0);
        let weighted = service.weighted_centrality(1, &weights).await.unwrap();
        assert_eq!(weighted[0].entity, EntityId::new("Material#4"));
        assert_eq!(weighted[0].score, 6.0);

        let similar = service.similar_to("Instrument#5", 5).await.unwrap();
        assert_eq!(similar[0].entity, EntityId::new("Instrument#1"));
        assert_eq!(similar[0].shared_neighbors, 1);
        assert!((similar[0].score - 0.5).abs() < 1e-9);

        let err = service.centrality(5000).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::LimitExceeded);
    }

    #[tokio::test]
    async fn test_detach_and_summary() {
        let service = service_over(MemoryGraph::default());
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.relation_count, 2);
        assert_eq!(summary.connected_entities, 3);

        assert_eq!(service.detach_entity("Instrument#1").await.unwrap(), 2);
        assert_eq!(service.summary().await.unwrap(), GraphSummary::default());
    }

    #[test]
    fn test_relation_types_listing() {
        let service = service_over(MemoryGraph::default());
        let types = service.relation_types();
        assert!(types.iter().any(|d| d.name == "belongsTo"));
        assert!(service.relation_type("inventedBy").is_err());
    }

    #[tokio::test]
    async fn test_all_relations_filters_by_type() {
        let service = service_over(MemoryGraph::default());
        service
            .create_relation("Instrument#5", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#1", "Material#4", "madeOf")
            .await
            .unwrap();
        service
            .create_relation("Instrument#1", "Family#2", "belongsTo")
            .await
            .unwrap();

        let all = service.all_relations(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].triple(), Triple::new("Instrument#1", "Family#2", "belongsTo"));

        let made_of = service.all_relations(Some("madeOf")).await.unwrap();
        assert_eq!(made_of.len(), 2);
        assert_eq!(made_of[0].source, EntityId::new("Instrument#1"));

        let err = service.all_relations(Some("inventedBy")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownRelationType);
    }
}
