//! # Property-Based Tests
//!
//! Random mutation sequences are checked against a simple model of the
//! relation set, and analytics are checked against independent recomputation.

use ontograph_core::{
    Direction, EntityId, EntityRef, EntityType, ErrorCode, GraphSnapshot, OntologySchema, Relation,
    RelationService, TraversalEngine,
};
use ontograph_storage::{MemoryStorage, StorageBackend};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

const POOL: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    /// instrument, counterpart, `belongsTo` if true else `madeOf`
    Create(usize, usize, bool),
    Delete(usize, usize, bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..POOL, 0..POOL, any::<bool>()).prop_map(|(i, o, b)| Op::Create(i, o, b)),
        (0..POOL, 0..POOL, any::<bool>()).prop_map(|(i, o, b)| Op::Delete(i, o, b)),
    ]
}

fn triple_of(instrument: usize, other: usize, belongs: bool) -> (String, String, String) {
    if belongs {
        (
            format!("Instrument#{}", instrument),
            format!("Family#{}", other),
            "belongsTo".to_string(),
        )
    } else {
        (
            format!("Instrument#{}", instrument),
            format!("Material#{}", other),
            "madeOf".to_string(),
        )
    }
}

async fn catalog_service() -> RelationService<MemoryStorage> {
    let storage = MemoryStorage::new();
    for i in 0..POOL {
        for (prefix, entity_type) in [
            ("Instrument", EntityType::Instrument),
            ("Family", EntityType::Family),
            ("Material", EntityType::Material),
        ] {
            storage
                .save_entity(&EntityRef::new(format!("{}#{}", prefix, i), entity_type))
                .await
                .unwrap();
        }
    }
    let schema = Arc::new(OntologySchema::builtin().unwrap());
    RelationService::from_backend(Arc::new(storage), schema)
}

/// BFS hop distance over undirected edges
fn hop_distance(relations: &[Relation], from: &EntityId, to: &EntityId) -> Option<usize> {
    let mut dist: HashMap<&EntityId, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    dist.insert(from, 0);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        let d = dist[current];
        if current == to {
            return Some(d);
        }
        for rel in relations {
            let next = if &rel.source == current {
                &rel.target
            } else if &rel.target == current {
                &rel.source
            } else {
                continue;
            };
            if !dist.contains_key(next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    None
}

fn random_graph() -> impl Strategy<Value = Vec<Relation>> {
    vec((0u8..6, 0u8..6, 0u8..2), 0..14).prop_map(|edges| {
        edges
            .into_iter()
            .map(|(s, t, ty)| {
                Relation::new(
                    format!("n{}", s),
                    format!("n{}", t),
                    if ty == 0 { "madeOf" } else { "playedBy" },
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every create/delete outcome matches a model of the relation set.
    #[test]
    fn mutations_follow_the_model(ops in vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let service = catalog_service().await;
            let mut model: BTreeSet<(String, String, String)> = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Create(i, o, belongs) => {
                        let key = triple_of(i, o, belongs);
                        let result = service.create_relation(&key.0, &key.1, &key.2).await;

                        let bound_taken = belongs
                            && model.iter().any(|(s, _, t)| s == &key.0 && t == &key.2);
                        if model.contains(&key) {
                            prop_assert_eq!(
                                result.unwrap_err().code(),
                                ErrorCode::DuplicateRelation
                            );
                        } else if bound_taken {
                            prop_assert_eq!(
                                result.unwrap_err().code(),
                                ErrorCode::CardinalityViolation
                            );
                        } else {
                            prop_assert!(result.is_ok());
                            model.insert(key);
                        }
                    }
                    Op::Delete(i, o, belongs) => {
                        let key = triple_of(i, o, belongs);
                        let result = service.delete_relation(&key.0, &key.1, &key.2).await;

                        if model.remove(&key) {
                            prop_assert!(result.unwrap().deleted);
                        } else {
                            prop_assert_eq!(
                                result.unwrap_err().code(),
                                ErrorCode::RelationNotFound
                            );
                        }
                    }
                }
            }

            // The stored edges are exactly the model
            let mut stored = BTreeSet::new();
            for i in 0..POOL {
                let id = format!("Instrument#{}", i);
                for rel in service.relations_of(&id, None, Direction::Outgoing).await.unwrap() {
                    stored.insert((
                        rel.source.to_string(),
                        rel.target.to_string(),
                        rel.relation_type.clone(),
                    ));
                }
            }
            prop_assert_eq!(stored, model);
            Ok(())
        })?;
    }

    /// The same edge set yields the same ranking and paths.
    #[test]
    fn analytics_are_deterministic(mut relations in random_graph()) {
        let first = GraphSnapshot::new(relations.clone());
        relations.reverse();
        let second = GraphSnapshot::new(relations);

        let a = TraversalEngine::new(&first);
        let b = TraversalEngine::new(&second);

        prop_assert_eq!(a.centrality(100, None).unwrap(), b.centrality(100, None).unwrap());
        let from = EntityId::new("n0");
        let to = EntityId::new("n5");
        prop_assert_eq!(
            a.find_paths(&from, &to, 8, 100).unwrap().paths,
            b.find_paths(&from, &to, 8, 100).unwrap().paths
        );
    }

    /// Returned paths are connected walks of the shortest length.
    #[test]
    fn paths_are_shortest_walks(relations in random_graph(), s in 0u8..6, t in 0u8..6) {
        let snapshot = GraphSnapshot::new(relations);
        let engine = TraversalEngine::new(&snapshot);
        let from = EntityId::new(format!("n{}", s));
        let to = EntityId::new(format!("n{}", t));

        let search = engine.find_paths(&from, &to, 8, 100).unwrap();
        let expected = hop_distance(snapshot.relations(), &from, &to);

        match expected {
            None => prop_assert!(search.paths.is_empty()),
            Some(length) => {
                prop_assert!(!search.paths.is_empty());
                for path in &search.paths {
                    prop_assert_eq!(path.len(), length);
                    prop_assert_eq!(path.end(), &to);

                    let mut at = &path.start;
                    for step in &path.steps {
                        let (expected_from, expected_to) = match step.direction {
                            Direction::Outgoing => (&step.relation.source, &step.relation.target),
                            _ => (&step.relation.target, &step.relation.source),
                        };
                        prop_assert_eq!(expected_from, at);
                        prop_assert_eq!(expected_to, &step.entity);
                        at = &step.entity;
                    }
                }

                let distinct: BTreeSet<_> = search
                    .paths
                    .iter()
                    .map(|p| p.steps.iter().map(|s| s.relation.triple()).collect::<Vec<_>>())
                    .collect();
                prop_assert_eq!(distinct.len(), search.paths.len());
            }
        }
    }

    /// Degree counts incident relations, and the ranking is ordered.
    #[test]
    fn centrality_counts_incident_relations(relations in random_graph()) {
        let snapshot = GraphSnapshot::new(relations);
        let engine = TraversalEngine::new(&snapshot);
        let ranked = engine.centrality(100, None).unwrap();

        for score in &ranked {
            let incident = snapshot
                .relations()
                .iter()
                .filter(|r| r.is_incident(&score.entity, Direction::Both))
                .count();
            prop_assert_eq!(score.degree, incident);
            prop_assert_eq!(score.score, incident as f64);
        }
        for pair in ranked.windows(2) {
            prop_assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].entity < pair[1].entity)
            );
        }
    }

    /// Similarity never reports the query entity and shared counts are symmetric.
    #[test]
    fn similarity_is_symmetric(relations in random_graph(), q in 0u8..6) {
        let snapshot = GraphSnapshot::new(relations);
        let engine = TraversalEngine::new(&snapshot);
        let query = EntityId::new(format!("n{}", q));

        for similar in engine.similar_to(&query, 100).unwrap() {
            prop_assert_ne!(&similar.entity, &query);
            prop_assert!(similar.shared_neighbors > 0);

            let back = engine
                .similar_to(&similar.entity, 100)
                .unwrap()
                .into_iter()
                .find(|s| s.entity == query)
                .map(|s| s.shared_neighbors);
            prop_assert_eq!(back, Some(similar.shared_neighbors));
        }
    }
}
