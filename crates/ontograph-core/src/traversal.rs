//! Graph traversal types and algorithms
//!
//! All analytics run over a [`GraphSnapshot`] with undirected adjacency.
//! Neighbor lists are ordered by (neighbor id, relation type, direction), so
//! results are deterministic for a given edge set.

use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::graph::GraphSnapshot;
use crate::relation::{Direction, Relation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// One hop of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// Relation followed
    pub relation: Relation,

    /// `Outgoing` if followed source to target, `Incoming` otherwise
    pub direction: Direction,

    /// Entity reached by this step
    pub entity: EntityId,
}

/// A path through the graph: a start entity plus ordered steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub start: EntityId,
    pub steps: Vec<PathStep>,
}

impl Path {
    /// Number of relations in the path
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last entity of the path
    pub fn end(&self) -> &EntityId {
        self.steps.last().map_or(&self.start, |s| &s.entity)
    }

    /// Entities in visiting order, start included
    pub fn entities(&self) -> Vec<&EntityId> {
        std::iter::once(&self.start)
            .chain(self.steps.iter().map(|s| &s.entity))
            .collect()
    }
}

/// Traversal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub edges_traversed: usize,
    pub max_depth_reached: u32,
    pub path_found: bool,

    /// More shortest paths existed than were returned
    pub truncated: bool,
}

/// Result of a path search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSearch {
    pub source: EntityId,
    pub target: EntityId,
    pub max_depth: u32,
    pub paths: Vec<Path>,
    pub stats: TraversalStats,
}

/// Per-relation-type weights for weighted centrality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityWeights {
    #[serde(default)]
    pub per_type: BTreeMap<String, f64>,

    #[serde(default = "default_weight")]
    pub default_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for CentralityWeights {
    fn default() -> Self {
        Self {
            per_type: BTreeMap::new(),
            default_weight: default_weight(),
        }
    }
}

impl CentralityWeights {
    pub fn with_weight(mut self, relation_type: impl Into<String>, weight: f64) -> Self {
        self.per_type.insert(relation_type.into(), weight);
        self
    }

    pub fn weight_of(&self, relation_type: &str) -> f64 {
        self.per_type
            .get(relation_type)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Degree centrality of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityScore {
    pub entity: EntityId,

    /// Incident relation count, self-loops counted once
    pub degree: usize,

    /// Weighted degree; equals `degree` without weights
    pub score: f64,
}

/// Jaccard similarity against a query entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarEntity {
    pub entity: EntityId,
    pub score: f64,
    pub shared_neighbors: usize,
}

/// Size overview of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Entities incident to at least one relation
    pub connected_entities: usize,
    pub relation_count: usize,
    pub relations_by_type: BTreeMap<String, usize>,
}

/// Cooperative time limit for an analytic
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    pub fn from_option(limit: Option<Duration>) -> Self {
        limit.map_or_else(Self::none, Self::after)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline, `None` if unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    /// The timeout error for `operation`, stamped with the elapsed time
    pub fn expired(&self, operation: &'static str) -> Error {
        Error::Timeout {
            operation,
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }

    pub fn check(&self, operation: &'static str) -> Result<()> {
        match self.limit {
            Some(limit) if self.elapsed() >= limit => Err(self.expired(operation)),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Neighbor entry of the adjacency index
#[derive(Debug, Clone, Copy)]
struct Adjacent<'a> {
    neighbor: &'a EntityId,
    relation: &'a Relation,
    direction: Direction,
}

impl Adjacent<'_> {
    fn step(&self) -> PathStep {
        PathStep {
            relation: self.relation.clone(),
            direction: self.direction,
            entity: self.neighbor.clone(),
        }
    }
}

/// Graph traversal engine over one snapshot
pub struct TraversalEngine<'a> {
    snapshot: &'a GraphSnapshot,
    adjacency: HashMap<&'a EntityId, Vec<Adjacent<'a>>>,
    deadline: Deadline,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(snapshot: &'a GraphSnapshot) -> Self {
        let mut adjacency: HashMap<&EntityId, Vec<Adjacent>> = HashMap::new();

        for rel in snapshot.relations() {
            adjacency.entry(&rel.source).or_default().push(Adjacent {
                neighbor: &rel.target,
                relation: rel,
                direction: Direction::Outgoing,
            });
            if rel.target != rel.source {
                adjacency.entry(&rel.target).or_default().push(Adjacent {
                    neighbor: &rel.source,
                    relation: rel,
                    direction: Direction::Incoming,
                });
            }
        }

        for list in adjacency.values_mut() {
            list.sort_by(|a, b| {
                (a.neighbor, &a.relation.relation_type, a.direction).cmp(&(
                    b.neighbor,
                    &b.relation.relation_type,
                    b.direction,
                ))
            });
        }

        Self {
            snapshot,
            adjacency,
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    fn neighbors(&self, entity: &EntityId) -> &[Adjacent<'a>] {
        self.adjacency.get(entity).map_or(&[], Vec::as_slice)
    }

    /// Distinct one-hop neighbors, self excluded
    fn neighbor_set(&self, entity: &EntityId) -> BTreeSet<&'a EntityId> {
        self.neighbors(entity)
            .iter()
            .map(|a| a.neighbor)
            .filter(|n| *n != entity)
            .collect()
    }

    /// All shortest paths from `source` to `target` of at most `max_depth` steps
    pub fn find_paths(
        &self,
        source: &EntityId,
        target: &EntityId,
        max_depth: u32,
        max_paths: usize,
    ) -> Result<PathSearch> {
        tracing::debug!(
            "Finding paths: source={}, target={}, depth={}, max_paths={}",
            source,
            target,
            max_depth,
            max_paths
        );
        crate::limits::validate_max_paths(max_paths)?;

        let mut search = PathSearch {
            source: source.clone(),
            target: target.clone(),
            max_depth,
            paths: Vec::new(),
            stats: TraversalStats::default(),
        };

        if source == target {
            search.stats.nodes_visited = 1;
            search.stats.path_found = true;
            search.paths.push(Path {
                start: source.clone(),
                steps: Vec::new(),
            });
            return Ok(search);
        }

        let mut dist: HashMap<&EntityId, u32> = HashMap::new();
        let mut succ: HashMap<&EntityId, Vec<Adjacent>> = HashMap::new();
        let mut preds: HashMap<&EntityId, Vec<&EntityId>> = HashMap::new();
        let mut queue: VecDeque<(&EntityId, u32)> = VecDeque::new();
        let mut found: Option<u32> = None;

        dist.insert(source, 0);
        queue.push_back((source, 0));

        while let Some((current, depth)) = queue.pop_front() {
            self.deadline.check("find_paths")?;
            search.stats.nodes_visited += 1;
            search.stats.max_depth_reached = search.stats.max_depth_reached.max(depth);

            if found.map_or(false, |f| depth >= f) || depth >= max_depth {
                continue;
            }

            for adj in self.neighbors(current) {
                search.stats.edges_traversed += 1;
                let next = adj.neighbor;

                match dist.get(next).copied() {
                    None => {
                        dist.insert(next, depth + 1);
                        if next == target {
                            found = Some(depth + 1);
                        } else {
                            queue.push_back((next, depth + 1));
                        }
                    }
                    Some(d) if d == depth + 1 => {}
                    Some(_) => continue,
                }

                succ.entry(current).or_default().push(*adj);
                preds.entry(next).or_default().push(current);
            }
        }

        let Some(length) = found else {
            tracing::debug!("No path within {} steps", max_depth);
            return Ok(search);
        };
        search.stats.path_found = true;
        search.stats.max_depth_reached = search.stats.max_depth_reached.max(length);

        // Entities lying on some shortest path
        let mut on_path: HashSet<&EntityId> = HashSet::new();
        let mut stack = vec![target];
        while let Some(node) = stack.pop() {
            if on_path.insert(node) {
                if let Some(list) = preds.get(node) {
                    stack.extend(list.iter().copied());
                }
            }
        }

        let mut steps = Vec::with_capacity(length as usize);
        self.collect_paths(
            source,
            target,
            &succ,
            &on_path,
            max_paths,
            &mut steps,
            &mut search,
        )?;

        tracing::debug!(
            "Found {} paths of length {} (truncated: {})",
            search.paths.len(),
            length,
            search.stats.truncated
        );
        Ok(search)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_paths(
        &self,
        current: &EntityId,
        target: &EntityId,
        succ: &HashMap<&EntityId, Vec<Adjacent>>,
        on_path: &HashSet<&EntityId>,
        max_paths: usize,
        steps: &mut Vec<PathStep>,
        search: &mut PathSearch,
    ) -> Result<()> {
        if current == target {
            if search.paths.len() >= max_paths {
                search.stats.truncated = true;
            } else {
                search.paths.push(Path {
                    start: search.source.clone(),
                    steps: steps.clone(),
                });
            }
            return Ok(());
        }

        let Some(edges) = succ.get(current) else {
            return Ok(());
        };

        for adj in edges {
            if search.stats.truncated {
                break;
            }
            if !on_path.contains(adj.neighbor) {
                continue;
            }
            self.deadline.check("find_paths")?;

            steps.push(adj.step());
            self.collect_paths(adj.neighbor, target, succ, on_path, max_paths, steps, search)?;
            steps.pop();
        }
        Ok(())
    }

    /// Degree centrality, optionally weighted per relation type
    pub fn centrality(
        &self,
        limit: usize,
        weights: Option<&CentralityWeights>,
    ) -> Result<Vec<CentralityScore>> {
        let mut totals: BTreeMap<&EntityId, (usize, f64)> = BTreeMap::new();

        for rel in self.snapshot.relations() {
            self.deadline.check("centrality")?;
            let weight = weights.map_or(1.0, |w| w.weight_of(&rel.relation_type));

            let entry = totals.entry(&rel.source).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += weight;

            if rel.target != rel.source {
                let entry = totals.entry(&rel.target).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += weight;
            }
        }

        let mut ranked: Vec<CentralityScore> = totals
            .into_iter()
            .map(|(entity, (degree, score))| CentralityScore {
                entity: entity.clone(),
                degree,
                score,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.entity.cmp(&b.entity)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Entities ranked by Jaccard similarity of one-hop neighborhoods
    pub fn similar_to(&self, entity: &EntityId, limit: usize) -> Result<Vec<SimilarEntity>> {
        let own = self.neighbor_set(entity);
        if own.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: BTreeSet<&EntityId> = own
            .iter()
            .flat_map(|n| self.neighbor_set(n))
            .filter(|c| *c != entity)
            .collect();

        let mut ranked = Vec::new();
        for candidate in candidates {
            self.deadline.check("similar_to")?;

            let theirs = self.neighbor_set(candidate);
            let shared = own.intersection(&theirs).count();
            if shared == 0 {
                continue;
            }
            let union = own.len() + theirs.len() - shared;
            ranked.push(SimilarEntity {
                entity: candidate.clone(),
                score: shared as f64 / union as f64,
                shared_neighbors: shared,
            });
        }

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.shared_neighbors.cmp(&a.shared_neighbors))
                .then_with(|| a.entity.cmp(&b.entity))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            connected_entities: self.adjacency.len(),
            relation_count: self.snapshot.len(),
            relations_by_type: self.snapshot.counts_by_type(),
        }
    }
}
