use crate::engine::UNREACHABLE_DISTANCE;
use crate::error::{HeapError, HeapResult};
use crate::graph::HeapGraph;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Configuration for leak-candidate ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Maximum number of candidates reported.
    pub limit: usize,
    /// Nodes at or below this distance are too shallow to be interesting.
    pub min_distance: u64,
    /// Nodes at or beyond this distance are unreachable from the root.
    pub unreachable_distance: u64,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            min_distance: 1,
            unreachable_distance: UNREACHABLE_DISTANCE,
        }
    }
}

impl RankConfig {
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn admits(&self, distance: u64) -> bool {
        distance > self.min_distance && distance < self.unreachable_distance
    }
}

/// A node singled out as a suspected leak retainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeakCandidate {
    pub index: usize,
    pub id: Arc<str>,
    pub size: u64,
}

/// Bounded shortlist kept in descending size order.
///
/// Equal sizes keep arrival order, and a newcomer only evicts the smallest
/// entry when strictly larger, so among ties the first seen wins.
#[derive(Debug)]
struct TopCandidates {
    limit: usize,
    entries: Vec<LeakCandidate>,
}

impl TopCandidates {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::with_capacity(limit),
        }
    }

    fn offer(&mut self, candidate: LeakCandidate) {
        if self.entries.len() == self.limit {
            match self.entries.last() {
                Some(smallest) if candidate.size > smallest.size => {
                    self.entries.pop();
                }
                _ => return,
            }
        }
        let at = self.entries.partition_point(|e| e.size >= candidate.size);
        self.entries.insert(at, candidate);
    }

    fn into_sorted(self) -> Vec<LeakCandidate> {
        self.entries
    }
}

/// Annotate every node with its engine results and select leak candidates.
///
/// The root, shallow nodes (`distance <= min_distance`) and unreachable
/// nodes (`distance >= unreachable_distance`) are never candidates. The
/// result is sorted by descending retained size.
pub fn rank(
    root_index: usize,
    retained_sizes: &[u64],
    distances: &[u64],
    graph: &mut HeapGraph,
    config: &RankConfig,
) -> HeapResult<Vec<LeakCandidate>> {
    let nodes = graph.node_count();
    if retained_sizes.len() != nodes || distances.len() != nodes {
        return Err(HeapError::EngineOutputMismatch {
            nodes,
            retained_sizes: retained_sizes.len(),
            distances: distances.len(),
        });
    }

    let mut top = TopCandidates::new(config.limit);
    for (index, (&size, &distance)) in retained_sizes.iter().zip(distances).enumerate() {
        graph.annotate(index, size, distance);
        if index == root_index || !config.admits(distance) {
            continue;
        }
        if let Some(node) = graph.node(index) {
            top.offer(LeakCandidate {
                index,
                id: node.id.clone(),
                size,
            });
        }
    }

    let candidates = top.into_sorted();
    debug!(
        nodes,
        limit = config.limit,
        candidates = candidates.len(),
        "ranked leak candidates"
    );
    Ok(candidates)
}
