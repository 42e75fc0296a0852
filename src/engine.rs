//! Analysis engine seam: retained sizes, distances and statistics come from
//! a dominator/BFS analysis outside this crate.

use crate::graph::HeapGraph;
use serde::{Deserialize, Serialize};

/// Distances at or above this value mark nodes unreachable from the root.
pub const UNREACHABLE_DISTANCE: u64 = 100_000_000;

/// Per-node results of an analysis pass, index-aligned with the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput<A, S> {
    /// Bytes freed if node `i` were removed (its dominator subtree).
    pub retained_sizes: Vec<u64>,
    /// Shortest retaining hop count from the root.
    pub distances: Vec<u64>,
    pub aggregates: A,
    pub statistics: S,
}

/// Computes retained sizes and distances for a decoded graph.
pub trait HeapAnalysisEngine {
    type Aggregates;
    type Statistics;

    fn analyze(&self, graph: &HeapGraph) -> EngineOutput<Self::Aggregates, Self::Statistics>;
}

/// Replays outputs computed elsewhere, e.g. by a host process that already
/// ran the dominator analysis.
#[derive(Debug, Clone)]
pub struct PrecomputedEngine<A, S> {
    output: EngineOutput<A, S>,
}

impl<A, S> PrecomputedEngine<A, S> {
    pub fn new(output: EngineOutput<A, S>) -> Self {
        Self { output }
    }
}

impl PrecomputedEngine<(), ()> {
    /// Engine output without aggregate or global statistics.
    pub fn from_arrays(retained_sizes: Vec<u64>, distances: Vec<u64>) -> Self {
        Self::new(EngineOutput {
            retained_sizes,
            distances,
            aggregates: (),
            statistics: (),
        })
    }
}

impl<A: Clone, S: Clone> HeapAnalysisEngine for PrecomputedEngine<A, S> {
    type Aggregates = A;
    type Statistics = S;

    fn analyze(&self, _graph: &HeapGraph) -> EngineOutput<A, S> {
        self.output.clone()
    }
}
