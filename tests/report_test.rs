//! End-to-end report assembly with an injected analysis engine.

mod common;

use common::{snapshot, three_node_chain, NodeSpec};
use heapsight::{
    decode, produce_report, rank, EngineOutput, HeapAnalysisEngine, HeapError, HeapGraph,
    PrecomputedEngine, RankConfig, UNREACHABLE_DISTANCE,
};

#[derive(Debug, Clone, PartialEq)]
struct Totals {
    total_bytes: u64,
    nodes: usize,
}

/// Engine that derives its statistics from the graph it is given.
struct CountingEngine {
    retained_sizes: Vec<u64>,
    distances: Vec<u64>,
}

impl HeapAnalysisEngine for CountingEngine {
    type Aggregates = Vec<(String, u64)>;
    type Statistics = Totals;

    fn analyze(&self, graph: &HeapGraph) -> EngineOutput<Self::Aggregates, Self::Statistics> {
        let aggregates = graph
            .nodes()
            .iter()
            .map(|n| (n.node_type.to_string(), n.self_size))
            .collect();
        EngineOutput {
            retained_sizes: self.retained_sizes.clone(),
            distances: self.distances.clone(),
            aggregates,
            statistics: Totals {
                total_bytes: graph.nodes().iter().map(|n| n.self_size).sum(),
                nodes: graph.node_count(),
            },
        }
    }
}

fn wide_snapshot(count: usize) -> heapsight::RawSnapshot {
    let mut specs = vec![NodeSpec::new("hidden", "(GC roots)", 1, 0)];
    for i in 1..count {
        specs[0] = specs[0].clone().property(&format!("p{i}"), i);
        specs.push(NodeSpec::new("object", &format!("Obj{i}"), (i as u64) * 2 + 1, 8));
    }
    snapshot(&specs)
}

#[test]
fn test_three_node_chain_reports_deep_payload() {
    let engine = PrecomputedEngine::from_arrays(vec![1010, 1000, 1000], vec![0, 1, 2]);
    let report = produce_report(&three_node_chain(), &engine, &RankConfig::default()).unwrap();

    assert_eq!(report.root_index(), 0);
    assert_eq!(report.leak_candidates.len(), 1);
    let candidate = &report.leak_candidates[0];
    assert_eq!(candidate.index, 2);
    assert_eq!(&*candidate.id, "@5");
    assert_eq!(candidate.size, 1000);
}

#[test]
fn test_report_annotates_every_node() {
    let engine = PrecomputedEngine::from_arrays(vec![1010, 1000, 1000], vec![0, 1, 2]);
    let report = produce_report(&three_node_chain(), &engine, &RankConfig::default()).unwrap();
    let retained: Vec<u64> = report.graph.nodes().iter().map(|n| n.retain_size).collect();
    let distances: Vec<Option<u64>> = report.graph.nodes().iter().map(|n| n.distance).collect();
    assert_eq!(retained, vec![1010, 1000, 1000]);
    assert_eq!(distances, vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn test_engine_outputs_pass_through() {
    let engine = CountingEngine {
        retained_sizes: vec![1010, 1000, 1000],
        distances: vec![0, 1, 2],
    };
    let report = produce_report(&three_node_chain(), &engine, &RankConfig::default()).unwrap();
    assert_eq!(
        report.statistics,
        Totals {
            total_bytes: 1010,
            nodes: 3
        }
    );
    assert_eq!(report.aggregates[2], ("array".to_string(), 1000));
}

#[test]
fn test_unreachable_and_shallow_nodes_are_excluded() {
    let raw = wide_snapshot(6);
    let retained = vec![5000, 900, 800, 700, 600, 500];
    let distances = vec![0, 1, 2, UNREACHABLE_DISTANCE, UNREACHABLE_DISTANCE + 7, 3];
    let engine = PrecomputedEngine::from_arrays(retained, distances);
    let report = produce_report(&raw, &engine, &RankConfig::default()).unwrap();

    let indices: Vec<usize> = report.leak_candidates.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![2, 5]);
}

#[test]
fn test_limit_bounds_and_orders_candidates() {
    let raw = wide_snapshot(9);
    let retained = vec![0, 10, 70, 30, 90, 30, 50, 30, 80];
    let distances = vec![0, 2, 2, 2, 2, 2, 2, 2, 2];
    let engine = PrecomputedEngine::from_arrays(retained, distances);
    let report = produce_report(&raw, &engine, &RankConfig::default().with_limit(4)).unwrap();

    let picked: Vec<(usize, u64)> = report
        .leak_candidates
        .iter()
        .map(|c| (c.index, c.size))
        .collect();
    assert_eq!(picked, vec![(4, 90), (8, 80), (2, 70), (6, 50)]);
}

#[test]
fn test_equal_sizes_keep_first_seen_when_full() {
    let raw = wide_snapshot(5);
    let retained = vec![0, 40, 40, 40, 40];
    let distances = vec![0, 2, 2, 2, 2];
    let engine = PrecomputedEngine::from_arrays(retained, distances);
    let report = produce_report(&raw, &engine, &RankConfig::default().with_limit(2)).unwrap();

    let indices: Vec<usize> = report.leak_candidates.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2]);
}

#[test]
fn test_root_is_never_a_candidate() {
    let mut raw = wide_snapshot(4);
    raw.snapshot.root_index = Some(2);
    let engine = PrecomputedEngine::from_arrays(vec![1, 2, 99_999, 3], vec![5, 5, 5, 5]);
    let report = produce_report(&raw, &engine, &RankConfig::default()).unwrap();
    assert!(report.leak_candidates.iter().all(|c| c.index != 2));
    assert_eq!(report.leak_candidates.len(), 3);
}

#[test]
fn test_misaligned_engine_output_aborts() {
    let engine = PrecomputedEngine::from_arrays(vec![1010, 1000, 1000], vec![0, 1]);
    match produce_report(&three_node_chain(), &engine, &RankConfig::default()) {
        Err(HeapError::EngineOutputMismatch {
            nodes,
            retained_sizes,
            distances,
        }) => assert_eq!((nodes, retained_sizes, distances), (3, 3, 2)),
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn test_rank_directly_on_decoded_graph() {
    let mut graph = decode(&three_node_chain()).unwrap();
    let candidates = rank(
        graph.root_index(),
        &[1010, 1000, 1000],
        &[0, 2, 3],
        &mut graph,
        &RankConfig::default(),
    )
    .unwrap();
    let indices: Vec<usize> = candidates.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(graph.node(1).unwrap().distance, Some(2));
}

#[test]
fn test_report_is_idempotent() {
    let raw = wide_snapshot(7);
    let engine = PrecomputedEngine::from_arrays(
        vec![0, 5, 60, 60, 10, 70, 1],
        vec![0, 2, 3, 4, 2, 9, 1],
    );
    let first = produce_report(&raw, &engine, &RankConfig::default()).unwrap();
    let second = produce_report(&raw, &engine, &RankConfig::default()).unwrap();
    assert_eq!(first.leak_candidates, second.leak_candidates);
    assert_eq!(first.graph.nodes(), second.graph.nodes());
}

#[test]
fn test_report_serializes_heap_map_and_candidates() {
    let engine = PrecomputedEngine::from_arrays(vec![1010, 1000, 1000], vec![0, 1, 2]);
    let report = produce_report(&three_node_chain(), &engine, &RankConfig::default()).unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["root_index"], 0);
    assert_eq!(value["root_id"], "@1");
    assert_eq!(value["heap_map"][2]["type"], "array");
    assert_eq!(value["heap_map"][1]["children"][0]["to_node"], "@5");
    assert_eq!(value["leak_candidates"][0]["size"], 1000);
}
