//! Decoded heap graph: nodes with their outgoing edges, plus the
//! bidirectional adjacency index.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One object instance in the captured graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Canonical index, dense in `0..node_count`.
    pub index: usize,
    #[serde(rename = "type")]
    pub node_type: Arc<str>,
    pub name: Arc<str>,
    /// Identity string, `"@<address>"`.
    pub id: Arc<str>,
    pub self_size: u64,
    /// Equals `self_size` until the analysis engine's result is applied.
    pub retain_size: u64,
    pub edge_count: usize,
    /// Opaque allocation-trace reference, carried through unchanged.
    pub trace_node_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detachedness: Option<u64>,
    /// Hop count from the root, set once engine output is applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u64>,
    pub children: Vec<Edge>,
}

/// One outgoing reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Canonical index of the target node.
    pub index: usize,
    #[serde(rename = "type")]
    pub edge_type: Arc<str>,
    /// Property name, or `"[n]"` for element and hidden links.
    pub name_or_index: Arc<str>,
    /// Identity of the target node.
    pub to_node: Arc<str>,
}

/// The other endpoint of an edge, as seen from one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRef {
    pub index: usize,
    pub id: Arc<str>,
    #[serde(rename = "type")]
    pub edge_type: Arc<str>,
    pub name_or_index: Arc<str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Adjacency {
    /// Nodes pointing at this node.
    pub from_ids: Vec<EdgeRef>,
    /// Nodes this node points at.
    pub to_ids: Vec<EdgeRef>,
}

/// Reverse and forward adjacency keyed by node index.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    entries: Vec<Adjacency>,
}

impl EdgeIndex {
    pub(crate) fn with_nodes(count: usize) -> Self {
        Self {
            entries: vec![Adjacency::default(); count],
        }
    }

    /// Record `edge` leaving `owner` in both directions.
    pub(crate) fn record(&mut self, owner: usize, owner_id: &Arc<str>, edge: &Edge) {
        self.entries[edge.index].from_ids.push(EdgeRef {
            index: owner,
            id: owner_id.clone(),
            edge_type: edge.edge_type.clone(),
            name_or_index: edge.name_or_index.clone(),
        });
        self.entries[owner].to_ids.push(EdgeRef {
            index: edge.index,
            id: edge.to_node.clone(),
            edge_type: edge.edge_type.clone(),
            name_or_index: edge.name_or_index.clone(),
        });
    }

    pub fn get(&self, index: usize) -> Option<&Adjacency> {
        self.entries.get(index)
    }
}

/// The fully decoded snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HeapGraph {
    /// Nodes in snapshot order; position equals `Node::index`.
    #[serde(rename = "heap_map")]
    nodes: Vec<Node>,
    root_index: usize,
    root_id: Arc<str>,
    #[serde(skip)]
    edges: EdgeIndex,
    #[serde(skip)]
    ids: HashMap<Arc<str>, usize>,
}

impl HeapGraph {
    pub(crate) fn new(
        nodes: Vec<Node>,
        edges: EdgeIndex,
        ids: HashMap<Arc<str>, usize>,
        root_index: usize,
        root_id: Arc<str>,
    ) -> Self {
        Self {
            nodes,
            root_index,
            root_id,
            edges,
            ids,
        }
    }

    /// Nodes in canonical index order (the heap array / heap map).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|index| self.nodes.get(index))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.get(id).copied()
    }

    pub fn root_index(&self) -> usize {
        self.root_index
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(self.root_index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    pub fn adjacency(&self, index: usize) -> Option<&Adjacency> {
        self.edges.get(index)
    }

    /// Edges pointing at the node (its `fromIds`).
    pub fn retainers(&self, index: usize) -> &[EdgeRef] {
        self.edges
            .get(index)
            .map(|a| a.from_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Edges leaving the node (its `toIds`).
    pub fn references(&self, index: usize) -> &[EdgeRef] {
        self.edges
            .get(index)
            .map(|a| a.to_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Apply engine output to one node.
    pub(crate) fn annotate(&mut self, index: usize, retained_size: u64, distance: u64) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.retain_size = retained_size;
            node.distance = Some(distance);
        }
    }
}
