//! SnapshotDecoder: turns the flat capture arrays into a [`HeapGraph`],
//! indexing adjacency in both directions as edges are decoded.

use crate::error::{HeapError, HeapResult};
use crate::graph::{Edge, EdgeIndex, HeapGraph, Node};
use crate::schema::{read_u64, read_usize, FieldSchema};
use crate::snapshot::RawSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Edge kinds whose `name_or_index` column is a numeric index, not a string.
const INDEXED_EDGE_TYPES: [&str; 2] = ["element", "hidden"];

/// Decode a raw snapshot into an indexed graph.
///
/// Fails without returning a partial graph if the layout metadata, any
/// table reference, or the edge spans are inconsistent.
pub fn decode(raw: &RawSnapshot) -> HeapResult<HeapGraph> {
    let schema = FieldSchema::resolve(&raw.snapshot.meta)?;
    SnapshotDecoder::new(raw, schema)?.run()
}

struct SnapshotDecoder<'a> {
    raw: &'a RawSnapshot,
    schema: FieldSchema,
    strings: Vec<Arc<str>>,
    node_count: usize,
}

impl<'a> SnapshotDecoder<'a> {
    fn new(raw: &'a RawSnapshot, schema: FieldSchema) -> HeapResult<Self> {
        let width = schema.node.width;
        if raw.nodes.len() % width != 0 {
            return Err(HeapError::MalformedSchema(format!(
                "nodes array of {} values is not a multiple of node width {width}",
                raw.nodes.len()
            )));
        }
        schema.check_type_coverage(&raw.nodes, &raw.edges)?;

        Ok(Self {
            raw,
            node_count: raw.nodes.len() / width,
            strings: raw.strings.iter().map(|s| Arc::from(s.as_str())).collect(),
            schema,
        })
    }

    fn run(self) -> HeapResult<HeapGraph> {
        let root_index = self.raw.root_index();
        if root_index >= self.node_count {
            return Err(HeapError::corrupt(
                "snapshot.root_index",
                root_index,
                format!("root outside {} nodes", self.node_count),
            ));
        }

        let mut nodes = Vec::with_capacity(self.node_count);
        let mut ids: HashMap<Arc<str>, usize> = HashMap::with_capacity(self.node_count);
        for index in 0..self.node_count {
            let node = self.decode_node(index)?;
            if let Some(first) = ids.get(&node.id).copied() {
                warn!(id = %node.id, first, duplicate = index, "duplicate node identity");
            } else {
                ids.insert(node.id.clone(), index);
            }
            nodes.push(node);
        }

        let mut edges = EdgeIndex::with_nodes(self.node_count);
        let edge_width = self.schema.edge.width;
        let mut offset = 0;
        for index in 0..self.node_count {
            let span = nodes[index]
                .edge_count
                .checked_mul(edge_width)
                .unwrap_or(usize::MAX);
            let available = self.raw.edges.len() - offset;
            if span > available {
                return Err(HeapError::TruncatedSnapshot {
                    node_index: index,
                    edge_offset: offset,
                    required: span,
                    available,
                });
            }

            let mut children = Vec::with_capacity(nodes[index].edge_count);
            let mut cursor = offset;
            while cursor < offset + span {
                let edge = self.decode_edge(cursor, &nodes)?;
                edges.record(index, &nodes[index].id, &edge);
                children.push(edge);
                cursor += edge_width;
            }
            nodes[index].children = children;
            offset += span;
        }

        if offset != self.raw.edges.len() {
            return Err(HeapError::MalformedSchema(format!(
                "edge counts cover {offset} of {} edge values",
                self.raw.edges.len()
            )));
        }
        // Header counts are compared only once the spans are known to fit,
        // so a short edges array reports as truncation.
        self.schema
            .check_counts(&self.raw.snapshot, self.raw.nodes.len(), self.raw.edges.len())?;

        let root_id = nodes[root_index].id.clone();
        debug!(
            nodes = self.node_count,
            edges = self.raw.edges.len() / edge_width,
            root_index,
            root_id = %root_id,
            "decoded heap snapshot"
        );

        Ok(HeapGraph::new(nodes, edges, ids, root_index, root_id))
    }

    fn decode_node(&self, index: usize) -> HeapResult<Node> {
        let layout = self.schema.node;
        let values = &self.raw.nodes;
        let base = index * layout.width;

        let type_offset = base + layout.type_field;
        let node_type = self
            .schema
            .node_type(read_usize(values, type_offset, "nodes.type")?, type_offset)?
            .clone();
        let name_offset = base + layout.name;
        let name = self.string(
            read_usize(values, name_offset, "nodes.name")?,
            "nodes.name",
            name_offset,
        )?;
        let address = read_u64(values, base + layout.id, "nodes.id")?;
        let self_size = read_u64(values, base + layout.self_size, "nodes.self_size")?;
        let edge_count = read_usize(values, base + layout.edge_count, "nodes.edge_count")?;
        let trace_node_id = match layout.trace_node_id {
            Some(column) => read_u64(values, base + column, "nodes.trace_node_id")?,
            None => 0,
        };
        let detachedness = layout
            .detachedness
            .map(|column| read_u64(values, base + column, "nodes.detachedness"))
            .transpose()?;

        Ok(Node {
            index,
            node_type,
            name,
            id: Arc::from(format!("@{address}")),
            self_size,
            retain_size: self_size,
            edge_count,
            trace_node_id,
            detachedness,
            distance: None,
            children: Vec::new(),
        })
    }

    fn decode_edge(&self, base: usize, nodes: &[Node]) -> HeapResult<Edge> {
        let layout = self.schema.edge;
        let values = &self.raw.edges;

        let type_offset = base + layout.type_field;
        let edge_type = self
            .schema
            .edge_type(read_usize(values, type_offset, "edges.type")?, type_offset)?
            .clone();

        let name_offset = base + layout.name_or_index;
        let raw_name = read_usize(values, name_offset, "edges.name_or_index")?;
        let name_or_index = if INDEXED_EDGE_TYPES.contains(&&*edge_type) {
            Arc::from(format!("[{raw_name}]"))
        } else {
            self.string(raw_name, "edges.name_or_index", name_offset)?
        };

        let target_offset = base + layout.to_node;
        let to_node = read_usize(values, target_offset, "edges.to_node")?;
        let node_width = self.schema.node.width;
        if to_node % node_width != 0 {
            return Err(HeapError::corrupt(
                "edges.to_node",
                target_offset,
                format!("{to_node} is not a multiple of node width {node_width}"),
            ));
        }
        let index = to_node / node_width;
        let target = nodes.get(index).ok_or_else(|| {
            HeapError::corrupt(
                "edges.to_node",
                target_offset,
                format!("node {index} outside {} nodes", nodes.len()),
            )
        })?;

        Ok(Edge {
            index,
            edge_type,
            name_or_index,
            to_node: target.id.clone(),
        })
    }

    fn string(&self, index: usize, field: &'static str, offset: usize) -> HeapResult<Arc<str>> {
        self.strings.get(index).cloned().ok_or_else(|| {
            HeapError::corrupt(
                field,
                offset,
                format!("string {index} outside table of {}", self.strings.len()),
            )
        })
    }
}
