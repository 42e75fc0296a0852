//! FieldSchema: resolves the self-described column layout of a snapshot.

use crate::error::{HeapError, HeapResult};
use crate::snapshot::{SnapshotHeader, SnapshotMeta, TypeDescriptor};
use serde_json::Number;
use std::sync::Arc;

/// Column positions within one node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    pub width: usize,
    pub type_field: usize,
    pub name: usize,
    pub id: usize,
    pub self_size: usize,
    pub edge_count: usize,
    pub trace_node_id: Option<usize>,
    pub detachedness: Option<usize>,
}

/// Column positions within one edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLayout {
    pub width: usize,
    pub type_field: usize,
    pub name_or_index: usize,
    pub to_node: usize,
}

/// Resolved field layout plus the node/edge type enumeration tables.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub node: NodeLayout,
    pub edge: EdgeLayout,
    node_types: Vec<Arc<str>>,
    edge_types: Vec<Arc<str>>,
}

impl FieldSchema {
    /// Build the schema from the snapshot's `meta` block.
    pub fn resolve(meta: &SnapshotMeta) -> HeapResult<Self> {
        let node_fields = &meta.node_fields;
        let edge_fields = &meta.edge_fields;
        require_unique("node_fields", node_fields)?;
        require_unique("edge_fields", edge_fields)?;

        let node = NodeLayout {
            width: node_fields.len(),
            type_field: position("node_fields", node_fields, "type")?,
            name: position("node_fields", node_fields, "name")?,
            id: position("node_fields", node_fields, "id")?,
            self_size: position("node_fields", node_fields, "self_size")?,
            edge_count: position("node_fields", node_fields, "edge_count")?,
            trace_node_id: node_fields.iter().position(|f| f == "trace_node_id"),
            detachedness: node_fields.iter().position(|f| f == "detachedness"),
        };
        let edge = EdgeLayout {
            width: edge_fields.len(),
            type_field: position("edge_fields", edge_fields, "type")?,
            name_or_index: position("edge_fields", edge_fields, "name_or_index")?,
            to_node: position("edge_fields", edge_fields, "to_node")?,
        };

        let node_types = type_table("node_types", &meta.node_types, node.type_field)?;
        let edge_types = type_table("edge_types", &meta.edge_types, edge.type_field)?;

        Ok(Self {
            node,
            edge,
            node_types,
            edge_types,
        })
    }

    pub fn node_type_names(&self) -> &[Arc<str>] {
        &self.node_types
    }

    pub fn edge_type_names(&self) -> &[Arc<str>] {
        &self.edge_types
    }

    /// Look up a node type name; `offset` locates the value for diagnostics.
    pub fn node_type(&self, raw: usize, offset: usize) -> HeapResult<&Arc<str>> {
        self.node_types.get(raw).ok_or_else(|| {
            HeapError::corrupt(
                "nodes.type",
                offset,
                format!("type {raw} outside table of {}", self.node_types.len()),
            )
        })
    }

    pub fn edge_type(&self, raw: usize, offset: usize) -> HeapResult<&Arc<str>> {
        self.edge_types.get(raw).ok_or_else(|| {
            HeapError::corrupt(
                "edges.type",
                offset,
                format!("type {raw} outside table of {}", self.edge_types.len()),
            )
        })
    }

    /// Check declared counts and array shapes against the layout.
    pub fn check_counts(
        &self,
        header: &SnapshotHeader,
        nodes_len: usize,
        edges_len: usize,
    ) -> HeapResult<()> {
        if let Some(declared) = header.node_count {
            if declared.checked_mul(self.node.width) != Some(nodes_len) {
                return Err(HeapError::MalformedSchema(format!(
                    "node_count {declared} disagrees with {nodes_len} node values of width {}",
                    self.node.width
                )));
            }
        }
        if let Some(declared) = header.edge_count {
            if declared.checked_mul(self.edge.width) != Some(edges_len) {
                return Err(HeapError::MalformedSchema(format!(
                    "edge_count {declared} disagrees with {edges_len} edge values of width {}",
                    self.edge.width
                )));
            }
        }
        Ok(())
    }

    /// Ensure the type tables cover every type index the records reference.
    pub fn check_type_coverage(&self, nodes: &[Number], edges: &[Number]) -> HeapResult<()> {
        let node_max = max_column(nodes, self.node.width, self.node.type_field, "nodes.type")?;
        if let Some(max) = node_max {
            if max >= self.node_types.len() {
                return Err(HeapError::MalformedSchema(format!(
                    "node type index {max} but node_types lists {} names",
                    self.node_types.len()
                )));
            }
        }
        let edge_max = max_column(edges, self.edge.width, self.edge.type_field, "edges.type")?;
        if let Some(max) = edge_max {
            if max >= self.edge_types.len() {
                return Err(HeapError::MalformedSchema(format!(
                    "edge type index {max} but edge_types lists {} names",
                    self.edge_types.len()
                )));
            }
        }
        Ok(())
    }
}

/// Largest float that still identifies one integer exactly (2^53).
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Read a flat-array value as a non-negative integer.
///
/// Integer literals are taken exactly over the full `u64` range. Float
/// literals such as `16.0` are accepted only when integral and below 2^53.
pub(crate) fn read_u64(values: &[Number], offset: usize, field: &'static str) -> HeapResult<u64> {
    let value = values
        .get(offset)
        .ok_or_else(|| HeapError::corrupt(field, offset, "offset past end of array"))?;
    if let Some(exact) = value.as_u64() {
        return Ok(exact);
    }
    match value.as_f64() {
        Some(float) if float >= 0.0 && float.fract() == 0.0 && float < MAX_EXACT_FLOAT => {
            Ok(float as u64)
        }
        _ => Err(HeapError::corrupt(
            field,
            offset,
            format!("{value} is not a non-negative integer"),
        )),
    }
}

pub(crate) fn read_usize(
    values: &[Number],
    offset: usize,
    field: &'static str,
) -> HeapResult<usize> {
    let value = read_u64(values, offset, field)?;
    usize::try_from(value)
        .map_err(|_| HeapError::corrupt(field, offset, format!("{value} does not fit an index")))
}

fn position(table: &str, fields: &[String], name: &str) -> HeapResult<usize> {
    if fields.is_empty() {
        return Err(HeapError::MalformedSchema(format!("{table} is missing or empty")));
    }
    fields
        .iter()
        .position(|f| f == name)
        .ok_or_else(|| HeapError::MalformedSchema(format!("{table} has no \"{name}\" field")))
}

fn require_unique(table: &str, fields: &[String]) -> HeapResult<()> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].contains(field) {
            return Err(HeapError::MalformedSchema(format!(
                "{table} lists \"{field}\" twice"
            )));
        }
    }
    Ok(())
}

fn type_table(
    table: &str,
    descriptors: &[TypeDescriptor],
    column: usize,
) -> HeapResult<Vec<Arc<str>>> {
    match descriptors.get(column) {
        Some(TypeDescriptor::Enum(names)) if !names.is_empty() => {
            Ok(names.iter().map(|n| Arc::from(n.as_str())).collect())
        }
        Some(TypeDescriptor::Enum(_)) => Err(HeapError::MalformedSchema(format!(
            "{table} type enumeration is empty"
        ))),
        Some(TypeDescriptor::Tag(tag)) => Err(HeapError::MalformedSchema(format!(
            "{table}[{column}] should enumerate type names, found \"{tag}\""
        ))),
        None => Err(HeapError::MalformedSchema(format!(
            "{table} has no descriptor for the type column"
        ))),
    }
}

fn max_column(
    values: &[Number],
    width: usize,
    column: usize,
    field: &'static str,
) -> HeapResult<Option<usize>> {
    let mut max = None;
    let mut offset = column;
    while offset < values.len() {
        let raw = read_usize(values, offset, field)?;
        max = Some(max.map_or(raw, |m: usize| m.max(raw)));
        offset += width;
    }
    Ok(max)
}
