//! Snapshot fixtures shared by the integration tests.
#![allow(dead_code)]

use heapsight::{RawSnapshot, SnapshotHeader, SnapshotMeta, TypeDescriptor};
use serde_json::Number;

pub const NODE_FIELDS: [&str; 6] = ["type", "name", "id", "self_size", "edge_count", "trace_node_id"];
pub const NODE_TYPES: [&str; 5] = ["hidden", "array", "string", "object", "closure"];
pub const EDGE_FIELDS: [&str; 3] = ["type", "name_or_index", "to_node"];
pub const EDGE_TYPES: [&str; 7] = ["context", "element", "property", "internal", "hidden", "shortcut", "weak"];

#[derive(Debug, Clone)]
pub enum Label {
    Name(String),
    Index(u64),
}

#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub kind: &'static str,
    pub label: Label,
    pub to: usize,
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub kind: &'static str,
    pub name: String,
    pub id: u64,
    pub self_size: u64,
    pub edges: Vec<EdgeSpec>,
}

impl NodeSpec {
    pub fn new(kind: &'static str, name: &str, id: u64, self_size: u64) -> Self {
        Self {
            kind,
            name: name.to_string(),
            id,
            self_size,
            edges: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, to: usize) -> Self {
        self.edges.push(EdgeSpec {
            kind: "property",
            label: Label::Name(name.to_string()),
            to,
        });
        self
    }

    pub fn element(mut self, index: u64, to: usize) -> Self {
        self.edges.push(EdgeSpec {
            kind: "element",
            label: Label::Index(index),
            to,
        });
        self
    }
}

fn intern(strings: &mut Vec<String>, value: &str) -> usize {
    match strings.iter().position(|s| s == value) {
        Some(index) => index,
        None => {
            strings.push(value.to_string());
            strings.len() - 1
        }
    }
}

fn position(table: &[&str], value: &str) -> usize {
    table
        .iter()
        .position(|t| *t == value)
        .unwrap_or_else(|| panic!("unknown type {value}"))
}

pub fn meta() -> SnapshotMeta {
    SnapshotMeta {
        node_fields: NODE_FIELDS.map(String::from).to_vec(),
        node_types: vec![
            TypeDescriptor::Enum(NODE_TYPES.map(String::from).to_vec()),
            TypeDescriptor::Tag("string".into()),
            TypeDescriptor::Tag("number".into()),
            TypeDescriptor::Tag("number".into()),
            TypeDescriptor::Tag("number".into()),
            TypeDescriptor::Tag("number".into()),
        ],
        edge_fields: EDGE_FIELDS.map(String::from).to_vec(),
        edge_types: vec![
            TypeDescriptor::Enum(EDGE_TYPES.map(String::from).to_vec()),
            TypeDescriptor::Tag("string_or_number".into()),
            TypeDescriptor::Tag("node".into()),
        ],
    }
}

/// Flatten node specs into the capture's array layout.
pub fn snapshot(specs: &[NodeSpec]) -> RawSnapshot {
    let mut strings = Vec::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for spec in specs {
        let name = intern(&mut strings, &spec.name);
        nodes.extend(
            [
                position(&NODE_TYPES, spec.kind) as u64,
                name as u64,
                spec.id,
                spec.self_size,
                spec.edges.len() as u64,
                0,
            ]
            .map(Number::from),
        );
        for edge in &spec.edges {
            let label = match &edge.label {
                Label::Name(name) => intern(&mut strings, name) as u64,
                Label::Index(index) => *index,
            };
            edges.extend(
                [
                    position(&EDGE_TYPES, edge.kind) as u64,
                    label,
                    (edge.to * NODE_FIELDS.len()) as u64,
                ]
                .map(Number::from),
            );
        }
    }

    RawSnapshot {
        snapshot: SnapshotHeader {
            meta: meta(),
            node_count: Some(specs.len()),
            edge_count: Some(edges.len() / EDGE_FIELDS.len()),
            root_index: None,
        },
        nodes,
        edges,
        strings,
    }
}

/// Root (index 0) -> holder (index 1, 10 bytes) -> payload (index 2, 1000 bytes).
pub fn three_node_chain() -> RawSnapshot {
    snapshot(&[
        NodeSpec::new("hidden", "(GC roots)", 1, 0).property("holder", 1),
        NodeSpec::new("object", "Holder", 3, 10).property("payload", 2),
        NodeSpec::new("array", "Payload", 5, 1000),
    ])
}
