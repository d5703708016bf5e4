//! Read-only DSL tree exported by the design tool.
//!
//! The tree is stored as a directed graph (parent → child edges) with an
//! id index, the same shape the editor uses for every node lookup. Each node
//! carries geometry relative to its immediate parent; absolute positions are
//! derived by `geometry::absolute_position`.

use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// ─── Input shape ─────────────────────────────────────────────────────────

/// Parent-relative geometry of a DSL node. Absent or `null` fields are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutStyle {
    #[serde(deserialize_with = "null_as_zero")]
    pub width: f32,
    #[serde(deserialize_with = "null_as_zero")]
    pub height: f32,
    #[serde(deserialize_with = "null_as_zero")]
    pub relative_x: f32,
    #[serde(deserialize_with = "null_as_zero")]
    pub relative_y: f32,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Owned, nested form of a DSL node as it arrives from the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDslNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default)]
    pub layout_style: LayoutStyle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawDslNode>,
}

impl RawDslNode {
    /// Convenience constructor used by hosts and tests.
    pub fn new(id: &str, node_type: &str, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            node_type: node_type.to_string(),
            name: None,
            visible: None,
            layout_style: LayoutStyle {
                width,
                height,
                relative_x: x,
                relative_y: y,
            },
            children: Vec::new(),
        }
    }

    /// Builder-style child attachment.
    pub fn with_children(mut self, children: Vec<RawDslNode>) -> Self {
        self.children = children;
        self
    }
}

// ─── Graph form ──────────────────────────────────────────────────────────

/// A single node of the DSL graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslNode {
    pub id: NodeId,
    /// Exporter node type (`frame`, `text`, `layer`, `path`, …).
    pub node_type: String,
    pub name: Option<String>,
    /// Visibility as last written by the host; never used for geometry.
    pub visible: bool,
    pub layout: LayoutStyle,
}

/// The DSL document: a tree of `DslNode` values with an id index.
#[derive(Debug, Clone)]
pub struct DslTree {
    /// The underlying directed graph.
    pub graph: StableDiGraph<DslNode, ()>,

    /// The root node index.
    pub root: NodeIndex,

    /// Index from NodeId → NodeIndex for fast lookup.
    pub id_index: HashMap<NodeId, NodeIndex>,
}

impl DslTree {
    /// Build the graph from the exporter's nested form.
    ///
    /// # Errors
    /// Returns an error if two nodes share an id.
    pub fn from_raw(raw: &RawDslNode) -> Result<Self, String> {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(dsl_node_from_raw(raw));
        let mut tree = Self {
            graph,
            root,
            id_index: HashMap::from([(NodeId::intern(&raw.id), root)]),
        };
        for child in &raw.children {
            tree.insert_recursive(root, child)?;
        }
        Ok(tree)
    }

    /// Parse the exporter's JSON document.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let raw: RawDslNode =
            serde_json::from_str(json).map_err(|e| format!("Invalid DSL document: {e}"))?;
        Self::from_raw(&raw)
    }

    fn insert_recursive(&mut self, parent: NodeIndex, raw: &RawDslNode) -> Result<(), String> {
        let node = dsl_node_from_raw(raw);
        if self.id_index.contains_key(&node.id) {
            return Err(format!("Duplicate DSL node id: \"{}\"", raw.id));
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        self.id_index.insert(id, idx);
        for child in &raw.children {
            self.insert_recursive(idx, child)?;
        }
        Ok(())
    }

    /// The id of the root DSL node.
    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    /// Number of nodes in the document.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Look up a node by its id.
    pub fn get_by_id(&self, id: NodeId) -> Option<&DslNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Get the index for a NodeId.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Get the parent index of a node.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Get children of a node in document order.
    ///
    /// Sorted by `NodeIndex`, which matches insertion order because nodes
    /// are never removed from the DSL graph.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    /// Pre-order list of every node id, root first.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            out.push(self.graph[idx].id);
            stack.extend(self.children(idx).into_iter().rev());
        }
        out
    }

    /// Check if `ancestor_id` is a parent/grandparent/etc. of `descendant_id`.
    pub fn is_ancestor_of(&self, ancestor_id: NodeId, descendant_id: NodeId) -> bool {
        if ancestor_id == descendant_id {
            return false;
        }
        let mut current_idx = match self.index_of(descendant_id) {
            Some(idx) => idx,
            None => return false,
        };
        while let Some(parent_idx) = self.parent(current_idx) {
            if self.graph[parent_idx].id == ancestor_id {
                return true;
            }
            current_idx = parent_idx;
        }
        false
    }

    /// Path of indices from the root down to `id` (both inclusive).
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeIndex>> {
        let mut idx = self.index_of(id)?;
        let mut path = vec![idx];
        while let Some(parent_idx) = self.parent(idx) {
            path.push(parent_idx);
            idx = parent_idx;
        }
        path.reverse();
        Some(path)
    }

    /// Overwrite a node's visibility flag. Geometry is unaffected.
    pub fn set_visibility(&mut self, id: NodeId, visible: bool) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.graph[idx].visible = visible;
                true
            }
            None => false,
        }
    }
}

fn dsl_node_from_raw(raw: &RawDslNode) -> DslNode {
    DslNode {
        id: NodeId::intern(&raw.id),
        node_type: raw.node_type.clone(),
        name: raw.name.clone(),
        visible: raw.visible.unwrap_or(true),
        layout: raw.layout_style,
    }
}
