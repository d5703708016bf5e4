//! Canonical ordering, pruning and flattening passes.
//!
//! Each pass has a single responsibility and is safe to compose. The engine
//! runs prune → sort → flatten after every structural mutation; nothing is
//! maintained incrementally.

use fta_core::annotation::AnnotationNode;
use fta_core::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Sort ─────────────────────────────────────────────────────────────────

/// Recursively order every `children` list top-to-bottom, left-to-right.
///
/// Siblings whose rounded Y lies within `row_tolerance` of the first node of
/// a row share that row and are ordered by X. Rows are ordered by Y.
/// Running the pass twice yields the same order.
pub fn sort_children(node: &mut AnnotationNode, row_tolerance: f32) {
    for child in &mut node.children {
        sort_children(child, row_tolerance);
    }
    if node.children.len() < 2 {
        return;
    }

    let mut kids = std::mem::take(&mut node.children);
    kids.sort_by(|a, b| {
        a.absolute_y
            .round()
            .total_cmp(&b.absolute_y.round())
            .then(a.absolute_x.total_cmp(&b.absolute_x))
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });

    let mut rows: Vec<Vec<AnnotationNode>> = Vec::new();
    let mut row_y = 0.0_f32;
    for kid in kids {
        let y = kid.absolute_y.round();
        let starts_row = rows.is_empty() || y - row_y > row_tolerance;
        if starts_row {
            row_y = y;
            rows.push(vec![kid]);
        } else if let Some(row) = rows.last_mut() {
            row.push(kid);
        }
    }

    for mut row in rows {
        row.sort_by(|a, b| {
            a.absolute_x
                .total_cmp(&b.absolute_x)
                .then(a.absolute_y.round().total_cmp(&b.absolute_y.round()))
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        node.children.extend(row);
    }
}

// ─── Prune ────────────────────────────────────────────────────────────────

/// Drop virtual containers that ended up with no children, bottom-up, so a
/// virtual emptied by pruning its own virtual child goes too.
pub fn prune_empty_virtuals(node: &mut AnnotationNode, preserve: &[NodeId]) {
    for child in &mut node.children {
        prune_empty_virtuals(child, preserve);
    }
    node.children
        .retain(|c| !(c.is_virtual() && c.children.is_empty() && !preserve.contains(&c.id)));
}

// ─── Flatten ──────────────────────────────────────────────────────────────

/// One pre-order entry of the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatAnnotation {
    /// The annotation with its `children` stripped.
    #[serde(flatten)]
    pub annotation: AnnotationNode,
    pub parent_id: Option<NodeId>,
    pub depth: usize,
}

/// Flattened tree with an id index for O(1) lookup.
#[derive(Debug, Clone, Default)]
pub struct FlatAnnotations {
    entries: Vec<FlatAnnotation>,
    index: HashMap<NodeId, usize>,
}

impl FlatAnnotations {
    pub fn get(&self, id: NodeId) -> Option<&FlatAnnotation> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[FlatAnnotation] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatAnnotation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pre-order flattening of the whole tree.
pub fn flatten(root: &AnnotationNode) -> FlatAnnotations {
    let mut flat = FlatAnnotations::default();
    flatten_into(root, None, 0, &mut flat);
    log::trace!("flattened {} annotations", flat.len());
    flat
}

fn flatten_into(
    node: &AnnotationNode,
    parent_id: Option<NodeId>,
    depth: usize,
    flat: &mut FlatAnnotations,
) {
    flat.index.insert(node.id, flat.entries.len());
    flat.entries.push(FlatAnnotation {
        annotation: node.shallow_clone(),
        parent_id,
        depth,
    });
    for child in &node.children {
        flatten_into(child, Some(node.id), depth + 1, flat);
    }
}

/// Reassemble a tree from flattened entries by following parent ids.
///
/// # Errors
/// - no root entry, or more than one
/// - an entry whose parent never appears (orphan or cycle)
pub fn rebuild_tree(entries: &[FlatAnnotation]) -> Result<AnnotationNode, String> {
    let mut nodes: HashMap<NodeId, AnnotationNode> = HashMap::new();
    let mut children_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut root_id = None;

    for entry in entries {
        let id = entry.annotation.id;
        match entry.parent_id {
            None => {
                if root_id.replace(id).is_some() {
                    return Err(format!("Second root entry {id}"));
                }
            }
            Some(parent) => children_of.entry(parent).or_default().push(id),
        }
        if nodes.insert(id, entry.annotation.shallow_clone()).is_some() {
            return Err(format!("Duplicate entry {id}"));
        }
    }

    let root_id = root_id.ok_or_else(|| "No root entry".to_string())?;
    let root = assemble(root_id, &mut nodes, &mut children_of)?;
    if let Some(orphan) = nodes.keys().next() {
        return Err(format!("Entry {orphan} is not reachable from the root"));
    }
    Ok(root)
}

fn assemble(
    id: NodeId,
    nodes: &mut HashMap<NodeId, AnnotationNode>,
    children_of: &mut HashMap<NodeId, Vec<NodeId>>,
) -> Result<AnnotationNode, String> {
    let mut node = nodes
        .remove(&id)
        .ok_or_else(|| format!("Missing entry {id}"))?;
    for child_id in children_of.remove(&id).unwrap_or_default() {
        node.children.push(assemble(child_id, nodes, children_of)?);
    }
    Ok(node)
}
