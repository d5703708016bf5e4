//! Annotation tree data model.
//!
//! An annotation maps one DSL node (or none, for virtual containers) to a
//! component type. Annotations form a strict ownership tree: a node is
//! referenced only from its parent's `children` list, there are no
//! back-pointers, and the single root is never removed or reparented.

use crate::geometry::Bounds;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Free-form JSON object used for `props` and `layout` overrides.
pub type FreeMap = Map<String, Value>;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Optional descriptive fields supplied when creating an annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationExtra {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub props: Option<FreeMap>,
    pub layout: Option<FreeMap>,
}

/// A single annotation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationNode {
    pub id: NodeId,
    /// Backing DSL node; `None` for virtual containers.
    #[serde(default)]
    pub dsl_node_id: Option<NodeId>,
    #[serde(default)]
    pub fta_component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<FreeMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<FreeMap>,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub is_container: bool,
    #[serde(default)]
    pub children: Vec<AnnotationNode>,

    // Cached geometry snapshot.
    #[serde(default)]
    pub absolute_x: f32,
    #[serde(default)]
    pub absolute_y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,

    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl AnnotationNode {
    /// Build a non-root annotation with fresh timestamps and no children.
    pub fn new(
        id: NodeId,
        dsl_node_id: Option<NodeId>,
        fta_component: &str,
        is_container: bool,
        bounds: Bounds,
    ) -> Self {
        let now = now_millis();
        Self {
            id,
            dsl_node_id,
            fta_component: fta_component.to_string(),
            name: None,
            comment: None,
            props: None,
            layout: None,
            is_root: false,
            is_container,
            children: Vec::new(),
            absolute_x: bounds.x,
            absolute_y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            created_at: now,
            updated_at: now,
        }
    }

    /// The root annotation, backed by the DSL root.
    pub fn new_root(dsl_root_id: NodeId, bounds: Bounds) -> Self {
        let mut root = Self::new(NodeId::root(), Some(dsl_root_id), "Root", true, bounds);
        root.is_root = true;
        root
    }

    /// Apply the optional descriptive fields.
    pub fn with_extra(mut self, extra: AnnotationExtra) -> Self {
        self.name = extra.name;
        self.comment = extra.comment;
        self.props = extra.props;
        self.layout = extra.layout;
        self
    }

    /// Virtual containers have no backing DSL node.
    pub fn is_virtual(&self) -> bool {
        !self.is_root && self.dsl_node_id.is_none()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.absolute_x, self.absolute_y, self.width, self.height)
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.absolute_x = bounds.x;
        self.absolute_y = bounds.y;
        self.width = bounds.width;
        self.height = bounds.height;
    }

    /// Copy every field except `children`.
    pub fn shallow_clone(&self) -> AnnotationNode {
        AnnotationNode {
            id: self.id,
            dsl_node_id: self.dsl_node_id,
            fta_component: self.fta_component.clone(),
            name: self.name.clone(),
            comment: self.comment.clone(),
            props: self.props.clone(),
            layout: self.layout.clone(),
            is_root: self.is_root,
            is_container: self.is_container,
            children: Vec::new(),
            absolute_x: self.absolute_x,
            absolute_y: self.absolute_y,
            width: self.width,
            height: self.height,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Bump `updated_at`, never moving it before `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.created_at).max(self.updated_at);
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Pre-order traversal starting at (and including) `self`.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first search by annotation id.
    pub fn find(&self, id: NodeId) -> Option<&AnnotationNode> {
        self.iter().find(|n| n.id == id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut AnnotationNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Depth-first search by backing DSL id.
    pub fn find_by_dsl_node_id(&self, dsl_id: NodeId) -> Option<&AnnotationNode> {
        self.iter().find(|n| n.dsl_node_id == Some(dsl_id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// The node whose `children` list holds `id`.
    pub fn parent_of(&self, id: NodeId) -> Option<&AnnotationNode> {
        self.iter()
            .find(|n| n.children.iter().any(|c| c.id == id))
    }

    pub fn parent_of_mut(&mut self, id: NodeId) -> Option<&mut AnnotationNode> {
        if self.children.iter().any(|c| c.id == id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.parent_of_mut(id))
    }

    /// Ids from `self` down to `id`, both inclusive.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeId>> {
        if self.id == id {
            return Some(vec![self.id]);
        }
        self.children.iter().find_map(|c| {
            c.path_to(id).map(|mut tail| {
                tail.insert(0, self.id);
                tail
            })
        })
    }

    /// Check if `ancestor_id` is a strict ancestor of `descendant_id`.
    pub fn is_ancestor_of(&self, ancestor_id: NodeId, descendant_id: NodeId) -> bool {
        if ancestor_id == descendant_id {
            return false;
        }
        self.find(ancestor_id)
            .is_some_and(|a| a.contains(descendant_id))
    }

    /// Detach and return the subtree rooted at `id`. Never removes `self`.
    pub fn remove_descendant(&mut self, id: NodeId) -> Option<AnnotationNode> {
        let parent = self.parent_of_mut(id)?;
        let pos = parent.children.iter().position(|c| c.id == id)?;
        Some(parent.children.remove(pos))
    }
}

/// Stack-based pre-order iterator over an annotation subtree.
pub struct PreOrder<'a> {
    stack: Vec<&'a AnnotationNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a AnnotationNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Check the structural invariants of a complete annotation tree:
/// a single root, unique ids, unique DSL bindings, childless leaves,
/// and no empty virtual containers.
pub fn validate_tree(root: &AnnotationNode) -> Result<(), String> {
    if !root.is_root {
        return Err(format!("{} is not marked as root", root.id));
    }
    let mut ids = HashSet::new();
    let mut dsl_ids = HashSet::new();
    for node in root.iter() {
        if !ids.insert(node.id) {
            return Err(format!("Annotation {} appears more than once", node.id));
        }
        if node.is_root && node.id != root.id {
            return Err(format!("Nested root annotation {}", node.id));
        }
        if let Some(dsl_id) = node.dsl_node_id
            && !dsl_ids.insert(dsl_id)
        {
            return Err(format!("DSL node {dsl_id} is annotated more than once"));
        }
        if !node.is_container && !node.children.is_empty() {
            return Err(format!("Non-container {} has children", node.id));
        }
        if node.is_virtual() && node.children.is_empty() {
            return Err(format!("Virtual container {} is empty", node.id));
        }
    }
    Ok(())
}
