//! Drag-reparenting: a pure validator and the commit that follows it.

use crate::engine::{AnnotationEngine, MutationOutcome, NoOpReason};
use crate::ordering::prune_empty_virtuals;
use fta_core::annotation::AnnotationNode;
use fta_core::geometry::Bounds;
use fta_core::id::NodeId;
use serde::{Deserialize, Serialize};

/// Where the source lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    Inside,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MoveValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MoveResult {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Check whether moving `source` to `position` of `target` is allowed.
/// Never mutates.
pub fn validate_move(
    root: &AnnotationNode,
    source: NodeId,
    target: NodeId,
    position: DropPosition,
) -> MoveValidation {
    if source == root.id {
        return MoveValidation::invalid("The root annotation cannot be moved");
    }
    if source == target {
        return MoveValidation::invalid("Cannot move an annotation onto itself");
    }
    let Some(target_node) = root.find(target) else {
        return MoveValidation::invalid(format!("Target {target} not found"));
    };
    let Some(source_parent) = root.parent_of(source) else {
        return MoveValidation::invalid(format!("Source {source} not found"));
    };
    if root.is_ancestor_of(source, target) {
        return MoveValidation::invalid("Cannot move an annotation into its own descendant");
    }

    if position == DropPosition::Inside {
        if !target_node.is_container {
            return MoveValidation::invalid(format!("{target} cannot contain children"));
        }
        return MoveValidation::ok();
    }

    let Some(target_parent) = root.parent_of(target) else {
        return MoveValidation::invalid("Cannot place an annotation beside the root");
    };

    // Escaping the current parent: only the edge children may leave, and
    // only in the direction of their edge.
    let siblings = &source_parent.children;
    if siblings.len() > 1 && root.is_ancestor_of(target_parent.id, source_parent.id) {
        let index = siblings.iter().position(|c| c.id == source).unwrap_or_default();
        let first = index == 0;
        let last = index + 1 == siblings.len();
        return match (first, last, position) {
            (true, _, DropPosition::Before) | (_, true, DropPosition::After) => MoveValidation::ok(),
            (true, _, _) => MoveValidation::invalid("The first child can only move out before its parent"),
            (_, true, _) => MoveValidation::invalid("The last child can only move out after its parent"),
            _ => MoveValidation::invalid("Only the first or last child can be moved out of its parent"),
        };
    }
    MoveValidation::ok()
}

impl AnnotationEngine {
    pub fn validate_move(&self, source: NodeId, target: NodeId, position: DropPosition) -> MoveValidation {
        validate_move(self.root(), source, target, position)
    }

    /// Reparent `source` next to or inside `target`.
    ///
    /// Container boxes along the old and new ancestor chains are refitted
    /// afterwards: virtual containers to exactly their children, real
    /// containers grown to cover their children. Real boxes never shrink.
    pub fn move_annotation(&mut self, source: NodeId, target: NodeId, position: DropPosition) -> MoveResult {
        let check = self.validate_move(source, target, position);
        if !check.valid {
            return MoveResult {
                success: false,
                error: check.reason,
            };
        }

        let mut tree = self.root().clone();
        let mut chain = ancestors(&tree, source);
        let Some(mut node) = tree.remove_descendant(source) else {
            return MoveResult::failed(format!("Source {source} vanished"));
        };
        node.touch();

        if position == DropPosition::Inside {
            let Some(parent) = tree.find_mut(target) else {
                return MoveResult::failed(format!("Target {target} vanished"));
            };
            parent.children.push(node);
        } else {
            let Some(parent) = tree.parent_of_mut(target) else {
                return MoveResult::failed(format!("Target {target} has no parent"));
            };
            let Some(index) = parent.children.iter().position(|c| c.id == target) else {
                return MoveResult::failed(format!("Target {target} vanished"));
            };
            let at = if position == DropPosition::After { index + 1 } else { index };
            parent.children.insert(at, node);
        }

        for id in ancestors(&tree, source) {
            if !chain.contains(&id) {
                chain.push(id);
            }
        }
        prune_empty_virtuals(&mut tree, &[]);
        refit_containers(&mut tree, &chain);

        match self.commit(tree, "move") {
            MutationOutcome::Applied => MoveResult {
                success: true,
                error: None,
            },
            MutationOutcome::NoOp(NoOpReason::InvariantViolation(err)) => MoveResult::failed(err),
            other => MoveResult::failed(format!("{other:?}")),
        }
    }
}

/// Recompute boxes for `ids`, deepest first. The root keeps its box.
fn refit_containers(tree: &mut AnnotationNode, ids: &[NodeId]) {
    let mut by_depth: Vec<(usize, NodeId)> = ids
        .iter()
        .filter(|&&id| id != tree.id)
        .filter_map(|&id| tree.path_to(id).map(|p| (p.len(), id)))
        .collect();
    by_depth.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, id) in by_depth {
        let Some(node) = tree.find_mut(id) else {
            continue;
        };
        if !node.is_container {
            continue;
        }
        let boxes: Vec<Bounds> = node.children.iter().map(AnnotationNode::bounds).collect();
        let Some(fitted) = Bounds::union_all(&boxes) else {
            continue;
        };
        let bounds = if node.is_virtual() {
            fitted
        } else {
            node.bounds().union(&fitted)
        };
        if bounds != node.bounds() {
            log::trace!("refit {id}: {:?} -> {bounds:?}", node.bounds());
            node.set_bounds(bounds);
        }
    }
}

/// Strict ancestors of `id`, root first.
fn ancestors(tree: &AnnotationNode, id: NodeId) -> Vec<NodeId> {
    let mut path = tree.path_to(id).unwrap_or_default();
    path.pop();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionItem;
    use fta_core::annotation::AnnotationExtra;
    use fta_core::config::EngineConfig;
    use fta_core::dsl::{DslTree, RawDslNode};
    use pretty_assertions::assert_eq;

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn engine(raw: RawDslNode, annotate: &[(&str, &str)]) -> AnnotationEngine {
        let mut e = AnnotationEngine::new(DslTree::from_raw(&raw).unwrap(), EngineConfig::default());
        for (id, component) in annotate {
            assert!(e.create_annotation(n(id), component, AnnotationExtra::default()).is_applied());
        }
        e
    }

    fn grouped() -> AnnotationEngine {
        let raw = RawDslNode::new("m_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("m_group", "frame", 10.0, 10.0, 300.0, 200.0).with_children(vec![
                RawDslNode::new("m_a", "text", 10.0, 10.0, 50.0, 20.0),
                RawDslNode::new("m_b", "text", 10.0, 100.0, 50.0, 20.0),
            ]),
            RawDslNode::new("m_other", "text", 10.0, 400.0, 100.0, 50.0),
        ]);
        engine(
            raw,
            &[("m_group", "Container"), ("m_a", "Text"), ("m_b", "Text"), ("m_other", "Text")],
        )
    }

    fn child_ids(node: &AnnotationNode) -> Vec<&str> {
        node.children.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn rejects_root_self_and_cycles() {
        let e = grouped();
        assert!(!e.validate_move(NodeId::root(), n("m_group"), DropPosition::Inside).valid);
        assert!(!e.validate_move(n("m_a"), n("m_a"), DropPosition::Before).valid);
        assert!(!e.validate_move(n("m_group"), n("m_a"), DropPosition::Inside).valid);
        assert!(!e.validate_move(n("m_group"), n("m_a"), DropPosition::After).valid);
        assert!(!e.validate_move(n("m_other"), NodeId::root(), DropPosition::Before).valid);
        assert!(!e.validate_move(n("m_missing"), n("m_a"), DropPosition::Before).valid);
    }

    #[test]
    fn inside_requires_container() {
        let e = grouped();
        let check = e.validate_move(n("m_b"), n("m_other"), DropPosition::Inside);
        assert!(!check.valid);
        assert!(check.reason.unwrap().contains("cannot contain"));
        assert!(e.validate_move(n("m_other"), n("m_group"), DropPosition::Inside).valid);
    }

    #[test]
    fn escape_move_follows_edge_direction() {
        let e = grouped();
        assert!(e.validate_move(n("m_a"), n("m_group"), DropPosition::Before).valid);
        assert!(!e.validate_move(n("m_a"), n("m_group"), DropPosition::After).valid);
        assert!(e.validate_move(n("m_b"), n("m_group"), DropPosition::After).valid);
        assert!(!e.validate_move(n("m_b"), n("m_group"), DropPosition::Before).valid);
        // sibling reorder is not an escape
        assert!(e.validate_move(n("m_a"), n("m_b"), DropPosition::After).valid);
    }

    #[test]
    fn middle_child_cannot_escape() {
        let raw = RawDslNode::new("mm_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("mm_group", "frame", 0.0, 0.0, 300.0, 300.0).with_children(vec![
                RawDslNode::new("mm_1", "text", 0.0, 0.0, 10.0, 10.0),
                RawDslNode::new("mm_2", "text", 0.0, 100.0, 10.0, 10.0),
                RawDslNode::new("mm_3", "text", 0.0, 200.0, 10.0, 10.0),
            ]),
        ]);
        let e = engine(
            raw,
            &[("mm_group", "List"), ("mm_1", "Text"), ("mm_2", "Text"), ("mm_3", "Text")],
        );
        assert!(!e.validate_move(n("mm_2"), n("mm_group"), DropPosition::Before).valid);
        assert!(!e.validate_move(n("mm_2"), n("mm_group"), DropPosition::After).valid);
    }

    #[test]
    fn move_out_and_back_in() {
        let mut e = grouped();
        let result = e.move_annotation(n("m_a"), n("m_group"), DropPosition::Before);
        assert_eq!(result, MoveResult { success: true, error: None });
        assert_eq!(e.root().parent_of(n("m_a")).map(|p| p.id), Some(NodeId::root()));
        assert_eq!(child_ids(e.find_by_id(n("m_group")).unwrap()), vec!["m_b"]);

        let result = e.move_annotation(n("m_other"), n("m_group"), DropPosition::Inside);
        assert!(result.success);
        assert_eq!(child_ids(e.find_by_id(n("m_group")).unwrap()), vec!["m_b", "m_other"]);
    }

    #[test]
    fn failed_move_leaves_tree_alone() {
        let mut e = grouped();
        let before = e.root().clone();
        let rev = e.revision();
        let result = e.move_annotation(n("m_a"), n("m_group"), DropPosition::After);
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(e.root(), &before);
        assert_eq!(e.revision(), rev);
    }

    #[test]
    fn real_container_grows_and_never_shrinks() {
        let raw = RawDslNode::new("g_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("g_card", "frame", 10.0, 10.0, 100.0, 100.0),
            RawDslNode::new("g_far", "text", 300.0, 300.0, 50.0, 50.0),
        ]);
        let mut e = engine(raw, &[("g_card", "Card"), ("g_far", "Text")]);

        assert!(e.move_annotation(n("g_far"), n("g_card"), DropPosition::Inside).success);
        let card = e.find_by_id(n("g_card")).unwrap();
        assert_eq!(card.bounds(), Bounds::new(10.0, 10.0, 340.0, 340.0));

        assert!(e.move_annotation(n("g_far"), n("g_card"), DropPosition::After).success);
        assert_eq!(e.root().parent_of(n("g_far")).map(|p| p.id), Some(NodeId::root()));
        let card = e.find_by_id(n("g_card")).unwrap();
        assert_eq!(card.bounds(), Bounds::new(10.0, 10.0, 340.0, 340.0));
    }

    #[test]
    fn virtual_container_refits_then_prunes() {
        let raw = RawDslNode::new("v_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("v_x", "text", 10.0, 10.0, 50.0, 50.0),
            RawDslNode::new("v_y", "text", 200.0, 10.0, 50.0, 50.0),
            RawDslNode::new("v_z", "text", 10.0, 300.0, 50.0, 50.0),
        ]);
        let mut e = engine(raw, &[("v_x", "Text"), ("v_y", "Text"), ("v_z", "Text")]);
        e.select(SelectionItem::annotation(n("v_x")));
        e.toggle_select(SelectionItem::annotation(n("v_y")), Default::default());
        assert!(e.combine_selected("List"));
        let group = e.root().children[0].id;
        assert!(group.is_virtual());

        assert!(e.move_annotation(n("v_y"), n("v_z"), DropPosition::After).success);
        let bounds = e.find_by_id(group).unwrap().bounds();
        assert_eq!(bounds, Bounds::new(10.0, 10.0, 50.0, 50.0));

        assert!(e.move_annotation(n("v_x"), n("v_z"), DropPosition::After).success);
        assert!(e.find_by_id(group).is_none());
        assert!(e.root().iter().all(|a| !a.is_virtual()));
    }
}
