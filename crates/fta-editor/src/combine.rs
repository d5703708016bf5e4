//! Grouping the current selection under one new container annotation.

use crate::detach::detach_descendants;
use crate::engine::AnnotationEngine;
use crate::selection::SelectionKind;
use crate::store::find_best_parent_excluding;
use fta_core::annotation::{AnnotationExtra, AnnotationNode};
use fta_core::geometry::Bounds;
use fta_core::id::NodeId;
use smallvec::SmallVec;

impl AnnotationEngine {
    /// Group the selection under a new `component` annotation.
    pub fn combine_selected(&mut self, component: &str) -> bool {
        self.combine_selected_with(component, AnnotationExtra::default())
    }

    /// Group the selection under a new `component` annotation.
    ///
    /// The new node is backed by the smallest free DSL node enclosing the
    /// selection, or is virtual when there is none. Returns `false` and
    /// leaves everything untouched when nothing qualifies.
    pub fn combine_selected_with(&mut self, component: &str, extra: AnnotationExtra) -> bool {
        if !self.config.registry.is_container(component) {
            log::debug!("combine refused: {component} is not a container component");
            return false;
        }
        let boxes: Vec<Bounds> = self
            .selection
            .items()
            .iter()
            .filter_map(|item| self.item_bounds(item))
            .collect();
        let Some(union) = Bounds::union_all(&boxes) else {
            log::debug!("combine refused: nothing selected");
            return false;
        };

        let mut picks: SmallVec<[NodeId; 8]> = SmallVec::new();
        for child in &self.root().children {
            collect_picks(child, &union, &mut picks);
        }
        if picks.is_empty() {
            log::debug!("combine refused: no annotation inside {union:?}");
            return false;
        }

        let (dsl_node_id, id, bounds) = match self.containing_dsl_node(&union) {
            Some(dsl_id) => (Some(dsl_id), dsl_id, self.dsl_bounds(dsl_id)),
            None => (None, NodeId::new_virtual(), union),
        };

        let parent_id = find_best_parent_excluding(self.root(), &bounds, &picks);
        let detached = detach_descendants(self.root(), &picks, &[parent_id]);
        let mut tree = detached.node;

        let mut group = AnnotationNode::new(id, dsl_node_id, component, true, bounds).with_extra(extra);
        for pick in detached.detached {
            if pick.is_virtual() {
                group.children.extend(pick.children);
            } else {
                group.children.push(pick);
            }
        }

        let Some(parent) = tree.find_mut(parent_id) else {
            log::warn!("combine aborted: parent {parent_id} vanished during detach");
            return false;
        };
        parent.children.push(group);

        if self.commit(tree, "combine").is_applied() {
            self.selection.clear();
            true
        } else {
            false
        }
    }

    /// Smallest DSL node (excluding the DSL root and the reserved root id)
    /// that encloses `target` and is neither selected nor annotated. On
    /// equal area the outer wins.
    fn containing_dsl_node(&self, target: &Bounds) -> Option<NodeId> {
        let selected = |id: NodeId| {
            self.selection
                .items()
                .iter()
                .any(|s| s.kind == SelectionKind::Dsl && s.id == id)
        };
        let dsl_root = self.dsl.root_id();
        let reserved = NodeId::root();
        let mut best: Option<(f32, NodeId)> = None;
        for id in self.dsl.ids() {
            if id == dsl_root
                || id == reserved
                || selected(id)
                || self.find_by_dsl_node_id(id).is_some()
            {
                continue;
            }
            let bounds = self.dsl_bounds(id);
            if !bounds.encloses(target) {
                continue;
            }
            if best.is_none_or(|(area, _)| bounds.area() < area) {
                best = Some((bounds.area(), id));
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Top-most annotations fully inside `area`; an enclosed node's subtree
/// travels with it and is not searched further.
fn collect_picks(node: &AnnotationNode, area: &Bounds, picks: &mut SmallVec<[NodeId; 8]>) {
    if area.encloses(&node.bounds()) {
        picks.push(node.id);
        return;
    }
    for child in &node.children {
        collect_picks(child, area, picks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionItem;
    use fta_core::config::EngineConfig;
    use fta_core::dsl::{DslTree, RawDslNode};
    use pretty_assertions::assert_eq;

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn engine() -> AnnotationEngine {
        let raw = RawDslNode::new("c_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("c_card", "frame", 10.0, 10.0, 300.0, 100.0).with_children(vec![
                RawDslNode::new("c_title", "text", 10.0, 10.0, 100.0, 20.0),
                RawDslNode::new("c_body", "text", 10.0, 40.0, 100.0, 20.0),
            ]),
            RawDslNode::new("c_left", "frame", 10.0, 300.0, 100.0, 50.0),
            RawDslNode::new("c_right", "frame", 400.0, 300.0, 100.0, 50.0),
        ]);
        AnnotationEngine::new(DslTree::from_raw(&raw).unwrap(), EngineConfig::default())
    }

    fn annotate(e: &mut AnnotationEngine, id: &str, component: &str) {
        assert!(e.create_annotation(n(id), component, AnnotationExtra::default()).is_applied());
    }

    #[test]
    fn combine_uses_enclosing_dsl_node() {
        let mut e = engine();
        annotate(&mut e, "c_title", "Text");
        annotate(&mut e, "c_body", "Text");
        e.select(SelectionItem::annotation(n("c_title")));
        e.toggle_select(SelectionItem::annotation(n("c_body")), Default::default());

        assert!(e.combine_selected("Card"));
        let card = e.find_by_id(n("c_card")).unwrap();
        assert_eq!(card.dsl_node_id, Some(n("c_card")));
        assert_eq!(card.bounds(), Bounds::new(10.0, 10.0, 300.0, 100.0));
        let kids: Vec<&str> = card.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(kids, vec!["c_title", "c_body"]);
        assert!(e.selection.is_empty());
    }

    #[test]
    fn combine_without_enclosing_node_makes_virtual() {
        let mut e = engine();
        annotate(&mut e, "c_left", "Container");
        annotate(&mut e, "c_right", "Container");
        e.select(SelectionItem::annotation(n("c_left")));
        e.toggle_select(SelectionItem::annotation(n("c_right")), Default::default());

        assert!(e.combine_selected("List"));
        assert_eq!(e.root().children.len(), 1);
        let group = &e.root().children[0];
        assert!(group.is_virtual());
        assert!(group.id.is_virtual());
        assert_eq!(group.bounds(), Bounds::new(10.0, 300.0, 490.0, 50.0));
        assert_eq!(group.children.len(), 2);
    }

    #[test]
    fn virtual_pick_is_unwrapped() {
        let mut e = engine();
        annotate(&mut e, "c_left", "Container");
        annotate(&mut e, "c_right", "Container");
        e.select(SelectionItem::annotation(n("c_left")));
        e.toggle_select(SelectionItem::annotation(n("c_right")), Default::default());
        assert!(e.combine_selected("List"));
        let first = e.root().children[0].id;

        e.select(SelectionItem::annotation(first));
        assert!(e.combine_selected("Section"));
        let group = &e.root().children[0];
        assert_ne!(group.id, first);
        assert!(!e.root().contains(first));
        let kids: Vec<&str> = group.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(kids, vec!["c_left", "c_right"]);
    }

    #[test]
    fn combine_refuses_without_picks_or_container() {
        let mut e = engine();
        annotate(&mut e, "c_title", "Text");
        let rev = e.revision();

        assert!(!e.combine_selected("Card"));
        e.select(SelectionItem::annotation(n("c_title")));
        assert!(!e.combine_selected("Button"));
        e.select(SelectionItem::dsl(n("c_right")));
        assert!(!e.combine_selected("Card"));

        assert_eq!(e.revision(), rev);
        assert_eq!(e.selection.len(), 1);
    }

    #[test]
    fn dsl_node_named_root_never_backs_a_group() {
        let raw = RawDslNode::new("q_page", "frame", 0.0, 0.0, 600.0, 600.0).with_children(vec![
            RawDslNode::new("root", "frame", 10.0, 10.0, 300.0, 100.0).with_children(vec![
                RawDslNode::new("q_a", "text", 10.0, 10.0, 100.0, 20.0),
                RawDslNode::new("q_b", "text", 10.0, 40.0, 100.0, 20.0),
            ]),
        ]);
        let mut e = AnnotationEngine::new(DslTree::from_raw(&raw).unwrap(), EngineConfig::default());
        annotate(&mut e, "q_a", "Text");
        annotate(&mut e, "q_b", "Text");
        e.select(SelectionItem::annotation(n("q_a")));
        e.toggle_select(SelectionItem::annotation(n("q_b")), Default::default());

        assert!(e.combine_selected("Container"));
        let group = &e.root().children[0];
        assert!(group.is_virtual());
        assert_eq!(group.bounds(), Bounds::new(20.0, 20.0, 100.0, 50.0));
    }
}
