//! Create / delete / update primitives and the best-container search.

use crate::detach::detach_descendants;
use crate::engine::{AnnotationEngine, MutationOutcome, NoOpReason};
use crate::pending::{ConfirmPrompt, PendingAction};
use fta_core::annotation::{AnnotationExtra, AnnotationNode, FreeMap};
use fta_core::geometry::Bounds;
use fta_core::id::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Field updates for `update_annotation`. `None` leaves a field as is.
/// Geometry is absent: updates never touch the cached box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationUpdate {
    pub fta_component: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub props: Option<FreeMap>,
    pub layout: Option<FreeMap>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteOptions {
    /// Drop the whole subtree instead of promoting children.
    pub delete_children: bool,
}

/// Smallest-area container whose box fully encloses `target`; the root when
/// none qualifies. On equal area the outer (earlier in pre-order) wins.
pub fn find_best_parent(root: &AnnotationNode, target: &Bounds) -> NodeId {
    find_best_parent_excluding(root, target, &[])
}

/// `find_best_parent` that skips the subtrees rooted at `excluded`.
pub fn find_best_parent_excluding(
    root: &AnnotationNode,
    target: &Bounds,
    excluded: &[NodeId],
) -> NodeId {
    let mut best: Option<(f32, NodeId)> = None;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if excluded.contains(&node.id) {
            continue;
        }
        if node.is_container && node.bounds().encloses(target) {
            let area = node.bounds().area();
            if best.is_none_or(|(best_area, _)| area < best_area) {
                best = Some((area, node.id));
            }
        }
        stack.extend(node.children.iter().rev());
    }
    best.map(|(_, id)| id).unwrap_or(root.id)
}

impl AnnotationEngine {
    // ─── Create ──────────────────────────────────────────────────────────

    /// Annotate `dsl_id` as `component`.
    ///
    /// Existing annotations on DSL descendants are re-homed under the new
    /// node when it is a container. When it is not, they would be
    /// discarded, so the call returns `NeedsConfirmation` instead.
    pub fn create_annotation(
        &mut self,
        dsl_id: NodeId,
        component: &str,
        extra: AnnotationExtra,
    ) -> MutationOutcome {
        self.apply_create(dsl_id, component, extra, false)
    }

    /// `create_annotation` resolving any confirmation through `prompt`.
    pub fn create_annotation_confirmed(
        &mut self,
        dsl_id: NodeId,
        component: &str,
        extra: AnnotationExtra,
        prompt: &mut dyn ConfirmPrompt,
    ) -> MutationOutcome {
        let outcome = self.create_annotation(dsl_id, component, extra);
        self.resolve_with(outcome, prompt)
    }

    pub(crate) fn apply_create(
        &mut self,
        dsl_id: NodeId,
        component: &str,
        extra: AnnotationExtra,
        confirmed: bool,
    ) -> MutationOutcome {
        if self.dsl.get_by_id(dsl_id).is_none() {
            return MutationOutcome::NoOp(NoOpReason::DslNodeNotFound);
        }
        if self.find_by_dsl_node_id(dsl_id).is_some() {
            return MutationOutcome::NoOp(NoOpReason::AlreadyAnnotated);
        }
        if dsl_id == NodeId::root() {
            log::warn!("DSL node {dsl_id} shares the root annotation id");
            return MutationOutcome::NoOp(NoOpReason::ReservedId);
        }

        let is_container = self.config.registry.is_container(component);
        let shadowed = self.shadowed_descendants(dsl_id);

        if !shadowed.is_empty() && !is_container && !confirmed {
            let reason = format!(
                "\"{component}\" cannot contain children; {} existing annotation(s) inside {} will be removed",
                shadowed.len(),
                dsl_id
            );
            return self.request_confirmation(
                PendingAction::Create {
                    dsl_id,
                    component: component.to_string(),
                    extra,
                },
                reason,
            );
        }

        let detached = detach_descendants(self.root(), &shadowed, &[]);
        let mut tree = detached.node;

        let bounds = self.dsl_bounds(dsl_id);
        let mut node =
            AnnotationNode::new(dsl_id, Some(dsl_id), component, is_container, bounds).with_extra(extra);
        if is_container {
            node.children = detached.detached;
        } else if !detached.detached.is_empty() {
            log::debug!(
                "discarding {} annotation(s) shadowed by leaf {dsl_id}",
                detached.detached.len()
            );
        }

        let parent_id = find_best_parent(&tree, &bounds);
        match tree.find_mut(parent_id) {
            Some(parent) => parent.children.push(node),
            None => {
                log::warn!("create {dsl_id}: best parent {parent_id} vanished");
                return MutationOutcome::NoOp(NoOpReason::AnnotationNotFound);
            }
        }
        self.commit(tree, "create")
    }

    /// Existing annotations bound to DSL descendants of `dsl_id`.
    fn shadowed_descendants(&self, dsl_id: NodeId) -> SmallVec<[NodeId; 8]> {
        self.root()
            .iter()
            .filter(|n| !n.is_root)
            .filter(|n| {
                n.dsl_node_id
                    .is_some_and(|d| self.dsl.is_ancestor_of(dsl_id, d))
            })
            .map(|n| n.id)
            .collect()
    }

    // ─── Delete ──────────────────────────────────────────────────────────

    /// Remove an annotation. By default its children are promoted into its
    /// slot, keeping their relative order.
    pub fn delete_annotation(&mut self, id: NodeId, options: DeleteOptions) -> MutationOutcome {
        if id == self.root().id {
            return MutationOutcome::NoOp(NoOpReason::RootProtected);
        }
        let mut tree = self.root().clone();
        let Some(parent) = tree.parent_of_mut(id) else {
            return MutationOutcome::NoOp(NoOpReason::AnnotationNotFound);
        };
        let Some(pos) = parent.children.iter().position(|c| c.id == id) else {
            return MutationOutcome::NoOp(NoOpReason::AnnotationNotFound);
        };
        let removed = parent.children.remove(pos);
        if !options.delete_children {
            parent.children.splice(pos..pos, removed.children);
        }
        self.commit(tree, "delete")
    }

    /// Dissolve a container, promoting its children.
    pub fn ungroup(&mut self, id: NodeId) -> MutationOutcome {
        match self.find_by_id(id) {
            None => MutationOutcome::NoOp(NoOpReason::AnnotationNotFound),
            Some(node) if !node.is_container => MutationOutcome::NoOp(NoOpReason::NotAContainer),
            Some(_) => self.delete_annotation(id, DeleteOptions::default()),
        }
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Merge `updates` into an annotation.
    ///
    /// Switching a node with children to a non-container component returns
    /// `NeedsConfirmation`; committing it clears the children.
    pub fn update_annotation(&mut self, id: NodeId, updates: AnnotationUpdate) -> MutationOutcome {
        self.apply_update(id, updates, false)
    }

    pub fn update_annotation_confirmed(
        &mut self,
        id: NodeId,
        updates: AnnotationUpdate,
        prompt: &mut dyn ConfirmPrompt,
    ) -> MutationOutcome {
        let outcome = self.update_annotation(id, updates);
        self.resolve_with(outcome, prompt)
    }

    pub(crate) fn apply_update(
        &mut self,
        id: NodeId,
        updates: AnnotationUpdate,
        confirmed: bool,
    ) -> MutationOutcome {
        let Some(current) = self.find_by_id(id) else {
            return MutationOutcome::NoOp(NoOpReason::AnnotationNotFound);
        };

        let is_container = match &updates.fta_component {
            Some(component) => self.config.registry.is_container(component),
            None => current.is_container,
        };
        if current.is_root && !is_container {
            return MutationOutcome::NoOp(NoOpReason::RootProtected);
        }
        let child_count = current.children.len();
        if !is_container && child_count > 0 && !confirmed {
            let reason = format!(
                "\"{}\" cannot contain children; {child_count} child annotation(s) of {id} will be removed",
                updates.fta_component.as_deref().unwrap_or(&current.fta_component),
            );
            return self.request_confirmation(PendingAction::Update { id, updates }, reason);
        }

        let mut tree = self.root().clone();
        let Some(node) = tree.find_mut(id) else {
            return MutationOutcome::NoOp(NoOpReason::AnnotationNotFound);
        };
        if let Some(component) = updates.fta_component {
            node.fta_component = component;
        }
        if let Some(name) = updates.name {
            node.name = Some(name);
        }
        if let Some(comment) = updates.comment {
            node.comment = Some(comment);
        }
        if let Some(props) = updates.props {
            node.props = Some(props);
        }
        if let Some(layout) = updates.layout {
            node.layout = Some(layout);
        }
        node.is_container = is_container;
        if !is_container {
            node.children.clear();
        }
        node.touch();
        self.commit(tree, "update")
    }
}
