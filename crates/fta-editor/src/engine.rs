//! The annotation engine: owner of the single annotation tree.
//!
//! Every mutator works on a copy of the tree and publishes it through
//! `commit`, which prunes empty virtual containers, re-sorts, re-flattens
//! and bumps the revision. A mutation that fails part-way simply never
//! reaches `commit`, so readers only ever see complete trees.

use crate::ordering::{FlatAnnotations, flatten, prune_empty_virtuals, sort_children};
use crate::pending::PendingOperation;
use crate::selection::SelectionSet;
use fta_core::annotation::{AnnotationNode, validate_tree};
use fta_core::config::EngineConfig;
use fta_core::dsl::DslTree;
use fta_core::geometry::{Bounds, Position, absolute_bounds, absolute_position};
use fta_core::id::NodeId;
use fta_core::snapshot::AnnotationSnapshot;
use serde::Serialize;

/// Why a mutation left the tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason", content = "detail")]
pub enum NoOpReason {
    AlreadyAnnotated,
    DslNodeNotFound,
    AnnotationNotFound,
    RootProtected,
    /// The DSL node's id collides with the reserved root annotation id.
    ReservedId,
    /// The host refused a destructive confirmation.
    Declined,
    /// A confirmation token no longer matches the current tree.
    StaleConfirmation,
    NothingSelected,
    NothingToCombine,
    NotAContainer,
    /// The rewritten tree broke an invariant; the previous tree was kept.
    InvariantViolation(String),
}

/// Result of a mutating call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum MutationOutcome {
    Applied,
    NoOp(NoOpReason),
    /// Nothing changed yet; commit or cancel the pending operation.
    NeedsConfirmation(PendingOperation),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// The engine holds the DSL document and the authoritative annotation tree.
pub struct AnnotationEngine {
    /// The read-only DSL document.
    pub dsl: DslTree,

    /// Engine tunables.
    pub config: EngineConfig,

    /// Current multi-selection (not persisted).
    pub selection: SelectionSet,

    root: AnnotationNode,
    flat: FlatAnnotations,
    revision: u64,
    pub(crate) pending: Option<PendingOperation>,
    pub(crate) next_token: u64,
}

impl AnnotationEngine {
    /// Create an engine over `dsl` with an empty annotation tree.
    pub fn new(dsl: DslTree, config: EngineConfig) -> Self {
        let root = root_for(&dsl);
        let flat = flatten(&root);
        Self {
            dsl,
            config,
            selection: SelectionSet::default(),
            root,
            flat,
            revision: 0,
            pending: None,
            next_token: 1,
        }
    }

    /// Replace the DSL document and start a fresh annotation tree.
    /// Selection and any pending confirmation are discarded.
    pub fn initialize(&mut self, dsl: DslTree) {
        self.dsl = dsl;
        self.root = root_for(&self.dsl);
        self.flat = flatten(&self.root);
        self.selection.clear();
        self.pending = None;
        self.revision += 1;
        log::debug!("initialized annotation tree over {} DSL nodes", self.dsl.len());
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn root(&self) -> &AnnotationNode {
        &self.root
    }

    /// Flattened view, rebuilt after every mutation.
    pub fn flattened(&self) -> &FlatAnnotations {
        &self.flat
    }

    /// Incremented on every published change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<&AnnotationNode> {
        self.root.find(id)
    }

    pub fn find_by_dsl_node_id(&self, dsl_id: NodeId) -> Option<&AnnotationNode> {
        self.root.find_by_dsl_node_id(dsl_id)
    }

    /// Absolute position of a DSL node; origin when unknown.
    pub fn absolute_position(&self, dsl_id: NodeId) -> Position {
        absolute_position(&self.dsl, dsl_id)
    }

    pub fn dsl_bounds(&self, dsl_id: NodeId) -> Bounds {
        absolute_bounds(&self.dsl, dsl_id)
    }

    /// Snapshot of the current tree for persistence.
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot::capture(&self.root)
    }

    // ─── Whole-tree replacement ──────────────────────────────────────────

    /// Replace the tree verbatim (reload, undo/redo). The caller supplies a
    /// complete tree; invariant problems are logged, not rejected.
    pub fn load_annotations(&mut self, root: AnnotationNode) {
        if let Err(err) = validate_tree(&root) {
            log::warn!("loaded annotation tree violates an invariant: {err}");
        }
        self.root = root;
        self.flat = flatten(&self.root);
        self.pending = None;
        self.revision += 1;
    }

    pub fn load_snapshot(&mut self, snapshot: AnnotationSnapshot) {
        log::debug!(
            "loading snapshot v{} saved at {}",
            snapshot.version,
            snapshot.saved_at
        );
        self.load_annotations(snapshot.root_annotation);
    }

    // ─── Publishing ──────────────────────────────────────────────────────

    /// Prune, sort, validate and publish `new_root`. On an invariant
    /// violation the previous tree stays in place.
    pub(crate) fn commit(&mut self, mut new_root: AnnotationNode, what: &str) -> MutationOutcome {
        prune_empty_virtuals(&mut new_root, &[]);
        sort_children(&mut new_root, self.config.row_tolerance);
        if let Err(err) = validate_tree(&new_root) {
            log::warn!("{what} aborted: {err}");
            return MutationOutcome::NoOp(NoOpReason::InvariantViolation(err));
        }
        self.root = new_root;
        self.flat = flatten(&self.root);
        self.pending = None;
        self.revision += 1;
        log::debug!("{what} committed (revision {})", self.revision);
        MutationOutcome::Applied
    }
}

fn root_for(dsl: &DslTree) -> AnnotationNode {
    let dsl_root = dsl.root_id();
    AnnotationNode::new_root(dsl_root, absolute_bounds(dsl, dsl_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fta_core::dsl::RawDslNode;

    fn engine() -> AnnotationEngine {
        let raw = RawDslNode::new("e_page", "frame", 0.0, 0.0, 320.0, 640.0)
            .with_children(vec![RawDslNode::new("e_title", "text", 16.0, 24.0, 200.0, 32.0)]);
        AnnotationEngine::new(DslTree::from_raw(&raw).unwrap(), EngineConfig::default())
    }

    #[test]
    fn new_engine_has_root_only() {
        let engine = engine();
        let root = engine.root();
        assert!(root.is_root && root.is_container);
        assert_eq!(root.id, NodeId::root());
        assert_eq!(root.dsl_node_id, Some(NodeId::intern("e_page")));
        assert_eq!(root.bounds(), Bounds::new(0.0, 0.0, 320.0, 640.0));
        assert_eq!(engine.flattened().len(), 1);
    }

    #[test]
    fn absolute_position_passthrough() {
        let engine = engine();
        assert_eq!(
            engine.absolute_position(NodeId::intern("e_title")),
            Position { x: 16.0, y: 24.0 }
        );
    }

    #[test]
    fn commit_rejects_invariant_violation() {
        let mut engine = engine();
        let before = engine.root().clone();
        let mut broken = before.clone();
        let mut leaf = AnnotationNode::new(
            NodeId::intern("e_title"),
            Some(NodeId::intern("e_title")),
            "Text",
            false,
            Bounds::default(),
        );
        leaf.children.push(leaf.clone());
        broken.children.push(leaf);

        let outcome = engine.commit(broken, "test");
        assert!(matches!(
            outcome,
            MutationOutcome::NoOp(NoOpReason::InvariantViolation(_))
        ));
        assert_eq!(engine.root(), &before);
        assert_eq!(engine.revision(), 0);
    }

    #[test]
    fn snapshot_reload_restores_tree() {
        let mut engine = engine();
        let snap = engine.snapshot();
        engine.initialize(engine.dsl.clone());
        engine.load_snapshot(snap.clone());
        assert_eq!(engine.root(), &snap.root_annotation);
    }
}
