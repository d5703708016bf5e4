//! Undo/Redo command stack.
//!
//! Every recorded step holds the whole annotation tree before and after the
//! mutation; undo and redo swap it back in through `load_annotations`.
//!
//! Drag gestures use **batching**: the tree is captured when the gesture
//! starts and again when it ends, so the whole gesture undoes in one step.

use crate::engine::AnnotationEngine;
use fta_core::annotation::AnnotationNode;

/// One undoable step.
#[derive(Debug, Clone)]
pub struct Command {
    pub before: AnnotationNode,
    pub after: AnnotationNode,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Tree captured at the start of a batch.
    batch_snapshot: Option<AnnotationNode>,
    /// Whether any mutation was published during the current batch.
    batch_dirty: bool,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(128)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
        }
    }

    /// Start a batch group. Mutations until the matching `end_batch()`
    /// are applied live but undo as one step.
    pub fn begin_batch(&mut self, engine: &AnnotationEngine) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(engine.root().clone());
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// End a batch group. The outermost close records one command if the
    /// tree actually changed.
    pub fn end_batch(&mut self, engine: &AnnotationEngine, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let before = self.batch_snapshot.take();
        if self.batch_dirty
            && let Some(before) = before
            && &before != engine.root()
        {
            self.push(Command {
                before,
                after: engine.root().clone(),
                description: description.to_string(),
            });
        }
        self.batch_dirty = false;
    }

    /// Run `op` against the engine and record it if it published a change.
    /// No-ops and pending confirmations leave the stacks alone.
    pub fn execute<R>(
        &mut self,
        engine: &mut AnnotationEngine,
        description: &str,
        op: impl FnOnce(&mut AnnotationEngine) -> R,
    ) -> R {
        let revision = engine.revision();
        let before = (self.batch_depth == 0).then(|| engine.root().clone());
        let out = op(engine);
        if engine.revision() == revision {
            return out;
        }
        match before {
            None => self.batch_dirty = true,
            Some(before) => self.push(Command {
                before,
                after: engine.root().clone(),
                description: description.to_string(),
            }),
        }
        out
    }

    /// Undo the last command (or batch).
    pub fn undo(&mut self, engine: &mut AnnotationEngine) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        engine.load_annotations(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        log::debug!("undo: {desc}");
        Some(desc)
    }

    /// Redo the last undone command (or batch).
    pub fn redo(&mut self, engine: &mut AnnotationEngine) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        engine.load_annotations(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        log::debug!("redo: {desc}");
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
    }

    fn push(&mut self, cmd: Command) {
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // New action invalidates redo history
        self.redo_stack.clear();
    }
}
