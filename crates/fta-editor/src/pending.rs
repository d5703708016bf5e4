//! Destructive-operation confirmation.
//!
//! A create or update that would discard annotations does not prompt from
//! inside the engine. It returns a `PendingOperation` token instead and the
//! host commits or cancels it explicitly. A token is bound to the tree
//! revision it was issued against; any intervening commit makes it stale.

use crate::engine::{AnnotationEngine, MutationOutcome, NoOpReason};
use crate::store::AnnotationUpdate;
use fta_core::annotation::AnnotationExtra;
use fta_core::id::NodeId;
use serde::Serialize;

/// The operation waiting for a yes/no answer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingAction {
    Create {
        dsl_id: NodeId,
        component: String,
        extra: AnnotationExtra,
    },
    Update {
        id: NodeId,
        updates: AnnotationUpdate,
    },
}

/// A destructive operation awaiting host confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub token: u64,
    /// Human-readable explanation for the prompt.
    pub reason: String,
    #[serde(skip)]
    pub(crate) revision: u64,
    #[serde(skip)]
    pub(crate) action: PendingAction,
}

/// Host-provided yes/no prompt.
pub trait ConfirmPrompt {
    fn confirm(&mut self, reason: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> ConfirmPrompt for F {
    fn confirm(&mut self, reason: &str) -> bool {
        self(reason)
    }
}

impl AnnotationEngine {
    /// Park `action` and hand its token to the caller.
    pub(crate) fn request_confirmation(
        &mut self,
        action: PendingAction,
        reason: String,
    ) -> MutationOutcome {
        let op = PendingOperation {
            token: self.next_token,
            reason,
            revision: self.revision(),
            action,
        };
        self.next_token += 1;
        log::debug!("awaiting confirmation {}: {}", op.token, op.reason);
        self.pending = Some(op.clone());
        MutationOutcome::NeedsConfirmation(op)
    }

    /// Commit the pending operation identified by `token`.
    pub fn confirm_pending(&mut self, token: u64) -> MutationOutcome {
        let op = match self.pending.take() {
            Some(op) if op.token == token => op,
            other => {
                self.pending = other;
                return MutationOutcome::NoOp(NoOpReason::StaleConfirmation);
            }
        };
        if op.revision != self.revision() {
            return MutationOutcome::NoOp(NoOpReason::StaleConfirmation);
        }
        match op.action {
            PendingAction::Create {
                dsl_id,
                component,
                extra,
            } => self.apply_create(dsl_id, &component, extra, true),
            PendingAction::Update { id, updates } => self.apply_update(id, updates, true),
        }
    }

    /// Drop the pending operation. Returns `false` if `token` is not pending.
    pub fn cancel_pending(&mut self, token: u64) -> bool {
        if self.pending.as_ref().is_some_and(|op| op.token == token) {
            self.pending = None;
            log::debug!("confirmation {token} declined");
            true
        } else {
            false
        }
    }

    /// Resolve a `NeedsConfirmation` outcome with `prompt` in one step.
    pub(crate) fn resolve_with(
        &mut self,
        outcome: MutationOutcome,
        prompt: &mut dyn ConfirmPrompt,
    ) -> MutationOutcome {
        match outcome {
            MutationOutcome::NeedsConfirmation(op) => {
                if prompt.confirm(&op.reason) {
                    self.confirm_pending(op.token)
                } else {
                    self.cancel_pending(op.token);
                    MutationOutcome::NoOp(NoOpReason::Declined)
                }
            }
            other => other,
        }
    }
}
