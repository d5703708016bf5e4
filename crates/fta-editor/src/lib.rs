pub mod combine;
pub mod commands;
pub mod detach;
pub mod engine;
pub mod moves;
pub mod ordering;
pub mod pending;
pub mod selection;
pub mod store;

pub use commands::CommandStack;
pub use detach::{Detached, detach_descendants};
pub use engine::{AnnotationEngine, MutationOutcome, NoOpReason};
pub use moves::{DropPosition, MoveResult, MoveValidation, validate_move};
pub use ordering::{FlatAnnotation, FlatAnnotations, flatten, prune_empty_virtuals, rebuild_tree, sort_children};
pub use pending::{ConfirmPrompt, PendingOperation};
pub use selection::{
    AncestryOracle, EngineAncestry, MultiSelectMode, SelectionChange, SelectionItem, SelectionKind,
    SelectionSet,
};
pub use store::{AnnotationUpdate, DeleteOptions, find_best_parent};
