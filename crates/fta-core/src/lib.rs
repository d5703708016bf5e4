pub mod annotation;
pub mod component;
pub mod config;
pub mod dsl;
pub mod geometry;
pub mod id;
pub mod snapshot;

pub use annotation::{AnnotationExtra, AnnotationNode, FreeMap, validate_tree};
pub use component::{ComponentCategory, ComponentRegistry};
pub use config::EngineConfig;
pub use dsl::{DslNode, DslTree, LayoutStyle, RawDslNode};
pub use geometry::{Bounds, Position, absolute_bounds, absolute_position};
pub use id::NodeId;
pub use snapshot::{AnnotationSnapshot, SnapshotError, SnapshotStore, load_with_fallback};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
