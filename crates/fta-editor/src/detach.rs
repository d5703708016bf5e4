//! Detach primitive shared by create, combine and move.
//!
//! Rebuilds a tree without a set of subtrees and hands the removed subtrees
//! back to the caller for reinsertion elsewhere, so a node is never both
//! orphaned and duplicated.

use fta_core::annotation::AnnotationNode;
use fta_core::id::NodeId;

/// Result of `detach_descendants`.
#[derive(Debug, Clone)]
pub struct Detached {
    /// The rebuilt tree.
    pub node: AnnotationNode,
    /// Removed subtrees, in pre-order of where they were found.
    pub detached: Vec<AnnotationNode>,
}

/// Rebuild `root` without the nodes in `ids_to_remove`.
///
/// A removed node takes its whole subtree with it; removal does not recurse
/// into it, so nested ids inside a removed subtree stay attached to it.
/// Virtual containers left without children are pruned unless their id is
/// in `preserve_ids`. The root itself is never removed. `root` is untouched.
pub fn detach_descendants(
    root: &AnnotationNode,
    ids_to_remove: &[NodeId],
    preserve_ids: &[NodeId],
) -> Detached {
    let mut detached = Vec::new();
    let node = rebuild(root, ids_to_remove, preserve_ids, &mut detached);
    Detached { node, detached }
}

fn rebuild(
    node: &AnnotationNode,
    ids_to_remove: &[NodeId],
    preserve_ids: &[NodeId],
    detached: &mut Vec<AnnotationNode>,
) -> AnnotationNode {
    let mut rebuilt = node.shallow_clone();
    rebuilt.children.reserve(node.children.len());
    for child in &node.children {
        if ids_to_remove.contains(&child.id) {
            detached.push(child.clone());
            continue;
        }
        let child = rebuild(child, ids_to_remove, preserve_ids, detached);
        if child.is_virtual() && child.children.is_empty() && !preserve_ids.contains(&child.id) {
            log::trace!("pruning emptied virtual container {}", child.id);
            continue;
        }
        rebuilt.children.push(child);
    }
    rebuilt
}
