//! Geometry resolver: relative DSL offsets → absolute boxes.
//!
//! Pure functions over a read-only `DslTree`. Unknown ids resolve to the
//! origin rather than an error so callers can treat them as "no geometry".

use crate::dsl::DslTree;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// An absolute canvas position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Absolute axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether `other` lies fully inside `self` (edges may touch).
    pub fn encloses(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// `encloses` that also requires the two boxes to differ.
    pub fn strictly_encloses(&self, other: &Bounds) -> bool {
        self.encloses(other) && self != other
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Union of every box in `iter`, or `None` when empty.
    pub fn union_all<'a>(iter: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        iter.into_iter()
            .fold(None, |acc: Option<Bounds>, b| match acc {
                Some(a) => Some(a.union(b)),
                None => Some(*b),
            })
    }
}

/// Absolute position of `target_id`: the sum of `relativeX/relativeY` along
/// the path from the root to the target, both inclusive.
/// Returns the origin when the id is not in the tree.
pub fn absolute_position(tree: &DslTree, target_id: NodeId) -> Position {
    let Some(path) = tree.path_to(target_id) else {
        return Position::default();
    };
    path.iter().fold(Position::default(), |acc, &idx| {
        let layout = &tree.graph[idx].layout;
        Position {
            x: acc.x + layout.relative_x,
            y: acc.y + layout.relative_y,
        }
    })
}

/// Absolute bounding box of `target_id`; zero-sized at the origin if unknown.
pub fn absolute_bounds(tree: &DslTree, target_id: NodeId) -> Bounds {
    let pos = absolute_position(tree, target_id);
    let (width, height) = tree
        .get_by_id(target_id)
        .map(|n| (n.layout.width, n.layout.height))
        .unwrap_or((0.0, 0.0));
    Bounds {
        x: pos.x,
        y: pos.y,
        width,
        height,
    }
}
