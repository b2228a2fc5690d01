//! AABB intersection and child-position generation, shared by the packer.

use crate::types::Case;

pub type Position = (i64, i64, i64);

/// True iff the two cases' axis-aligned bounding boxes overlap on all three
/// axes. Touching faces do not intersect.
pub fn intersect(a: &Case, b: &Case) -> bool {
    a.right().min(b.right()) > a.left().max(b.left())
        && a.back().min(b.back()) > a.front().max(b.front())
        && a.top().min(b.top()) > a.bottom().max(b.bottom())
}

/// For k in {0, 1, 2}, the corner immediately to the right of, behind, or
/// on top of `anchor`.
pub fn child_position(k: usize, anchor: &Case) -> Position {
    match k {
        0 => (anchor.right(), anchor.y, anchor.z),
        1 => (anchor.x, anchor.back(), anchor.z),
        2 => (anchor.x, anchor.y, anchor.top()),
        _ => unreachable!("child position index out of range: {k}"),
    }
}
