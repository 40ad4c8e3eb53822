//! Integer lattice geometry
//!
//! BlockPos: a point on the world lattice
//! Aabb: axis-aligned box, inclusive at both boundaries

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point on the integer world lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box.
///
/// Construction normalizes the corners componentwise, so `min <= max` holds
/// on every axis. Containment and overlap are inclusive at both boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    min: BlockPos,
    max: BlockPos,
}

impl Aabb {
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn min(&self) -> BlockPos {
        self.min
    }

    pub fn max(&self) -> BlockPos {
        self.max
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Number of lattice points covered, clamped to `u64::MAX` instead of
    /// overflowing.
    pub fn volume(&self) -> u64 {
        let side = |lo: i64, hi: i64| (hi as i128 - lo as i128 + 1) as u128;
        let v = side(self.min.x, self.max.x)
            .saturating_mul(side(self.min.y, self.max.y))
            .saturating_mul(side(self.min.z, self.max.z));
        v.min(u64::MAX as u128) as u64
    }
}

/// Whether the closed 2D segments `a1-a2` and `b1-b2` intersect.
pub(crate) fn segments_intersect(
    a1: (i64, i64),
    a2: (i64, i64),
    b1: (i64, i64),
    b2: (i64, i64),
) -> bool {
    fn orient(p: (i64, i64), q: (i64, i64), r: (i64, i64)) -> i8 {
        let v = (q.0 as i128 - p.0 as i128) * (r.1 as i128 - p.1 as i128)
            - (q.1 as i128 - p.1 as i128) * (r.0 as i128 - p.0 as i128);
        match v.cmp(&0) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    fn on_segment(p: (i64, i64), q: (i64, i64), r: (i64, i64)) -> bool {
        q.0 >= p.0.min(r.0) && q.0 <= p.0.max(r.0) && q.1 >= p.1.min(r.1) && q.1 <= p.1.max(r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1 != o2 && o3 != o4 {
        return true;
    }
    (o1 == 0 && on_segment(a1, b1, a2))
        || (o2 == 0 && on_segment(a1, b2, a2))
        || (o3 == 0 && on_segment(b1, a1, b2))
        || (o4 == 0 && on_segment(b1, a2, b2))
}
