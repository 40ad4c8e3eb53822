//! Region shapes
//!
//! The shape set is fixed (cuboid, polygon, global), so it is a closed enum
//! with exhaustive matches rather than open subclassing.

use serde::{Deserialize, Serialize};

use super::geometry::{segments_intersect, Aabb, BlockPos};

/// A 2D-projected column: an `(x, z)` vertex ring extruded over a y range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon2D {
    points: Vec<(i64, i64)>,
    min_y: i64,
    max_y: i64,
}

impl Polygon2D {
    /// A polygon needs at least three vertices to cover anything; fewer
    /// produce an empty shape rather than an error.
    pub fn new(points: Vec<(i64, i64)>, y_a: i64, y_b: i64) -> Self {
        Self {
            points,
            min_y: y_a.min(y_b),
            max_y: y_a.max(y_b),
        }
    }

    pub fn points(&self) -> &[(i64, i64)] {
        &self.points
    }

    pub fn min_y(&self) -> i64 {
        self.min_y
    }

    pub fn max_y(&self) -> i64 {
        self.max_y
    }

    pub fn bounds(&self) -> Aabb {
        let xs = self.points.iter().map(|p| p.0);
        let zs = self.points.iter().map(|p| p.1);
        let min_x = xs.clone().min().unwrap_or(0);
        let max_x = xs.max().unwrap_or(0);
        let min_z = zs.clone().min().unwrap_or(0);
        let max_z = zs.max().unwrap_or(0);
        Aabb::new(
            BlockPos::new(min_x, self.min_y, min_z),
            BlockPos::new(max_x, self.max_y, max_z),
        )
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        if p.y < self.min_y || p.y > self.max_y {
            return false;
        }
        self.contains_column(p.x, p.z)
    }

    /// Even-odd ray cast on the (x, z) projection.
    fn contains_column(&self, x: i64, z: i64) -> bool {
        let pts = &self.points;
        let n = pts.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, zi) = pts[i];
            let (xj, zj) = pts[j];
            if (zi > z) != (zj > z) {
                // x < xj + (xi - xj) * (z - zj) / (zi - zj), in integers
                let lhs = (x - xj) as i128 * (zi - zj) as i128;
                let rhs = (xi - xj) as i128 * (z - zj) as i128;
                let crossed = if zi > zj { lhs < rhs } else { lhs > rhs };
                if crossed {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// The volume covered by a region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionShape {
    Cuboid(Aabb),
    Polygon(Polygon2D),
    Global,
}

impl RegionShape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Cuboid(_) => "cuboid",
            Self::Polygon(_) => "polygon",
            Self::Global => "global",
        }
    }

    /// Bounding box; `None` for the global shape.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Self::Cuboid(b) => Some(*b),
            Self::Polygon(p) => Some(p.bounds()),
            Self::Global => None,
        }
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        match self {
            Self::Cuboid(b) => b.contains(p),
            Self::Polygon(poly) => poly.contains(p),
            Self::Global => true,
        }
    }

    /// Area-intersection test: bounding-box prefilter, then a type-specific
    /// check. Cuboid vs cuboid degrades to the pure box test; polygon cases
    /// add vertex-in-polygon (both directions) plus edge intersection.
    pub fn intersects(&self, other: &RegionShape) -> bool {
        let (a, b) = match (self.bounds(), other.bounds()) {
            // Global overlaps everything.
            (None, _) | (_, None) => return true,
            (Some(a), Some(b)) => (a, b),
        };
        if !a.intersects(&b) {
            return false;
        }
        match (self, other) {
            (Self::Cuboid(_), Self::Cuboid(_)) => true,
            _ => footprints_intersect(self, other),
        }
    }

    /// The (x, z) footprint ring used for polygon intersection tests.
    fn footprint(&self) -> Vec<(i64, i64)> {
        match self {
            Self::Cuboid(b) => {
                let (min, max) = (b.min(), b.max());
                vec![
                    (min.x, min.z),
                    (max.x, min.z),
                    (max.x, max.z),
                    (min.x, max.z),
                ]
            }
            Self::Polygon(p) => p.points().to_vec(),
            Self::Global => Vec::new(),
        }
    }

    fn footprint_contains(&self, x: i64, z: i64) -> bool {
        match self {
            Self::Cuboid(b) => {
                x >= b.min().x && x <= b.max().x && z >= b.min().z && z <= b.max().z
            }
            Self::Polygon(p) => p.contains_column(x, z),
            Self::Global => true,
        }
    }
}

fn footprints_intersect(a: &RegionShape, b: &RegionShape) -> bool {
    let ring_a = a.footprint();
    let ring_b = b.footprint();

    if ring_a.iter().any(|&(x, z)| b.footprint_contains(x, z)) {
        return true;
    }
    if ring_b.iter().any(|&(x, z)| a.footprint_contains(x, z)) {
        return true;
    }

    let edges = |ring: &[(i64, i64)]| -> Vec<((i64, i64), (i64, i64))> {
        let n = ring.len();
        (0..n).map(|i| (ring[i], ring[(i + 1) % n])).collect()
    };
    let edges_b = edges(&ring_b);
    for (a1, a2) in edges(&ring_a) {
        for &(b1, b2) in &edges_b {
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: i64, max: i64) -> Polygon2D {
        Polygon2D::new(vec![(min, min), (max, min), (max, max), (min, max)], 0, 64)
    }

    #[test]
    fn polygon_contains_interior_not_exterior() {
        let poly = square(0, 10);
        assert!(poly.contains(BlockPos::new(5, 32, 5)));
        assert!(!poly.contains(BlockPos::new(11, 32, 5)));
        assert!(!poly.contains(BlockPos::new(5, 65, 5)));
    }

    #[test]
    fn polygon_with_too_few_points_is_empty() {
        let degenerate = Polygon2D::new(vec![(0, 0), (4, 4)], 0, 10);
        assert!(!degenerate.contains(BlockPos::new(2, 5, 2)));
    }

    #[test]
    fn concave_polygon_containment() {
        // L-shape: notch cut out of the upper-right quadrant.
        let poly = Polygon2D::new(
            vec![(0, 0), (10, 0), (10, 5), (5, 5), (5, 10), (0, 10)],
            0,
            0,
        );
        assert!(poly.contains(BlockPos::new(2, 0, 8)));
        assert!(!poly.contains(BlockPos::new(8, 0, 8)));
    }

    #[test]
    fn global_contains_and_intersects_everything() {
        let g = RegionShape::Global;
        assert!(g.contains(BlockPos::new(i64::MAX, i64::MIN, 0)));
        let c = RegionShape::Cuboid(Aabb::new(BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)));
        assert!(g.intersects(&c));
        assert!(c.intersects(&g));
    }

    #[test]
    fn cuboid_cuboid_intersection_is_the_box_test() {
        let a = RegionShape::Cuboid(Aabb::new(BlockPos::new(0, 0, 0), BlockPos::new(4, 4, 4)));
        let b = RegionShape::Cuboid(Aabb::new(BlockPos::new(4, 4, 4), BlockPos::new(8, 8, 8)));
        let c = RegionShape::Cuboid(Aabb::new(BlockPos::new(9, 0, 0), BlockPos::new(12, 4, 4)));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn polygon_cuboid_intersection() {
        let poly = RegionShape::Polygon(square(0, 10));
        let inside = RegionShape::Cuboid(Aabb::new(
            BlockPos::new(2, 0, 2),
            BlockPos::new(4, 32, 4),
        ));
        let outside = RegionShape::Cuboid(Aabb::new(
            BlockPos::new(20, 0, 20),
            BlockPos::new(30, 32, 30),
        ));
        let above = RegionShape::Cuboid(Aabb::new(
            BlockPos::new(2, 100, 2),
            BlockPos::new(4, 120, 4),
        ));
        assert!(poly.intersects(&inside));
        assert!(!poly.intersects(&outside));
        assert!(!poly.intersects(&above));
    }

    #[test]
    fn polygon_polygon_edge_crossing_without_contained_vertices() {
        // Two long thin rectangles crossing in a plus sign: neither contains
        // the other's vertices, only edges cross.
        let horiz = RegionShape::Polygon(Polygon2D::new(
            vec![(-10, -1), (10, -1), (10, 1), (-10, 1)],
            0,
            0,
        ));
        let vert = RegionShape::Polygon(Polygon2D::new(
            vec![(-1, -10), (1, -10), (1, 10), (-1, 10)],
            0,
            0,
        ));
        assert!(horiz.intersects(&vert));
    }
}
