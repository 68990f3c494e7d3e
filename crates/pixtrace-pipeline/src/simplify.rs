//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces the vertex count of closed boundary polygons by removing
//! vertices that lie within a tolerance of the chord between their
//! retained neighbours.
//!
//! Closed rings are handled by anchoring at the first vertex and running
//! RDP over the chain that walks the whole ring back to that vertex. The
//! first split is therefore the vertex farthest from the anchor, and the
//! closing edge stays implicit in the output.
//!
//! This is step 5 in the trace pipeline, between contour filtering and
//! color sampling.

use crate::types::{Point, Polygon};

/// Simplify a closed polygon using Ramer-Douglas-Peucker.
///
/// Vertices within `tolerance` pixels of the chord between their
/// retained neighbours are removed. A tolerance of zero (or below)
/// returns the polygon unchanged, and polygons with fewer than 3
/// vertices are returned unchanged (nothing to simplify). An infinite
/// tolerance collapses any polygon to its anchor vertex.
///
/// Re-simplifying an already simplified polygon with the same tolerance
/// returns it unchanged.
#[must_use = "returns the simplified polygon"]
pub fn simplify(polygon: &Polygon, tolerance: f64) -> Polygon {
    let points = polygon.points();
    if points.len() < 3 || tolerance <= 0.0 || tolerance.is_nan() {
        return polygon.clone();
    }

    // Walk the ring and come back to the anchor.
    let mut ring = Vec::with_capacity(points.len() + 1);
    ring.extend_from_slice(points);
    ring.push(points[0]);

    let mut kept = vec![false; ring.len()];
    kept[0] = true;

    rdp_recurse(&ring, 0, ring.len() - 1, tolerance, &mut kept);

    // The final ring entry duplicates the anchor; it is never emitted.
    let simplified: Vec<Point> = ring[..ring.len() - 1]
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polygon::new(simplified)
}

/// Simplify multiple polygons, applying RDP to each independently.
#[must_use = "returns the simplified polygons"]
pub fn simplify_polygons(polygons: &[Polygon], tolerance: f64) -> Vec<Polygon> {
    polygons.iter().map(|p| simplify(p, tolerance)).collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line through them. If that distance exceeds `tolerance`, the point is
/// kept and both sub-chains are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = f64::from(b.x - a.x);
    let dy = f64::from(b.y - a.y);
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(f64::from(a.y - p.y), -(dy * f64::from(a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
