// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometric operations over shape descriptors: inflation, signed distance,
//! containment, and container boxes.
//!
//! ## Conventions
//!
//! - Distances are signed: **negative means inside** the shape's region.
//! - Every operation is pure; inputs are never mutated.
//! - Inputs are assumed finite (no NaN/infinity handling).
//!
//! ## Approximations
//!
//! Two deliberate simplifications are kept from the design this crate
//! implements:
//! - Composite distance is the minimum over children ("closest child wins"),
//!   which is not a true union signed distance when the coord is inside one
//!   child and outside another.
//! - Rect and polygon inflation displace each vertex along the direction from
//!   the shape's centroid, not a true Minkowski sum.

use alloc::vec::Vec;
use core::f64::consts::TAU;
use kurbo::{Point, Rect, Vec2};

use crate::types::{BoundShape, MetaShape, is_float_equal};

#[inline]
fn dist(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

/// Signed distance from `coord` to the capsule around segment `a..b` with the
/// given half width. Degenerate segments collapse to a circle of that radius.
fn segment_distance(coord: Point, a: Point, b: Point, half_width: f64) -> f64 {
    if is_float_equal(a.x, b.x) && is_float_equal(a.y, b.y) {
        return dist(coord, a) - half_width;
    }
    let ab = b - a;
    let t = (coord - a).dot(ab) / ab.hypot2();
    if (0.0..=1.0).contains(&t) {
        dist(coord, a + ab * t) - half_width
    } else {
        dist(coord, a).min(dist(coord, b)) - half_width
    }
}

/// Normalize an angle to `[0, TAU)`.
fn norm_angle(a: f64) -> f64 {
    let r = a % TAU;
    if r < 0.0 { r + TAU } else { r }
}

/// Whether `angle` lies on the counter-clockwise sweep from `start` to `end`.
/// A zero sweep is treated as the full circle.
fn angle_in_sweep(angle: f64, start: f64, end: f64) -> bool {
    let sweep = norm_angle(end - start);
    if is_float_equal(sweep, 0.0) {
        return true;
    }
    norm_angle(angle - start) <= sweep
}

/// Even-odd containment: cast a ray in +x and count edge crossings.
/// Odd crossings means inside.
fn polygon_contains(coord: Point, coords: &[Point]) -> bool {
    let n = coords.len();
    let mut inside = false;
    for i in 0..n {
        let a = coords[i];
        let b = coords[(i + 1) % n];
        if (a.y > coord.y) != (b.y > coord.y) {
            let t = (coord.y - a.y) / (b.y - a.y);
            if coord.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
    }
    inside
}

/// Displace each vertex outward from the vertex centroid by `delta`.
/// Vertices coincident with the centroid are left in place.
fn inflate_coords(coords: &[Point], delta: f64) -> Vec<Point> {
    let n = coords.len() as f64;
    let centroid = (coords
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2())
        / n)
        .to_point();
    coords
        .iter()
        .map(|&p| {
            let dir = p - centroid;
            let len = dir.hypot();
            if is_float_equal(len, 0.0) {
                p
            } else {
                p + dir * (delta / len)
            }
        })
        .collect()
}

/// Closed-interval overlap test; degenerate (zero-area) boxes still overlap
/// when they touch.
fn boxes_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn coords_bbox(coords: &[Point]) -> Rect {
    let first = coords[0];
    let mut r = Rect::new(first.x, first.y, first.x, first.y);
    for p in &coords[1..] {
        r = r.union_pt(*p);
    }
    r
}

impl MetaShape {
    /// Return a new shape expanded uniformly by `delta` in every direction.
    ///
    /// A point becomes a circle of radius `delta`; stroked shapes widen by
    /// `2 * delta`; rects and polygons use vertex-radial displacement.
    pub fn inflate(&self, delta: f64) -> Self {
        match self {
            Self::Point { pos } => Self::circle(*pos, delta),
            Self::Circle { center, radius } => Self::circle(*center, radius + delta),
            Self::Line { start, end, width } => Self::line(*start, *end, width + 2.0 * delta),
            Self::Rect { corner1, corner2 } => {
                let c = inflate_coords(&[*corner1, *corner2], delta);
                Self::rect(c[0], c[1])
            }
            Self::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                width,
            } => Self::arc(
                *center,
                *radius,
                *start_angle,
                *end_angle,
                width + 2.0 * delta,
            ),
            Self::Polyline { coords, width } => {
                Self::polyline(coords.clone(), width + 2.0 * delta)
            }
            Self::Polygon { coords } => Self::polygon(inflate_coords(coords, delta)),
            Self::Sphere { center, radius } => Self::sphere(*center, radius + delta),
            Self::Cylinder { start, end, radius } => {
                Self::cylinder(*start, *end, radius + delta)
            }
        }
    }

    /// Signed distance from `coord` to this shape's boundary; negative inside.
    pub fn distance_to(&self, coord: Point) -> f64 {
        match self {
            Self::Point { pos } => dist(coord, *pos),
            Self::Circle { center, radius } | Self::Sphere { center, radius } => {
                dist(coord, *center) - radius
            }
            Self::Line { start, end, width } => {
                segment_distance(coord, *start, *end, width / 2.0)
            }
            Self::Cylinder { start, end, radius } => {
                segment_distance(coord, *start, *end, *radius)
            }
            Self::Rect { corner1, corner2 } => {
                let x0 = corner1.x.min(corner2.x);
                let x1 = corner1.x.max(corner2.x);
                let y0 = corner1.y.min(corner2.y);
                let y1 = corner1.y.max(corner2.y);
                let inside = x0 <= coord.x && coord.x <= x1 && y0 <= coord.y && coord.y <= y1;
                if inside {
                    -(coord.x - x0)
                        .min(x1 - coord.x)
                        .min(coord.y - y0)
                        .min(y1 - coord.y)
                } else {
                    let dx = (x0 - coord.x).max(coord.x - x1).max(0.0);
                    let dy = (y0 - coord.y).max(coord.y - y1).max(0.0);
                    Vec2::new(dx, dy).hypot()
                }
            }
            Self::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                width,
            } => {
                let half = width / 2.0;
                let v = coord - *center;
                if angle_in_sweep(v.atan2(), *start_angle, *end_angle) {
                    (v.hypot() - radius).abs() - half
                } else {
                    let ep = |a: f64| *center + Vec2::from_angle(a) * *radius;
                    dist(coord, ep(*start_angle)).min(dist(coord, ep(*end_angle))) - half
                }
            }
            Self::Polyline { coords, width } => {
                let half = width / 2.0;
                if coords.len() == 1 {
                    return dist(coord, coords[0]) - half;
                }
                coords
                    .windows(2)
                    .map(|w| segment_distance(coord, w[0], w[1], half))
                    .fold(f64::INFINITY, f64::min)
            }
            Self::Polygon { coords } => {
                if coords.len() == 1 {
                    return dist(coord, coords[0]);
                }
                let n = coords.len();
                let d = (0..n)
                    .map(|i| segment_distance(coord, coords[i], coords[(i + 1) % n], 0.0))
                    .fold(f64::INFINITY, f64::min);
                if polygon_contains(coord, coords) { -d } else { d }
            }
        }
    }

    /// Boundary-inclusive containment test.
    pub fn contains_coord(&self, coord: Point) -> bool {
        match self {
            Self::Point { pos } => {
                is_float_equal(coord.x, pos.x) && is_float_equal(coord.y, pos.y)
            }
            Self::Circle { center, radius } | Self::Sphere { center, radius } => {
                dist(coord, *center) <= *radius
            }
            Self::Rect { corner1, corner2 } => {
                let x0 = corner1.x.min(corner2.x);
                let x1 = corner1.x.max(corner2.x);
                let y0 = corner1.y.min(corner2.y);
                let y1 = corner1.y.max(corner2.y);
                x0 <= coord.x && coord.x <= x1 && y0 <= coord.y && coord.y <= y1
            }
            Self::Polygon { coords } => {
                if coords.len() == 1 {
                    return is_float_equal(coord.x, coords[0].x)
                        && is_float_equal(coord.y, coords[0].y);
                }
                // The ray-crossing test alone misses exact boundary points
                // on the max-x/max-y edges; a zero edge distance is inside.
                let n = coords.len();
                let edge_d = (0..n)
                    .map(|i| segment_distance(coord, coords[i], coords[(i + 1) % n], 0.0))
                    .fold(f64::INFINITY, f64::min);
                edge_d <= 0.0 || polygon_contains(coord, coords)
            }
            // Stroked shapes are capsule regions; containment agrees with the
            // signed distance by construction.
            Self::Line { .. } | Self::Cylinder { .. } | Self::Arc { .. }
            | Self::Polyline { .. } => self.distance_to(coord) <= 0.0,
        }
    }

    /// Minimum enclosing axis-aligned box, padded by stroke widths and radii.
    pub fn container_box(&self) -> Rect {
        match self {
            Self::Point { pos } => Rect::new(pos.x, pos.y, pos.x, pos.y),
            Self::Circle { center, radius } | Self::Sphere { center, radius } => {
                Rect::new(center.x, center.y, center.x, center.y).inflate(*radius, *radius)
            }
            Self::Line { start, end, width } => {
                coords_bbox(&[*start, *end]).inflate(width / 2.0, width / 2.0)
            }
            Self::Cylinder { start, end, radius } => {
                coords_bbox(&[*start, *end]).inflate(*radius, *radius)
            }
            Self::Rect { corner1, corner2 } => coords_bbox(&[*corner1, *corner2]),
            // Conservative: the full supporting circle, padded by half width.
            Self::Arc {
                center,
                radius,
                width,
                ..
            } => {
                let r = radius + width / 2.0;
                Rect::new(center.x, center.y, center.x, center.y).inflate(r, r)
            }
            Self::Polyline { coords, width } => {
                coords_bbox(coords).inflate(width / 2.0, width / 2.0)
            }
            Self::Polygon { coords } => coords_bbox(coords),
        }
    }

    /// The raw coordinates of this shape, without widths or radii applied.
    fn raw_coords_bbox(&self) -> Rect {
        match self {
            Self::Point { pos } => coords_bbox(&[*pos]),
            Self::Circle { center, .. } | Self::Sphere { center, .. } => coords_bbox(&[*center]),
            Self::Line { start, end, .. } | Self::Cylinder { start, end, .. } => {
                coords_bbox(&[*start, *end])
            }
            Self::Rect { corner1, corner2 } => coords_bbox(&[*corner1, *corner2]),
            Self::Arc { center, .. } => coords_bbox(&[*center]),
            Self::Polyline { coords, .. } | Self::Polygon { coords } => coords_bbox(coords),
        }
    }
}

impl BoundShape {
    /// Return a new shape expanded uniformly by `delta`; composites inflate
    /// element-wise.
    pub fn inflate(&self, delta: f64) -> Self {
        match self {
            Self::Simple(s) => Self::Simple(s.inflate(delta)),
            Self::Composite(children) => {
                Self::Composite(children.iter().map(|c| c.inflate(delta)).collect())
            }
        }
    }

    /// Signed distance from `coord` to this shape; negative inside.
    ///
    /// `inflate` expands the shape before measuring. For composites the result
    /// is the distance to the nearest child.
    pub fn distance_to(&self, coord: Point, inflate: f64) -> f64 {
        match self {
            Self::Simple(s) => {
                if inflate != 0.0 {
                    s.inflate(inflate).distance_to(coord)
                } else {
                    s.distance_to(coord)
                }
            }
            Self::Composite(children) => children
                .iter()
                .map(|c| c.distance_to(coord, inflate))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Boundary-inclusive containment. A composite contains the coord when any
    /// child does.
    pub fn contains_coord(&self, coord: Point, inflate: f64) -> bool {
        match self {
            Self::Simple(s) => {
                if inflate != 0.0 {
                    s.inflate(inflate).contains_coord(coord)
                } else {
                    s.contains_coord(coord)
                }
            }
            Self::Composite(children) => {
                children.iter().any(|c| c.contains_coord(coord, inflate))
            }
        }
    }

    /// Minimum enclosing axis-aligned box of the shape inflated by
    /// `inflation`. A composite's box is the union of its children's boxes.
    pub fn container_box(&self, inflation: f64) -> Option<Rect> {
        match self {
            Self::Simple(s) => Some(if inflation != 0.0 {
                s.inflate(inflation).container_box()
            } else {
                s.container_box()
            }),
            Self::Composite(children) => children
                .iter()
                .filter_map(|c| c.container_box(inflation))
                .reduce(|a, b| a.union(b)),
        }
    }

    /// Whether the shape (widths and radii included) lies entirely in `rect`.
    pub fn inside_box(&self, rect: Rect) -> bool {
        match self.container_box(0.0) {
            Some(b) => rect.union(b) == rect,
            None => false,
        }
    }

    /// Whether the shape's raw coordinates overlap `rect`.
    ///
    /// Line widths and circle radii are ignored here; this is a coarse
    /// candidate filter, not a precise overlap test.
    pub fn intersects_box(&self, rect: Rect) -> bool {
        match self {
            Self::Simple(s) => boxes_overlap(s.raw_coords_bbox(), rect),
            Self::Composite(children) => children.iter().any(|c| c.intersects_box(rect)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn rect_distance_and_containment() {
        let shape = BoundShape::from(MetaShape::rect(pt(0.0, 0.0), pt(10.0, 10.0)));
        assert!(shape.contains_coord(pt(5.0, 5.0), 0.0));
        assert!(!shape.contains_coord(pt(15.0, 5.0), 0.0));
        assert!(is_float_equal(shape.distance_to(pt(15.0, 5.0), 0.0), 5.0));
        // Inside: negative minimum gap to an edge.
        assert!(is_float_equal(shape.distance_to(pt(5.0, 4.0), 0.0), -4.0));
    }

    #[test]
    fn circle_distance_and_inflation() {
        let shape = BoundShape::from(MetaShape::circle(pt(0.0, 0.0), 5.0));
        assert!(is_float_equal(shape.distance_to(pt(10.0, 0.0), 0.0), 5.0));
        let inflated = shape.inflate(3.0);
        assert!(is_float_equal(inflated.distance_to(pt(10.0, 0.0), 0.0), 2.0));
        // The inflate parameter is equivalent to inflating first.
        assert!(is_float_equal(shape.distance_to(pt(10.0, 0.0), 3.0), 2.0));
    }

    #[test]
    fn polygon_even_odd_rule() {
        let square = BoundShape::from(MetaShape::polygon(vec![
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(10.0, 10.0),
            pt(0.0, 10.0),
        ]));
        assert!(square.contains_coord(pt(5.0, 5.0), 0.0));
        assert!(!square.contains_coord(pt(-1.0, 5.0), 0.0));
        assert!(square.distance_to(pt(5.0, 5.0), 0.0) < 0.0);
        assert!(square.distance_to(pt(-1.0, 5.0), 0.0) > 0.0);
    }

    #[test]
    fn concave_polygon_parity() {
        // A "C" shape: the notch on the right is outside.
        let c = BoundShape::from(MetaShape::polygon(vec![
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(10.0, 3.0),
            pt(3.0, 3.0),
            pt(3.0, 7.0),
            pt(10.0, 7.0),
            pt(10.0, 10.0),
            pt(0.0, 10.0),
        ]));
        assert!(c.contains_coord(pt(1.5, 5.0), 0.0));
        assert!(!c.contains_coord(pt(7.0, 5.0), 0.0));
    }

    #[test]
    fn line_capsule_width() {
        let line = BoundShape::from(MetaShape::line(pt(0.0, 0.0), pt(10.0, 0.0), 4.0));
        assert!(line.contains_coord(pt(5.0, 1.0), 0.0));
        assert!(!line.contains_coord(pt(5.0, 3.0), 0.0));
        assert!(is_float_equal(line.distance_to(pt(5.0, 3.0), 0.0), 1.0));
    }

    #[test]
    fn degenerate_line_is_a_disc() {
        let line = BoundShape::from(MetaShape::line(pt(2.0, 2.0), pt(2.0, 2.0), 4.0));
        assert!(line.contains_coord(pt(3.5, 2.0), 0.0));
        assert!(!line.contains_coord(pt(4.5, 2.0), 0.0));
    }

    #[test]
    fn inflate_distance_consistency() {
        // For point, circle and line: distance after inflating by d drops by d.
        let shapes = [
            BoundShape::from(MetaShape::point(pt(1.0, 1.0))),
            BoundShape::from(MetaShape::circle(pt(1.0, 1.0), 2.0)),
            BoundShape::from(MetaShape::line(pt(0.0, 0.0), pt(4.0, 0.0), 1.0)),
        ];
        let probes = [pt(6.0, 1.0), pt(-3.0, 2.0), pt(2.0, 5.0)];
        for s in &shapes {
            for &c in &probes {
                for d in [0.5, 1.0, 2.5] {
                    let got = s.inflate(d).distance_to(c, 0.0);
                    let want = s.distance_to(c, 0.0) - d;
                    assert!(is_float_equal(got, want), "shape {s:?} probe {c:?} d {d}");
                }
            }
        }
    }

    #[test]
    fn containment_agrees_with_distance() {
        let shapes = [
            BoundShape::from(MetaShape::circle(pt(0.0, 0.0), 3.0)),
            BoundShape::from(MetaShape::rect(pt(-2.0, -2.0), pt(2.0, 2.0))),
            BoundShape::from(MetaShape::line(pt(0.0, 0.0), pt(5.0, 5.0), 2.0)),
            BoundShape::from(MetaShape::polygon(vec![
                pt(0.0, 0.0),
                pt(4.0, 0.0),
                pt(2.0, 4.0),
            ])),
        ];
        let probes = [
            pt(0.0, 0.0),
            pt(1.0, 1.0),
            pt(3.5, 0.5),
            pt(-4.0, -4.0),
            pt(2.0, 2.0),
            pt(6.0, 6.0),
        ];
        for s in &shapes {
            for &c in &probes {
                assert_eq!(
                    s.contains_coord(c, 0.0),
                    s.distance_to(c, 0.0) <= 0.0,
                    "shape {s:?} probe {c:?}"
                );
            }
        }
    }

    #[test]
    fn polygon_boundary_points_are_inside() {
        let square = BoundShape::from(MetaShape::polygon(vec![
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(10.0, 10.0),
            pt(0.0, 10.0),
        ]));
        // Points on the max-x and max-y edges, where the ray-crossing test
        // alone reports outside.
        for c in [pt(10.0, 5.0), pt(5.0, 10.0), pt(10.0, 10.0), pt(0.0, 0.0)] {
            assert!(
                is_float_equal(square.distance_to(c, 0.0), 0.0),
                "probe {c:?} sits on the boundary"
            );
            assert!(square.contains_coord(c, 0.0), "boundary probe {c:?}");
            assert_eq!(
                square.contains_coord(c, 0.0),
                square.distance_to(c, 0.0) <= 0.0,
                "agreement at boundary probe {c:?}"
            );
        }
        assert!(!square.contains_coord(pt(10.1, 5.0), 0.0));
    }

    #[test]
    fn composite_containment_is_existential() {
        let a = MetaShape::circle(pt(0.0, 0.0), 1.0);
        let b = MetaShape::circle(pt(10.0, 0.0), 1.0);
        let composite: BoundShape = [a.clone(), b.clone()].into_iter().collect();
        let probes = [pt(0.5, 0.0), pt(10.5, 0.0), pt(5.0, 0.0)];
        for &c in &probes {
            let each = BoundShape::from(a.clone()).contains_coord(c, 0.0)
                || BoundShape::from(b.clone()).contains_coord(c, 0.0);
            assert_eq!(composite.contains_coord(c, 0.0), each);
        }
    }

    #[test]
    fn composite_distance_is_nearest_child() {
        let composite: BoundShape = [
            MetaShape::circle(pt(0.0, 0.0), 1.0),
            MetaShape::circle(pt(10.0, 0.0), 1.0),
        ]
        .into_iter()
        .collect();
        assert!(is_float_equal(composite.distance_to(pt(4.0, 0.0), 0.0), 3.0));
        // Inside the first child: negative even though outside the second.
        assert!(composite.distance_to(pt(0.0, 0.0), 0.0) < 0.0);
    }

    #[test]
    fn container_box_monotonic_under_inflation() {
        let shapes = [
            BoundShape::from(MetaShape::line(pt(0.0, 0.0), pt(10.0, 2.0), 1.0)),
            BoundShape::from(MetaShape::polygon(vec![
                pt(0.0, 0.0),
                pt(4.0, 0.0),
                pt(2.0, 4.0),
            ])),
            BoundShape::from(MetaShape::circle(pt(1.0, 1.0), 2.0)),
        ];
        for s in &shapes {
            let base = s.container_box(0.0).unwrap();
            for d in [0.5, 2.0] {
                let grown = s.inflate(d).container_box(0.0).unwrap();
                assert_eq!(grown.union(base), grown, "inflated box must contain base");
            }
        }
    }

    #[test]
    fn line_container_box_pads_half_width() {
        let line = BoundShape::from(MetaShape::line(pt(0.0, 0.0), pt(10.0, 0.0), 4.0));
        let b = line.container_box(0.0).unwrap();
        assert!(is_float_equal(b.y0, -2.0));
        assert!(is_float_equal(b.y1, 2.0));
    }

    #[test]
    fn sphere_and_cylinder_behave_as_projections() {
        let s = BoundShape::from(MetaShape::sphere(pt(0.0, 0.0), 2.0));
        assert!(s.contains_coord(pt(1.5, 0.0), 0.0));
        let cyl = BoundShape::from(MetaShape::cylinder(pt(0.0, 0.0), pt(4.0, 0.0), 1.0));
        assert!(cyl.contains_coord(pt(2.0, 0.5), 0.0));
        assert!(!cyl.contains_coord(pt(2.0, 1.5), 0.0));
    }

    #[test]
    fn arc_band_membership() {
        // Right half ring, radius 5, width 2.
        let arc = BoundShape::from(MetaShape::arc(
            pt(0.0, 0.0),
            5.0,
            -core::f64::consts::FRAC_PI_2,
            core::f64::consts::FRAC_PI_2,
            2.0,
        ));
        assert!(arc.contains_coord(pt(5.0, 0.0), 0.0));
        assert!(arc.contains_coord(pt(0.0, 5.5), 0.0));
        // Opposite side of the circle is outside the sweep.
        assert!(!arc.contains_coord(pt(-5.0, 0.0), 0.0));
        // Inside the hole.
        assert!(!arc.contains_coord(pt(1.0, 0.0), 0.0));
    }

    #[test]
    fn box_tests() {
        let line = BoundShape::from(MetaShape::line(pt(2.0, 2.0), pt(8.0, 2.0), 2.0));
        assert!(line.inside_box(Rect::new(0.0, 0.0, 10.0, 10.0)));
        // Too tight: the half-width padding pokes out.
        assert!(!line.inside_box(Rect::new(2.0, 2.0, 8.0, 2.5)));
        assert!(line.intersects_box(Rect::new(5.0, 0.0, 6.0, 5.0)));
        // Raw coords only: the stroke width is ignored by the overlap test.
        assert!(!line.intersects_box(Rect::new(0.0, 2.5, 10.0, 5.0)));
    }

    #[test]
    fn point_inflates_to_circle() {
        let p = BoundShape::from(MetaShape::point(pt(3.0, 3.0)));
        assert!(!p.contains_coord(pt(3.5, 3.0), 0.0));
        assert!(p.contains_coord(pt(3.5, 3.0), 1.0));
        assert!(matches!(
            p.inflate(1.0),
            BoundShape::Simple(MetaShape::Circle { .. })
        ));
    }
}
