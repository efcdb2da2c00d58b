// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape descriptor types: simple meta shapes and recursive composites.

use alloc::vec::Vec;
use kurbo::Point;

/// Relative tolerance used for degenerate-segment detection and point equality.
pub const FLOAT_TOLERANCE: f64 = 1e-10;

/// Tolerant float equality. Inputs are assumed finite.
#[inline]
pub fn is_float_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_TOLERANCE * (1.0 + a.abs().max(b.abs()))
}

/// A simple (non-composite) bound shape on a drawing context.
///
/// Coordinates are context-space. The 3D variants ([`MetaShape::Sphere`],
/// [`MetaShape::Cylinder`]) carry the projected 2D coordinates recorded for a
/// 3D context; on the 2D predicate surface they behave as a circle and a line
/// of width `2 * radius`.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaShape {
    /// A single point.
    Point {
        /// The point's position.
        pos: Point,
    },
    /// A filled circle.
    Circle {
        /// Center of the circle.
        center: Point,
        /// Radius of the circle.
        radius: f64,
    },
    /// A line segment with a stroke width (a capsule region).
    Line {
        /// One end of the segment.
        start: Point,
        /// The other end of the segment.
        end: Point,
        /// Full stroke width; the capsule extends `width / 2` to each side.
        width: f64,
    },
    /// An axis-aligned rectangle given by two opposite corners, in either order.
    Rect {
        /// One corner.
        corner1: Point,
        /// The diagonally opposite corner.
        corner2: Point,
    },
    /// A circular arc band between two angles, with a stroke width.
    Arc {
        /// Center of the supporting circle.
        center: Point,
        /// Radius of the supporting circle.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians; the band sweeps counter-clockwise from
        /// `start_angle` to `end_angle`.
        end_angle: f64,
        /// Full stroke width of the band.
        width: f64,
    },
    /// An open chain of segments with a shared stroke width.
    Polyline {
        /// The chain's vertices, at least one.
        coords: Vec<Point>,
        /// Full stroke width of every segment.
        width: f64,
    },
    /// A closed polygon; the last vertex connects back to the first.
    Polygon {
        /// The polygon's vertices, at least one.
        coords: Vec<Point>,
    },
    /// A sphere on a 3D context, recorded by its projected center.
    Sphere {
        /// Projected center.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// A cylinder on a 3D context, recorded by its projected axis.
    Cylinder {
        /// One projected end of the axis.
        start: Point,
        /// The other projected end.
        end: Point,
        /// Radius.
        radius: f64,
    },
}

impl MetaShape {
    /// A point shape.
    pub const fn point(pos: Point) -> Self {
        Self::Point { pos }
    }

    /// A circle shape.
    pub const fn circle(center: Point, radius: f64) -> Self {
        Self::Circle { center, radius }
    }

    /// A line shape with the given full stroke width.
    pub const fn line(start: Point, end: Point, width: f64) -> Self {
        Self::Line { start, end, width }
    }

    /// A rectangle shape from two opposite corners (either ordering).
    pub const fn rect(corner1: Point, corner2: Point) -> Self {
        Self::Rect { corner1, corner2 }
    }

    /// An arc band shape.
    pub const fn arc(
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        width: f64,
    ) -> Self {
        Self::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            width,
        }
    }

    /// A polyline shape. `coords` must not be empty.
    pub fn polyline(coords: Vec<Point>, width: f64) -> Self {
        debug_assert!(!coords.is_empty(), "polyline requires at least one coord");
        Self::Polyline { coords, width }
    }

    /// A polygon shape. `coords` must not be empty.
    pub fn polygon(coords: Vec<Point>) -> Self {
        debug_assert!(!coords.is_empty(), "polygon requires at least one coord");
        Self::Polygon { coords }
    }

    /// A sphere shape (projected coordinates).
    pub const fn sphere(center: Point, radius: f64) -> Self {
        Self::Sphere { center, radius }
    }

    /// A cylinder shape (projected coordinates).
    pub const fn cylinder(start: Point, end: Point, radius: f64) -> Self {
        Self::Cylinder { start, end, radius }
    }
}

/// A bound shape: a simple [`MetaShape`] or an ordered composite of child
/// shapes (recursively).
///
/// Composites arise when one drawn object maps to several shapes, for example
/// a multi-center bond rendered as multiple segments.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundShape {
    /// A single simple shape.
    Simple(MetaShape),
    /// An ordered list of child shapes.
    Composite(Vec<BoundShape>),
}

impl BoundShape {
    /// Whether this shape is a composite (a list of child shapes).
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

impl From<MetaShape> for BoundShape {
    fn from(s: MetaShape) -> Self {
        Self::Simple(s)
    }
}

impl FromIterator<MetaShape> for BoundShape {
    fn from_iter<I: IntoIterator<Item = MetaShape>>(iter: I) -> Self {
        Self::Composite(iter.into_iter().map(Self::Simple).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_detection() {
        let p = BoundShape::from(MetaShape::point(Point::new(1.0, 2.0)));
        assert!(!p.is_composite());
        let c: BoundShape = [
            MetaShape::point(Point::ZERO),
            MetaShape::circle(Point::ZERO, 1.0),
        ]
        .into_iter()
        .collect();
        assert!(c.is_composite());
    }

    #[test]
    fn float_equality_tolerates_rounding() {
        assert!(is_float_equal(0.1 + 0.2, 0.3));
        assert!(!is_float_equal(0.1, 0.2));
        assert!(is_float_equal(1e12 + 0.000_01, 1e12));
    }
}
