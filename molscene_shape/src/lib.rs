// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Molscene Shape: a Kurbo-native meta-shape algebra for scene bounds.
//!
//! Renderers for chemical scenes record, per drawn object, a *bound shape* —
//! a point, circle, line capsule, rect, arc, polyline, polygon, or a
//! composite list of those — describing where the object landed on a drawing
//! context. Interaction code (hot-tracking, selection, incremental redraw)
//! then asks geometric questions of those shapes. This crate is that algebra:
//! pure functions over shape descriptors, no I/O, no mutation of inputs.
//!
//! ## Conventions
//!
//! - Coordinates are [`kurbo::Point`] in context space; boxes are
//!   [`kurbo::Rect`].
//! - Signed distances are negative inside a shape; containment is boundary
//!   inclusive and agrees with `distance <= 0` for every shape type.
//! - Shapes recorded on 3D contexts (sphere, cylinder) carry projected 2D
//!   coordinates and behave as circle/line on the predicate surface.
//! - Inputs are assumed finite. Malformed descriptors (for example an empty
//!   polygon) are a contract violation checked by `debug_assert!`, not a
//!   runtime error.
//!
//! ## Example
//!
//! ```
//! use molscene_shape::{BoundShape, MetaShape};
//! use kurbo::Point;
//!
//! let bond = BoundShape::from(MetaShape::line(
//!     Point::new(0.0, 0.0),
//!     Point::new(10.0, 0.0),
//!     4.0,
//! ));
//! assert!(bond.contains_coord(Point::new(5.0, 1.0), 0.0));
//! assert!(!bond.contains_coord(Point::new(5.0, 3.0), 0.0));
//!
//! // Hot-track halo: inflate before testing.
//! assert!(bond.contains_coord(Point::new(5.0, 3.0), 2.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod ops;
mod types;

pub use types::{BoundShape, FLOAT_TOLERANCE, MetaShape, is_float_equal};
