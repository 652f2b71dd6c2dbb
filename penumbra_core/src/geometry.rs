// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry primitives shared by the shape kinds.
//!
//! Shapes live in full-resolution image pixel coordinates. [`Frame`] describes
//! the full image, [`Polyline`] is a dense outline produced from a
//! [`FloatBuffer`](crate::buffer::FloatBuffer), and the free functions cover
//! the distance and containment tests used by rasterization and hit-testing.

use alloc::vec::Vec;
use core::f64::consts::TAU;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{CubicBez, ParamCurve, Point, Rect, Vec2};

/// Dimensions of the full-resolution image a mask applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Frame {
    /// Creates a frame of the given size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the full image rectangle.
    #[must_use]
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Returns the image center.
    #[must_use]
    pub fn center(self) -> Point {
        self.rect().center()
    }

    /// Half the length of the image diagonal.
    ///
    /// Gradients express their compression relative to this length.
    #[must_use]
    pub fn half_diagonal(self) -> f64 {
        0.5 * f64::from(self.width).hypot(f64::from(self.height))
    }

    /// Smaller of the two dimensions.
    #[must_use]
    pub fn min_dimension(self) -> f64 {
        f64::from(self.width.min(self.height))
    }
}

/// A dense outline stored as interleaved `x, y` coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    coords: Vec<f64>,
}

impl Polyline {
    /// Wraps interleaved coordinates, usually harvested from a
    /// [`FloatBuffer`](crate::buffer::FloatBuffer).
    ///
    /// # Panics
    ///
    /// Panics if `coords` has odd length.
    #[must_use]
    pub fn from_coords(coords: Vec<f64>) -> Self {
        assert!(
            coords.len() % 2 == 0,
            "polyline coordinates must come in pairs (got {})",
            coords.len()
        );
        Self { coords }
    }

    /// Builds a polyline from points.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Self {
        let mut coords = Vec::with_capacity(points.len() * 2);
        for p in points {
            coords.push(p.x);
            coords.push(p.y);
        }
        Self { coords }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len() / 2
    }

    /// Returns `true` if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Returns point `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn point(&self, i: usize) -> Point {
        Point::new(self.coords[2 * i], self.coords[2 * i + 1])
    }

    /// Interleaved coordinates.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Iterates over the points.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.coords.chunks_exact(2).map(|c| Point::new(c[0], c[1]))
    }

    /// Iterates over the edges of the closed polygon (last point joins the first).
    pub fn closed_segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.len();
        (0..n).map(move |i| (self.point(i), self.point((i + 1) % n)))
    }

    /// Bounding rectangle of the points, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        bounds_of(self.points())
    }

    /// Returns a copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        let coords = self
            .coords
            .chunks_exact(2)
            .flat_map(|c| [c[0] + offset.x, c[1] + offset.y])
            .collect();
        Self { coords }
    }

    /// Even-odd containment test against the closed polygon.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(self.coords(), p)
    }
}

/// Bounding rectangle of a point sequence.
pub fn bounds_of(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut rect = Rect::from_points(first, first);
    for p in iter {
        rect = rect.union_pt(p);
    }
    Some(rect)
}

/// Distance from `p` to the segment `a`–`b`, and the parameter of the closest
/// point along the segment in `[0, 1]`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> (f64, f64) {
    let ab = b - a;
    let denom = ab.hypot2();
    if denom <= 1e-12 {
        return ((p - a).hypot(), 0.0);
    }
    let t = ((p - a).dot(ab) / denom).clamp(0.0, 1.0);
    let closest = a + ab * t;
    ((p - closest).hypot(), t)
}

/// Even-odd point-in-polygon test over interleaved coordinates.
///
/// Casts a horizontal ray from `p` and counts edge crossings.
#[must_use]
pub fn point_in_polygon(coords: &[f64], p: Point) -> bool {
    let n = coords.len() / 2;
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (coords[2 * i], coords[2 * i + 1]);
        let (xj, yj) = (coords[2 * j], coords[2 * j + 1]);
        if (yi > p.y) != (yj > p.y) && p.x < (xj - xi) * (p.y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Twice the signed area of the closed polygon.
///
/// Positive for counter-clockwise winding in a y-up system, which is
/// clockwise on screen.
#[must_use]
pub fn signed_area2(coords: &[f64]) -> f64 {
    let n = coords.len() / 2;
    let mut acc = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        acc += coords[2 * i] * coords[2 * j + 1] - coords[2 * j] * coords[2 * i + 1];
    }
    acc
}

/// Number of samples to take along a cubic so consecutive samples are about
/// `step` pixels apart, bounded by `[min, max]`.
#[must_use]
pub fn cubic_sample_count(bez: &CubicBez, step: f64, min: usize, max: usize) -> usize {
    // The control polygon bounds the arc length from above; the chord bounds it
    // from below. Their mean is a good enough estimate for sampling density.
    let net = (bez.p1 - bez.p0).hypot() + (bez.p2 - bez.p1).hypot() + (bez.p3 - bez.p2).hypot();
    let chord = (bez.p3 - bez.p0).hypot();
    let estimate = 0.5 * (net + chord) / step.max(1e-3);
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sample counts are clamped to a small range"
    )]
    let count = estimate.ceil().max(0.0) as usize;
    count.clamp(min.max(1), max.max(min.max(1)))
}

/// Evaluates the cubic at `count` evenly spaced parameters in `[0, 1)`.
///
/// The end point is omitted so consecutive segments can be chained without
/// duplicates.
pub fn sample_cubic(bez: &CubicBez, count: usize) -> impl Iterator<Item = (f64, Point)> + '_ {
    let count = count.max(1);
    (0..count).map(move |i| {
        let t = i as f64 / count as f64;
        (t, bez.eval(t))
    })
}

/// Handles for a smooth corner at `cur`, given its neighbours.
///
/// Returns `(incoming, outgoing)` control points following a Catmull-Rom
/// tangent scaled to a third of the neighbour distance.
#[must_use]
pub fn smooth_handles(prev: Point, cur: Point, next: Point) -> (Point, Point) {
    let tangent = next - prev;
    let len = tangent.hypot();
    if len <= 1e-12 {
        return (cur, cur);
    }
    let dir = tangent / len;
    let d_prev = (cur - prev).hypot() / 3.0;
    let d_next = (next - cur).hypot() / 3.0;
    (cur - dir * d_prev, cur + dir * d_next)
}

/// Wraps an angle into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle - TAU * (angle / TAU).floor();
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Unit vector at `angle` radians.
#[must_use]
pub fn direction(angle: f64) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Rotates `v` by `angle` radians.
#[must_use]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (s, c) = (angle.sin(), angle.cos());
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Linear interpolation between two scalars.
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
