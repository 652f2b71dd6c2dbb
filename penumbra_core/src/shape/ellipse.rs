// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rotated ellipses with an equidistant or proportional feather.

use core::f64::consts::{FRAC_PI_2, PI, TAU};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Vec2};

use super::circle::sanitize_point;
use super::{Hit, HitTest, sanitize_length};
use crate::buffer::{AllocError, FloatBuffer};
use crate::config::RasterConfig;
use crate::geometry::{Polyline, direction, normalize_angle, rotate};
use crate::raster::{MaskArea, Roi, fill_with, narrow};

/// How an ellipse's border width is measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EllipseBorder {
    /// `border` is a distance in pixels added to both radii.
    #[default]
    Equidistant,
    /// `border` is a fraction of each radius.
    Proportional,
}

/// An ellipse with radii `radii.x` along `rotation` and `radii.y` across it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ellipse {
    /// Center in image pixels.
    pub center: Point,
    /// Semi-axis lengths.
    pub radii: Vec2,
    /// Rotation of the first axis in radians, in `[0, 2π)`.
    pub rotation: f64,
    /// Feather width; see [`EllipseBorder`].
    pub border: f64,
    /// How `border` is interpreted.
    pub border_mode: EllipseBorder,
}

impl Ellipse {
    /// Creates an ellipse.
    #[must_use]
    pub fn new(
        center: Point,
        radii: Vec2,
        rotation: f64,
        border: f64,
        border_mode: EllipseBorder,
    ) -> Self {
        Self {
            center,
            radii,
            rotation: normalize_angle(rotation),
            border,
            border_mode,
        }
    }

    /// Whether the ellipse covers no pixels.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.radii.x.is_nan() || self.radii.y.is_nan() || self.radii.x <= 0.0 || self.radii.y <= 0.0
    }

    /// Semi-axes of the outer edge of the feather band.
    #[must_use]
    pub fn outer_radii(&self) -> Vec2 {
        let b = self.border.max(0.0);
        match self.border_mode {
            EllipseBorder::Equidistant => Vec2::new(self.radii.x + b, self.radii.y + b),
            EllipseBorder::Proportional => self.radii * (1.0 + b),
        }
    }

    /// Opacity at image point `p`.
    ///
    /// The feather is linear along each ray from the center, between the
    /// boundary and the outer ellipse.
    #[must_use]
    pub fn opacity(&self, p: Point) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        let local = rotate(p - self.center, -self.rotation);
        let d = local.hypot();
        if d == 0.0 {
            return 1.0;
        }
        let theta = local.y.atan2(local.x);
        let inner = polar_radius(self.radii, theta);
        if d <= inner {
            return 1.0;
        }
        let outer = polar_radius(self.outer_radii(), theta);
        if outer > inner && d < outer {
            narrow((outer - d) / (outer - inner))
        } else {
            0.0
        }
    }

    /// Bounding box of the ellipse and its feather.
    #[must_use]
    pub fn area(&self) -> MaskArea {
        if self.is_degenerate() {
            return MaskArea::default();
        }
        let r = self.outer_radii();
        let (s, c) = (self.rotation.sin(), self.rotation.cos());
        let hx = (r.x * c).hypot(r.y * s);
        let hy = (r.x * s).hypot(r.y * c);
        MaskArea::covering(Rect::from_center_size(self.center, (2.0 * hx, 2.0 * hy)))
    }

    /// Sampled boundary.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        sample_ellipse(self.center, self.radii, self.rotation, cfg)
    }

    /// Sampled outer edge of the feather band.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn border_outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        sample_ellipse(self.center, self.outer_radii(), self.rotation, cfg)
    }

    /// End point of axis handle `i` (`0` and `2` on the first axis, `1` and
    /// `3` on the second).
    #[must_use]
    pub fn axis_point(&self, i: usize) -> Point {
        let r = if i % 2 == 0 { self.radii.x } else { self.radii.y };
        let angle = self.rotation + FRAC_PI_2 * (i % 4) as f64;
        self.center + direction(angle) * r
    }

    /// Writes the opacity of every ROI pixel into `out`.
    pub fn fill_roi(&self, roi: &Roi, out: &mut [f32]) {
        fill_with(roi, out, |p| self.opacity(p));
    }

    /// Classifies `p` against the ellipse.
    #[must_use]
    pub fn hit(&self, p: Point, tolerance: f64) -> Option<HitTest> {
        for i in 0..4 {
            let d = (p - self.axis_point(i)).hypot();
            if d <= tolerance {
                return Some(HitTest {
                    hit: Hit::Axis(i),
                    distance: d,
                });
            }
        }
        if self.is_degenerate() {
            return None;
        }
        let local = rotate(p - self.center, -self.rotation);
        let d = local.hypot();
        let theta = local.y.atan2(local.x);
        let inner = polar_radius(self.radii, theta);
        let outer = polar_radius(self.outer_radii(), theta);
        if self.border > 0.0 && d > inner && d <= outer + tolerance {
            return Some(HitTest {
                hit: Hit::Border,
                distance: (d - outer).abs(),
            });
        }
        (d <= inner).then_some(HitTest {
            hit: Hit::Inside,
            distance: d,
        })
    }

    /// Moves axis handle `i` to `p`: the matching radius follows the distance
    /// and the rotation follows the direction.
    pub fn drag_axis(&mut self, i: usize, p: Point, min: f64) {
        let v = p - self.center;
        let len = v.hypot().max(min);
        if i % 2 == 0 {
            self.radii.x = len;
        } else {
            self.radii.y = len;
        }
        if v.hypot() > 0.0 {
            let offset = FRAC_PI_2 * (i % 4) as f64;
            self.rotation = normalize_angle(v.y.atan2(v.x) - offset);
        }
    }

    /// Multiplies both radii, keeping each at least `min`.
    pub fn scale_radii(&mut self, factor: f64, min: f64) {
        self.radii = Vec2::new(
            (self.radii.x * factor).max(min),
            (self.radii.y * factor).max(min),
        );
    }

    /// Multiplies the feather width, keeping it at least `min`.
    pub fn scale_border(&mut self, factor: f64, min: f64) {
        self.border = (self.border * factor).max(min);
    }

    /// Adds `delta` radians to the rotation.
    pub fn rotate_by(&mut self, delta: f64) {
        self.rotation = normalize_angle(self.rotation + delta);
    }

    /// Clamps stored values into range; returns the number of fields changed.
    pub fn sanitize(&mut self) -> u32 {
        let mut changed = sanitize_point(&mut self.center);
        changed += sanitize_length(&mut self.radii.x);
        changed += sanitize_length(&mut self.radii.y);
        changed += sanitize_length(&mut self.border);
        let rotation = normalize_angle(self.rotation);
        if rotation.to_bits() != self.rotation.to_bits() {
            self.rotation = rotation;
            changed += 1;
        }
        changed
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }
}

/// Distance from the center to the ellipse boundary along angle `theta`
/// (measured in the ellipse's own frame).
fn polar_radius(radii: Vec2, theta: f64) -> f64 {
    let (s, c) = (theta.sin(), theta.cos());
    let denom = (radii.y * c).hypot(radii.x * s);
    if denom <= 0.0 {
        0.0
    } else {
        radii.x * radii.y / denom
    }
}

/// Ramanujan's approximation of the perimeter.
fn perimeter(radii: Vec2) -> f64 {
    let (a, b) = (radii.x, radii.y);
    PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
}

pub(crate) fn sample_ellipse(
    center: Point,
    radii: Vec2,
    rotation: f64,
    cfg: &RasterConfig,
) -> Result<Polyline, AllocError> {
    if radii.x.is_nan() || radii.y.is_nan() || radii.x <= 0.0 || radii.y <= 0.0 {
        return Ok(Polyline::default());
    }
    let count = super::circle::ring_samples(perimeter(radii) / TAU, cfg);
    let mut buf = FloatBuffer::init(2 * count, "ellipse")?;
    for i in 0..count {
        let t = TAU * i as f64 / count as f64;
        let local = Vec2::new(radii.x * t.cos(), radii.y * t.sin());
        let p = center + rotate(local, rotation);
        buf.add_pair(p.x, p.y)?;
    }
    Ok(Polyline::from_coords(buf.harvest()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> Ellipse {
        Ellipse::new(
            Point::new(200.0, 100.0),
            Vec2::new(80.0, 40.0),
            0.0,
            10.0,
            EllipseBorder::Equidistant,
        )
    }

    #[test]
    fn opacity_along_axes() {
        let e = wide();
        assert_eq!(e.opacity(Point::new(200.0, 100.0)), 1.0);
        assert_eq!(e.opacity(Point::new(279.0, 100.0)), 1.0);
        assert_eq!(e.opacity(Point::new(285.0, 100.0)), 0.5);
        assert_eq!(e.opacity(Point::new(200.0, 145.0)), 0.5);
        assert_eq!(e.opacity(Point::new(200.0, 151.0)), 0.0);
    }

    #[test]
    fn proportional_border_scales_radii() {
        let mut e = wide();
        e.border_mode = EllipseBorder::Proportional;
        e.border = 0.5;
        assert_eq!(e.outer_radii(), Vec2::new(120.0, 60.0));
        assert_eq!(e.opacity(Point::new(300.0, 100.0)), 0.5);
    }

    #[test]
    fn rotated_area_swaps_extents() {
        let mut e = wide();
        e.rotation = FRAC_PI_2;
        let a = e.area();
        assert_eq!(a.width, 100);
        assert_eq!(a.height, 180);
    }

    #[test]
    fn outline_points_satisfy_equation() {
        let e = Ellipse::new(
            Point::new(0.0, 0.0),
            Vec2::new(30.0, 10.0),
            0.7,
            0.0,
            EllipseBorder::Equidistant,
        );
        let line = e.outline(&RasterConfig::full()).unwrap();
        assert!(line.len() > 100);
        for p in line.points() {
            let l = rotate(p.to_vec2(), -0.7);
            let (u, w) = (l.x / 30.0, l.y / 10.0);
            let v = u * u + w * w;
            assert!((v - 1.0).abs() < 1e-9, "off the ellipse by {v}");
        }
    }

    #[test]
    fn axis_drag_sets_radius_and_rotation() {
        let mut e = wide();
        e.drag_axis(1, Point::new(150.0, 100.0), 1.0);
        assert!((e.radii.y - 50.0).abs() < 1e-9);
        assert!((e.rotation - FRAC_PI_2).abs() < 1e-9, "rotation {}", e.rotation);
        assert_eq!(e.hit(e.axis_point(1), 2.0).unwrap().hit, Hit::Axis(1));
    }

    #[test]
    fn feather_band_is_border() {
        let e = wide();
        for p in [Point::new(285.0, 100.0), Point::new(200.0, 145.0)] {
            assert_eq!(e.opacity(p), 0.5);
            let hit = e.hit(p, 2.0).expect("feather band is pickable");
            assert_eq!(hit.hit, Hit::Border);
        }
        assert_eq!(e.hit(Point::new(240.0, 100.0), 2.0).unwrap().hit, Hit::Inside);
        assert!(e.hit(Point::new(300.0, 100.0), 2.0).is_none());
    }

    #[test]
    fn degenerate_ellipse_is_empty() {
        let mut e = wide();
        e.radii.y = 0.0;
        assert!(e.area().is_empty());
        assert_eq!(e.opacity(e.center), 0.0);
    }
}
