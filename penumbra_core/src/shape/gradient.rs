// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gradients: a continuous ramp across the whole frame.
//!
//! Positions are measured in a frame rotated by `rotation` around the anchor
//! and normalized by the frame's half diagonal. The signed distance of a
//! normalized point `(x, y)` from the (optionally parabolic) axis is
//! `y - curvature·x²`; dividing by `compression` and multiplying by
//! `1 + steepness` gives the ramp parameter that the transfer curve maps to an
//! opacity.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};

use super::circle::sanitize_point;
use super::{Hit, HitTest};
use crate::buffer::{AllocError, FloatBuffer};
use crate::config::RasterConfig;
use crate::geometry::{Frame, Polyline, direction, normalize_angle, rotate};
use crate::raster::{MaskArea, Roi, fill_with, narrow};

/// Smallest allowed compression.
pub const MIN_COMPRESSION: f64 = 0.001;

/// Largest allowed curvature magnitude.
pub const MAX_CURVATURE: f64 = 2.0;

/// Transfer curve of a gradient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientState {
    /// Straight ramp clamped to `[0, 1]`.
    Linear,
    /// Smooth S-shaped ramp.
    #[default]
    Sigmoid,
}

/// A ramp perpendicular to an axis through `anchor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gradient {
    /// A point on the axis, where opacity is one half.
    pub anchor: Point,
    /// Direction of the axis in radians, in `[0, 2π)`.
    pub rotation: f64,
    /// Width of the ramp relative to the half diagonal, in `(0, 1]`.
    pub compression: f64,
    /// Extra steepness of the ramp; `0` is neutral.
    pub steepness: f64,
    /// Parabolic bend of the axis, in `[-2, 2]`.
    pub curvature: f64,
    /// Transfer curve.
    pub state: GradientState,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            anchor: Point::ZERO,
            rotation: 0.0,
            compression: 0.5,
            steepness: 0.0,
            curvature: 0.0,
            state: GradientState::default(),
        }
    }
}

impl Gradient {
    /// Normalized coordinates of `p`: along the axis and across it.
    fn local(&self, p: Point, frame: Frame) -> Vec2 {
        let scale = frame.half_diagonal().max(1.0);
        rotate(p - self.anchor, -self.rotation) / scale
    }

    /// Signed distance of `p` from the axis in normalized units.
    #[must_use]
    pub fn axis_distance(&self, p: Point, frame: Frame) -> f64 {
        let v = self.local(p, frame);
        v.y - self.curvature * v.x * v.x
    }

    /// Opacity at image point `p`.
    #[must_use]
    pub fn opacity(&self, p: Point, frame: Frame) -> f32 {
        let t = self.axis_distance(p, frame) / self.compression.max(MIN_COMPRESSION)
            * (1.0 + self.steepness.max(0.0));
        let v = match self.state {
            GradientState::Linear => 0.5 + 0.5 * t,
            GradientState::Sigmoid => 0.5 + 0.5 * t / (1.0 + t * t).sqrt(),
        };
        narrow(v.clamp(0.0, 1.0))
    }

    /// The full frame: a gradient has no bounded extent.
    #[must_use]
    pub fn area(&self, frame: Frame) -> MaskArea {
        MaskArea::covering(frame.rect())
    }

    /// Sampled axis curve across the frame.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn outline(&self, frame: Frame, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        self.curve(frame, 0.0, cfg)
    }

    /// The two curves where the ramp reaches its ends, joined into one band
    /// outline.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn border_outline(&self, frame: Frame, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        let reach = self.compression.max(MIN_COMPRESSION) / (1.0 + self.steepness.max(0.0));
        let upper = self.curve(frame, reach, cfg)?;
        let lower = self.curve(frame, -reach, cfg)?;
        let mut points: alloc::vec::Vec<Point> = upper.points().collect();
        let lower: alloc::vec::Vec<Point> = lower.points().collect();
        points.extend(lower.into_iter().rev());
        Ok(Polyline::from_points(&points))
    }

    fn curve(&self, frame: Frame, offset: f64, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        let scale = frame.half_diagonal().max(1.0);
        let count = super::circle::ring_samples(scale / core::f64::consts::PI, cfg);
        let mut buf = FloatBuffer::init(2 * (count + 1), "gradient")?;
        for i in 0..=count {
            let x = -1.0 + 2.0 * i as f64 / count as f64;
            let y = self.curvature * x * x + offset;
            let p = self.anchor + rotate(Vec2::new(x, y) * scale, self.rotation);
            buf.add_pair(p.x, p.y)?;
        }
        Ok(Polyline::from_coords(buf.harvest()))
    }

    /// Position of the rotation handle.
    #[must_use]
    pub fn rotation_handle(&self, frame: Frame) -> Point {
        self.anchor + direction(self.rotation) * (0.1 * frame.min_dimension().max(10.0))
    }

    /// Classifies `p` against the gradient's controls.
    #[must_use]
    pub fn hit(&self, p: Point, tolerance: f64, frame: Frame) -> Option<HitTest> {
        let anchor_d = (p - self.anchor).hypot();
        if anchor_d <= tolerance {
            return Some(HitTest {
                hit: Hit::Corner(0),
                distance: anchor_d,
            });
        }
        let rot_d = (p - self.rotation_handle(frame)).hypot();
        if rot_d <= tolerance {
            return Some(HitTest {
                hit: Hit::Rotation,
                distance: rot_d,
            });
        }
        let scale = frame.half_diagonal().max(1.0);
        let dist = self.axis_distance(p, frame) * scale;
        if dist.abs() <= tolerance {
            return Some(HitTest {
                hit: Hit::Segment(0),
                distance: dist.abs(),
            });
        }
        let reach =
            self.compression.max(MIN_COMPRESSION) / (1.0 + self.steepness.max(0.0)) * scale;
        let off = (dist.abs() - reach).abs();
        (off <= tolerance).then_some(HitTest {
            hit: Hit::Border,
            distance: off,
        })
    }

    /// Points the axis at `p`.
    pub fn aim_at(&mut self, p: Point) {
        let v = p - self.anchor;
        if v.hypot() > 0.0 {
            self.rotation = normalize_angle(v.y.atan2(v.x));
        }
    }

    /// Sets the compression so the ramp's end passes through `p`.
    pub fn compress_to(&mut self, p: Point, frame: Frame) {
        let d = self.axis_distance(p, frame).abs() * (1.0 + self.steepness.max(0.0));
        self.compression = d.clamp(MIN_COMPRESSION, 1.0);
    }

    /// Multiplies the compression, clamped to its valid range.
    pub fn scale_compression(&mut self, factor: f64) {
        self.compression = (self.compression * factor).clamp(MIN_COMPRESSION, 1.0);
    }

    /// Adds `delta` to the curvature, clamped to its valid range.
    pub fn adjust_curvature(&mut self, delta: f64) {
        self.curvature = (self.curvature + delta).clamp(-MAX_CURVATURE, MAX_CURVATURE);
    }

    /// Clamps stored values into range; returns the number of fields changed.
    pub fn sanitize(&mut self) -> u32 {
        let mut changed = sanitize_point(&mut self.anchor);
        let mut fix = |v: &mut f64, lo: f64, hi: f64, fallback: f64| {
            let fixed = if v.is_finite() { v.clamp(lo, hi) } else { fallback };
            if fixed.to_bits() != v.to_bits() {
                *v = fixed;
                changed += 1;
            }
        };
        fix(&mut self.compression, MIN_COMPRESSION, 1.0, 0.5);
        fix(&mut self.steepness, 0.0, f64::MAX, 0.0);
        fix(&mut self.curvature, -MAX_CURVATURE, MAX_CURVATURE, 0.0);
        let rotation = normalize_angle(self.rotation);
        if rotation.to_bits() != self.rotation.to_bits() {
            self.rotation = rotation;
            changed += 1;
        }
        changed
    }

    /// Writes the opacity of every ROI pixel into `out`.
    pub fn fill_roi(&self, frame: Frame, roi: &Roi, out: &mut [f32]) {
        fill_with(roi, out, |p| self.opacity(p, frame));
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.anchor += delta;
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_2;

    use super::*;

    const FRAME: Frame = Frame::new(600, 800);

    fn horizontal(state: GradientState) -> Gradient {
        Gradient {
            anchor: Point::new(300.0, 400.0),
            state,
            ..Gradient::default()
        }
    }

    #[test]
    fn half_opacity_on_axis() {
        for state in [GradientState::Linear, GradientState::Sigmoid] {
            let g = horizontal(state);
            assert_eq!(g.opacity(Point::new(10.0, 400.0), FRAME), 0.5);
        }
    }

    #[test]
    fn linear_ramp_saturates_at_compression() {
        // Half diagonal of 600x800 is 500; compression 0.5 puts the ends 250px away.
        let g = horizontal(GradientState::Linear);
        assert_eq!(g.opacity(Point::new(300.0, 650.0), FRAME), 1.0);
        assert_eq!(g.opacity(Point::new(300.0, 525.0), FRAME), 0.75);
        assert_eq!(g.opacity(Point::new(300.0, 150.0), FRAME), 0.0);
    }

    #[test]
    fn sigmoid_is_monotonic_and_bounded() {
        let g = horizontal(GradientState::Sigmoid);
        let mut last = -1.0;
        for y in (0..800).step_by(20) {
            let v = g.opacity(Point::new(300.0, f64::from(y)), FRAME);
            assert!(v >= last, "not monotonic at y={y}");
            assert!((0.0..=1.0).contains(&v));
            last = v;
        }
    }

    #[test]
    fn area_is_the_whole_frame() {
        let a = horizontal(GradientState::Linear).area(FRAME);
        assert_eq!((a.x, a.y, a.width, a.height), (0, 0, 600, 800));
    }

    #[test]
    fn curvature_bends_the_axis() {
        let mut g = horizontal(GradientState::Linear);
        g.curvature = 1.0;
        // At x = 250px (0.5 normalized) the axis sits 0.25 * 500 = 125px lower.
        assert_eq!(g.opacity(Point::new(550.0, 525.0), FRAME), 0.5);
    }

    #[test]
    fn controls_are_hit() {
        let mut g = horizontal(GradientState::Linear);
        assert_eq!(g.hit(g.anchor, 2.0, FRAME).unwrap().hit, Hit::Corner(0));
        assert_eq!(g.hit(g.rotation_handle(FRAME), 2.0, FRAME).unwrap().hit, Hit::Rotation);
        assert_eq!(g.hit(Point::new(100.0, 401.0), 2.0, FRAME).unwrap().hit, Hit::Segment(0));
        assert_eq!(g.hit(Point::new(100.0, 651.0), 2.0, FRAME).unwrap().hit, Hit::Border);
        assert!(g.hit(Point::new(100.0, 500.0), 2.0, FRAME).is_none());
        g.aim_at(Point::new(300.0, 500.0));
        assert!((g.rotation - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn sanitize_clamps_ranges() {
        let mut g = Gradient {
            compression: 0.0,
            curvature: 9.0,
            steepness: f64::NAN,
            ..Gradient::default()
        };
        assert_eq!(g.sanitize(), 3);
        assert_eq!(g.compression, MIN_COMPRESSION);
        assert_eq!(g.curvature, MAX_CURVATURE);
        assert_eq!(g.steepness, 0.0);
    }
}
