// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Circles: a disc with a linear feather band around it.

use core::f64::consts::TAU;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Vec2};

use super::{Hit, HitTest, sanitize_length};
use crate::buffer::{AllocError, FloatBuffer};
use crate::config::RasterConfig;
use crate::geometry::{Polyline, direction};
use crate::raster::{MaskArea, Roi, fill_with, narrow};

/// A disc of `radius` around `center`, fading to zero over `border` pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Circle {
    /// Center in image pixels.
    pub center: Point,
    /// Radius of the fully opaque disc.
    pub radius: f64,
    /// Width of the feather band outside the disc.
    pub border: f64,
}

impl Circle {
    /// Creates a circle.
    #[must_use]
    pub const fn new(center: Point, radius: f64, border: f64) -> Self {
        Self {
            center,
            radius,
            border,
        }
    }

    /// Whether the circle covers no pixels.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.radius.is_nan() || self.radius <= 0.0
    }

    /// Opacity at image point `p`.
    #[must_use]
    pub fn opacity(&self, p: Point) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        let d = (p - self.center).hypot();
        if d <= self.radius {
            1.0
        } else if self.border > 0.0 && d < self.radius + self.border {
            narrow((self.radius + self.border - d) / self.border)
        } else {
            0.0
        }
    }

    /// Bounding box of the disc and its feather.
    #[must_use]
    pub fn area(&self) -> MaskArea {
        if self.is_degenerate() {
            return MaskArea::default();
        }
        let r = self.radius + self.border.max(0.0);
        MaskArea::covering(Rect::from_center_size(self.center, (2.0 * r, 2.0 * r)))
    }

    /// Sampled boundary circle.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        ring(self.center, self.radius, cfg)
    }

    /// Sampled outer edge of the feather band.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffer cannot grow.
    pub fn border_outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        ring(self.center, self.radius + self.border.max(0.0), cfg)
    }

    /// Writes the opacity of every ROI pixel into `out`.
    pub fn fill_roi(&self, roi: &Roi, out: &mut [f32]) {
        fill_with(roi, out, |p| self.opacity(p));
    }

    /// Classifies `p` against the circle.
    #[must_use]
    pub fn hit(&self, p: Point, tolerance: f64) -> Option<HitTest> {
        let d = (p - self.center).hypot();
        let outer = self.radius + self.border.max(0.0);
        if self.border > 0.0 && d > self.radius && d <= outer + tolerance {
            return Some(HitTest {
                hit: Hit::Border,
                distance: (d - outer).abs(),
            });
        }
        (d <= self.radius).then_some(HitTest {
            hit: Hit::Inside,
            distance: d,
        })
    }

    /// Multiplies the radius, keeping it at least `min`.
    pub fn scale_radius(&mut self, factor: f64, min: f64) {
        self.radius = (self.radius * factor).max(min);
    }

    /// Multiplies the feather width, keeping it at least `min`.
    pub fn scale_border(&mut self, factor: f64, min: f64) {
        self.border = (self.border * factor).max(min);
    }

    /// Clamps stored values into range; returns the number of fields changed.
    pub fn sanitize(&mut self) -> u32 {
        let mut changed = 0;
        changed += sanitize_point(&mut self.center);
        changed += sanitize_length(&mut self.radius);
        changed += sanitize_length(&mut self.border);
        changed
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }
}

/// Samples a full circle of `radius` around `center`.
pub(crate) fn ring(center: Point, radius: f64, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
    if radius.is_nan() || radius <= 0.0 {
        return Ok(Polyline::default());
    }
    let count = ring_samples(radius, cfg);
    let mut buf = FloatBuffer::init(2 * count, "circle")?;
    for i in 0..count {
        let p = center + direction(TAU * i as f64 / count as f64) * radius;
        buf.add_pair(p.x, p.y)?;
    }
    Ok(Polyline::from_coords(buf.harvest()))
}

pub(crate) fn ring_samples(circumference_radius: f64, cfg: &RasterConfig) -> usize {
    let estimate = TAU * circumference_radius / cfg.curve_step.max(1e-3);
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sample counts are clamped to a small range"
    )]
    let count = estimate.ceil().max(0.0) as usize;
    count.clamp(cfg.min_samples.max(3), cfg.max_samples.max(3))
}

pub(crate) fn sanitize_point(p: &mut Point) -> u32 {
    if p.x.is_finite() && p.y.is_finite() {
        0
    } else {
        *p = Point::ZERO;
        1
    }
}
