// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Open brush strokes with per-node width, hardness and density.
//!
//! A stroke's opacity at distance `d` from its centerline, where the local
//! half-width is `w`, hardness `h` and density `ρ`, is `ρ` out to `h·w` and
//! falls linearly to zero at `w`.

use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::{Point, Vec2};

use super::path::{hit_controls, sanitize_corners, scale_corners};
use super::spline::{self, Corner, CornerState, Flattened};
use super::{Hit, HitTest};
use crate::buffer::AllocError;
use crate::config::RasterConfig;
use crate::geometry::{Polyline, lerp};
use crate::raster::{MaskArea, Roi, narrow, sweep_segments_with};

/// One stroke node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushCorner {
    /// Position, handles and half-width (`node.border`).
    pub node: Corner,
    /// Peak opacity in `[0, 1]`.
    pub density: f64,
    /// Fraction of the half-width that is fully opaque, in `[0, 1]`.
    pub hardness: f64,
}

impl BrushCorner {
    /// A node at `point`.
    #[must_use]
    pub fn new(point: Point, width: f64, hardness: f64, density: f64) -> Self {
        Self {
            node: Corner::new(point, width),
            density,
            hardness,
        }
    }
}

impl AsRef<Corner> for BrushCorner {
    fn as_ref(&self) -> &Corner {
        &self.node
    }
}

impl AsMut<Corner> for BrushCorner {
    fn as_mut(&mut self) -> &mut Corner {
        &mut self.node
    }
}

/// An open stroke through `nodes`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Brush {
    /// Nodes in stroke order.
    pub nodes: Vec<BrushCorner>,
}

/// Opacity of a stroke profile at distance `d` for half-width `w`.
#[must_use]
pub fn stroke_profile(d: f64, w: f64, hardness: f64, density: f64) -> f64 {
    if w <= 0.0 || d >= w {
        return 0.0;
    }
    let solid = hardness.clamp(0.0, 1.0) * w;
    let v = if d <= solid {
        1.0
    } else {
        (w - d) / (w - solid)
    };
    v * density.clamp(0.0, 1.0)
}

impl Brush {
    /// Whether the stroke has no nodes.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recomputes the handles of every [`CornerState::Normal`] node.
    pub fn smooth(&mut self) {
        spline::auto_smooth(&mut self.nodes, false);
    }

    /// Flattens the centerline.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn flatten(&self, cfg: &RasterConfig) -> Result<Flattened, AllocError> {
        spline::flatten(&self.nodes, false, cfg)
    }

    /// Half-width at every sample of `flat`.
    #[must_use]
    pub fn widths(&self, flat: &Flattened) -> Vec<f64> {
        flat.interpolate(&self.nodes, |n, entering| {
            n.node.border[usize::from(entering)].max(0.0)
        })
    }

    /// Sampled centerline.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        Ok(self.flatten(cfg)?.line)
    }

    /// Sampled outline of the stroke's full width.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn border_outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        let flat = self.flatten(cfg)?;
        let widths = self.widths(&flat);
        Ok(spline::offset_open(&flat.line, &widths))
    }

    /// Bounding box of the stroke.
    #[must_use]
    pub fn area(&self) -> MaskArea {
        let Some(bounds) = spline::control_bounds(&self.nodes) else {
            return MaskArea::default();
        };
        let w = spline::max_border(&self.nodes);
        if w <= 0.0 {
            return MaskArea::default();
        }
        MaskArea::covering(bounds.inflate(w, w))
    }

    /// Sweeps the stroke profile into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the centerline cannot be flattened.
    pub fn fill_roi(&self, roi: &Roi, cfg: &RasterConfig, out: &mut [f32]) -> Result<(), AllocError> {
        if self.is_degenerate() {
            return Ok(());
        }
        let flat = self.flatten(cfg)?;
        let widths = self.widths(&flat);
        let hardness = flat.interpolate(&self.nodes, |n, _| n.hardness);
        let density = flat.interpolate(&self.nodes, |n, _| n.density);
        let n = flat.line.len();
        sweep_segments_with(roi, &flat.line, &widths, false, out, |s, t, d, w| {
            let next = (s + 1).min(n - 1);
            let h = lerp(hardness[s], hardness[next], t);
            let rho = lerp(density[s], density[next], t);
            narrow(stroke_profile(d, w, h, rho))
        });
        Ok(())
    }

    /// Classifies `p` against the stroke.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the centerline cannot be flattened.
    pub fn hit(
        &self,
        p: Point,
        tolerance: f64,
        cfg: &RasterConfig,
    ) -> Result<Option<HitTest>, AllocError> {
        if let Some(hit) = hit_controls(&self.nodes, false, p, tolerance) {
            return Ok(Some(hit));
        }
        let flat = self.flatten(cfg)?;
        let Some((seg, t, d)) = spline::nearest_on_curve(&flat, false, p) else {
            return Ok(None);
        };
        if d <= tolerance {
            return Ok(Some(HitTest {
                hit: Hit::Segment(seg),
                distance: d,
            }));
        }
        let a = &self.nodes[seg].node;
        let b = &self.nodes[(seg + 1).min(self.nodes.len() - 1)].node;
        let w = lerp(a.border[0], b.border[1], t);
        Ok((d <= w).then_some(HitTest {
            hit: Hit::Inside,
            distance: d,
        }))
    }

    /// Inserts a node on segment `seg` at curve parameter `t` and returns its
    /// index.
    pub fn insert_corner(&mut self, seg: usize, t: f64) -> usize {
        let n = self.nodes.len();
        let (a, b) = (self.nodes[seg], self.nodes[(seg + 1) % n]);
        let node = spline::split_segment(&mut self.nodes, seg, t);
        self.nodes.insert(
            seg + 1,
            BrushCorner {
                node,
                density: lerp(a.density, b.density, t),
                hardness: lerp(a.hardness, b.hardness, t),
            },
        );
        seg + 1
    }

    /// Removes node `i` if at least `min_len` nodes would remain.
    pub fn remove_corner(&mut self, i: usize, min_len: usize) -> bool {
        if i >= self.nodes.len() || self.nodes.len() <= min_len {
            return false;
        }
        self.nodes.remove(i);
        self.smooth();
        true
    }

    /// Switches node `i` between automatic and user handles.
    pub fn toggle_corner(&mut self, i: usize) {
        if let Some(n) = self.nodes.get_mut(i) {
            n.node.state = match n.node.state {
                CornerState::Normal => CornerState::User,
                CornerState::User => CornerState::Normal,
            };
        }
        self.smooth();
    }

    /// Horizontal ordering of node `i` relative to its neighbours.
    #[must_use]
    pub fn x_ordering(&self, i: usize) -> Option<Ordering> {
        spline::x_ordering(&self.nodes, i, false)
    }

    /// Position of the width handle of node `i`.
    #[must_use]
    pub fn feather_handle(&self, i: usize) -> Point {
        spline::feather_handle(&self.nodes, i, false)
    }

    /// Multiplies every node's distance from the centroid.
    pub fn scale(&mut self, factor: f64) {
        scale_corners(&mut self.nodes, factor);
    }

    /// Multiplies every node's width, keeping each at least `min`.
    pub fn scale_width(&mut self, factor: f64, min: f64) {
        for n in &mut self.nodes {
            n.node.border = n.node.border.map(|b| (b * factor).max(min));
        }
    }

    /// Adds `delta` to every node's hardness, clamped to `[0, 1]`.
    pub fn adjust_hardness(&mut self, delta: f64) {
        for n in &mut self.nodes {
            n.hardness = (n.hardness + delta).clamp(0.0, 1.0);
        }
    }

    /// Drops non-finite nodes and clamps widths, hardness and density;
    /// returns the number of fields changed.
    pub fn sanitize(&mut self) -> u32 {
        let mut changed = sanitize_corners(&mut self.nodes);
        for n in &mut self.nodes {
            for v in [&mut n.density, &mut n.hardness] {
                let clamped = if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 };
                if clamped.to_bits() != v.to_bits() {
                    *v = clamped;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        for n in &mut self.nodes {
            n.node.translate(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn line(hardness: f64, density: f64) -> Brush {
        let mut brush = Brush {
            nodes: vec![
                BrushCorner::new(Point::new(10.0, 20.0), 10.0, hardness, density),
                BrushCorner::new(Point::new(90.0, 20.0), 10.0, hardness, density),
            ],
        };
        brush.smooth();
        brush
    }

    #[test]
    fn profile_has_solid_core_and_linear_falloff() {
        assert_eq!(stroke_profile(0.0, 10.0, 0.5, 1.0), 1.0);
        assert_eq!(stroke_profile(5.0, 10.0, 0.5, 1.0), 1.0);
        assert_eq!(stroke_profile(7.5, 10.0, 0.5, 1.0), 0.5);
        assert_eq!(stroke_profile(10.0, 10.0, 0.5, 1.0), 0.0);
        assert_eq!(stroke_profile(0.0, 10.0, 0.5, 0.25), 0.25);
    }

    #[test]
    fn stroke_raster_follows_profile() {
        let brush = line(0.5, 1.0);
        let area = brush.area();
        assert_eq!((area.x, area.y, area.width, area.height), (0, 10, 100, 20));
        let roi = Roi::from_area(area);
        let mut out = vec![0.0; roi.pixel_count()];
        brush.fill_roi(&roi, &RasterConfig::full(), &mut out).unwrap();
        let at = |x: usize, y: usize| out[(y - 10) * 100 + x];
        assert_eq!(at(50, 20), 1.0);
        assert_eq!(at(50, 25), 1.0);
        assert!((at(50, 27) - 0.6).abs() < 1e-5, "got {}", at(50, 27));
        assert_eq!(at(50, 10), 0.0);
    }

    #[test]
    fn density_caps_opacity() {
        let brush = line(1.0, 0.4);
        let roi = Roi::from_area(brush.area());
        let mut out = vec![0.0; roi.pixel_count()];
        brush.fill_roi(&roi, &RasterConfig::full(), &mut out).unwrap();
        let max = out.iter().copied().fold(0.0_f32, f32::max);
        assert!((max - 0.4).abs() < 1e-6, "peak was {max}");
    }

    #[test]
    fn single_node_is_a_dab() {
        let brush = Brush {
            nodes: vec![BrushCorner::new(Point::new(5.0, 5.0), 3.0, 1.0, 1.0)],
        };
        let roi = Roi::from_area(brush.area());
        let mut out = vec![0.0; roi.pixel_count()];
        brush.fill_roi(&roi, &RasterConfig::full(), &mut out).unwrap();
        assert_eq!(out[3 * 6 + 3], 1.0);
    }

    #[test]
    fn hit_inside_stroke_width() {
        let brush = line(0.5, 1.0);
        let cfg = RasterConfig::full();
        let hit = |x, y| brush.hit(Point::new(x, y), 1.0, &cfg).unwrap().map(|h| h.hit);
        assert_eq!(hit(10.0, 20.0), Some(Hit::Corner(0)));
        assert_eq!(hit(50.0, 20.5), Some(Hit::Segment(0)));
        assert_eq!(hit(50.0, 26.0), Some(Hit::Inside));
        assert_eq!(hit(50.0, 35.0), None);
    }

    #[test]
    fn sanitize_clamps_pressure_fields() {
        let mut brush = line(1.5, f64::NAN);
        assert_eq!(brush.sanitize(), 4);
        assert!(brush.nodes.iter().all(|n| n.hardness == 1.0 && n.density == 1.0));
    }
}
