// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Closed Bezier outlines with a per-corner feather.
//!
//! The interior of the flattened outline is filled with the even-odd rule and
//! the feather is produced by sweeping every outline segment with a linear
//! falloff whose reach is the border width interpolated between corners.

use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::{Point, Vec2};

use super::circle::sanitize_point;
use super::spline::{self, Corner, CornerState, Flattened, HandleSide};
use super::{Hit, HitTest, sanitize_length};
use crate::buffer::AllocError;
use crate::config::RasterConfig;
use crate::geometry::Polyline;
use crate::raster::{MaskArea, Roi, fill_polygon, linear_falloff, sweep_segments};

/// A closed chain of cubic segments through `corners`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    /// Corners in drawing order.
    pub corners: Vec<Corner>,
}

impl Path {
    /// Builds a path through `points` with a uniform border and smoothed
    /// handles.
    #[must_use]
    pub fn from_points(points: &[Point], border: f64) -> Self {
        let mut path = Self {
            corners: points.iter().map(|&p| Corner::new(p, border)).collect(),
        };
        path.smooth();
        path
    }

    /// Whether the path encloses no area.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.corners.len() < 2
    }

    /// Recomputes the handles of every [`CornerState::Normal`] corner.
    pub fn smooth(&mut self) {
        spline::auto_smooth(&mut self.corners, true);
    }

    /// Flattens the outline.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn flatten(&self, cfg: &RasterConfig) -> Result<Flattened, AllocError> {
        spline::flatten(&self.corners, true, cfg)
    }

    /// Feather width at every sample of `flat`.
    #[must_use]
    pub fn widths(&self, flat: &Flattened) -> Vec<f64> {
        flat.interpolate(&self.corners, |c, entering| {
            c.border[usize::from(entering)].max(0.0)
        })
    }

    /// Sampled boundary.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        if self.is_degenerate() {
            return Ok(Polyline::default());
        }
        Ok(self.flatten(cfg)?.line)
    }

    /// Sampled outer edge of the feather band.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the sample buffers cannot grow.
    pub fn border_outline(&self, cfg: &RasterConfig) -> Result<Polyline, AllocError> {
        if self.is_degenerate() {
            return Ok(Polyline::default());
        }
        let flat = self.flatten(cfg)?;
        let widths = self.widths(&flat);
        Ok(spline::offset_closed(&flat.line, &widths))
    }

    /// Bounding box of the curves and the widest feather.
    #[must_use]
    pub fn area(&self) -> MaskArea {
        if self.is_degenerate() {
            return MaskArea::default();
        }
        let Some(bounds) = spline::control_bounds(&self.corners) else {
            return MaskArea::default();
        };
        let b = spline::max_border(&self.corners);
        MaskArea::covering(bounds.inflate(b, b))
    }

    /// Fills the interior and sweeps the feather into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the outline cannot be flattened.
    pub fn fill_roi(&self, roi: &Roi, cfg: &RasterConfig, out: &mut [f32]) -> Result<(), AllocError> {
        if self.is_degenerate() {
            return Ok(());
        }
        let flat = self.flatten(cfg)?;
        fill_polygon(roi, &flat.line, 1.0, out);
        let widths = self.widths(&flat);
        sweep_segments(roi, &flat.line, &widths, true, out, linear_falloff);
        Ok(())
    }

    /// Classifies `p` against the path.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the outline cannot be flattened.
    pub fn hit(
        &self,
        p: Point,
        tolerance: f64,
        cfg: &RasterConfig,
    ) -> Result<Option<HitTest>, AllocError> {
        if let Some(hit) = hit_controls(&self.corners, true, p, tolerance) {
            return Ok(Some(hit));
        }
        if self.is_degenerate() {
            return Ok(None);
        }
        let flat = self.flatten(cfg)?;
        if let Some((seg, _, d)) = spline::nearest_on_curve(&flat, true, p) {
            if d <= tolerance {
                return Ok(Some(HitTest {
                    hit: Hit::Segment(seg),
                    distance: d,
                }));
            }
            if flat.line.contains(p) {
                return Ok(Some(HitTest {
                    hit: Hit::Inside,
                    distance: d,
                }));
            }
            let widths = self.widths(&flat);
            let outer = spline::offset_closed(&flat.line, &widths);
            if outer.contains(p) {
                return Ok(Some(HitTest {
                    hit: Hit::Border,
                    distance: d,
                }));
            }
        }
        Ok(None)
    }

    /// Inserts a corner on segment `seg` at curve parameter `t` and returns its
    /// index.
    pub fn insert_corner(&mut self, seg: usize, t: f64) -> usize {
        let corner = spline::split_segment(&mut self.corners, seg, t);
        self.corners.insert(seg + 1, corner);
        seg + 1
    }

    /// Removes corner `i` if at least `min_len` corners would remain.
    pub fn remove_corner(&mut self, i: usize, min_len: usize) -> bool {
        if i >= self.corners.len() || self.corners.len() <= min_len {
            return false;
        }
        self.corners.remove(i);
        self.smooth();
        true
    }

    /// Switches corner `i` between automatic and user handles.
    pub fn toggle_corner(&mut self, i: usize) {
        if let Some(c) = self.corners.get_mut(i) {
            c.state = match c.state {
                CornerState::Normal => CornerState::User,
                CornerState::User => CornerState::Normal,
            };
        }
        self.smooth();
    }

    /// Horizontal ordering of corner `i` relative to its neighbours.
    #[must_use]
    pub fn x_ordering(&self, i: usize) -> Option<Ordering> {
        spline::x_ordering(&self.corners, i, true)
    }

    /// Position of the feather handle of corner `i`.
    #[must_use]
    pub fn feather_handle(&self, i: usize) -> Point {
        spline::feather_handle(&self.corners, i, true)
    }

    /// Multiplies every corner's distance from the centroid.
    pub fn scale(&mut self, factor: f64) {
        scale_corners(&mut self.corners, factor);
    }

    /// Multiplies every corner's border, keeping each at least `min`.
    pub fn scale_border(&mut self, factor: f64, min: f64) {
        for c in &mut self.corners {
            c.border = c.border.map(|b| (b * factor).max(min));
        }
    }

    /// Drops non-finite corners and clamps borders; returns the number of
    /// fields changed.
    pub fn sanitize(&mut self) -> u32 {
        sanitize_corners(&mut self.corners)
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        for c in &mut self.corners {
            c.translate(delta);
        }
    }
}

/// Corner, handle and feather hits shared by paths and brushes.
pub(crate) fn hit_controls<C: AsRef<Corner>>(
    corners: &[C],
    closed: bool,
    p: Point,
    tolerance: f64,
) -> Option<HitTest> {
    let mut best: Option<HitTest> = None;
    let mut consider = |hit: Hit, at: Point| {
        let distance = (p - at).hypot();
        if distance <= tolerance && best.is_none_or(|b| distance < b.distance) {
            best = Some(HitTest { hit, distance });
        }
    };
    for (i, c) in corners.iter().enumerate() {
        let c = c.as_ref();
        consider(Hit::Corner(i), c.point);
        if c.state == CornerState::User {
            for side in [HandleSide::In, HandleSide::Out] {
                if c.handle(side) != c.point {
                    consider(Hit::Handle(i, side), c.handle(side));
                }
            }
        }
        if c.mean_border() > 0.0 {
            consider(Hit::Feather(i), spline::feather_handle(corners, i, closed));
        }
    }
    // Corners win over handles and feathers that sit on top of them.
    if let Some(HitTest { hit: Hit::Handle(i, _) | Hit::Feather(i), .. }) = best {
        let d = (p - corners[i].as_ref().point).hypot();
        if d <= tolerance {
            best = Some(HitTest {
                hit: Hit::Corner(i),
                distance: d,
            });
        }
    }
    best
}

pub(crate) fn scale_corners<C: AsMut<Corner> + AsRef<Corner>>(corners: &mut [C], factor: f64) {
    if corners.is_empty() {
        return;
    }
    let n = corners.len() as f64;
    let centroid = corners
        .iter()
        .fold(Vec2::ZERO, |acc, c| acc + c.as_ref().point.to_vec2())
        / n;
    let centroid = centroid.to_point();
    for c in corners.iter_mut() {
        let c = c.as_mut();
        c.point = centroid + (c.point - centroid) * factor;
        c.ctrl_in = centroid + (c.ctrl_in - centroid) * factor;
        c.ctrl_out = centroid + (c.ctrl_out - centroid) * factor;
    }
}

pub(crate) fn sanitize_corners<C: AsMut<Corner> + AsRef<Corner>>(corners: &mut Vec<C>) -> u32 {
    let before = corners.len();
    corners.retain(|c| {
        let p = c.as_ref().point;
        p.x.is_finite() && p.y.is_finite()
    });
    let mut changed = u32::try_from(before - corners.len()).unwrap_or(u32::MAX);
    for c in corners.iter_mut() {
        let c = c.as_mut();
        let point = c.point;
        for handle in [&mut c.ctrl_in, &mut c.ctrl_out] {
            if sanitize_point(handle) > 0 {
                *handle = point;
                changed += 1;
            }
        }
        for b in &mut c.border {
            changed += sanitize_length(b);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn square() -> Path {
        let mut path = Path::from_points(
            &[
                Point::new(20.0, 20.0),
                Point::new(80.0, 20.0),
                Point::new(80.0, 80.0),
                Point::new(20.0, 80.0),
            ],
            5.0,
        );
        for i in 0..4 {
            path.corners[i].state = CornerState::User;
            path.corners[i].ctrl_in = path.corners[i].point;
            path.corners[i].ctrl_out = path.corners[i].point;
        }
        path
    }

    #[test]
    fn mask_fills_interior_and_feathers_edges() {
        let path = square();
        let area = path.area();
        assert_eq!((area.x, area.y, area.width, area.height), (15, 15, 70, 70));
        let roi = Roi::from_area(area);
        let mut out = vec![0.0; roi.pixel_count()];
        path.fill_roi(&roi, &RasterConfig::full(), &mut out).unwrap();
        let at = |x: i32, y: i32| out[((y - 15) * 70 + (x - 15)) as usize];
        assert_eq!(at(50, 50), 1.0);
        assert_eq!(at(21, 50), 1.0);
        assert!((at(17, 50) - 0.4).abs() < 1e-6, "feather was {}", at(17, 50));
        assert_eq!(at(15, 50), 0.0);
    }

    #[test]
    fn degenerate_path_is_empty() {
        let path = Path::from_points(&[Point::new(1.0, 1.0)], 2.0);
        assert!(path.area().is_empty());
        assert!(path.outline(&RasterConfig::full()).unwrap().is_empty());
    }

    #[test]
    fn hits_classify_parts() {
        let path = square();
        let cfg = RasterConfig::full();
        let hit = |x, y| path.hit(Point::new(x, y), 2.0, &cfg).unwrap().map(|h| h.hit);
        assert_eq!(hit(20.5, 20.5), Some(Hit::Corner(0)));
        assert_eq!(hit(50.0, 21.0), Some(Hit::Segment(0)));
        assert_eq!(hit(50.0, 50.0), Some(Hit::Inside));
        assert_eq!(hit(50.0, 16.0), Some(Hit::Border));
        assert_eq!(hit(50.0, 5.0), None);
    }

    #[test]
    fn insert_then_remove_corner() {
        let mut path = square();
        let idx = path.insert_corner(0, 0.5);
        assert_eq!(idx, 1);
        assert_eq!(path.corners.len(), 5);
        assert!((path.corners[1].point - Point::new(50.0, 20.0)).hypot() < 1e-9);
        assert!(path.remove_corner(1, 2));
        assert_eq!(path.corners.len(), 4);
        let mut tiny = Path::from_points(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)], 1.0);
        assert!(!tiny.remove_corner(0, 2));
    }

    #[test]
    fn sanitize_drops_non_finite_corners() {
        let mut path = square();
        path.corners[2].point = Point::new(f64::NAN, 0.0);
        path.corners[1].border = [-1.0, 2.0];
        assert_eq!(path.sanitize(), 2);
        assert_eq!(path.corners.len(), 3);
        assert_eq!(path.corners[1].border, [0.0, 2.0]);
    }

    #[test]
    fn scale_keeps_centroid() {
        let mut path = square();
        path.scale(2.0);
        assert_eq!(path.corners[0].point, Point::new(-10.0, -10.0));
        assert_eq!(path.corners[2].point, Point::new(110.0, 110.0));
    }
}
