// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opacity rasters and the pixel loops that fill them.
//!
//! A [`MaskBuffer`] holds one `f32` opacity in `[0, 1]` per pixel. Buffers are
//! always addressed through a [`Roi`]: output pixel `(i, j)` covers the image
//! point `((roi.x + i) / roi.scale, (roi.y + j) / roi.scale)`. A full
//! resolution mask over a shape's [`MaskArea`] is simply the ROI at that area
//! with scale `1.0`.
//!
//! The fill helpers here are shared by every shape kind:
//!
//! - [`fill_with`] evaluates a closed-form opacity per pixel (circles,
//!   ellipses, gradients).
//! - [`fill_polygon`] scan-fills a dense outline with the even-odd rule.
//! - [`sweep_segments`] visits the pixels near each outline segment and keeps
//!   the strongest value of a distance profile, which produces feathering and
//!   brush strokes without touching pixels far from the outline.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

use crate::buffer::AllocError;
use crate::geometry::{Polyline, distance_to_segment, lerp};

/// Integer bounding box of a mask in full-resolution image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaskArea {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl MaskArea {
    /// Smallest integer box covering `rect`.
    #[must_use]
    pub fn covering(rect: Rect) -> Self {
        let x0 = saturating_i32(rect.x0.floor());
        let y0 = saturating_i32(rect.y0.floor());
        let x1 = saturating_i32(rect.x1.ceil());
        let y1 = saturating_i32(rect.y1.ceil());
        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(0).unsigned_abs(),
            height: y1.saturating_sub(y0).max(0).unsigned_abs(),
        }
    }

    /// Returns `true` if the area has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The area as a floating point rectangle.
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }

    /// Smallest area covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::covering(self.to_rect().union(other.to_rect()))
    }

    /// Overlap of both areas (empty when disjoint).
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let r = self.to_rect().intersect(other.to_rect());
        if r.width() <= 0.0 || r.height() <= 0.0 {
            return Self::default();
        }
        Self::covering(r)
    }
}

/// A region of interest: a sub-rectangle of the scaled image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    /// Left edge in scaled pixels.
    pub x: i32,
    /// Top edge in scaled pixels.
    pub y: i32,
    /// Width in scaled pixels.
    pub width: u32,
    /// Height in scaled pixels.
    pub height: u32,
    /// Output pixels per image pixel. Values that are not finite and
    /// positive sample at full resolution.
    pub scale: f64,
}

impl Roi {
    /// A full-resolution ROI over `area`.
    #[must_use]
    pub fn from_area(area: MaskArea) -> Self {
        Self {
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height,
            scale: 1.0,
        }
    }

    /// The scale used for sampling: `scale`, or 1 when `scale` is zero,
    /// negative or not finite.
    #[inline]
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    /// Number of pixels in the ROI.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Image point sampled by output pixel `(i, j)`.
    #[inline]
    #[must_use]
    pub fn image_point(&self, i: u32, j: u32) -> Point {
        let scale = self.scale_factor();
        Point::new(
            (f64::from(self.x) + f64::from(i)) / scale,
            (f64::from(self.y) + f64::from(j)) / scale,
        )
    }

    /// Image-space rectangle covered by the ROI.
    #[must_use]
    pub fn image_rect(&self) -> Rect {
        let scale = self.scale_factor();
        Rect::new(
            f64::from(self.x) / scale,
            f64::from(self.y) / scale,
            (f64::from(self.x) + f64::from(self.width)) / scale,
            (f64::from(self.y) + f64::from(self.height)) / scale,
        )
    }

    /// Output pixel column range `[start, end)` whose samples fall in the image
    /// x-interval `[x0, x1]`.
    fn columns(&self, x0: f64, x1: f64) -> (u32, u32) {
        let lo = (x0 * self.scale_factor() - f64::from(self.x)).ceil();
        let hi = (x1 * self.scale_factor() - f64::from(self.x)).floor() + 1.0;
        (clamp_index(lo, self.width), clamp_index(hi, self.width))
    }

    /// Output pixel row range `[start, end)` whose samples fall in the image
    /// y-interval `[y0, y1]`.
    fn rows(&self, y0: f64, y1: f64) -> (u32, u32) {
        let lo = (y0 * self.scale_factor() - f64::from(self.y)).ceil();
        let hi = (y1 * self.scale_factor() - f64::from(self.y)).floor() + 1.0;
        (clamp_index(lo, self.height), clamp_index(hi, self.height))
    }
}

/// A per-pixel opacity raster.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Left edge of the buffer in output pixel space.
    pub origin_x: i32,
    /// Top edge of the buffer in output pixel space.
    pub origin_y: i32,
    data: Vec<f32>,
}

impl MaskBuffer {
    /// Allocates a zeroed buffer covering `roi`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] tagged with `tag` if the allocation fails.
    pub fn try_for_roi(roi: &Roi, tag: &'static str) -> Result<Self, AllocError> {
        let len = roi.pixel_count();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| AllocError {
            tag,
            requested: len,
        })?;
        data.resize(len, 0.0);
        Ok(Self {
            width: roi.width,
            height: roi.height,
            origin_x: roi.x,
            origin_y: roi.y,
            data,
        })
    }

    /// Opacity values in row-major order.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable opacity values in row-major order.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the buffer and returns its values.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value at buffer-local pixel `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if the pixel is outside the buffer.
    #[must_use]
    pub fn get(&self, i: u32, j: u32) -> f32 {
        assert!(
            i < self.width && j < self.height,
            "pixel ({i}, {j}) outside {}x{} buffer",
            self.width,
            self.height
        );
        self.data[j as usize * self.width as usize + i as usize]
    }

    /// Value at absolute output pixel `(x, y)`, or `0.0` outside the buffer.
    #[must_use]
    pub fn value_at(&self, x: i32, y: i32) -> f32 {
        let i = i64::from(x) - i64::from(self.origin_x);
        let j = i64::from(y) - i64::from(self.origin_y);
        match (u32::try_from(i), u32::try_from(j)) {
            (Ok(i), Ok(j)) if i < self.width && j < self.height => self.get(i, j),
            _ => 0.0,
        }
    }

    /// Pixel area covered by the buffer.
    #[must_use]
    pub fn area(&self) -> MaskArea {
        MaskArea {
            x: self.origin_x,
            y: self.origin_y,
            width: self.width,
            height: self.height,
        }
    }

    /// Replaces every value `v` with `1 - v`.
    pub fn invert(&mut self) {
        for v in &mut self.data {
            *v = 1.0 - *v;
        }
    }
}

/// Writes `opacity(p)` for every output pixel, where `p` is the sampled image
/// point.
///
/// # Panics
///
/// Panics if `out` is smaller than the ROI.
pub fn fill_with(roi: &Roi, out: &mut [f32], mut opacity: impl FnMut(Point) -> f32) {
    assert!(out.len() >= roi.pixel_count(), "output smaller than ROI");
    let width = roi.width as usize;
    for j in 0..roi.height {
        let row = &mut out[j as usize * width..(j as usize + 1) * width];
        for (i, v) in (0..roi.width).zip(row.iter_mut()) {
            *v = opacity(roi.image_point(i, j)).clamp(0.0, 1.0);
        }
    }
}

/// Sets every output pixel inside the closed `polygon` to `value`, using the
/// even-odd rule on each row.
///
/// # Panics
///
/// Panics if `out` is smaller than the ROI.
pub fn fill_polygon(roi: &Roi, polygon: &Polyline, value: f32, out: &mut [f32]) {
    assert!(out.len() >= roi.pixel_count(), "output smaller than ROI");
    let n = polygon.len();
    if n < 3 {
        return;
    }
    let Some(bounds) = polygon.bounds() else {
        return;
    };
    let (row_start, row_end) = roi.rows(bounds.y0, bounds.y1);
    let width = roi.width as usize;
    let mut crossings: Vec<f64> = Vec::new();
    for j in row_start..row_end {
        let y = (f64::from(roi.y) + f64::from(j)) / roi.scale_factor();
        crossings.clear();
        for (a, b) in polygon.closed_segments() {
            if (a.y > y) != (b.y > y) {
                crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_unstable_by(f64::total_cmp);
        let row = &mut out[j as usize * width..(j as usize + 1) * width];
        for span in crossings.chunks_exact(2) {
            let (c0, c1) = roi.columns(span[0], span[1]);
            for v in &mut row[c0 as usize..c1 as usize] {
                *v = v.max(value);
            }
        }
    }
}

/// Visits the pixels within reach of each outline segment and keeps the
/// maximum of `profile(distance, reach)`.
///
/// `reach` is interpolated linearly between the per-point `widths` along each
/// segment. When `closed` is set the last point connects back to the first.
/// `profile` should return `0.0` once `distance >= reach`.
///
/// # Panics
///
/// Panics if `widths` does not have one entry per point or `out` is smaller
/// than the ROI.
pub fn sweep_segments(
    roi: &Roi,
    outline: &Polyline,
    widths: &[f64],
    closed: bool,
    out: &mut [f32],
    profile: impl Fn(f64, f64) -> f32,
) {
    sweep_segments_with(roi, outline, widths, closed, out, |_, _, d, w| profile(d, w));
}

/// Like [`sweep_segments`], but `profile(segment, t, distance, reach)` also
/// receives the index of the segment's first point and the parameter of the
/// closest point along it, so callers can interpolate per-point attributes.
///
/// # Panics
///
/// Panics if `widths` does not have one entry per point or `out` is smaller
/// than the ROI.
pub fn sweep_segments_with(
    roi: &Roi,
    outline: &Polyline,
    widths: &[f64],
    closed: bool,
    out: &mut [f32],
    profile: impl Fn(usize, f64, f64, f64) -> f32,
) {
    assert_eq!(
        widths.len(),
        outline.len(),
        "one width per outline point is required"
    );
    assert!(out.len() >= roi.pixel_count(), "output smaller than ROI");
    let n = outline.len();
    if n == 0 {
        return;
    }
    let segments = match (n, closed) {
        (1, _) => 1,
        (_, true) => n,
        (_, false) => n - 1,
    };
    let width = roi.width as usize;
    for s in 0..segments {
        let (ia, ib) = (s, (s + 1) % n);
        let (a, b) = (outline.point(ia), outline.point(ib));
        let (wa, wb) = (widths[ia].max(0.0), widths[ib].max(0.0));
        let reach = wa.max(wb);
        if reach <= 0.0 {
            continue;
        }
        let bbox = Rect::from_points(a, b).inflate(reach, reach);
        let (c0, c1) = roi.columns(bbox.x0, bbox.x1);
        let (r0, r1) = roi.rows(bbox.y0, bbox.y1);
        for j in r0..r1 {
            let row = &mut out[j as usize * width..(j as usize + 1) * width];
            for i in c0..c1 {
                let p = roi.image_point(i, j);
                let (d, t) = distance_to_segment(p, a, b);
                let w = lerp(wa, wb, t);
                if d >= w {
                    continue;
                }
                let v = profile(s, t, d, w).clamp(0.0, 1.0);
                let slot = &mut row[i as usize];
                if v > *slot {
                    *slot = v;
                }
            }
        }
    }
}

/// Linear feather: `1` on the outline, `0` at `reach`.
#[must_use]
pub fn linear_falloff(distance: f64, reach: f64) -> f32 {
    if reach <= 0.0 {
        return 0.0;
    }
    narrow((1.0 - distance / reach).clamp(0.0, 1.0))
}

/// Converts a unit-range `f64` to `f32`.
#[inline]
#[must_use]
pub fn narrow(v: f64) -> f32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "opacity values are in [0, 1] where f32 precision suffices"
    )]
    let v = v as f32;
    v
}

fn saturating_i32(v: f64) -> i32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "saturating float-to-int conversion is intended"
    )]
    let v = v as i32;
    v
}

fn clamp_index(v: f64, limit: u32) -> u32 {
    if v <= 0.0 {
        0
    } else if v >= f64::from(limit) {
        limit
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value is within [0, limit)"
        )]
        let v = v as u32;
        v
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn area_covers_fractional_rect() {
        let a = MaskArea::covering(Rect::new(40.0, 40.0, 160.0, 160.0));
        assert_eq!(
            a,
            MaskArea {
                x: 40,
                y: 40,
                width: 120,
                height: 120
            }
        );
        let b = MaskArea::covering(Rect::new(0.5, 0.5, 1.5, 1.2));
        assert_eq!((b.x, b.y, b.width, b.height), (0, 0, 2, 2));
    }

    #[test]
    fn area_union_and_intersection() {
        let a = MaskArea::covering(Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = MaskArea::covering(Rect::new(5.0, 5.0, 20.0, 20.0));
        assert_eq!(a.union(b), MaskArea::covering(Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert_eq!(a.intersect(b), MaskArea::covering(Rect::new(5.0, 5.0, 10.0, 10.0)));
        let far = MaskArea::covering(Rect::new(50.0, 50.0, 60.0, 60.0));
        assert!(a.intersect(far).is_empty());
        assert_eq!(MaskArea::default().union(a), a);
    }

    #[test]
    fn roi_maps_pixels_through_scale() {
        let roi = Roi {
            x: 10,
            y: 20,
            width: 4,
            height: 4,
            scale: 0.5,
        };
        assert_eq!(roi.image_point(0, 0), Point::new(20.0, 40.0));
        assert_eq!(roi.image_point(2, 1), Point::new(24.0, 42.0));
        assert_eq!(roi.image_rect(), Rect::new(20.0, 40.0, 28.0, 48.0));
    }

    #[test]
    fn unusable_scales_sample_at_full_resolution() {
        for scale in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let roi = Roi {
                x: 10,
                y: 20,
                width: 4,
                height: 4,
                scale,
            };
            assert_eq!(roi.scale_factor(), 1.0, "scale {scale}");
            assert_eq!(roi.image_point(2, 1), Point::new(12.0, 21.0), "scale {scale}");
            assert_eq!(roi.image_rect(), Rect::new(10.0, 20.0, 14.0, 24.0), "scale {scale}");
        }
    }

    #[test]
    fn polygon_fill_marks_interior_only() {
        let roi = Roi::from_area(MaskArea {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        });
        let square = Polyline::from_points(&[
            Point::new(2.5, 2.5),
            Point::new(6.5, 2.5),
            Point::new(6.5, 6.5),
            Point::new(2.5, 6.5),
        ]);
        let mut out = vec![0.0; roi.pixel_count()];
        fill_polygon(&roi, &square, 1.0, &mut out);
        let at = |i: usize, j: usize| out[j * 10 + i];
        assert_eq!(at(4, 4), 1.0);
        assert_eq!(at(3, 3), 1.0);
        assert_eq!(at(6, 6), 1.0);
        assert_eq!(at(2, 4), 0.0);
        assert_eq!(at(7, 4), 0.0);
        assert_eq!(out.iter().filter(|v| **v == 1.0).count(), 16);
    }

    #[test]
    fn sweep_keeps_strongest_value() {
        let roi = Roi::from_area(MaskArea {
            x: 0,
            y: 0,
            width: 21,
            height: 5,
        });
        let line = Polyline::from_points(&[Point::new(0.0, 2.0), Point::new(20.0, 2.0)]);
        let mut out = vec![0.0; roi.pixel_count()];
        sweep_segments(&roi, &line, &[2.0, 2.0], false, &mut out, linear_falloff);
        let at = |i: usize, j: usize| out[j * 21 + i];
        assert_eq!(at(10, 2), 1.0);
        assert_eq!(at(10, 1), 0.5);
        assert_eq!(at(10, 0), 0.0);
    }

    #[test]
    fn buffer_lookup_outside_is_zero() {
        let roi = Roi {
            x: 5,
            y: 5,
            width: 2,
            height: 2,
            scale: 1.0,
        };
        let mut buf = MaskBuffer::try_for_roi(&roi, "test").unwrap();
        buf.data_mut()[3] = 0.75;
        assert_eq!(buf.value_at(6, 6), 0.75);
        assert_eq!(buf.get(1, 1), 0.75);
        assert_eq!(buf.value_at(0, 0), 0.0);
        buf.invert();
        assert_eq!(buf.value_at(5, 5), 1.0);
    }

    #[test]
    fn falloff_is_linear() {
        assert_eq!(linear_falloff(0.0, 10.0), 1.0);
        assert_eq!(linear_falloff(5.0, 10.0), 0.5);
        assert_eq!(linear_falloff(12.0, 10.0), 0.0);
        assert_eq!(linear_falloff(1.0, 0.0), 0.0);
    }
}
