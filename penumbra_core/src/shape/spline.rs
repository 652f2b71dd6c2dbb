// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cubic Bezier corner lists shared by paths and brushes.
//!
//! A corner list describes a chain of cubic segments. Segment `i` runs from
//! corner `i` to corner `i + 1` (wrapping for closed outlines) with control
//! points `corner[i].ctrl_out` and `corner[i + 1].ctrl_in`. Functions here are
//! generic over `AsRef<Corner>` so brush nodes, which carry extra pressure
//! data, can share them.

use alloc::vec::Vec;
use core::cmp::Ordering;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{CubicBez, ParamCurve, Point, Rect, Vec2};

use crate::buffer::{AllocError, FloatBuffer};
use crate::config::RasterConfig;
use crate::geometry::{
    Polyline, bounds_of, cubic_sample_count, distance_to_segment, lerp, sample_cubic,
    signed_area2, smooth_handles,
};

/// Whether a corner's handles follow its neighbours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CornerState {
    /// Handles are recomputed from the neighbouring corners.
    #[default]
    Normal,
    /// Handles were placed by the user and are left alone.
    User,
}

/// Which of a corner's two handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleSide {
    /// Control point of the segment arriving at the corner.
    In,
    /// Control point of the segment leaving the corner.
    Out,
}

/// One on-curve point with its two handles and feather widths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    /// The on-curve point.
    pub point: Point,
    /// Control point of the segment arriving here.
    pub ctrl_in: Point,
    /// Control point of the segment leaving here.
    pub ctrl_out: Point,
    /// Feather width after (`[0]`) and before (`[1]`) this corner.
    pub border: [f64; 2],
    /// Handle mode.
    pub state: CornerState,
}

impl Corner {
    /// A corner at `point` with collapsed handles and a uniform border.
    #[must_use]
    pub fn new(point: Point, border: f64) -> Self {
        Self {
            point,
            ctrl_in: point,
            ctrl_out: point,
            border: [border, border],
            state: CornerState::Normal,
        }
    }

    /// Moves the point and both handles.
    pub fn translate(&mut self, delta: Vec2) {
        self.point += delta;
        self.ctrl_in += delta;
        self.ctrl_out += delta;
    }

    /// The handle on `side`.
    #[must_use]
    pub fn handle(&self, side: HandleSide) -> Point {
        match side {
            HandleSide::In => self.ctrl_in,
            HandleSide::Out => self.ctrl_out,
        }
    }

    /// Mean of the two border widths.
    #[must_use]
    pub fn mean_border(&self) -> f64 {
        0.5 * (self.border[0] + self.border[1])
    }
}

impl AsRef<Self> for Corner {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl AsMut<Self> for Corner {
    fn as_mut(&mut self) -> &mut Self {
        self
    }
}

/// A flattened corner list.
#[derive(Clone, Debug, Default)]
pub struct Flattened {
    /// The dense outline.
    pub line: Polyline,
    /// For every sample, the segment it lies on and its curve parameter.
    pub stations: Vec<(usize, f64)>,
}

impl Flattened {
    /// Interpolates a per-corner attribute at every sample.
    ///
    /// `value(corner, entering)` returns the attribute of `corner` for the
    /// segment leaving it (`entering == false`) or arriving at it
    /// (`entering == true`).
    pub fn interpolate<C: AsRef<Corner>>(
        &self,
        corners: &[C],
        value: impl Fn(&C, bool) -> f64,
    ) -> Vec<f64> {
        let n = corners.len();
        self.stations
            .iter()
            .map(|&(seg, t)| {
                let a = &corners[seg];
                let b = &corners[(seg + 1) % n];
                lerp(value(a, false), value(b, true), t)
            })
            .collect()
    }
}

/// Number of segments in a list of `n` corners.
#[must_use]
pub fn segment_count(n: usize, closed: bool) -> usize {
    match (n, closed) {
        (0 | 1, _) => 0,
        (_, true) => n,
        (_, false) => n - 1,
    }
}

/// Cubic segment `i`.
///
/// # Panics
///
/// Panics if `i` is not a valid corner index.
#[must_use]
pub fn segment<C: AsRef<Corner>>(corners: &[C], i: usize) -> CubicBez {
    let a = corners[i].as_ref();
    let b = corners[(i + 1) % corners.len()].as_ref();
    CubicBez::new(a.point, a.ctrl_out, b.ctrl_in, b.point)
}

/// Samples every segment into a dense outline.
///
/// Open lists include the final corner; closed lists stop just before
/// returning to the first one.
///
/// # Errors
///
/// Returns [`AllocError`] if the sample buffers cannot grow.
pub fn flatten<C: AsRef<Corner>>(
    corners: &[C],
    closed: bool,
    cfg: &RasterConfig,
) -> Result<Flattened, AllocError> {
    let n = corners.len();
    let mut buf = FloatBuffer::init(n * 16, "spline")?;
    let mut stations: Vec<(usize, f64)> = Vec::new();
    if n == 1 {
        let p = corners[0].as_ref().point;
        buf.add_pair(p.x, p.y)?;
        stations.push((0, 0.0));
    }
    for i in 0..segment_count(n, closed) {
        let bez = segment(corners, i);
        let count = cubic_sample_count(&bez, cfg.curve_step, cfg.min_samples, cfg.max_samples);
        stations.try_reserve(count).map_err(|_| AllocError {
            tag: "spline-stations",
            requested: stations.len() + count,
        })?;
        for (t, p) in sample_cubic(&bez, count) {
            buf.add_pair(p.x, p.y)?;
            stations.push((i, t));
        }
    }
    if !closed && n >= 2 {
        let p = corners[n - 1].as_ref().point;
        buf.add_pair(p.x, p.y)?;
        stations.push((n - 2, 1.0));
    }
    Ok(Flattened {
        line: Polyline::from_coords(buf.harvest()),
        stations,
    })
}

/// Recomputes the handles of every [`CornerState::Normal`] corner from its
/// neighbours.
pub fn auto_smooth<C: AsRef<Corner> + AsMut<Corner>>(corners: &mut [C], closed: bool) {
    let n = corners.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        if corners[i].as_ref().state != CornerState::Normal {
            continue;
        }
        let cur = corners[i].as_ref().point;
        let prev = if i > 0 {
            corners[i - 1].as_ref().point
        } else if closed {
            corners[n - 1].as_ref().point
        } else {
            cur
        };
        let next = if i + 1 < n {
            corners[i + 1].as_ref().point
        } else if closed {
            corners[0].as_ref().point
        } else {
            cur
        };
        let (h_in, h_out) = smooth_handles(prev, cur, next);
        let c = corners[i].as_mut();
        c.ctrl_in = h_in;
        c.ctrl_out = h_out;
    }
}

/// Conservative bounds of the curves: the hull of all points and handles.
#[must_use]
pub fn control_bounds<C: AsRef<Corner>>(corners: &[C]) -> Option<Rect> {
    bounds_of(corners.iter().flat_map(|c| {
        let c = c.as_ref();
        [c.point, c.ctrl_in, c.ctrl_out]
    }))
}

/// Largest border width of any corner.
#[must_use]
pub fn max_border<C: AsRef<Corner>>(corners: &[C]) -> f64 {
    corners
        .iter()
        .map(|c| c.as_ref().border[0].max(c.as_ref().border[1]))
        .fold(0.0, f64::max)
}

/// Offsets every sample of a closed outline outwards by its width.
#[must_use]
pub fn offset_closed(line: &Polyline, widths: &[f64]) -> Polyline {
    let n = line.len();
    if n < 3 {
        return line.clone();
    }
    let sign = if signed_area2(line.coords()) >= 0.0 {
        1.0
    } else {
        -1.0
    };
    let points: Vec<Point> = (0..n)
        .map(|i| {
            let prev = line.point((i + n - 1) % n);
            let next = line.point((i + 1) % n);
            line.point(i) + right_normal(next - prev) * (sign * widths[i])
        })
        .collect();
    Polyline::from_points(&points)
}

/// Outline of an open stroke: the left side forwards, then the right side
/// backwards.
#[must_use]
pub fn offset_open(line: &Polyline, widths: &[f64]) -> Polyline {
    let n = line.len();
    if n < 2 {
        return line.clone();
    }
    let normal_at = |i: usize| {
        let prev = line.point(i.saturating_sub(1));
        let next = line.point((i + 1).min(n - 1));
        right_normal(next - prev)
    };
    let mut points = Vec::with_capacity(2 * n);
    for i in 0..n {
        points.push(line.point(i) + normal_at(i) * widths[i]);
    }
    for i in (0..n).rev() {
        points.push(line.point(i) - normal_at(i) * widths[i]);
    }
    Polyline::from_points(&points)
}

/// Position of the feather handle of corner `i`: the corner pushed outwards
/// by its mean border width.
#[must_use]
pub fn feather_handle<C: AsRef<Corner>>(corners: &[C], i: usize, closed: bool) -> Point {
    let n = corners.len();
    let c = corners[i].as_ref();
    if n < 2 {
        return c.point + Vec2::new(c.mean_border(), 0.0);
    }
    let prev = if i > 0 || closed {
        corners[(i + n - 1) % n].as_ref().point
    } else {
        c.point
    };
    let next = if i + 1 < n || closed {
        corners[(i + 1) % n].as_ref().point
    } else {
        c.point
    };
    let sign = if closed && corner_area2(corners) < 0.0 {
        -1.0
    } else {
        1.0
    };
    c.point + right_normal(next - prev) * (sign * c.mean_border())
}

/// Nearest point on the curves to `p`: `(segment, t, distance)`.
#[must_use]
pub fn nearest_on_curve(flat: &Flattened, closed: bool, p: Point) -> Option<(usize, f64, f64)> {
    let n = flat.line.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some((0, 0.0, (p - flat.line.point(0)).hypot()));
    }
    let edges = if closed { n } else { n - 1 };
    let mut best: Option<(usize, f64, f64)> = None;
    for k in 0..edges {
        let (seg, t0) = flat.stations[k];
        let (next_seg, next_t) = flat.stations[(k + 1) % n];
        let t1 = if next_seg == seg { next_t } else { 1.0 };
        let (d, u) = distance_to_segment(p, flat.line.point(k), flat.line.point((k + 1) % n));
        if best.is_none_or(|(_, _, bd)| d < bd) {
            best = Some((seg, lerp(t0, t1, u), d));
        }
    }
    best
}

/// Splits segment `seg` at `t` and returns the new corner, adjusting the
/// handles of the two neighbours so the curve shape is preserved.
///
/// The caller inserts the returned corner at index `seg + 1`.
pub fn split_segment<C: AsRef<Corner> + AsMut<Corner>>(
    corners: &mut [C],
    seg: usize,
    t: f64,
) -> Corner {
    let n = corners.len();
    let bez = segment(corners, seg);
    let left = bez.subsegment(0.0..t);
    let right = bez.subsegment(t..1.0);
    let border = [
        lerp(
            corners[seg].as_ref().border[0],
            corners[(seg + 1) % n].as_ref().border[1],
            t,
        ),
        lerp(
            corners[seg].as_ref().border[0],
            corners[(seg + 1) % n].as_ref().border[1],
            t,
        ),
    ];
    corners[seg].as_mut().ctrl_out = left.p1;
    corners[(seg + 1) % n].as_mut().ctrl_in = right.p2;
    Corner {
        point: left.p3,
        ctrl_in: left.p2,
        ctrl_out: right.p1,
        border,
        state: CornerState::User,
    }
}

/// Horizontal ordering of corner `i` relative to its two neighbours.
///
/// Returns `Less` when `prev.x < cur.x < next.x`, `Greater` for the reverse,
/// and `None` when the three are not strictly monotonic or `i` has fewer than
/// two neighbours.
#[must_use]
pub fn x_ordering<C: AsRef<Corner>>(corners: &[C], i: usize, closed: bool) -> Option<Ordering> {
    let n = corners.len();
    if n < 3 || (!closed && (i == 0 || i + 1 >= n)) {
        return None;
    }
    let prev = corners[(i + n - 1) % n].as_ref().point.x;
    let cur = corners[i].as_ref().point.x;
    let next = corners[(i + 1) % n].as_ref().point.x;
    if prev < cur && cur < next {
        Some(Ordering::Less)
    } else if prev > cur && cur > next {
        Some(Ordering::Greater)
    } else {
        None
    }
}

fn corner_area2<C: AsRef<Corner>>(corners: &[C]) -> f64 {
    let coords: Vec<f64> = corners
        .iter()
        .flat_map(|c| [c.as_ref().point.x, c.as_ref().point.y])
        .collect();
    signed_area2(&coords)
}

fn right_normal(tangent: Vec2) -> Vec2 {
    let len = tangent.hypot();
    if len <= 1e-12 {
        return Vec2::ZERO;
    }
    Vec2::new(tangent.y, -tangent.x) / len
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn square(border: f64) -> Vec<Corner> {
        let mut corners = vec![
            Corner::new(Point::new(0.0, 0.0), border),
            Corner::new(Point::new(100.0, 0.0), border),
            Corner::new(Point::new(100.0, 100.0), border),
            Corner::new(Point::new(0.0, 100.0), border),
        ];
        for c in &mut corners {
            c.state = CornerState::User;
        }
        corners
    }

    #[test]
    fn straight_segments_flatten_onto_the_edges() {
        let flat = flatten(&square(0.0), true, &RasterConfig::full()).unwrap();
        assert!(flat.line.len() >= 400, "got {} samples", flat.line.len());
        assert_eq!(flat.stations.len(), flat.line.len());
        for p in flat.line.points() {
            let on_edge = p.x.abs() < 1e-9
                || (p.x - 100.0).abs() < 1e-9
                || p.y.abs() < 1e-9
                || (p.y - 100.0).abs() < 1e-9;
            assert!(on_edge, "{p:?} is off the square");
        }
    }

    #[test]
    fn open_flatten_ends_on_last_corner() {
        let corners = [
            Corner::new(Point::new(0.0, 0.0), 1.0),
            Corner::new(Point::new(10.0, 0.0), 1.0),
        ];
        let flat = flatten(&corners, false, &RasterConfig::full()).unwrap();
        let last = flat.line.point(flat.line.len() - 1);
        assert_eq!(last, Point::new(10.0, 0.0));
        assert_eq!(flat.stations.last(), Some(&(0, 1.0)));
    }

    #[test]
    fn interpolated_widths_follow_borders() {
        let mut corners = square(0.0);
        corners[0].border = [10.0, 10.0];
        corners[1].border = [20.0, 20.0];
        let flat = flatten(&corners, true, &RasterConfig::full()).unwrap();
        let widths = flat.interpolate(&corners, |c, entering| {
            c.border[usize::from(entering)]
        });
        let (seg, t) = flat.stations[50];
        assert_eq!(seg, 0);
        assert!((widths[50] - (10.0 + 10.0 * t)).abs() < 1e-9);
    }

    #[test]
    fn auto_smooth_leaves_user_corners_alone() {
        let mut corners = square(0.0);
        corners[1].state = CornerState::Normal;
        auto_smooth(&mut corners, true);
        assert_ne!(corners[1].ctrl_in, corners[1].point);
        assert_eq!(corners[0].ctrl_out, corners[0].point);
    }

    #[test]
    fn split_preserves_curve() {
        let mut corners = square(2.0);
        corners[0].ctrl_out = Point::new(30.0, -20.0);
        corners[1].ctrl_in = Point::new(70.0, -20.0);
        let before = segment(&corners, 0);
        let mid = before.eval(0.5);
        let inserted = split_segment(&mut corners, 0, 0.5);
        assert!((inserted.point - mid).hypot() < 1e-9);
        corners.insert(1, inserted);
        let left = segment(&corners, 0);
        assert!((left.eval(0.5) - before.eval(0.25)).hypot() < 1e-9);
        assert_eq!(corners.len(), 5);
    }

    #[test]
    fn offset_closed_points_outwards() {
        let corners = square(0.0);
        let flat = flatten(&corners, true, &RasterConfig::full()).unwrap();
        let widths = vec![5.0; flat.line.len()];
        let outer = offset_closed(&flat.line, &widths);
        let b = outer.bounds().unwrap();
        assert!(b.x0 < -4.0 && b.x1 > 104.0, "offset went inwards: {b:?}");
    }

    #[test]
    fn x_ordering_detects_monotonic_neighbours() {
        let corners = [
            Corner::new(Point::new(0.0, 0.0), 0.0),
            Corner::new(Point::new(50.0, 10.0), 0.0),
            Corner::new(Point::new(100.0, 0.0), 0.0),
        ];
        assert_eq!(x_ordering(&corners, 1, false), Some(Ordering::Less));
        assert_eq!(x_ordering(&corners, 0, false), None);
    }

    #[test]
    fn nearest_on_curve_finds_segment() {
        let corners = square(0.0);
        let flat = flatten(&corners, true, &RasterConfig::full()).unwrap();
        let (seg, t, d) = nearest_on_curve(&flat, true, Point::new(103.0, 50.0)).unwrap();
        assert_eq!(seg, 1);
        assert!((t - 0.5).abs() < 0.02, "t was {t}");
        assert!((d - 3.0).abs() < 1e-6, "d was {d}");
    }
}
