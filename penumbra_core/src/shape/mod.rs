// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape kinds and the operations every kind supports.
//!
//! The set of kinds is closed, so operations dispatch with a `match` over
//! [`Shape`] rather than through a trait object. Each kind lives in its own
//! module; the free functions here add the behaviour that is shared across
//! kinds (clone sources, naming, hints).
//!
//! Groups are listed as a kind but have no geometry of their own: the
//! functions here treat them as empty, and the [`group`](crate::group) module
//! composes them from their members.

use alloc::format;
use alloc::string::String;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::buffer::AllocError;
use crate::config::RasterConfig;
use crate::form::{Form, Shape, ShapeKind};
use crate::geometry::{Frame, Polyline};
use crate::raster::{MaskArea, MaskBuffer, Roi};

pub mod brush;
pub mod circle;
pub mod ellipse;
pub mod gradient;
pub mod path;
pub mod spline;

pub use brush::{Brush, BrushCorner};
pub use circle::Circle;
pub use ellipse::{Ellipse, EllipseBorder};
pub use gradient::{Gradient, GradientState};
pub use path::Path;
pub use spline::{Corner, CornerState, HandleSide};

/// Which part of a shape a pointer is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hit {
    /// The opaque interior.
    Inside,
    /// The feather band or its outer edge.
    Border,
    /// The clone source outline.
    Source,
    /// A corner of a path or brush, or a gradient's anchor.
    Corner(usize),
    /// A Bezier handle of a corner.
    Handle(usize, HandleSide),
    /// The feather handle of a corner.
    Feather(usize),
    /// A curve segment, identified by its first corner.
    Segment(usize),
    /// A gradient's rotation handle.
    Rotation,
    /// An ellipse axis end point.
    Axis(usize),
}

/// Result of a hit-test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitTest {
    /// What was hit.
    pub hit: Hit,
    /// Distance from the pointer to the part, in image pixels.
    pub distance: f64,
}

/// Geometry could not be produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// A radius was zero, negative or not a number.
    NonPositiveRadius,
    /// The frame has no pixels.
    EmptyFrame,
    /// The kind has no outline of its own.
    Unsupported(ShapeKind),
    /// A clone source outline was requested for a form without one.
    NoSource,
    /// A sample buffer could not grow.
    Alloc(AllocError),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveRadius => f.write_str("radius must be positive"),
            Self::EmptyFrame => f.write_str("frame has no pixels"),
            Self::Unsupported(kind) => write!(f, "{} forms have no outline", kind.name()),
            Self::NoSource => f.write_str("form has no clone source"),
            Self::Alloc(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for GeometryError {}

impl From<AllocError> for GeometryError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

/// Which outline of a form to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutlineTarget {
    /// The shape itself.
    Shape,
    /// The shape moved to its clone source.
    Source,
}

/// A boundary and the outer edge of its feather band.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outlines {
    /// Dense boundary polygon (a centerline for brushes, the axis for
    /// gradients).
    pub boundary: Polyline,
    /// Dense outline of the feather band.
    pub border: Polyline,
}

/// A documented pointer gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseAction {
    /// Button, modifiers and motion.
    pub gesture: &'static str,
    /// What the gesture does.
    pub description: &'static str,
}

impl Shape {
    /// The reference point of the payload: the center of circles and
    /// ellipses, the first corner of paths and brushes, the anchor of
    /// gradients.
    #[must_use]
    pub fn anchor(&self) -> Option<Point> {
        match self {
            Self::Circle(c) => Some(c.center),
            Self::Ellipse(e) => Some(e.center),
            Self::Path(p) => p.corners.first().map(|c| c.point),
            Self::Brush(b) => b.nodes.first().map(|n| n.node.point),
            Self::Gradient(g) => Some(g.anchor),
            Self::Group(_) => None,
        }
    }

    /// Moves the whole shape.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Self::Circle(c) => c.translate(delta),
            Self::Ellipse(e) => e.translate(delta),
            Self::Path(p) => p.translate(delta),
            Self::Brush(b) => b.translate(delta),
            Self::Gradient(g) => g.translate(delta),
            Self::Group(_) => {}
        }
    }
}

/// Outline of a shape of `kind` placed at `center` with the given size, for
/// previews while creating.
///
/// Circles use `radius_a`; ellipses use both radii and `rotation`; paths and
/// brushes show their creation cursor as a circle of `radius_a`; gradients
/// draw their axis through `center` at `rotation`.
///
/// # Errors
///
/// Returns [`GeometryError`] for degenerate parameters, for groups, and when
/// the sample buffer cannot grow.
pub fn preview_points(
    kind: ShapeKind,
    center: Point,
    frame: Frame,
    radius_a: f64,
    radius_b: f64,
    rotation: f64,
    cfg: &RasterConfig,
) -> Result<Polyline, GeometryError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(GeometryError::EmptyFrame);
    }
    let positive = |r: f64| r.is_finite() && r > 0.0;
    match kind {
        ShapeKind::Circle | ShapeKind::Path | ShapeKind::Brush => {
            if !positive(radius_a) {
                return Err(GeometryError::NonPositiveRadius);
            }
            Ok(circle::ring(center, radius_a, cfg)?)
        }
        ShapeKind::Ellipse => {
            if !positive(radius_a) || !positive(radius_b) {
                return Err(GeometryError::NonPositiveRadius);
            }
            Ok(ellipse::sample_ellipse(
                center,
                Vec2::new(radius_a, radius_b),
                rotation,
                cfg,
            )?)
        }
        ShapeKind::Gradient => {
            let g = Gradient {
                anchor: center,
                rotation,
                ..Gradient::default()
            };
            Ok(g.outline(frame, cfg)?)
        }
        ShapeKind::Group => Err(GeometryError::Unsupported(kind)),
    }
}

/// Offset from a form's anchor to its clone source.
#[must_use]
pub fn source_offset(form: &Form) -> Option<Vec2> {
    if !form.kind().supports_source() {
        return None;
    }
    Some(form.source? - form.shape.anchor()?)
}

/// Boundary and feather outlines of a form or of its clone source.
///
/// # Errors
///
/// Returns [`GeometryError::Unsupported`] for groups,
/// [`GeometryError::NoSource`] when the source outline of a form without a
/// source is requested, and [`GeometryError::Alloc`] when sampling fails.
pub fn points_border(
    form: &Form,
    frame: Frame,
    cfg: &RasterConfig,
    target: OutlineTarget,
) -> Result<Outlines, GeometryError> {
    let (boundary, border) = match &form.shape {
        Shape::Circle(c) => (c.outline(cfg)?, c.border_outline(cfg)?),
        Shape::Ellipse(e) => (e.outline(cfg)?, e.border_outline(cfg)?),
        Shape::Path(p) => (p.outline(cfg)?, p.border_outline(cfg)?),
        Shape::Brush(b) => (b.outline(cfg)?, b.border_outline(cfg)?),
        Shape::Gradient(g) => (g.outline(frame, cfg)?, g.border_outline(frame, cfg)?),
        Shape::Group(_) => return Err(GeometryError::Unsupported(ShapeKind::Group)),
    };
    match target {
        OutlineTarget::Shape => Ok(Outlines { boundary, border }),
        OutlineTarget::Source => {
            let offset = source_offset(form).ok_or(GeometryError::NoSource)?;
            Ok(Outlines {
                boundary: boundary.translated(offset),
                border: border.translated(offset),
            })
        }
    }
}

/// Bounding box of a form's mask. Empty for groups.
#[must_use]
pub fn area(form: &Form, frame: Frame) -> MaskArea {
    match &form.shape {
        Shape::Circle(c) => c.area(),
        Shape::Ellipse(e) => e.area(),
        Shape::Path(p) => p.area(),
        Shape::Brush(b) => b.area(),
        Shape::Gradient(g) => g.area(frame),
        Shape::Group(_) => MaskArea::default(),
    }
}

/// Bounding box of a form's clone source, if it has one.
#[must_use]
pub fn source_area(form: &Form, frame: Frame) -> Option<MaskArea> {
    let offset = source_offset(form)?;
    let a = area(form, frame);
    if a.is_empty() {
        return Some(a);
    }
    Some(MaskArea::covering(a.to_rect() + offset))
}

/// Rasterizes a form over its own area at full resolution.
///
/// # Errors
///
/// Returns [`AllocError`] if the buffer or the outline samples cannot be
/// allocated.
pub fn mask(form: &Form, frame: Frame, cfg: &RasterConfig) -> Result<MaskBuffer, AllocError> {
    let roi = Roi::from_area(area(form, frame));
    let mut buf = MaskBuffer::try_for_roi(&roi, "mask")?;
    mask_roi(form, frame, &roi, cfg, buf.data_mut())?;
    Ok(buf)
}

/// Rasterizes a form into a caller-provided buffer covering `roi`.
///
/// Every value of `out` is overwritten. Groups leave it zeroed.
///
/// # Errors
///
/// Returns [`AllocError`] if the outline samples cannot be allocated; `out`
/// then holds a partial result and should be discarded.
///
/// # Panics
///
/// Panics if `out` is smaller than the ROI.
pub fn mask_roi(
    form: &Form,
    frame: Frame,
    roi: &Roi,
    cfg: &RasterConfig,
    out: &mut [f32],
) -> Result<(), AllocError> {
    assert!(out.len() >= roi.pixel_count(), "output smaller than ROI");
    let out = &mut out[..roi.pixel_count()];
    out.fill(0.0);
    match &form.shape {
        Shape::Circle(c) => c.fill_roi(roi, out),
        Shape::Ellipse(e) => e.fill_roi(roi, out),
        Shape::Path(p) => p.fill_roi(roi, cfg, out)?,
        Shape::Brush(b) => b.fill_roi(roi, cfg, out)?,
        Shape::Gradient(g) => g.fill_roi(frame, roi, out),
        Shape::Group(_) => {}
    }
    Ok(())
}

/// Classifies the pointer at image point `p` against a form.
///
/// `tolerance` is the pick radius in image pixels. Control points win over
/// segments and outlines, which win over interiors; the clone source is
/// tested last.
///
/// # Errors
///
/// Returns [`AllocError`] if the outline samples cannot be allocated.
pub fn hit_test(
    form: &Form,
    p: Point,
    tolerance: f64,
    frame: Frame,
    cfg: &RasterConfig,
) -> Result<Option<HitTest>, AllocError> {
    if let Some(hit) = hit_shape(&form.shape, p, tolerance, frame, cfg)? {
        return Ok(Some(hit));
    }
    let Some(offset) = source_offset(form) else {
        return Ok(None);
    };
    Ok(hit_shape(&form.shape, p - offset, tolerance, frame, cfg)?
        .filter(|h| matches!(h.hit, Hit::Inside | Hit::Border | Hit::Segment(_)))
        .map(|h| HitTest {
            hit: Hit::Source,
            distance: h.distance,
        }))
}

fn hit_shape(
    shape: &Shape,
    p: Point,
    tolerance: f64,
    frame: Frame,
    cfg: &RasterConfig,
) -> Result<Option<HitTest>, AllocError> {
    Ok(match shape {
        Shape::Circle(c) => c.hit(p, tolerance),
        Shape::Ellipse(e) => e.hit(p, tolerance),
        Shape::Path(path) => path.hit(p, tolerance, cfg)?,
        Shape::Brush(b) => b.hit(p, tolerance, cfg)?,
        Shape::Gradient(g) => g.hit(p, tolerance, frame),
        Shape::Group(_) => None,
    })
}

/// Clamps out-of-range stored values; returns the number of fields changed.
pub fn sanitize(form: &mut Form) -> u32 {
    let mut changed = match &mut form.shape {
        Shape::Circle(c) => c.sanitize(),
        Shape::Ellipse(e) => e.sanitize(),
        Shape::Path(p) => p.sanitize(),
        Shape::Brush(b) => b.sanitize(),
        Shape::Gradient(g) => g.sanitize(),
        Shape::Group(g) => g.sanitize(),
    };
    let bad_source = match form.source {
        Some(s) => !form.kind().supports_source() || !s.x.is_finite() || !s.y.is_finite(),
        None => false,
    };
    if bad_source {
        form.source = None;
        changed += 1;
    }
    changed
}

/// Default clone source position: beside the shape, inside the frame.
#[must_use]
pub fn initial_source(form: &Form, frame: Frame) -> Option<Point> {
    if !form.kind().supports_source() {
        return None;
    }
    let anchor = form.shape.anchor()?;
    let a = area(form, frame);
    let shift = f64::from(a.width.max(1));
    let right = anchor + Vec2::new(shift, 0.0);
    let x = if right.x <= f64::from(frame.width) {
        right.x
    } else {
        anchor.x - shift
    };
    Some(Point::new(
        x.clamp(0.0, f64::from(frame.width)),
        anchor.y.clamp(0.0, f64::from(frame.height)),
    ))
}

/// The first unused name of the form `"<kind> #<n>"`.
#[must_use]
pub fn default_name<'a>(kind: ShapeKind, existing: impl IntoIterator<Item = &'a str>) -> String {
    let prefix = format!("{} #", kind.name());
    let mut taken: alloc::vec::Vec<u32> = existing
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix.as_str())?.parse().ok())
        .collect();
    taken.sort_unstable();
    let mut n = 1;
    for t in taken {
        if t == n {
            n += 1;
        } else if t > n {
            break;
        }
    }
    format!("{prefix}{n}")
}

/// Gives `form` its default name, numbered after the forms in `others`.
pub fn set_form_name<'a>(form: &mut Form, others: impl IntoIterator<Item = &'a Form>) {
    form.name = default_name(form.kind(), others.into_iter().map(|f| f.name.as_str()));
}

/// Interaction help for the current pointer state.
#[must_use]
pub fn hint_message(kind: ShapeKind, hit: Option<Hit>, creating: bool) -> &'static str {
    if creating {
        return match kind {
            ShapeKind::Circle | ShapeKind::Ellipse => {
                "click to place, scroll to resize, shift+scroll to change feather"
            }
            ShapeKind::Path => {
                "click to add a corner, ctrl+click for a sharp corner, right-click or double-click to finish"
            }
            ShapeKind::Brush => "drag to paint, scroll to change width, shift+scroll to change hardness",
            ShapeKind::Gradient => "click to place the axis, drag to aim it",
            ShapeKind::Group => "",
        };
    }
    match hit {
        Some(Hit::Corner(_)) if kind == ShapeKind::Gradient => "drag to move the gradient",
        Some(Hit::Corner(_)) => {
            "drag to move the corner, ctrl+click to toggle smoothing, right-click to delete"
        }
        Some(Hit::Handle(..)) => "drag to shape the curve",
        Some(Hit::Feather(_)) => "drag to change the feather",
        Some(Hit::Segment(_)) if kind == ShapeKind::Gradient => "drag to move the gradient",
        Some(Hit::Segment(_)) => "drag to move the segment, ctrl+click to add a corner",
        Some(Hit::Rotation) => "drag to rotate",
        Some(Hit::Axis(_)) => "drag to resize and rotate",
        Some(Hit::Border) if kind == ShapeKind::Gradient => "drag to change the compression",
        Some(Hit::Border) => "drag to change the feather, shift+scroll to resize it",
        Some(Hit::Source) => "drag to move the clone source",
        Some(Hit::Inside) => {
            "drag to move, scroll to resize, shift+scroll for feather, ctrl+scroll for opacity"
        }
        None => "",
    }
}

const SHAPE_ACTIONS: &[MouseAction] = &[
    MouseAction {
        gesture: "drag",
        description: "move the shape",
    },
    MouseAction {
        gesture: "scroll",
        description: "resize",
    },
    MouseAction {
        gesture: "shift+scroll",
        description: "change the feather",
    },
    MouseAction {
        gesture: "ctrl+scroll",
        description: "change the opacity",
    },
    MouseAction {
        gesture: "right-click",
        description: "remove the shape",
    },
];

const SPLINE_ACTIONS: &[MouseAction] = &[
    MouseAction {
        gesture: "drag corner",
        description: "move the corner",
    },
    MouseAction {
        gesture: "ctrl+click corner",
        description: "toggle smooth and sharp corners",
    },
    MouseAction {
        gesture: "ctrl+click segment",
        description: "add a corner",
    },
    MouseAction {
        gesture: "right-click corner",
        description: "remove the corner",
    },
    MouseAction {
        gesture: "scroll",
        description: "resize",
    },
    MouseAction {
        gesture: "shift+scroll",
        description: "change the feather or hardness",
    },
    MouseAction {
        gesture: "ctrl+scroll",
        description: "change the opacity",
    },
];

const GRADIENT_ACTIONS: &[MouseAction] = &[
    MouseAction {
        gesture: "drag",
        description: "move the axis",
    },
    MouseAction {
        gesture: "drag rotation handle",
        description: "rotate",
    },
    MouseAction {
        gesture: "scroll",
        description: "change the compression",
    },
    MouseAction {
        gesture: "shift+scroll",
        description: "change the curvature",
    },
    MouseAction {
        gesture: "ctrl+scroll",
        description: "change the opacity",
    },
];

/// Gestures a shape kind responds to.
#[must_use]
pub fn mouse_actions(kind: ShapeKind) -> &'static [MouseAction] {
    match kind {
        ShapeKind::Circle | ShapeKind::Ellipse => SHAPE_ACTIONS,
        ShapeKind::Path | ShapeKind::Brush => SPLINE_ACTIONS,
        ShapeKind::Gradient => GRADIENT_ACTIONS,
        ShapeKind::Group => &[],
    }
}

/// Replaces a negative or non-finite length with zero; returns `1` if it
/// changed.
pub(crate) fn sanitize_length(v: &mut f64) -> u32 {
    if v.is_finite() && *v >= 0.0 {
        0
    } else {
        *v = 0.0;
        1
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::form::FormId;

    const FRAME: Frame = Frame::new(800, 600);

    fn circle_form() -> Form {
        Form::new(
            FormId(1),
            Shape::Circle(Circle::new(Point::new(100.0, 100.0), 50.0, 10.0)),
        )
    }

    #[test]
    fn end_to_end_circle_mask() {
        let form = circle_form();
        let a = area(&form, FRAME);
        assert_eq!((a.x, a.y, a.width, a.height), (40, 40, 120, 120));
        let m = mask(&form, FRAME, &RasterConfig::full()).unwrap();
        assert_eq!((m.width, m.height, m.origin_x, m.origin_y), (120, 120, 40, 40));
        assert_eq!(m.value_at(100, 100), 1.0);
        assert_eq!(m.value_at(40, 100), 0.0);
        assert_eq!(m.value_at(40, 40), 0.0);
        let band: alloc::vec::Vec<f32> = (150..=160).map(|x| m.value_at(x, 100)).collect();
        for pair in band.windows(2) {
            assert!(pair[1] <= pair[0], "band not decreasing: {band:?}");
        }
    }

    #[test]
    fn mask_is_idempotent() {
        let form = circle_form();
        let cfg = RasterConfig::full();
        assert_eq!(mask(&form, FRAME, &cfg).unwrap(), mask(&form, FRAME, &cfg).unwrap());
    }

    #[test]
    fn roi_render_matches_full_render_at_scale_one() {
        let form = circle_form();
        let cfg = RasterConfig::full();
        let full = mask(&form, FRAME, &cfg).unwrap();
        let roi = Roi {
            x: 90,
            y: 90,
            width: 30,
            height: 30,
            scale: 1.0,
        };
        let mut out = vec![7.0; roi.pixel_count()];
        mask_roi(&form, FRAME, &roi, &cfg, &mut out).unwrap();
        for j in 0..30_u32 {
            for i in 0..30_u32 {
                let x = 90 + i32::try_from(i).unwrap();
                let y = 90 + i32::try_from(j).unwrap();
                assert_eq!(out[(j * 30 + i) as usize], full.value_at(x, y));
            }
        }
    }

    #[test]
    fn source_outline_is_translated() {
        let mut form = circle_form();
        form.source = Some(Point::new(300.0, 100.0));
        let cfg = RasterConfig::preview();
        let shape = points_border(&form, FRAME, &cfg, OutlineTarget::Shape).unwrap();
        let source = points_border(&form, FRAME, &cfg, OutlineTarget::Source).unwrap();
        assert_eq!(
            source.boundary.point(0),
            shape.boundary.point(0) + Vec2::new(200.0, 0.0)
        );
        let sa = source_area(&form, FRAME).unwrap();
        assert_eq!((sa.x, sa.y), (240, 40));
        let hit = hit_test(&form, Point::new(300.0, 100.0), 2.0, FRAME, &cfg).unwrap();
        assert_eq!(hit.map(|h| h.hit), Some(Hit::Source));
    }

    #[test]
    fn groups_have_no_outline() {
        let form = Form::new(FormId(2), Shape::empty(ShapeKind::Group));
        assert_eq!(
            points_border(&form, FRAME, &RasterConfig::full(), OutlineTarget::Shape),
            Err(GeometryError::Unsupported(ShapeKind::Group))
        );
        assert!(area(&form, FRAME).is_empty());
    }

    #[test]
    fn preview_rejects_degenerate_radius() {
        let cfg = RasterConfig::preview();
        let c = Point::new(10.0, 10.0);
        assert_eq!(
            preview_points(ShapeKind::Circle, c, FRAME, 0.0, 0.0, 0.0, &cfg),
            Err(GeometryError::NonPositiveRadius)
        );
        assert_eq!(
            preview_points(ShapeKind::Ellipse, c, FRAME, 5.0, -1.0, 0.0, &cfg),
            Err(GeometryError::NonPositiveRadius)
        );
        assert!(!preview_points(ShapeKind::Ellipse, c, FRAME, 5.0, 3.0, 0.4, &cfg)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn default_names_fill_gaps() {
        let names = ["circle #1", "circle #3", "path #2"];
        assert_eq!(default_name(ShapeKind::Circle, names), "circle #2");
        assert_eq!(default_name(ShapeKind::Path, names), "path #1");
        assert_eq!(default_name(ShapeKind::Brush, []), "brush #1");
    }

    #[test]
    fn sanitize_drops_source_from_gradients() {
        let mut form = Form::new(FormId(3), Shape::empty(ShapeKind::Gradient));
        form.source = Some(Point::new(1.0, 1.0));
        assert_eq!(sanitize(&mut form), 1);
        assert!(form.source.is_none());
    }

    #[test]
    fn initial_source_stays_in_frame() {
        let mut form = circle_form();
        let p = initial_source(&form, FRAME).unwrap();
        assert_eq!(p, Point::new(220.0, 100.0));
        form.shape.translate(Vec2::new(650.0, 0.0));
        let p = initial_source(&form, FRAME).unwrap();
        assert_eq!(p, Point::new(630.0, 100.0));
    }

    #[test]
    fn hints_cover_creation() {
        assert!(!hint_message(ShapeKind::Path, None, true).is_empty());
        assert!(hint_message(ShapeKind::Circle, None, false).is_empty());
        assert_eq!(mouse_actions(ShapeKind::Group).len(), 0);
    }
}
