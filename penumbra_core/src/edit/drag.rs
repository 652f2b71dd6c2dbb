// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry mutations behind drags and scroll steps.

use core::cmp::Ordering;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Point;

use crate::config::EditConfig;
use crate::form::{Form, Shape};
use crate::geometry::Frame;
use crate::shape::{Corner, CornerState, HandleSide, Hit};

/// Hardness change per normal scroll step on a brush.
const HARDNESS_STEP: f64 = 0.05;
/// Curvature change per normal scroll step on a gradient.
const CURVATURE_STEP: f64 = 0.05;

/// What a scroll step adjusts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScrollTarget {
    Size,
    Feather,
}

/// Result of moving a dragged part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DragOutcome {
    /// The part did not apply to this form.
    Ignored,
    Moved,
    /// The dragged corner broke its horizontal ordering and was deleted.
    Healed,
}

/// Horizontal ordering of corner `i` of a path or brush.
pub(crate) fn corner_ordering(form: &Form, i: usize) -> Option<Ordering> {
    match &form.shape {
        Shape::Path(p) => p.x_ordering(i),
        Shape::Brush(b) => b.x_ordering(i),
        _ => None,
    }
}

/// Moves `target` of `form` from `from` to `to`.
///
/// `ordering` is the corner's horizontal ordering when the drag started; a
/// path or brush corner that was strictly ordered and no longer is gets
/// removed, as long as more than two corners remain.
pub(crate) fn apply_drag(
    form: &mut Form,
    target: Hit,
    from: Point,
    to: Point,
    ordering: Option<Ordering>,
    frame: Frame,
    min_size: f64,
) -> DragOutcome {
    let delta = to - from;
    if target == Hit::Source {
        return match form.source.as_mut() {
            Some(s) => {
                *s += delta;
                DragOutcome::Moved
            }
            None => DragOutcome::Ignored,
        };
    }
    let anchor = form.shape.anchor();
    match (&mut form.shape, target) {
        (Shape::Circle(c), Hit::Border) => {
            c.border = ((to - c.center).hypot() - c.radius).max(0.0);
        }
        (Shape::Ellipse(e), Hit::Axis(i)) => e.drag_axis(i, to, min_size),
        (Shape::Ellipse(e), Hit::Border) => {
            if let Some(f) = radial_factor(e.center, from, to) {
                e.scale_border(f, 0.0);
            }
        }
        (Shape::Path(p), Hit::Corner(i)) => {
            let Some(c) = p.corners.get_mut(i) else {
                return DragOutcome::Ignored;
            };
            c.translate(delta);
            p.smooth();
            if let Some(before) = ordering {
                if p.x_ordering(i) != Some(before) && p.remove_corner(i, 2) {
                    return DragOutcome::Healed;
                }
            }
        }
        (Shape::Brush(b), Hit::Corner(i)) => {
            let Some(n) = b.nodes.get_mut(i) else {
                return DragOutcome::Ignored;
            };
            n.node.translate(delta);
            b.smooth();
            if let Some(before) = ordering {
                if b.x_ordering(i) != Some(before) && b.remove_corner(i, 2) {
                    return DragOutcome::Healed;
                }
            }
        }
        (Shape::Path(p), Hit::Segment(i)) => {
            let n = p.corners.len();
            if i >= n {
                return DragOutcome::Ignored;
            }
            p.corners[i].translate(delta);
            if n > 1 {
                p.corners[(i + 1) % n].translate(delta);
            }
            p.smooth();
        }
        (Shape::Brush(b), Hit::Segment(i)) => {
            let n = b.nodes.len();
            if i >= n {
                return DragOutcome::Ignored;
            }
            b.nodes[i].node.translate(delta);
            if i + 1 < n {
                b.nodes[i + 1].node.translate(delta);
            }
            b.smooth();
        }
        (Shape::Path(p), Hit::Handle(i, side)) => {
            let Some(c) = p.corners.get_mut(i) else {
                return DragOutcome::Ignored;
            };
            set_handle(c, side, to);
            p.smooth();
        }
        (Shape::Brush(b), Hit::Handle(i, side)) => {
            let Some(n) = b.nodes.get_mut(i) else {
                return DragOutcome::Ignored;
            };
            set_handle(&mut n.node, side, to);
            b.smooth();
        }
        (Shape::Path(p), Hit::Feather(i)) => match p.corners.get_mut(i) {
            Some(c) => set_feather(c, to),
            None => return DragOutcome::Ignored,
        },
        (Shape::Brush(b), Hit::Feather(i)) => match b.nodes.get_mut(i) {
            Some(n) => set_feather(&mut n.node, to),
            None => return DragOutcome::Ignored,
        },
        (Shape::Path(p), Hit::Border) => {
            if let Some(f) = anchor.and_then(|c| radial_factor(c, from, to)) {
                p.scale_border(f, 0.0);
            }
        }
        (Shape::Gradient(g), Hit::Rotation) => g.aim_at(to),
        (Shape::Gradient(g), Hit::Border) => g.compress_to(to, frame),
        (Shape::Group(_), _) => return DragOutcome::Ignored,
        (shape, Hit::Inside | Hit::Segment(_) | Hit::Corner(_)) => shape.translate(delta),
        _ => return DragOutcome::Ignored,
    }
    DragOutcome::Moved
}

/// Ratio of the distances of `to` and `from` from `center`.
fn radial_factor(center: Point, from: Point, to: Point) -> Option<f64> {
    let before = (from - center).hypot();
    (before > 1e-6).then(|| (to - center).hypot() / before)
}

/// Places the handle on `side` at `p` and mirrors the other one.
fn set_handle(c: &mut Corner, side: HandleSide, p: Point) {
    let mirrored = c.point + (c.point - p);
    match side {
        HandleSide::In => {
            c.ctrl_in = p;
            c.ctrl_out = mirrored;
        }
        HandleSide::Out => {
            c.ctrl_out = p;
            c.ctrl_in = mirrored;
        }
    }
    c.state = CornerState::User;
}

fn set_feather(c: &mut Corner, p: Point) {
    let w = (p - c.point).hypot();
    c.border = [w, w];
}

/// Applies one scroll step to `shape`; `step` is the step-size multiplier.
pub(crate) fn scroll_shape(
    shape: &mut Shape,
    target: ScrollTarget,
    up: bool,
    step: f64,
    cfg: &EditConfig,
) -> bool {
    let grow = 1.0 + cfg.scroll_factor * step;
    let factor = if up { grow } else { 1.0 / grow };
    let sign = if up { 1.0 } else { -1.0 };
    let min = cfg.min_size;
    match (shape, target) {
        (Shape::Circle(c), ScrollTarget::Size) => c.scale_radius(factor, min),
        (Shape::Circle(c), ScrollTarget::Feather) => c.scale_border(factor, min),
        (Shape::Ellipse(e), ScrollTarget::Size) => e.scale_radii(factor, min),
        (Shape::Ellipse(e), ScrollTarget::Feather) => e.scale_border(factor, min),
        (Shape::Path(p), ScrollTarget::Size) => p.scale(factor),
        (Shape::Path(p), ScrollTarget::Feather) => p.scale_border(factor, min),
        (Shape::Brush(b), ScrollTarget::Size) => b.scale_width(factor, min),
        (Shape::Brush(b), ScrollTarget::Feather) => b.adjust_hardness(sign * HARDNESS_STEP * step),
        (Shape::Gradient(g), ScrollTarget::Size) => g.scale_compression(factor),
        (Shape::Gradient(g), ScrollTarget::Feather) => {
            g.adjust_curvature(sign * CURVATURE_STEP * step);
        }
        (Shape::Group(_), _) => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormId;
    use crate::shape::{Circle, Gradient, Path};

    const FRAME: Frame = Frame::new(400, 300);

    fn triangle() -> Form {
        Form::new(
            FormId(1),
            Shape::Path(Path::from_points(
                &[
                    Point::new(0.0, 0.0),
                    Point::new(50.0, 50.0),
                    Point::new(100.0, 0.0),
                ],
                2.0,
            )),
        )
    }

    #[test]
    fn dragging_past_a_neighbour_deletes_the_corner() {
        let mut form = triangle();
        let ordering = corner_ordering(&form, 1);
        assert_eq!(ordering, Some(Ordering::Less));
        let out = apply_drag(
            &mut form,
            Hit::Corner(1),
            Point::new(50.0, 50.0),
            Point::new(150.0, 50.0),
            ordering,
            FRAME,
            0.5,
        );
        assert_eq!(out, DragOutcome::Healed);
        let Shape::Path(p) = &form.shape else {
            panic!("still a path");
        };
        assert_eq!(p.corners.len(), 2);
    }

    #[test]
    fn ordered_drags_keep_the_corner() {
        let mut form = triangle();
        let ordering = corner_ordering(&form, 1);
        let out = apply_drag(
            &mut form,
            Hit::Corner(1),
            Point::new(50.0, 50.0),
            Point::new(60.0, 80.0),
            ordering,
            FRAME,
            0.5,
        );
        assert_eq!(out, DragOutcome::Moved);
        let Shape::Path(p) = &form.shape else {
            panic!("still a path");
        };
        assert_eq!(p.corners.len(), 3);
        assert_eq!(p.corners[1].point, Point::new(60.0, 80.0));
    }

    #[test]
    fn unordered_corners_never_heal() {
        let mut form = triangle();
        // The first corner of this triangle has no strict x-ordering.
        let ordering = corner_ordering(&form, 0);
        assert_eq!(ordering, None);
        let out = apply_drag(
            &mut form,
            Hit::Corner(0),
            Point::new(0.0, 0.0),
            Point::new(300.0, 0.0),
            ordering,
            FRAME,
            0.5,
        );
        assert_eq!(out, DragOutcome::Moved);
    }

    #[test]
    fn circle_drags() {
        let mut form = Form::new(
            FormId(2),
            Shape::Circle(Circle::new(Point::new(100.0, 100.0), 20.0, 5.0)),
        );
        form.source = Some(Point::new(200.0, 100.0));
        apply_drag(
            &mut form,
            Hit::Inside,
            Point::new(100.0, 100.0),
            Point::new(110.0, 90.0),
            None,
            FRAME,
            0.5,
        );
        assert_eq!(form.shape.anchor(), Some(Point::new(110.0, 90.0)));
        assert_eq!(form.source, Some(Point::new(200.0, 100.0)), "source stays");

        apply_drag(
            &mut form,
            Hit::Source,
            Point::new(200.0, 100.0),
            Point::new(200.0, 120.0),
            None,
            FRAME,
            0.5,
        );
        assert_eq!(form.source, Some(Point::new(200.0, 120.0)));

        apply_drag(
            &mut form,
            Hit::Border,
            Point::new(135.0, 90.0),
            Point::new(140.0, 90.0),
            None,
            FRAME,
            0.5,
        );
        let Shape::Circle(c) = form.shape else {
            panic!("still a circle");
        };
        assert_eq!(c.border, 10.0);
    }

    #[test]
    fn handle_drags_mirror_and_pin() {
        let mut form = triangle();
        apply_drag(
            &mut form,
            Hit::Handle(1, HandleSide::Out),
            Point::new(50.0, 50.0),
            Point::new(70.0, 50.0),
            None,
            FRAME,
            0.5,
        );
        let Shape::Path(p) = &form.shape else {
            panic!("still a path");
        };
        let c = p.corners[1];
        assert_eq!(c.state, CornerState::User);
        assert_eq!(c.ctrl_out, Point::new(70.0, 50.0));
        assert_eq!(c.ctrl_in, Point::new(30.0, 50.0));
    }

    #[test]
    fn gradients_aim_and_scroll() {
        let mut shape = Shape::Gradient(Gradient {
            anchor: Point::new(100.0, 100.0),
            ..Gradient::default()
        });
        let mut form = Form::new(FormId(3), shape.clone());
        apply_drag(
            &mut form,
            Hit::Rotation,
            Point::ZERO,
            Point::new(100.0, 200.0),
            None,
            FRAME,
            0.5,
        );
        let Shape::Gradient(g) = &form.shape else {
            panic!("still a gradient");
        };
        assert!((g.rotation - core::f64::consts::FRAC_PI_2).abs() < 1e-9);

        let cfg = EditConfig::default();
        assert!(scroll_shape(&mut shape, ScrollTarget::Feather, true, 1.0, &cfg));
        let Shape::Gradient(g) = &shape else {
            panic!("still a gradient");
        };
        assert!((g.curvature - CURVATURE_STEP).abs() < 1e-12);
    }

    #[test]
    fn scroll_steps_are_symmetric() {
        let cfg = EditConfig::default();
        let mut shape = Shape::Circle(Circle::new(Point::ZERO, 40.0, 4.0));
        scroll_shape(&mut shape, ScrollTarget::Size, true, 10.0, &cfg);
        scroll_shape(&mut shape, ScrollTarget::Size, false, 10.0, &cfg);
        let Shape::Circle(c) = shape else {
            panic!("still a circle");
        };
        assert!((c.radius - 40.0).abs() < 1e-9);

        let mut group = Shape::empty(crate::form::ShapeKind::Group);
        assert!(!scroll_shape(&mut group, ScrollTarget::Size, true, 1.0, &cfg));
    }
}
