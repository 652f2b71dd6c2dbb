// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing editing affordances.
//!
//! [`EditSession::post_expose`] describes what to draw in image coordinates
//! through the [`Overlay`] trait; the GUI layer maps the calls onto its own
//! painter and chooses colors, line widths and handle sizes.

use alloc::vec::Vec;

use kurbo::Point;

use crate::form::{Form, Shape, ShapeKind};
use crate::geometry::Polyline;
use crate::group::MemberState;
use crate::registry::Registry;
use crate::shape::{
    self, Corner, CornerState, GeometryError, HandleSide, Hit, OutlineTarget, Outlines,
};
use crate::trace::{AllocFailureEvent, Tracer};

use super::{EditSession, State, creation::Creation};

/// What an outline represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineRole {
    /// The shape boundary (a brush centerline, a gradient axis).
    Boundary,
    /// The outer edge of the feather band.
    Border,
    /// The boundary moved to the clone source.
    Source,
    /// A shape being created.
    Preview,
}

/// What a handle controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A corner with automatic handles, or a gradient anchor.
    Corner,
    /// A corner with user handles.
    SharpCorner,
    /// A Bezier control point.
    Control,
    /// A feather width handle.
    Feather,
    /// A gradient rotation handle.
    Rotation,
    /// An ellipse axis end.
    Axis,
}

/// A painter for editing affordances. Coordinates are in image pixels.
pub trait Overlay {
    /// Strokes a polyline.
    fn polyline(&mut self, line: &Polyline, closed: bool, role: LineRole, highlighted: bool);

    /// Draws a handle centered on `at`.
    fn handle(&mut self, at: Point, kind: HandleKind, highlighted: bool);

    /// Draws an arrow from `from` to `to`.
    fn arrow(&mut self, from: Point, to: Point, highlighted: bool);
}

impl EditSession {
    /// Draws outlines of the visible members, controls of the hovered or
    /// dragged form and the preview of a shape being created.
    ///
    /// Does not mutate anything. Returns `true` if anything was drawn.
    pub fn post_expose(
        &self,
        registry: &Registry,
        overlay: &mut dyn Overlay,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let mut drawn = false;
        let focus = self.hovered();
        if let Some(group) = registry.get(self.group).and_then(Form::as_group) {
            for m in &group.members {
                if !m.state.contains(MemberState::SHOW) {
                    continue;
                }
                let Some(form) = registry.get(m.form) else {
                    continue;
                };
                let hit = focus.filter(|(f, _)| *f == form.id).map(|(_, h)| h);
                drawn |= self.draw_form(form, hit, overlay, tracer);
            }
        }
        if let State::Creating { creation, .. } = &self.state {
            drawn |= self.draw_creation(creation, overlay, tracer);
        }
        drawn
    }

    fn outlines(&self, form: &Form, target: OutlineTarget, tracer: &mut Tracer<'_>) -> Option<Outlines> {
        traced(
            shape::points_border(form, self.frame, &self.raster, target),
            tracer,
        )
    }

    fn preview(
        &self,
        kind: ShapeKind,
        center: Point,
        radius_a: f64,
        radius_b: f64,
        rotation: f64,
        tracer: &mut Tracer<'_>,
    ) -> Option<Polyline> {
        let line = shape::preview_points(
            kind,
            center,
            self.frame,
            radius_a,
            radius_b,
            rotation,
            &self.raster,
        );
        traced(line, tracer)
    }

    /// Draws one form; `hit` is set when the form has the focus.
    fn draw_form(
        &self,
        form: &Form,
        hit: Option<Hit>,
        overlay: &mut dyn Overlay,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let Some(outlines) = self.outlines(form, OutlineTarget::Shape, tracer) else {
            return false;
        };
        let closed = !matches!(form.kind(), ShapeKind::Brush | ShapeKind::Gradient);
        let focused = hit.is_some();
        overlay.polyline(
            &outlines.boundary,
            closed,
            LineRole::Boundary,
            focused && hit != Some(Hit::Border),
        );
        overlay.polyline(&outlines.border, true, LineRole::Border, hit == Some(Hit::Border));

        if form.source.is_some() {
            if let Some(src) = self.outlines(form, OutlineTarget::Source, tracer) {
                let on_source = hit == Some(Hit::Source);
                overlay.polyline(&src.boundary, closed, LineRole::Source, on_source);
                if let (Some(from), Some(to)) = (form.source, form.shape.anchor()) {
                    overlay.arrow(from, to, on_source);
                }
            }
        }

        if let Some(hit) = hit {
            self.draw_controls(form, hit, overlay);
        }
        true
    }

    fn draw_controls(&self, form: &Form, hit: Hit, overlay: &mut dyn Overlay) {
        match &form.shape {
            Shape::Path(p) => {
                for (i, c) in p.corners.iter().enumerate() {
                    draw_corner(overlay, c, i, hit);
                    overlay.handle(p.feather_handle(i), HandleKind::Feather, hit == Hit::Feather(i));
                }
            }
            Shape::Brush(b) => {
                for (i, n) in b.nodes.iter().enumerate() {
                    draw_corner(overlay, &n.node, i, hit);
                    overlay.handle(b.feather_handle(i), HandleKind::Feather, hit == Hit::Feather(i));
                }
            }
            Shape::Ellipse(e) => {
                for i in 0..4 {
                    overlay.handle(e.axis_point(i), HandleKind::Axis, hit == Hit::Axis(i));
                }
            }
            Shape::Gradient(g) => {
                let tip = g.rotation_handle(self.frame);
                overlay.handle(g.anchor, HandleKind::Corner, hit == Hit::Corner(0));
                overlay.arrow(g.anchor, tip, hit == Hit::Rotation);
                overlay.handle(tip, HandleKind::Rotation, hit == Hit::Rotation);
            }
            Shape::Circle(_) | Shape::Group(_) => {}
        }
    }

    fn draw_creation(
        &self,
        creation: &Creation,
        overlay: &mut dyn Overlay,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let cursor = self.cursor;
        match creation {
            Creation::Circle { radius, border } => {
                let Some(c) = cursor else {
                    return false;
                };
                for r in [*radius, radius + border] {
                    if let Some(line) = self.preview(ShapeKind::Circle, c, r, r, 0.0, tracer) {
                        overlay.polyline(&line, true, LineRole::Preview, false);
                    }
                }
                true
            }
            Creation::Ellipse { radii, rotation, .. } => {
                let Some(c) = cursor else {
                    return false;
                };
                if let Some(line) = self.preview(ShapeKind::Ellipse, c, radii.x, radii.y, *rotation, tracer) {
                    overlay.polyline(&line, true, LineRole::Preview, false);
                }
                true
            }
            Creation::Path { corners, .. } => {
                let mut points: Vec<Point> = corners.iter().map(|c| c.point).collect();
                points.extend(cursor);
                if points.is_empty() {
                    return false;
                }
                overlay.polyline(&Polyline::from_points(&points), false, LineRole::Preview, false);
                for c in corners {
                    overlay.handle(c.point, corner_kind(c), false);
                }
                true
            }
            Creation::Brush { nodes, width, .. } => {
                if nodes.len() > 1 {
                    let points: Vec<Point> = nodes.iter().map(|n| n.node.point).collect();
                    overlay.polyline(&Polyline::from_points(&points), false, LineRole::Preview, false);
                }
                if let Some(c) = cursor {
                    if let Some(line) = self.preview(ShapeKind::Brush, c, *width, *width, 0.0, tracer) {
                        overlay.polyline(&line, true, LineRole::Preview, false);
                    }
                }
                !nodes.is_empty() || cursor.is_some()
            }
            Creation::Gradient { anchor, rotation } => {
                let Some(center) = anchor.or(cursor) else {
                    return false;
                };
                if let Some(line) = self.preview(ShapeKind::Gradient, center, 1.0, 1.0, *rotation, tracer) {
                    overlay.polyline(&line, false, LineRole::Preview, false);
                }
                true
            }
        }
    }
}

/// Drops geometry errors, tracing allocation failures.
fn traced<T>(result: Result<T, GeometryError>, tracer: &mut Tracer<'_>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(GeometryError::Alloc(e)) => {
            tracer.alloc_failure(&AllocFailureEvent {
                tag: e.tag,
                requested: e.requested,
            });
            None
        }
        Err(_) => None,
    }
}

fn corner_kind(c: &Corner) -> HandleKind {
    match c.state {
        CornerState::Normal => HandleKind::Corner,
        CornerState::User => HandleKind::SharpCorner,
    }
}

fn draw_corner(overlay: &mut dyn Overlay, c: &Corner, i: usize, hit: Hit) {
    overlay.handle(c.point, corner_kind(c), hit == Hit::Corner(i));
    if c.state == CornerState::User {
        for side in [HandleSide::In, HandleSide::Out] {
            let at = c.handle(side);
            if at != c.point {
                overlay.arrow(c.point, at, false);
                overlay.handle(at, HandleKind::Control, hit == Hit::Handle(i, side));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Point;

    use super::*;
    use crate::config::EditConfig;
    use crate::edit::{ButtonEvent, PointerEvent};
    use crate::form::FormId;
    use crate::geometry::Frame;
    use crate::shape::{Circle, Path};

    #[derive(Default)]
    struct Recorder {
        lines: Vec<(LineRole, bool)>,
        handles: Vec<(HandleKind, bool)>,
        arrows: usize,
    }

    impl Overlay for Recorder {
        fn polyline(&mut self, line: &Polyline, _closed: bool, role: LineRole, highlighted: bool) {
            assert!(!line.is_empty(), "empty {role:?} outline");
            self.lines.push((role, highlighted));
        }

        fn handle(&mut self, _at: Point, kind: HandleKind, highlighted: bool) {
            self.handles.push((kind, highlighted));
        }

        fn arrow(&mut self, _from: Point, _to: Point, _highlighted: bool) {
            self.arrows += 1;
        }
    }

    fn setup() -> (Registry, EditSession, FormId) {
        let mut reg = Registry::new();
        let group = reg.create(ShapeKind::Group);
        let group = reg.insert(group).unwrap();
        let mut path = reg.create(ShapeKind::Path);
        path.shape = Shape::Path(Path::from_points(
            &[
                Point::new(100.0, 100.0),
                Point::new(200.0, 100.0),
                Point::new(150.0, 200.0),
            ],
            4.0,
        ));
        let path = reg.insert(path).unwrap();
        reg.add_member(group, path).unwrap();
        let mut circle = reg.create(ShapeKind::Circle);
        circle.shape = Shape::Circle(Circle::new(Point::new(400.0, 300.0), 30.0, 5.0));
        circle.source = Some(Point::new(500.0, 300.0));
        let circle = reg.insert(circle).unwrap();
        reg.add_member(group, circle).unwrap();
        let session = EditSession::new(group, Frame::new(800, 600), EditConfig::default());
        (reg, session, path)
    }

    #[test]
    fn outlines_for_every_visible_member() {
        let (reg, session, _) = setup();
        let mut rec = Recorder::default();
        assert!(session.post_expose(&reg, &mut rec, &mut Tracer::none()));
        let roles: Vec<LineRole> = rec.lines.iter().map(|l| l.0).collect();
        assert_eq!(
            roles,
            [
                LineRole::Boundary,
                LineRole::Border,
                LineRole::Boundary,
                LineRole::Border,
                LineRole::Source,
            ]
        );
        assert!(rec.handles.is_empty(), "no focus, no handles");
        assert_eq!(rec.arrows, 1, "source arrow");
    }

    #[test]
    fn focused_paths_show_their_corners() {
        let (mut reg, mut session, path) = setup();
        session.mouse_moved(&mut reg, &PointerEvent::at(Point::new(200.0, 100.0)), &mut Tracer::none());
        assert_eq!(session.hovered(), Some((path, Hit::Corner(1))));
        let mut rec = Recorder::default();
        session.post_expose(&reg, &mut rec, &mut Tracer::none());
        let corners = rec
            .handles
            .iter()
            .filter(|h| h.0 == HandleKind::Corner)
            .count();
        assert_eq!(corners, 3);
        assert!(rec.handles.contains(&(HandleKind::Corner, true)));
        assert_eq!(rec.handles.iter().filter(|h| h.0 == HandleKind::Feather).count(), 3);
    }

    #[test]
    fn creation_previews_follow_the_cursor() {
        let (mut reg, mut session, _) = setup();
        session.start_creating(ShapeKind::Path, false);
        session.button_pressed(
            &mut reg,
            &ButtonEvent::primary(Point::new(10.0, 10.0)),
            &mut Tracer::none(),
        );
        session.mouse_moved(&mut reg, &PointerEvent::at(Point::new(50.0, 10.0)), &mut Tracer::none());
        let mut rec = Recorder::default();
        session.post_expose(&reg, &mut rec, &mut Tracer::none());
        assert_eq!(rec.lines.iter().filter(|l| l.0 == LineRole::Preview).count(), 1);
    }
}
