// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizing groups by combining their members.
//!
//! [`render_roi`] accepts any form id: plain shapes are forwarded to
//! [`shape::mask_roi`], groups recurse into their members. Each participating
//! member is rendered over the same ROI into a scratch buffer, optionally
//! inverted, scaled by its opacity and merged into the output with its
//! [`CombineMode`](super::CombineMode). The first participating member seeds
//! the output; later members combine with it.
//!
//! Members whose id cannot be resolved are reported through
//! [`Tracer::dangling_member`] and skipped. A member that refers back to a
//! group already being rendered is treated the same way, so a corrupted
//! membership graph degrades to a partial mask instead of unbounded
//! recursion.

use alloc::vec::Vec;

use crate::buffer::AllocError;
use crate::config::RasterConfig;
use crate::form::{Form, FormId, ShapeKind};
use crate::geometry::Frame;
use crate::raster::{MaskArea, MaskBuffer, Roi};
use crate::shape;
use crate::snapshot::FormSource;
use crate::trace::{AllocFailureEvent, DanglingMemberEvent, RenderEvent, Tracer};

use super::MemberState;

struct Walk<'s, S: ?Sized> {
    src: &'s S,
    frame: Frame,
    stack: Vec<FormId>,
}

impl<'s, S: FormSource + ?Sized> Walk<'s, S> {
    fn new(src: &'s S, frame: Frame) -> Self {
        Self {
            src,
            frame,
            stack: Vec::new(),
        }
    }

    /// Resolves a member, reporting it when it is missing or would recurse.
    fn member(&self, group: FormId, id: FormId, tracer: &mut Tracer<'_>) -> Option<&'s Form> {
        let form = if self.stack.contains(&id) {
            None
        } else {
            self.src.form(id)
        };
        if form.is_none() {
            tracer.dangling_member(&DanglingMemberEvent { group, member: id });
        }
        form
    }

    fn area(&mut self, form: &Form, tracer: &mut Tracer<'_>) -> MaskArea {
        let Some(group) = form.as_group() else {
            return shape::area(form, self.frame);
        };
        self.stack.push(form.id);
        let mut area = MaskArea::default();
        for m in &group.members {
            if !m.state.contains(MemberState::USE) {
                continue;
            }
            let Some(member) = self.member(form.id, m.form, tracer) else {
                continue;
            };
            if m.state.contains(MemberState::INVERSE) {
                area = MaskArea::covering(self.frame.rect());
                break;
            }
            area = area.union(self.area(member, tracer));
        }
        self.stack.pop();
        area
    }

    fn render(
        &mut self,
        form: &Form,
        roi: &Roi,
        cfg: &RasterConfig,
        out: &mut [f32],
        tracer: &mut Tracer<'_>,
    ) -> Result<(), AllocError> {
        let Some(group) = form.as_group() else {
            return shape::mask_roi(form, self.frame, roi, cfg, out);
        };
        out.fill(0.0);
        self.stack.push(form.id);
        let result = self.combine(form.id, &group.members, roi, cfg, out, tracer);
        self.stack.pop();
        result
    }

    fn combine(
        &mut self,
        group: FormId,
        members: &[super::GroupMember],
        roi: &Roi,
        cfg: &RasterConfig,
        out: &mut [f32],
        tracer: &mut Tracer<'_>,
    ) -> Result<(), AllocError> {
        let visible = MaskArea::covering(roi.image_rect());
        let mut scratch: Option<MaskBuffer> = None;
        let mut first = true;
        for m in members {
            if !m.state.contains(MemberState::USE) {
                continue;
            }
            let Some(member) = self.member(group, m.form, tracer) else {
                continue;
            };
            let inverse = m.state.contains(MemberState::INVERSE);
            let mode = m.state.mode();
            let opacity = m.opacity.clamp(0.0, 1.0);
            let seed = first;
            first = false;

            if !inverse && self.area(member, tracer).intersect(visible).is_empty() {
                // The member is zero everywhere in this ROI.
                if !seed && mode == super::CombineMode::Intersection {
                    out.fill(0.0);
                }
                continue;
            }

            let buf = match &mut scratch {
                Some(buf) => buf,
                None => scratch.insert(MaskBuffer::try_for_roi(roi, "group member")?),
            };
            self.render(member, roi, cfg, buf.data_mut(), tracer)?;
            for (acc, &v) in out.iter_mut().zip(buf.data()) {
                let b = (if inverse { 1.0 - v } else { v }) * opacity;
                *acc = if seed { b } else { mode.combine(*acc, b) };
            }
        }
        Ok(())
    }
}

/// Rasterizes form `id` (a shape or a group) into `out`, which covers `roi`.
///
/// Every value of `out` is overwritten. An unknown `id` leaves it zeroed.
///
/// # Errors
///
/// Returns [`AllocError`] when a scratch buffer or outline cannot be
/// allocated; the failure is also reported to `tracer` and `out` should be
/// discarded.
///
/// # Panics
///
/// Panics if `out` is smaller than the ROI.
pub fn render_roi<S: FormSource + ?Sized>(
    src: &S,
    id: FormId,
    frame: Frame,
    roi: &Roi,
    cfg: &RasterConfig,
    out: &mut [f32],
    tracer: &mut Tracer<'_>,
) -> Result<(), AllocError> {
    assert!(out.len() >= roi.pixel_count(), "output smaller than ROI");
    let out = &mut out[..roi.pixel_count()];
    let Some(form) = src.form(id) else {
        out.fill(0.0);
        return Ok(());
    };
    let mut walk = Walk::new(src, frame);
    match walk.render(form, roi, cfg, out, tracer) {
        Ok(()) => {
            tracer.render(&RenderEvent {
                form: id,
                kind: form.kind(),
                width: roi.width,
                height: roi.height,
                cached: false,
            });
            Ok(())
        }
        Err(e) => {
            tracer.alloc_failure(&AllocFailureEvent {
                tag: e.tag,
                requested: e.requested,
            });
            Err(e)
        }
    }
}

/// Rasterizes form `id` over its own [`area`] at full resolution.
///
/// # Errors
///
/// Returns [`AllocError`] when the output or a scratch buffer cannot be
/// allocated.
pub fn render<S: FormSource + ?Sized>(
    src: &S,
    id: FormId,
    frame: Frame,
    cfg: &RasterConfig,
    tracer: &mut Tracer<'_>,
) -> Result<MaskBuffer, AllocError> {
    let roi = Roi::from_area(area(src, id, frame, tracer));
    let mut buf = MaskBuffer::try_for_roi(&roi, "mask").inspect_err(|e| {
        tracer.alloc_failure(&AllocFailureEvent {
            tag: e.tag,
            requested: e.requested,
        });
    })?;
    render_roi(src, id, frame, &roi, cfg, buf.data_mut(), tracer)?;
    Ok(buf)
}

/// Bounding box of form `id`'s mask.
///
/// A group covers the union of its participating members, or the whole frame
/// once any member is inverted. Unknown ids have an empty area.
#[must_use]
pub fn area<S: FormSource + ?Sized>(
    src: &S,
    id: FormId,
    frame: Frame,
    tracer: &mut Tracer<'_>,
) -> MaskArea {
    match src.form(id) {
        Some(form) => Walk::new(src, frame).area(form, tracer),
        None => MaskArea::default(),
    }
}

/// Bounding box of form `id`'s clone source. Groups and gradients have none.
#[must_use]
pub fn source_area<S: FormSource + ?Sized>(src: &S, id: FormId, frame: Frame) -> Option<MaskArea> {
    let form = src.form(id)?;
    if form.kind() == ShapeKind::Group {
        return None;
    }
    shape::source_area(form, frame)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use hashbrown::HashMap;
    use kurbo::Point;

    use super::*;
    use crate::form::Shape;
    use crate::group::{CombineMode, Group, GroupMember};
    use crate::shape::Circle;

    const FRAME: Frame = Frame::new(400, 300);

    fn circle(id: u32, x: f64, y: f64) -> Form {
        Form::new(
            FormId(id),
            Shape::Circle(Circle::new(Point::new(x, y), 50.0, 0.0)),
        )
    }

    fn forms(members: &[GroupMember], extra: &[Form]) -> HashMap<FormId, Form> {
        let mut map = HashMap::new();
        for f in extra {
            map.insert(f.id, f.clone());
        }
        let g = Form::new(
            FormId(100),
            Shape::Group(Group {
                members: members.to_vec(),
            }),
        );
        map.insert(g.id, g);
        map
    }

    fn sample(map: &HashMap<FormId, Form>, x: i32, y: i32) -> f32 {
        let roi = Roi {
            x,
            y,
            width: 1,
            height: 1,
            scale: 1.0,
        };
        let mut out = [0.0_f32];
        render_roi(
            map,
            FormId(100),
            FRAME,
            &roi,
            &RasterConfig::full(),
            &mut out,
            &mut Tracer::none(),
        )
        .unwrap();
        out[0]
    }

    fn member(id: u32, mode: CombineMode) -> GroupMember {
        GroupMember::new(FormId(id), FormId(100)).with_mode(mode)
    }

    #[test]
    fn union_then_intersection() {
        let a = circle(1, 100.0, 100.0);
        let b = circle(2, 150.0, 100.0);
        let map = forms(
            &[member(1, CombineMode::Union), member(2, CombineMode::Intersection)],
            &[a.clone(), b],
        );
        assert_eq!(sample(&map, 125, 100), 1.0, "overlap");
        assert_eq!(sample(&map, 75, 100), 0.0, "outside the intersection");

        let only_a = forms(&[member(1, CombineMode::Union)], &[a]);
        assert_eq!(sample(&only_a, 75, 100), 1.0);
    }

    #[test]
    fn exclusion_cancels_overlap() {
        let map = forms(
            &[member(1, CombineMode::Union), member(2, CombineMode::Exclusion)],
            &[circle(1, 100.0, 100.0), circle(2, 150.0, 100.0)],
        );
        assert!(sample(&map, 125, 100) < 1e-6);
        assert!((sample(&map, 75, 100) - 1.0).abs() < 1e-6);
        assert!((sample(&map, 175, 100) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn difference_and_opacity() {
        let map = forms(
            &[
                member(1, CombineMode::Union),
                member(2, CombineMode::Difference).with_opacity(0.25),
            ],
            &[circle(1, 100.0, 100.0), circle(2, 150.0, 100.0)],
        );
        assert_eq!(sample(&map, 75, 100), 1.0);
        assert_eq!(sample(&map, 125, 100), 0.75);
        assert_eq!(sample(&map, 175, 100), 0.0);
    }

    #[test]
    fn inverted_member_covers_frame() {
        let map = forms(
            &[member(1, CombineMode::Union).inverted()],
            &[circle(1, 100.0, 100.0)],
        );
        assert_eq!(sample(&map, 100, 100), 0.0);
        assert_eq!(sample(&map, 300, 250), 1.0);
        let a = area(&map, FormId(100), FRAME, &mut Tracer::none());
        assert_eq!((a.x, a.y, a.width, a.height), (0, 0, 400, 300));
    }

    #[test]
    fn disjoint_intersection_clears_output() {
        let map = forms(
            &[member(1, CombineMode::Union), member(2, CombineMode::Intersection)],
            &[circle(1, 100.0, 100.0), circle(2, 350.0, 250.0)],
        );
        assert_eq!(sample(&map, 100, 100), 0.0);
    }

    #[test]
    fn dangling_and_unused_members_are_skipped() {
        let mut unused = member(2, CombineMode::Union);
        unused.state.remove(MemberState::USE);
        let map = forms(
            &[member(9, CombineMode::Union), unused, member(1, CombineMode::Union)],
            &[circle(1, 100.0, 100.0), circle(2, 300.0, 100.0)],
        );
        assert_eq!(sample(&map, 100, 100), 1.0);
        assert_eq!(sample(&map, 300, 100), 0.0);
        let a = area(&map, FormId(100), FRAME, &mut Tracer::none());
        assert_eq!((a.x, a.y, a.width, a.height), (50, 50, 100, 100));
    }

    #[test]
    fn nested_groups_render_recursively() {
        let mut map = forms(
            &[member(1, CombineMode::Union), member(2, CombineMode::Union)],
            &[circle(1, 100.0, 100.0), circle(2, 300.0, 100.0)],
        );
        let outer = Form::new(
            FormId(200),
            Shape::Group(Group {
                members: vec![
                    GroupMember::new(FormId(100), FormId(200)),
                    GroupMember::new(FormId(1), FormId(200)).with_mode(CombineMode::Difference),
                ],
            }),
        );
        map.insert(outer.id, outer);
        let buf = render(
            &map,
            FormId(200),
            FRAME,
            &RasterConfig::full(),
            &mut Tracer::none(),
        )
        .unwrap();
        assert_eq!((buf.origin_x, buf.width), (50, 300));
        assert_eq!(buf.value_at(100, 100), 0.0);
        assert_eq!(buf.value_at(300, 100), 1.0);
    }

    #[test]
    fn group_area_bounds_renders_at_any_quality() {
        let map = forms(
            &[member(1, CombineMode::Union), member(2, CombineMode::Union)],
            &[circle(1, 100.0, 100.0), circle(2, 300.0, 100.0)],
        );
        let a = area(&map, FormId(100), FRAME, &mut Tracer::none());
        assert_eq!((a.x, a.y, a.width, a.height), (50, 50, 300, 100));
        for cfg in [RasterConfig::full(), RasterConfig::preview()] {
            let buf = render(&map, FormId(100), FRAME, &cfg, &mut Tracer::none()).unwrap();
            assert_eq!(
                (buf.origin_x, buf.origin_y, buf.width, buf.height),
                (a.x, a.y, a.width, a.height)
            );
        }
    }

    #[test]
    fn plain_shapes_pass_through() {
        let map = forms(&[], &[circle(1, 100.0, 100.0)]);
        let buf = render(
            &map,
            FormId(1),
            FRAME,
            &RasterConfig::full(),
            &mut Tracer::none(),
        )
        .unwrap();
        assert_eq!(buf.value_at(100, 100), 1.0);
        assert!(source_area(&map, FormId(100), FRAME).is_none());
        assert!(area(&map, FormId(100), FRAME, &mut Tracer::none()).is_empty());
    }

    #[test]
    #[should_panic(expected = "output smaller than ROI")]
    fn short_output_panics() {
        let map = forms(&[], &[]);
        let roi = Roi::from_area(MaskArea {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        });
        let mut out = [0.0_f32; 3];
        let _ = render_roi(
            &map,
            FormId(100),
            FRAME,
            &roi,
            &RasterConfig::full(),
            &mut out,
            &mut Tracer::none(),
        );
    }
}
