// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interactive editing of the forms in one group.
//!
//! An [`EditSession`] turns pointer, button and scroll events (already mapped
//! to image coordinates by the GUI layer) into registry mutations. It holds no
//! forms itself: every event handler takes the [`Registry`] by `&mut`, which
//! is the exclusive access the editing thread holds while it mutates. Renders
//! running elsewhere read [`Snapshot`](crate::snapshot::Snapshot)s instead.
//!
//! ```text
//!            pointer over a shape            press
//!   Idle ───────────────────────▶ Hover ─────────────▶ Dragging
//!    ▲  ◀─────────────────────────  │  ◀─────────────────  │
//!    │        pointer left          │       release        │
//!    │                              │ ctrl+click segment ──┘ (new corner)
//!    │   start_creating
//!    └──────────────▶ Creating ── finished, cancelled or stop_creating ──▶ Idle
//! ```
//!
//! Every handler returns whether it consumed the event, so the caller knows
//! whether to keep dispatching it. Completed edits are queued as
//! [`EditSignal`]s for the history layer and reported to the trace sink.

use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::Point;

use crate::config::{EditConfig, RasterConfig};
use crate::form::{FormId, Shape, ShapeKind};
use crate::geometry::Frame;
use crate::group::MemberState;
use crate::registry::{MoveDirection, Registry, RegistryError};
use crate::shape::{self, Hit};
use crate::shape::spline;
use crate::trace::{AllocFailureEvent, EditEvent, RejectedEditEvent, Tracer};

mod creation;
mod drag;
mod overlay;

pub use overlay::{HandleKind, LineRole, Overlay};

use creation::{Creation, Step};
use drag::{DragOutcome, ScrollTarget};

/// What a committed edit changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditAction {
    /// A new form was placed.
    Created,
    /// A form or its clone source was moved.
    Moved,
    /// Corners, handles, axes or the rotation changed.
    Reshaped,
    /// A feather, hardness or curvature changed.
    Feathered,
    /// A form was scaled.
    Resized,
    /// A member's opacity changed.
    Opacity,
    /// A corner was inserted.
    CornerAdded,
    /// A corner was deleted.
    CornerRemoved,
    /// A corner switched between automatic and user handles.
    CornerToggled,
    /// A form was removed from the edited group.
    Removed,
    /// A member was moved in the combination order.
    Reordered,
    /// A form was duplicated into the edited group.
    Duplicated,
    /// A group member was added or a subgroup dissolved.
    Regrouped,
}

impl EditAction {
    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Moved => "moved",
            Self::Reshaped => "reshaped",
            Self::Feathered => "feathered",
            Self::Resized => "resized",
            Self::Opacity => "opacity",
            Self::CornerAdded => "corner added",
            Self::CornerRemoved => "corner removed",
            Self::CornerToggled => "corner toggled",
            Self::Removed => "removed",
            Self::Reordered => "reordered",
            Self::Duplicated => "duplicated",
            Self::Regrouped => "regrouped",
        }
    }
}

/// A committed edit; the history layer records a checkpoint for each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EditSignal {
    /// The form that changed.
    pub form: FormId,
    /// What changed.
    pub action: EditAction,
}

/// Scroll step granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StepSize {
    /// [`EditConfig::coarse_multiplier`] times the normal step.
    Coarse,
    /// One step.
    #[default]
    Normal,
    /// [`EditConfig::fine_multiplier`] times the normal step.
    Fine,
}

impl StepSize {
    /// Step multiplier under `cfg`.
    #[must_use]
    pub fn multiplier(self, cfg: &EditConfig) -> f64 {
        match self {
            Self::Coarse => cfg.coarse_multiplier,
            Self::Normal => 1.0,
            Self::Fine => cfg.fine_multiplier,
        }
    }
}

/// Modifier keys held during an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Shift.
    pub shift: bool,
    /// Control (command on macOS).
    pub ctrl: bool,
    /// Alt.
    pub alt: bool,
}

/// A pointer button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    /// Usually the left button.
    Primary,
    /// Usually the right button.
    Secondary,
    /// The middle button.
    Middle,
}

/// Pointer motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Position in image pixels.
    pub pos: Point,
    /// Display pixels per image pixel.
    pub zoom: f64,
    /// Stylus pressure in `[0, 1]`; `1` for devices without pressure.
    pub pressure: f64,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Motion to `pos` at zoom 1 with full pressure.
    #[must_use]
    pub fn at(pos: Point) -> Self {
        Self {
            pos,
            zoom: 1.0,
            pressure: 1.0,
            modifiers: Modifiers::default(),
        }
    }
}

/// A button press or release.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ButtonEvent {
    /// Position in image pixels.
    pub pos: Point,
    /// Display pixels per image pixel.
    pub zoom: f64,
    /// Which button.
    pub button: Button,
    /// `2` for the second press of a double-click.
    pub clicks: u8,
    /// Stylus pressure in `[0, 1]`.
    pub pressure: f64,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl ButtonEvent {
    /// A single primary click at `pos` at zoom 1.
    #[must_use]
    pub fn primary(pos: Point) -> Self {
        Self {
            pos,
            zoom: 1.0,
            button: Button::Primary,
            clicks: 1,
            pressure: 1.0,
            modifiers: Modifiers::default(),
        }
    }
}

/// One scroll notch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollEvent {
    /// Position in image pixels.
    pub pos: Point,
    /// Display pixels per image pixel.
    pub zoom: f64,
    /// Scrolling up grows, down shrinks.
    pub up: bool,
    /// Step granularity.
    pub step: StepSize,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl ScrollEvent {
    /// One normal step up at `pos` at zoom 1.
    #[must_use]
    pub fn at(pos: Point) -> Self {
        Self {
            pos,
            zoom: 1.0,
            up: true,
            step: StepSize::Normal,
            modifiers: Modifiers::default(),
        }
    }
}

/// Coarse state of an [`EditSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing under the pointer.
    Idle,
    /// The pointer is over a part of a form.
    Hover,
    /// A part of a form is being dragged.
    Dragging,
    /// A new shape is being placed.
    Creating,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    form: FormId,
    target: Hit,
    last: Point,
    /// Horizontal ordering of a dragged corner at press time.
    ordering: Option<Ordering>,
    action: EditAction,
    moved: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum State {
    Idle,
    Hover { form: FormId, hit: Hit },
    Dragging(Drag),
    Creating { creation: Creation, continuous: bool },
}

/// Editing state for the members of one group.
#[derive(Debug)]
pub struct EditSession {
    group: FormId,
    frame: Frame,
    cfg: EditConfig,
    raster: RasterConfig,
    state: State,
    cursor: Option<Point>,
    clone_mode: bool,
    signals: Vec<EditSignal>,
}

impl EditSession {
    /// Edits the members of `group` in an image of size `frame`.
    #[must_use]
    pub fn new(group: FormId, frame: Frame, cfg: EditConfig) -> Self {
        Self {
            group,
            frame,
            cfg,
            raster: RasterConfig::preview(),
            state: State::Idle,
            cursor: None,
            clone_mode: false,
            signals: Vec::new(),
        }
    }

    /// The edited group.
    #[must_use]
    pub fn group(&self) -> FormId {
        self.group
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &EditConfig {
        &self.cfg
    }

    /// Coarse state.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Hover { .. } => Phase::Hover,
            State::Dragging(_) => Phase::Dragging,
            State::Creating { .. } => Phase::Creating,
        }
    }

    /// The form and part under the pointer or being dragged.
    #[must_use]
    pub fn hovered(&self) -> Option<(FormId, Hit)> {
        match self.state {
            State::Hover { form, hit } => Some((form, hit)),
            State::Dragging(d) => Some((d.form, d.target)),
            _ => None,
        }
    }

    /// Kind of shape being created, if any.
    #[must_use]
    pub fn creating(&self) -> Option<ShapeKind> {
        match &self.state {
            State::Creating { creation, .. } => Some(creation.kind()),
            _ => None,
        }
    }

    /// New shapes get a clone source when on.
    pub fn set_clone_mode(&mut self, on: bool) {
        self.clone_mode = on;
    }

    /// Starts placing a shape of `kind`.
    ///
    /// With `continuous`, creation restarts after each placed shape until
    /// [`stop_creating`](Self::stop_creating). Returns `false` for groups.
    pub fn start_creating(&mut self, kind: ShapeKind, continuous: bool) -> bool {
        match Creation::new(kind, self.frame, &self.cfg) {
            Some(creation) => {
                self.state = State::Creating {
                    creation,
                    continuous,
                };
                true
            }
            None => false,
        }
    }

    /// Abandons any creation in progress.
    pub fn stop_creating(&mut self) {
        if matches!(self.state, State::Creating { .. }) {
            self.state = State::Idle;
        }
    }

    /// Takes the queued edit signals, oldest first.
    pub fn drain_signals(&mut self) -> impl Iterator<Item = EditSignal> + '_ {
        self.signals.drain(..)
    }

    /// Help text for the current state.
    #[must_use]
    pub fn hint(&self, registry: &Registry) -> &'static str {
        match &self.state {
            State::Creating { creation, .. } => shape::hint_message(creation.kind(), None, true),
            _ => match self.hovered() {
                Some((form, hit)) => registry
                    .get(form)
                    .map_or("", |f| shape::hint_message(f.kind(), Some(hit), false)),
                None => "",
            },
        }
    }

    // -- Events --

    /// The pointer entered the image area.
    pub fn mouse_enter(&mut self, pos: Point) -> bool {
        self.cursor = Some(pos);
        false
    }

    /// The pointer left the image area. Returns `true` when a hover was
    /// cleared.
    pub fn mouse_leave(&mut self) -> bool {
        self.cursor = None;
        if matches!(self.state, State::Hover { .. }) {
            self.state = State::Idle;
            return true;
        }
        false
    }

    /// Handles pointer motion.
    pub fn mouse_moved(
        &mut self,
        registry: &mut Registry,
        ev: &PointerEvent,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.cursor = Some(ev.pos);
        if let State::Creating { creation, .. } = &mut self.state {
            creation.moved(ev, &self.cfg);
            return true;
        }
        if matches!(self.state, State::Dragging(_)) {
            return self.drag_to(registry, ev.pos, tracer);
        }
        let before = self.hovered();
        let now = self.pick(registry, ev.pos, ev.zoom, tracer);
        self.state = match now {
            Some((form, hit)) => State::Hover { form, hit },
            None => State::Idle,
        };
        now.is_some() || before.is_some()
    }

    /// Handles a button press.
    pub fn button_pressed(
        &mut self,
        registry: &mut Registry,
        ev: &ButtonEvent,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.cursor = Some(ev.pos);
        if let State::Creating { creation, .. } = &mut self.state {
            let step = creation.pressed(ev, &self.cfg);
            return self.creation_step(registry, step, tracer);
        }
        let Some((form, hit)) = self.pick(registry, ev.pos, ev.zoom, tracer) else {
            self.state = State::Idle;
            return false;
        };
        match ev.button {
            Button::Secondary => {
                self.secondary_click(registry, form, hit, tracer);
                true
            }
            Button::Primary if ev.modifiers.ctrl => {
                self.ctrl_click(registry, form, hit, ev.pos, tracer)
            }
            Button::Primary => {
                self.begin_drag(registry, form, hit, ev.pos);
                true
            }
            Button::Middle => false,
        }
    }

    /// Handles a button release.
    pub fn button_released(
        &mut self,
        registry: &mut Registry,
        ev: &ButtonEvent,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.cursor = Some(ev.pos);
        if let State::Creating { creation, .. } = &mut self.state {
            let step = creation.released(ev, &self.cfg);
            return self.creation_step(registry, step, tracer);
        }
        let State::Dragging(drag) = self.state else {
            return false;
        };
        if ev.button != Button::Primary {
            return false;
        }
        if drag.moved {
            self.commit(drag.form, drag.action, tracer);
        }
        self.state = match self.pick(registry, ev.pos, ev.zoom, tracer) {
            Some((form, hit)) => State::Hover { form, hit },
            None => State::Idle,
        };
        true
    }

    /// Handles a scroll notch.
    ///
    /// Plain scrolling resizes the hovered form, shift changes its feather
    /// (brush hardness, gradient curvature) and ctrl its opacity in the
    /// edited group. While creating, scrolling resizes the shape about to be
    /// placed.
    pub fn mouse_scrolled(
        &mut self,
        registry: &mut Registry,
        ev: &ScrollEvent,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let step = ev.step.multiplier(&self.cfg);
        if let State::Creating { creation, .. } = &mut self.state {
            return creation.scrolled(ev, step, &self.cfg) == Step::Continue;
        }
        let Some((form, _)) = self.hovered() else {
            return false;
        };
        if ev.modifiers.ctrl {
            #[expect(clippy::cast_possible_truncation, reason = "step multipliers are small")]
            let scale = step as f32;
            let delta = self.cfg.opacity_step * scale * if ev.up { 1.0 } else { -1.0 };
            return self.change_opacity(registry, form, delta, tracer).is_some();
        }
        let (target, action) = if ev.modifiers.shift {
            (ScrollTarget::Feather, EditAction::Feathered)
        } else {
            (ScrollTarget::Size, EditAction::Resized)
        };
        let cfg = self.cfg;
        let changed = registry
            .update(form, |f| drag::scroll_shape(&mut f.shape, target, ev.up, step, &cfg))
            .unwrap_or(false);
        if changed {
            self.commit(form, action, tracer);
        }
        changed
    }

    // -- Structural edits --

    /// Adds `form` to the edited group.
    pub fn add_form(&mut self, registry: &mut Registry, form: FormId, tracer: &mut Tracer<'_>) -> bool {
        match registry.add_member(self.group, form) {
            Ok(()) => {
                self.commit(form, EditAction::Regrouped, tracer);
                true
            }
            Err(e) => {
                self.rejected(form, e, tracer);
                false
            }
        }
    }

    /// Removes `form` from the edited group, deleting it when no other group
    /// uses it.
    pub fn remove_form(&mut self, registry: &mut Registry, form: FormId, tracer: &mut Tracer<'_>) -> bool {
        if let Err(e) = registry.remove_member(self.group, form) {
            self.rejected(form, e, tracer);
            return false;
        }
        if registry.groups_containing(form).is_empty() {
            registry.remove(form);
        }
        if self.hovered().is_some_and(|(f, _)| f == form) {
            self.state = State::Idle;
        }
        self.commit(form, EditAction::Removed, tracer);
        true
    }

    /// Moves `form` one step in the edited group's combination order.
    pub fn move_form(
        &mut self,
        registry: &mut Registry,
        form: FormId,
        direction: MoveDirection,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        match registry.move_member(self.group, form, direction) {
            Ok(true) => {
                self.commit(form, EditAction::Reordered, tracer);
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.rejected(form, e, tracer);
                false
            }
        }
    }

    /// Copies `form` and adds the copy to the edited group.
    pub fn duplicate_form(
        &mut self,
        registry: &mut Registry,
        form: FormId,
        tracer: &mut Tracer<'_>,
    ) -> Option<FormId> {
        let copy = match registry.duplicate(form) {
            Ok(copy) => copy,
            Err(e) => {
                self.rejected(form, e, tracer);
                return None;
            }
        };
        if let Err(e) = registry.add_member(self.group, copy) {
            registry.remove(copy);
            self.rejected(copy, e, tracer);
            return None;
        }
        self.commit(copy, EditAction::Duplicated, tracer);
        Some(copy)
    }

    /// Steps the opacity of `form` within the edited group; returns the new
    /// opacity.
    pub fn change_opacity(
        &mut self,
        registry: &mut Registry,
        form: FormId,
        delta: f32,
        tracer: &mut Tracer<'_>,
    ) -> Option<f32> {
        match registry.change_opacity(self.group, form, delta) {
            Ok(opacity) => {
                self.commit(form, EditAction::Opacity, tracer);
                Some(opacity)
            }
            Err(e) => {
                self.rejected(form, e, tracer);
                None
            }
        }
    }

    /// Replaces `subgroup` in the edited group with its members.
    pub fn ungroup(&mut self, registry: &mut Registry, subgroup: FormId, tracer: &mut Tracer<'_>) -> bool {
        match registry.ungroup(self.group, subgroup) {
            Ok(()) => {
                self.commit(subgroup, EditAction::Regrouped, tracer);
                true
            }
            Err(e) => {
                self.rejected(subgroup, e, tracer);
                false
            }
        }
    }

    // -- Internals --

    fn tolerance(&self, zoom: f64) -> f64 {
        self.cfg.handle_radius / creation::zoom(zoom)
    }

    /// The visible member part under `p`. Control points beat outlines, which
    /// beat interiors; among equals the nearest wins, and later members win
    /// ties since they are drawn on top.
    fn pick(
        &self,
        registry: &Registry,
        p: Point,
        zoom: f64,
        tracer: &mut Tracer<'_>,
    ) -> Option<(FormId, Hit)> {
        let group = registry.get(self.group)?.as_group()?;
        let tolerance = self.tolerance(zoom);
        let mut best: Option<(FormId, Hit, f64)> = None;
        for m in &group.members {
            if !m.state.contains(MemberState::SHOW) {
                continue;
            }
            let Some(form) = registry.get(m.form) else {
                continue;
            };
            let hit = match shape::hit_test(form, p, tolerance, self.frame, &self.raster) {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(e) => {
                    tracer.alloc_failure(&AllocFailureEvent {
                        tag: e.tag,
                        requested: e.requested,
                    });
                    continue;
                }
            };
            let better = best.is_none_or(|(_, b, d)| {
                match hit_rank(hit.hit).cmp(&hit_rank(b)) {
                    Ordering::Less => true,
                    Ordering::Equal => hit.distance <= d,
                    Ordering::Greater => false,
                }
            });
            if better {
                best = Some((m.form, hit.hit, hit.distance));
            }
        }
        best.map(|(form, hit, _)| (form, hit))
    }

    fn begin_drag(&mut self, registry: &Registry, form: FormId, target: Hit, pos: Point) {
        let ordering = match target {
            Hit::Corner(i) => registry.get(form).and_then(|f| drag::corner_ordering(f, i)),
            _ => None,
        };
        self.state = State::Dragging(Drag {
            form,
            target,
            last: pos,
            ordering,
            action: drag_action(target),
            moved: false,
        });
    }

    fn drag_to(&mut self, registry: &mut Registry, p: Point, tracer: &mut Tracer<'_>) -> bool {
        let State::Dragging(drag) = self.state else {
            return false;
        };
        let frame = self.frame;
        let min = self.cfg.min_size;
        let outcome = registry
            .update(drag.form, |f| {
                drag::apply_drag(f, drag.target, drag.last, p, drag.ordering, frame, min)
            })
            .unwrap_or(DragOutcome::Ignored);
        match outcome {
            DragOutcome::Ignored => false,
            DragOutcome::Moved => {
                self.state = State::Dragging(Drag {
                    last: p,
                    moved: true,
                    ..drag
                });
                true
            }
            DragOutcome::Healed => {
                self.commit(drag.form, EditAction::CornerRemoved, tracer);
                self.state = State::Idle;
                true
            }
        }
    }

    fn secondary_click(&mut self, registry: &mut Registry, form: FormId, hit: Hit, tracer: &mut Tracer<'_>) {
        if let Hit::Corner(i) = hit {
            let removed = registry
                .update(form, |f| match &mut f.shape {
                    Shape::Path(p) => p.remove_corner(i, 2),
                    Shape::Brush(b) => b.remove_corner(i, 2),
                    _ => false,
                })
                .unwrap_or(false);
            if removed {
                self.state = State::Idle;
                self.commit(form, EditAction::CornerRemoved, tracer);
                return;
            }
        }
        self.remove_form(registry, form, tracer);
    }

    fn ctrl_click(
        &mut self,
        registry: &mut Registry,
        form: FormId,
        hit: Hit,
        pos: Point,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        match hit {
            Hit::Corner(i) => {
                let toggled = registry
                    .update(form, |f| match &mut f.shape {
                        Shape::Path(p) => {
                            p.toggle_corner(i);
                            true
                        }
                        Shape::Brush(b) => {
                            b.toggle_corner(i);
                            true
                        }
                        _ => false,
                    })
                    .unwrap_or(false);
                if toggled {
                    self.commit(form, EditAction::CornerToggled, tracer);
                }
                toggled
            }
            Hit::Segment(_) => {
                let raster = self.raster;
                let inserted = registry
                    .update(form, |f| insert_corner_at(&mut f.shape, pos, &raster))
                    .unwrap_or(None);
                match inserted {
                    Some(i) => {
                        self.commit(form, EditAction::CornerAdded, tracer);
                        self.begin_drag(registry, form, Hit::Corner(i), pos);
                        true
                    }
                    None => false,
                }
            }
            _ => {
                self.begin_drag(registry, form, hit, pos);
                true
            }
        }
    }

    fn creation_step(&mut self, registry: &mut Registry, step: Step, tracer: &mut Tracer<'_>) -> bool {
        let State::Creating {
            creation,
            continuous,
        } = &self.state
        else {
            return false;
        };
        let (kind, continuous) = (creation.kind(), *continuous);
        match step {
            Step::Ignored => false,
            Step::Continue => true,
            Step::Cancelled => {
                self.state = State::Idle;
                true
            }
            Step::Finished(shape) => {
                self.place(registry, shape, tracer);
                self.state = State::Idle;
                if continuous {
                    self.start_creating(kind, true);
                }
                true
            }
        }
    }

    /// Registers a finished shape and adds it to the edited group.
    fn place(&mut self, registry: &mut Registry, shape: Shape, tracer: &mut Tracer<'_>) {
        let mut form = registry.create(shape.kind());
        form.shape = shape;
        if self.clone_mode {
            form.source = shape::initial_source(&form, self.frame);
        }
        let Ok(id) = registry.insert(form) else {
            return;
        };
        if let Err(e) = registry.add_member(self.group, id) {
            registry.remove(id);
            self.rejected(id, e, tracer);
            return;
        }
        self.commit(id, EditAction::Created, tracer);
    }

    fn commit(&mut self, form: FormId, action: EditAction, tracer: &mut Tracer<'_>) {
        tracer.edit(&EditEvent { form, action });
        self.signals.push(EditSignal { form, action });
    }

    fn rejected(&self, member: FormId, e: RegistryError, tracer: &mut Tracer<'_>) {
        if let RegistryError::Group(reason) = e {
            tracer.rejected_edit(&RejectedEditEvent {
                group: self.group,
                member,
                reason,
            });
        }
    }
}

fn hit_rank(hit: Hit) -> u8 {
    match hit {
        Hit::Corner(_) | Hit::Handle(..) | Hit::Feather(_) | Hit::Rotation | Hit::Axis(_) => 0,
        Hit::Segment(_) | Hit::Border | Hit::Source => 1,
        Hit::Inside => 2,
    }
}

fn drag_action(target: Hit) -> EditAction {
    match target {
        Hit::Inside | Hit::Source => EditAction::Moved,
        Hit::Border | Hit::Feather(_) => EditAction::Feathered,
        Hit::Corner(_) | Hit::Handle(..) | Hit::Segment(_) | Hit::Rotation | Hit::Axis(_) => {
            EditAction::Reshaped
        }
    }
}

/// Splits the path or brush segment nearest to `p`; returns the new corner.
fn insert_corner_at(shape: &mut Shape, p: Point, raster: &RasterConfig) -> Option<usize> {
    match shape {
        Shape::Path(path) => {
            let flat = path.flatten(raster).ok()?;
            let (seg, t, _) = spline::nearest_on_curve(&flat, true, p)?;
            Some(path.insert_corner(seg, t))
        }
        Shape::Brush(brush) => {
            let flat = brush.flatten(raster).ok()?;
            let (seg, t, _) = spline::nearest_on_curve(&flat, false, p)?;
            (seg + 1 < brush.nodes.len()).then(|| brush.insert_corner(seg, t))
        }
        _ => None,
    }
}
