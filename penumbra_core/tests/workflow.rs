// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Editing, persistence and off-thread rendering working together.

use kurbo::Point;
use penumbra_core::codec;
use penumbra_core::config::{EditConfig, RasterConfig};
use penumbra_core::edit::{ButtonEvent, EditAction, EditSession, PointerEvent};
use penumbra_core::form::{FormId, Shape, ShapeKind};
use penumbra_core::geometry::Frame;
use penumbra_core::group::CombineMode;
use penumbra_core::group::render;
use penumbra_core::registry::Registry;
use penumbra_core::shape::{Circle, Path};
use penumbra_core::trace::Tracer;

const FRAME: Frame = Frame::new(640, 480);

fn register(reg: &mut Registry, group: FormId, shape: Shape) -> FormId {
    let mut form = reg.create(shape.kind());
    form.shape = shape;
    let id = reg.insert(form).unwrap();
    reg.add_member(group, id).unwrap();
    id
}

fn new_group(reg: &mut Registry) -> FormId {
    let group = reg.create(ShapeKind::Group);
    reg.insert(group).unwrap()
}

#[test]
fn single_circle_renders_opaque_center_and_feather() {
    let mut reg = Registry::new();
    let group = new_group(&mut reg);
    register(
        &mut reg,
        group,
        Shape::Circle(Circle::new(Point::new(200.0, 200.0), 40.0, 20.0)),
    );
    let snap = reg.snapshot(group);
    let mask = render::render(&snap, group, FRAME, &RasterConfig::full(), &mut Tracer::none()).unwrap();
    assert_eq!(mask.value_at(200, 200), 1.0);
    let feather = mask.value_at(250, 200);
    assert!(feather > 0.0 && feather < 1.0, "feather band is partial: {feather}");
    assert_eq!(mask.value_at(300, 200), 0.0);
}

#[test]
fn difference_cuts_a_hole() {
    let mut reg = Registry::new();
    let group = new_group(&mut reg);
    register(
        &mut reg,
        group,
        Shape::Circle(Circle::new(Point::new(200.0, 200.0), 80.0, 0.0)),
    );
    let hole = register(
        &mut reg,
        group,
        Shape::Circle(Circle::new(Point::new(200.0, 200.0), 20.0, 0.0)),
    );
    reg.set_member_mode(group, hole, CombineMode::Difference).unwrap();
    let snap = reg.snapshot(group);
    let mask = render::render(&snap, group, FRAME, &RasterConfig::full(), &mut Tracer::none()).unwrap();
    assert_eq!(mask.value_at(200, 200), 0.0, "hole");
    assert_eq!(mask.value_at(150, 200), 1.0, "ring");
}

#[test]
fn snapshots_render_on_another_thread_while_editing_continues() {
    let mut reg = Registry::new();
    let group = new_group(&mut reg);
    let c = register(
        &mut reg,
        group,
        Shape::Circle(Circle::new(Point::new(100.0, 100.0), 30.0, 0.0)),
    );
    let snap = reg.snapshot(group);
    assert!(snap.is_current(&reg));

    let worker = std::thread::spawn(move || {
        let mask = render::render(&snap, group, FRAME, &RasterConfig::full(), &mut Tracer::none()).unwrap();
        mask.value_at(100, 100)
    });

    reg.update(c, |f| f.shape.translate(kurbo::Vec2::new(300.0, 0.0)))
        .unwrap();
    assert_eq!(worker.join().unwrap(), 1.0, "snapshot keeps the old position");

    let fresh = reg.snapshot(group);
    let mask = render::render(&fresh, group, FRAME, &RasterConfig::full(), &mut Tracer::none()).unwrap();
    assert_eq!(mask.value_at(100, 100), 0.0);
    assert_eq!(mask.value_at(400, 100), 1.0);
}

#[test]
fn dragged_corner_that_breaks_ordering_is_removed() {
    let mut reg = Registry::new();
    let group = new_group(&mut reg);
    let path = register(
        &mut reg,
        group,
        Shape::Path(Path::from_points(
            &[
                Point::new(100.0, 100.0),
                Point::new(150.0, 50.0),
                Point::new(200.0, 100.0),
                Point::new(150.0, 200.0),
            ],
            5.0,
        )),
    );
    let mut session = EditSession::new(group, FRAME, EditConfig::default());
    let mut tracer = Tracer::none();
    session.mouse_moved(&mut reg, &PointerEvent::at(Point::new(150.0, 50.0)), &mut tracer);
    session.button_pressed(&mut reg, &ButtonEvent::primary(Point::new(150.0, 50.0)), &mut tracer);
    session.mouse_moved(&mut reg, &PointerEvent::at(Point::new(250.0, 50.0)), &mut tracer);
    session.button_released(&mut reg, &ButtonEvent::primary(Point::new(250.0, 50.0)), &mut tracer);

    let Shape::Path(p) = &reg.get(path).unwrap().shape else {
        panic!("path changed kind");
    };
    assert_eq!(p.corners.len(), 3, "out-of-order corner deleted");
    assert!(
        session
            .drain_signals()
            .any(|s| s.form == path && s.action == EditAction::CornerRemoved),
        "removal is signalled"
    );
    let changes = reg.drain_changes();
    assert!(changes.touches(path) && changes.touches(group));
}

#[test]
fn saved_forms_reload_into_a_fresh_registry() {
    let mut reg = Registry::new();
    let group = new_group(&mut reg);
    register(
        &mut reg,
        group,
        Shape::Circle(Circle::new(Point::new(120.0, 90.0), 25.0, 10.0)),
    );
    register(
        &mut reg,
        group,
        Shape::Path(Path::from_points(
            &[
                Point::new(300.0, 300.0),
                Point::new(400.0, 300.0),
                Point::new(350.0, 400.0),
            ],
            8.0,
        )),
    );
    let bytes = codec::encode_forms(reg.iter());

    let mut restored = Registry::new();
    let mut tracer = Tracer::none();
    let forms = codec::decode_forms(&bytes, &mut tracer);
    assert_eq!(restored.load(forms, &mut tracer), 3);

    let before = reg.snapshot(group);
    let after = restored.snapshot(group);
    let cfg = RasterConfig::preview();
    let a = render::render(&before, group, FRAME, &cfg, &mut Tracer::none()).unwrap();
    let b = render::render(&after, group, FRAME, &cfg, &mut Tracer::none()).unwrap();
    assert_eq!(a, b);

    // Fresh ids continue after the loaded ones.
    let next = restored.create(ShapeKind::Circle);
    assert!(reg.ids().iter().all(|&id| id != next.id));
}
