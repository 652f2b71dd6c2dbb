// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placing new shapes.
//!
//! Circles and ellipses are placed with one click. Paths collect corners until
//! a double-click, a click on the first corner or a right-click closes them.
//! Brushes record a stroke from press to release. Gradients take their anchor
//! from the press and their direction from the drag.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};

use crate::config::{BrushPressure, EditConfig};
use crate::form::{Shape, ShapeKind};
use crate::geometry::{Frame, normalize_angle};
use crate::shape::{
    Brush, BrushCorner, Circle, Corner, CornerState, Ellipse, EllipseBorder, Gradient, Path,
};

use super::{Button, ButtonEvent, PointerEvent, ScrollEvent};
use super::drag::ScrollTarget;

/// Fewest corners a path is closed with.
const MIN_PATH_CORNERS: usize = 3;
/// Hardness change per normal scroll step while painting.
const HARDNESS_STEP: f64 = 0.05;

/// In-progress creation of one shape.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Creation {
    Circle {
        radius: f64,
        border: f64,
    },
    Ellipse {
        radii: Vec2,
        rotation: f64,
        border: f64,
    },
    Path {
        corners: Vec<Corner>,
        border: f64,
    },
    Brush {
        nodes: Vec<BrushCorner>,
        painting: bool,
        width: f64,
        hardness: f64,
        density: f64,
    },
    Gradient {
        anchor: Option<Point>,
        rotation: f64,
    },
}

/// What a creation event led to.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Step {
    /// The event was not for the creation.
    Ignored,
    /// Still collecting input.
    Continue,
    /// The shape is complete.
    Finished(Shape),
    /// Creation was abandoned.
    Cancelled,
}

impl Creation {
    /// Starts creating a shape of `kind`; groups cannot be drawn.
    pub(crate) fn new(kind: ShapeKind, frame: Frame, cfg: &EditConfig) -> Option<Self> {
        let d = &cfg.defaults;
        let unit = frame.min_dimension();
        Some(match kind {
            ShapeKind::Circle => Self::Circle {
                radius: d.circle_radius * unit,
                border: d.circle_border * unit,
            },
            ShapeKind::Ellipse => Self::Ellipse {
                radii: Vec2::new(d.ellipse_radii.0 * unit, d.ellipse_radii.1 * unit),
                rotation: 0.0,
                border: d.ellipse_border * unit,
            },
            ShapeKind::Path => Self::Path {
                corners: Vec::new(),
                border: d.path_border * unit,
            },
            ShapeKind::Brush => Self::Brush {
                nodes: Vec::new(),
                painting: false,
                width: d.brush_width * unit,
                hardness: d.brush_hardness,
                density: d.brush_density,
            },
            ShapeKind::Gradient => Self::Gradient {
                anchor: None,
                rotation: 0.0,
            },
            ShapeKind::Group => return None,
        })
    }

    pub(crate) fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Ellipse { .. } => ShapeKind::Ellipse,
            Self::Path { .. } => ShapeKind::Path,
            Self::Brush { .. } => ShapeKind::Brush,
            Self::Gradient { .. } => ShapeKind::Gradient,
        }
    }

    pub(crate) fn pressed(&mut self, ev: &ButtonEvent, cfg: &EditConfig) -> Step {
        if ev.button == Button::Secondary {
            return match self {
                Self::Path { corners, .. } if corners.len() >= MIN_PATH_CORNERS => {
                    finish_path(corners)
                }
                _ => Step::Cancelled,
            };
        }
        if ev.button != Button::Primary {
            return Step::Ignored;
        }
        let pos = ev.pos;
        match self {
            Self::Circle { radius, border } => {
                Step::Finished(Shape::Circle(Circle::new(pos, *radius, *border)))
            }
            Self::Ellipse {
                radii,
                rotation,
                border,
            } => Step::Finished(Shape::Ellipse(Ellipse::new(
                pos,
                *radii,
                *rotation,
                *border,
                EllipseBorder::default(),
            ))),
            Self::Path { corners, border } => {
                let closing = corners.len() >= MIN_PATH_CORNERS
                    && (ev.clicks >= 2
                        || corners.first().is_some_and(|first| {
                            (first.point - pos).hypot() <= cfg.close_distance / zoom(ev.zoom)
                        }));
                if closing {
                    return finish_path(corners);
                }
                // The first press of a double-click already placed this corner.
                if ev.clicks >= 2 {
                    return Step::Continue;
                }
                let mut corner = Corner::new(pos, *border);
                if ev.modifiers.ctrl {
                    corner.state = CornerState::User;
                }
                corners.push(corner);
                Step::Continue
            }
            Self::Brush {
                nodes,
                painting,
                width,
                hardness,
                density,
            } => {
                *painting = true;
                nodes.clear();
                nodes.push(brush_node(
                    pos,
                    ev.pressure,
                    (*width, *hardness, *density),
                    cfg.brush_pressure,
                ));
                Step::Continue
            }
            Self::Gradient { anchor, .. } => {
                *anchor = Some(pos);
                Step::Continue
            }
        }
    }

    pub(crate) fn moved(&mut self, ev: &PointerEvent, cfg: &EditConfig) -> Step {
        match self {
            Self::Brush {
                nodes,
                painting: true,
                width,
                hardness,
                density,
            } => {
                let far_enough = nodes
                    .last()
                    .is_none_or(|n| (n.node.point - ev.pos).hypot() >= cfg.brush_spacing);
                if far_enough {
                    nodes.push(brush_node(
                        ev.pos,
                        ev.pressure,
                        (*width, *hardness, *density),
                        cfg.brush_pressure,
                    ));
                }
                Step::Continue
            }
            Self::Gradient {
                anchor: Some(anchor),
                rotation,
            } => {
                let v = ev.pos - *anchor;
                if v.hypot() > 0.0 {
                    *rotation = normalize_angle(v.y.atan2(v.x));
                }
                Step::Continue
            }
            _ => Step::Ignored,
        }
    }

    pub(crate) fn released(&mut self, ev: &ButtonEvent, cfg: &EditConfig) -> Step {
        if ev.button != Button::Primary {
            return Step::Ignored;
        }
        match self {
            Self::Brush {
                nodes,
                painting: true,
                ..
            } => {
                let mut brush = Brush {
                    nodes: core::mem::take(nodes),
                };
                brush.smooth();
                Step::Finished(Shape::Brush(brush))
            }
            Self::Gradient {
                anchor: Some(anchor),
                rotation,
            } => Step::Finished(Shape::Gradient(Gradient {
                anchor: *anchor,
                rotation: *rotation,
                compression: cfg.defaults.gradient_compression,
                steepness: cfg.defaults.gradient_steepness,
                ..Gradient::default()
            })),
            _ => Step::Ignored,
        }
    }

    /// Resizes the shape about to be placed.
    pub(crate) fn scrolled(&mut self, ev: &ScrollEvent, step: f64, cfg: &EditConfig) -> Step {
        let grow = 1.0 + cfg.scroll_factor * step;
        let factor = if ev.up { grow } else { 1.0 / grow };
        let target = if ev.modifiers.shift {
            ScrollTarget::Feather
        } else {
            ScrollTarget::Size
        };
        let min = cfg.min_size;
        match (self, target) {
            (Self::Circle { radius, .. }, ScrollTarget::Size) => {
                *radius = (*radius * factor).max(min);
            }
            (Self::Circle { border, .. } | Self::Ellipse { border, .. }, ScrollTarget::Feather)
            | (Self::Path { border, .. }, _) => *border = (*border * factor).max(min),
            (Self::Ellipse { radii, .. }, ScrollTarget::Size) => {
                *radii = Vec2::new((radii.x * factor).max(min), (radii.y * factor).max(min));
            }
            (Self::Brush { width, .. }, ScrollTarget::Size) => *width = (*width * factor).max(min),
            (Self::Brush { hardness, .. }, ScrollTarget::Feather) => {
                let sign = if ev.up { 1.0 } else { -1.0 };
                *hardness = (*hardness + sign * HARDNESS_STEP * step).clamp(0.0, 1.0);
            }
            (Self::Gradient { .. }, _) => return Step::Ignored,
        }
        Step::Continue
    }
}

fn finish_path(corners: &mut Vec<Corner>) -> Step {
    let mut path = Path {
        corners: core::mem::take(corners),
    };
    path.smooth();
    Step::Finished(Shape::Path(path))
}

pub(super) fn zoom(z: f64) -> f64 {
    if z.is_finite() && z > 0.0 { z } else { 1.0 }
}

/// A stroke sample with stylus pressure applied to one parameter.
fn brush_node(
    pos: Point,
    pressure: f64,
    (width, hardness, density): (f64, f64, f64),
    mapping: BrushPressure,
) -> BrushCorner {
    let p = if pressure.is_finite() {
        pressure.clamp(0.0, 1.0)
    } else {
        1.0
    };
    match mapping {
        BrushPressure::Off => BrushCorner::new(pos, width, hardness, density),
        BrushPressure::Size => BrushCorner::new(pos, width * p, hardness, density),
        BrushPressure::Hardness => BrushCorner::new(pos, width, hardness * p, density),
        BrushPressure::Opacity => BrushCorner::new(pos, width, hardness, density * p),
    }
}
