// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content hashes of forms for raster caching.
//!
//! [`hash_buffer`] serializes every field that influences a form's raster:
//! the kind discriminator, the geometry, and for groups each participating
//! member's mode, inversion, opacity and (recursively) content. Form ids and
//! display names are left out, so two groups built from different forms with
//! identical geometry and composition produce identical buffers. [`form_hash`]
//! folds the buffer with 64-bit FNV-1a.

use alloc::vec::Vec;

use kurbo::Point;

use crate::form::{Form, FormId, Shape};
use crate::shape::{Corner, CornerState, EllipseBorder, GradientState};
use crate::snapshot::FormSource;
use crate::trace::{DanglingMemberEvent, Tracer};

use super::MemberState;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a of `bytes`.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| {
        (h ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Feeds more bytes into an FNV-1a state started with [`fnv1a`].
#[must_use]
pub fn fnv1a_extend(state: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(state, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

// Member marker bytes.
const MISSING: u8 = 0;
const PRESENT: u8 = 1;

struct Writer<'s, S: ?Sized> {
    src: &'s S,
    bytes: Vec<u8>,
    stack: Vec<FormId>,
}

impl<S: FormSource + ?Sized> Writer<'_, S> {
    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.u32(v.to_bits());
    }

    fn f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    fn point(&mut self, p: Point) {
        self.f64(p.x);
        self.f64(p.y);
    }

    fn corner(&mut self, c: &Corner) {
        self.point(c.point);
        self.point(c.ctrl_in);
        self.point(c.ctrl_out);
        self.f64(c.border[0]);
        self.f64(c.border[1]);
        self.u8(match c.state {
            CornerState::Normal => 0,
            CornerState::User => 1,
        });
    }

    fn form(&mut self, form: &Form, tracer: &mut Tracer<'_>) {
        self.u8(form.kind().tag());
        match &form.shape {
            Shape::Circle(c) => {
                self.point(c.center);
                self.f64(c.radius);
                self.f64(c.border);
            }
            Shape::Ellipse(e) => {
                self.point(e.center);
                self.f64(e.radii.x);
                self.f64(e.radii.y);
                self.f64(e.rotation);
                self.f64(e.border);
                self.u8(match e.border_mode {
                    EllipseBorder::Equidistant => 0,
                    EllipseBorder::Proportional => 1,
                });
            }
            Shape::Path(p) => {
                self.u32(len_u32(p.corners.len()));
                for c in &p.corners {
                    self.corner(c);
                }
            }
            Shape::Brush(b) => {
                self.u32(len_u32(b.nodes.len()));
                for n in &b.nodes {
                    self.corner(&n.node);
                    self.f64(n.density);
                    self.f64(n.hardness);
                }
            }
            Shape::Gradient(g) => {
                self.point(g.anchor);
                self.f64(g.rotation);
                self.f64(g.compression);
                self.f64(g.steepness);
                self.f64(g.curvature);
                self.u8(match g.state {
                    GradientState::Linear => 0,
                    GradientState::Sigmoid => 1,
                });
            }
            Shape::Group(group) => {
                self.stack.push(form.id);
                let used = group
                    .members
                    .iter()
                    .filter(|m| m.state.contains(MemberState::USE));
                for m in used {
                    let state = MemberState::from_bits_truncate(
                        m.state.bits() & !MemberState::SHOW.bits(),
                    )
                    .with_mode(m.state.mode());
                    self.u32(state.bits());
                    self.f32(m.opacity);
                    let member = if self.stack.contains(&m.form) {
                        None
                    } else {
                        self.src.form(m.form)
                    };
                    match member {
                        Some(member) => {
                            self.u8(PRESENT);
                            self.form(member, tracer);
                        }
                        None => {
                            tracer.dangling_member(&DanglingMemberEvent {
                                group: form.id,
                                member: m.form,
                            });
                            self.u8(MISSING);
                        }
                    }
                }
                self.stack.pop();
                // Terminates the member list so nesting stays unambiguous.
                self.u32(u32::MAX);
            }
        }
        if let Some(source) = form.source {
            self.u8(PRESENT);
            self.point(source);
        } else {
            self.u8(MISSING);
        }
    }
}

fn len_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Serializes the raster-relevant content of form `id`.
///
/// Unknown ids produce an empty buffer. Dangling members are reported to
/// `tracer` and contribute a fixed marker byte.
#[must_use]
pub fn hash_buffer<S: FormSource + ?Sized>(src: &S, id: FormId, tracer: &mut Tracer<'_>) -> Vec<u8> {
    let Some(form) = src.form(id) else {
        return Vec::new();
    };
    let mut w = Writer {
        src,
        bytes: Vec::new(),
        stack: Vec::new(),
    };
    w.form(form, tracer);
    w.bytes
}

/// FNV-1a hash of [`hash_buffer`].
#[must_use]
pub fn form_hash<S: FormSource + ?Sized>(src: &S, id: FormId, tracer: &mut Tracer<'_>) -> u64 {
    fnv1a(&hash_buffer(src, id, tracer))
}
