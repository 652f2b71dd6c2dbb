// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary persistence of forms.
//!
//! Each form is one little-endian record:
//!
//! ```text
//!   u32 length          bytes that follow this field
//!   u32 version         layout version (1..=MASKS_VERSION)
//!   u32 id
//!   u8  kind            ShapeKind::tag
//!   u32 + bytes         UTF-8 display name
//!   u8  has_source      followed by f64 x, f64 y when 1
//!   ...                 kind payload
//! ```
//!
//! Payload changes by version:
//!
//! | version | change                                                      |
//! |---------|-------------------------------------------------------------|
//! | 1       | initial layout                                              |
//! | 2       | ellipse border mode; gradient curvature and curve state     |
//! | 3       | brush per-node density and hardness                         |
//!
//! Older records are upgraded while decoding: fields a version lacks take the
//! values that reproduce the old rendering. The length prefix lets
//! [`decode_forms`] skip a record it cannot read and continue with the next.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::form::{Form, FormId, MASKS_VERSION, Shape, ShapeKind};
use crate::group::{Group, GroupMember, MemberState};
use crate::shape::{
    Brush, BrushCorner, Circle, Corner, CornerState, Ellipse, EllipseBorder, Gradient,
    GradientState, Path,
};
use crate::trace::{DropReason, FormDroppedEvent, Tracer};

/// A record could not be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended inside the record.
    Truncated,
    /// No upgrade path exists from this version.
    UnsupportedVersion(u32),
    /// The kind discriminator is not known.
    UnknownKind(u8),
    /// A field held a value that cannot be represented.
    Invalid(&'static str),
}

impl DecodeError {
    /// The diagnostic reason matching this error.
    #[must_use]
    pub const fn drop_reason(self) -> DropReason {
        match self {
            Self::Truncated => DropReason::Truncated,
            Self::UnsupportedVersion(_) => DropReason::UnsupportedVersion,
            Self::UnknownKind(_) => DropReason::UnknownKind,
            Self::Invalid(_) => DropReason::Invalid,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("record truncated"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported mask version {v}"),
            Self::UnknownKind(k) => write!(f, "unknown shape kind {k}"),
            Self::Invalid(what) => write!(f, "invalid {what}"),
        }
    }
}

impl core::error::Error for DecodeError {}

// Serialized sizes used to bound allocations before reading lists.
const CORNER_BYTES: usize = 6 * 8 + 2 * 8 + 1;
const BRUSH_EXTRA_BYTES: usize = 2 * 8;
const MEMBER_BYTES: usize = 4 * 4;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct Writer<'a> {
    buf: &'a mut Vec<u8>,
    version: u32,
}

impl Writer<'_> {
    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_point(&mut self, p: Point) {
        self.write_f64(p.x);
        self.write_f64(p.y);
    }

    fn write_len(&mut self, n: usize) {
        self.write_u32(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn write_corner(&mut self, c: &Corner) {
        self.write_point(c.point);
        self.write_point(c.ctrl_in);
        self.write_point(c.ctrl_out);
        self.write_f64(c.border[0]);
        self.write_f64(c.border[1]);
        self.write_u8(match c.state {
            CornerState::Normal => 0,
            CornerState::User => 1,
        });
    }

    fn write_shape(&mut self, shape: &Shape) {
        match shape {
            Shape::Circle(c) => {
                self.write_point(c.center);
                self.write_f64(c.radius);
                self.write_f64(c.border);
            }
            Shape::Ellipse(e) => {
                self.write_point(e.center);
                self.write_f64(e.radii.x);
                self.write_f64(e.radii.y);
                self.write_f64(e.rotation);
                self.write_f64(e.border);
                if self.version >= 2 {
                    self.write_u8(match e.border_mode {
                        EllipseBorder::Equidistant => 0,
                        EllipseBorder::Proportional => 1,
                    });
                }
            }
            Shape::Path(p) => {
                self.write_len(p.corners.len());
                for c in &p.corners {
                    self.write_corner(c);
                }
            }
            Shape::Brush(b) => {
                self.write_len(b.nodes.len());
                for n in &b.nodes {
                    self.write_corner(&n.node);
                    if self.version >= 3 {
                        self.write_f64(n.density);
                        self.write_f64(n.hardness);
                    }
                }
            }
            Shape::Gradient(g) => {
                self.write_point(g.anchor);
                self.write_f64(g.rotation);
                self.write_f64(g.compression);
                self.write_f64(g.steepness);
                if self.version >= 2 {
                    self.write_f64(g.curvature);
                    self.write_u8(match g.state {
                        GradientState::Linear => 0,
                        GradientState::Sigmoid => 1,
                    });
                }
            }
            Shape::Group(g) => {
                self.write_len(g.members.len());
                for m in &g.members {
                    self.write_u32(m.form.0);
                    self.write_u32(m.parent.0);
                    self.write_u32(m.state.bits());
                    self.write_f32(m.opacity);
                }
            }
        }
    }
}

/// Appends the record of `form` in the current layout to `out`.
pub fn encode_form(form: &Form, out: &mut Vec<u8>) {
    encode_versioned(form, MASKS_VERSION, out);
}

/// Encodes `forms` as consecutive records.
#[must_use]
pub fn encode_forms<'a>(forms: impl IntoIterator<Item = &'a Form>) -> Vec<u8> {
    let mut out = Vec::new();
    for form in forms {
        encode_form(form, &mut out);
    }
    out
}

/// Writes `form` in the layout of `version`, dropping fields that version
/// lacks.
pub(crate) fn encode_versioned(form: &Form, version: u32, out: &mut Vec<u8>) {
    let start = out.len();
    let mut w = Writer { buf: out, version };
    w.write_u32(0);
    w.write_u32(version);
    w.write_u32(form.id.0);
    w.write_u8(form.kind().tag());
    w.write_len(form.name.len());
    w.buf.extend_from_slice(form.name.as_bytes());
    match form.source {
        Some(p) => {
            w.write_u8(1);
            w.write_point(p);
        }
        None => w.write_u8(0),
    }
    w.write_shape(&form.shape);
    let len = u32::try_from(out.len() - start - 4).unwrap_or(u32::MAX);
    out[start..start + 4].copy_from_slice(&len.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    version: u32,
}

impl Reader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated);
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        let mut bytes = [0_u8; 8];
        bytes.copy_from_slice(b);
        Ok(f64::from_le_bytes(bytes))
    }

    fn read_point(&mut self) -> Result<Point, DecodeError> {
        Ok(Point::new(self.read_f64()?, self.read_f64()?))
    }

    /// Reads a list length and checks that `item_bytes` per item fit.
    fn read_len(&mut self, item_bytes: usize) -> Result<usize, DecodeError> {
        let n = self.read_u32()? as usize;
        if n.saturating_mul(item_bytes) > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        Ok(n)
    }

    fn read_corner(&mut self) -> Result<Corner, DecodeError> {
        Ok(Corner {
            point: self.read_point()?,
            ctrl_in: self.read_point()?,
            ctrl_out: self.read_point()?,
            border: [self.read_f64()?, self.read_f64()?],
            state: match self.read_u8()? {
                0 => CornerState::Normal,
                1 => CornerState::User,
                _ => return Err(DecodeError::Invalid("corner state")),
            },
        })
    }

    fn read_shape(&mut self, kind: ShapeKind) -> Result<Shape, DecodeError> {
        Ok(match kind {
            ShapeKind::Circle => Shape::Circle(Circle::new(
                self.read_point()?,
                self.read_f64()?,
                self.read_f64()?,
            )),
            ShapeKind::Ellipse => {
                let center = self.read_point()?;
                let radii = Vec2::new(self.read_f64()?, self.read_f64()?);
                let rotation = self.read_f64()?;
                let border = self.read_f64()?;
                let border_mode = if self.version >= 2 {
                    match self.read_u8()? {
                        0 => EllipseBorder::Equidistant,
                        1 => EllipseBorder::Proportional,
                        _ => return Err(DecodeError::Invalid("ellipse border mode")),
                    }
                } else {
                    EllipseBorder::Equidistant
                };
                Shape::Ellipse(Ellipse {
                    center,
                    radii,
                    rotation,
                    border,
                    border_mode,
                })
            }
            ShapeKind::Path => {
                let n = self.read_len(CORNER_BYTES)?;
                let mut corners = Vec::with_capacity(n);
                for _ in 0..n {
                    corners.push(self.read_corner()?);
                }
                Shape::Path(Path { corners })
            }
            ShapeKind::Brush => {
                let extra = if self.version >= 3 { BRUSH_EXTRA_BYTES } else { 0 };
                let n = self.read_len(CORNER_BYTES + extra)?;
                let mut nodes = Vec::with_capacity(n);
                for _ in 0..n {
                    let node = self.read_corner()?;
                    // Strokes before version 3 rendered as solid, fully dense
                    // lines.
                    let (density, hardness) = if self.version >= 3 {
                        (self.read_f64()?, self.read_f64()?)
                    } else {
                        (1.0, 1.0)
                    };
                    nodes.push(BrushCorner {
                        node,
                        density,
                        hardness,
                    });
                }
                Shape::Brush(Brush { nodes })
            }
            ShapeKind::Gradient => {
                let anchor = self.read_point()?;
                let rotation = self.read_f64()?;
                let compression = self.read_f64()?;
                let steepness = self.read_f64()?;
                let (curvature, state) = if self.version >= 2 {
                    let curvature = self.read_f64()?;
                    let state = match self.read_u8()? {
                        0 => GradientState::Linear,
                        1 => GradientState::Sigmoid,
                        _ => return Err(DecodeError::Invalid("gradient state")),
                    };
                    (curvature, state)
                } else {
                    (0.0, GradientState::Linear)
                };
                Shape::Gradient(Gradient {
                    anchor,
                    rotation,
                    compression,
                    steepness,
                    curvature,
                    state,
                })
            }
            ShapeKind::Group => {
                let n = self.read_len(MEMBER_BYTES)?;
                let mut members = Vec::with_capacity(n);
                for _ in 0..n {
                    members.push(GroupMember {
                        form: FormId(self.read_u32()?),
                        parent: FormId(self.read_u32()?),
                        state: MemberState::from_bits_truncate(self.read_u32()?),
                        opacity: self.read_f32()?,
                    });
                }
                Shape::Group(Group { members })
            }
        })
    }
}

/// Length of the record at the start of `bytes`, including its length field.
fn record_len(bytes: &[u8]) -> Result<usize, DecodeError> {
    let head = bytes.get(..4).ok_or(DecodeError::Truncated)?;
    let len = u32::from_le_bytes([head[0], head[1], head[2], head[3]]) as usize;
    let total = len.checked_add(4).ok_or(DecodeError::Truncated)?;
    if total > bytes.len() {
        return Err(DecodeError::Truncated);
    }
    Ok(total)
}

/// Decodes the record at the start of `bytes`, upgrading it to
/// [`MASKS_VERSION`].
///
/// Returns the form and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`DecodeError`] when the record is truncated, has an unsupported
/// version or unknown kind, or holds an unrepresentable value.
pub fn decode_form(bytes: &[u8]) -> Result<(Form, usize), DecodeError> {
    let total = record_len(bytes)?;
    let mut r = Reader {
        data: &bytes[..total],
        pos: 4,
        version: 0,
    };
    let version = r.read_u32()?;
    if version == 0 || version > MASKS_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    r.version = version;
    let id = FormId(r.read_u32()?);
    let tag = r.read_u8()?;
    let kind = ShapeKind::from_tag(tag).ok_or(DecodeError::UnknownKind(tag))?;
    let name_len = r.read_u32()? as usize;
    let name = String::from_utf8(r.take(name_len)?.to_vec())
        .map_err(|_| DecodeError::Invalid("name"))?;
    let source = match r.read_u8()? {
        0 => None,
        1 => Some(r.read_point()?),
        _ => return Err(DecodeError::Invalid("source flag")),
    };
    let shape = r.read_shape(kind)?;
    if r.remaining() != 0 {
        return Err(DecodeError::Invalid("record length"));
    }
    Ok((
        Form {
            id,
            version: MASKS_VERSION,
            shape,
            name,
            source,
        },
        total,
    ))
}

/// Decodes consecutive records.
///
/// A record that cannot be decoded is reported through
/// [`Tracer::form_dropped`] and skipped. Decoding stops when a record's length
/// field itself is truncated.
pub fn decode_forms(bytes: &[u8], tracer: &mut Tracer<'_>) -> Vec<Form> {
    let mut forms = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let rest = &bytes[pos..];
        match decode_form(rest) {
            Ok((form, used)) => {
                forms.push(form);
                pos += used;
            }
            Err(e) => {
                tracer.form_dropped(&FormDroppedEvent {
                    id: peek_u32(rest, 8).map(FormId),
                    version: peek_u32(rest, 4),
                    reason: e.drop_reason(),
                });
                match record_len(rest) {
                    Ok(total) => pos += total,
                    Err(_) => break,
                }
            }
        }
    }
    forms
}

fn peek_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn corner(x: f64, y: f64) -> Corner {
        Corner {
            state: CornerState::User,
            ..Corner::new(Point::new(x, y), 3.5)
        }
    }

    fn sample_forms() -> Vec<Form> {
        let mut circle = Form::new(
            FormId(1),
            Shape::Circle(Circle::new(Point::new(100.0, 80.0), 30.0, 6.0)),
        );
        circle.name = String::from("circle #1");
        circle.source = Some(Point::new(200.0, 80.0));

        let ellipse = Form::new(
            FormId(2),
            Shape::Ellipse(Ellipse::new(
                Point::new(50.0, 60.0),
                Vec2::new(40.0, 20.0),
                0.5,
                4.0,
                EllipseBorder::Proportional,
            )),
        );
        let path = Form::new(
            FormId(3),
            Shape::Path(Path {
                corners: vec![corner(0.0, 0.0), corner(40.0, 0.0), corner(20.0, 30.0)],
            }),
        );
        let brush = Form::new(
            FormId(4),
            Shape::Brush(Brush {
                nodes: vec![
                    BrushCorner::new(Point::new(0.0, 0.0), 5.0, 0.4, 0.9),
                    BrushCorner::new(Point::new(30.0, 10.0), 6.0, 0.5, 0.8),
                ],
            }),
        );
        let gradient = Form::new(
            FormId(5),
            Shape::Gradient(Gradient {
                anchor: Point::new(10.0, 20.0),
                rotation: 1.25,
                compression: 0.3,
                steepness: 0.1,
                curvature: -0.5,
                state: GradientState::Linear,
            }),
        );
        let mut group = Form::new(
            FormId(6),
            Shape::Group(Group {
                members: vec![
                    GroupMember::new(FormId(1), FormId(6)),
                    GroupMember::new(FormId(2), FormId(6))
                        .with_mode(crate::group::CombineMode::Exclusion)
                        .with_opacity(0.5)
                        .inverted(),
                ],
            }),
        );
        group.name = String::from("grupo ü");
        vec![circle, ellipse, path, brush, gradient, group]
    }

    #[test]
    fn every_kind_survives_encoding() {
        let forms = sample_forms();
        let bytes = encode_forms(&forms);
        let decoded = decode_forms(&bytes, &mut Tracer::none());
        assert_eq!(decoded, forms);
    }

    #[test]
    fn version_one_records_upgrade() {
        let forms = sample_forms();
        let mut bytes = Vec::new();
        encode_versioned(&forms[1], 1, &mut bytes);
        encode_versioned(&forms[4], 1, &mut bytes);
        let decoded = decode_forms(&bytes, &mut Tracer::none());
        assert_eq!(decoded.len(), 2);

        let Shape::Ellipse(e) = &decoded[0].shape else {
            panic!("expected an ellipse");
        };
        assert_eq!(e.border_mode, EllipseBorder::Equidistant);
        assert_eq!(e.radii, Vec2::new(40.0, 20.0));

        let Shape::Gradient(g) = &decoded[1].shape else {
            panic!("expected a gradient");
        };
        assert_eq!(g.curvature, 0.0);
        assert_eq!(g.state, GradientState::Linear);
        assert_eq!(g.rotation, 1.25);
        assert!(decoded.iter().all(|f| f.version == MASKS_VERSION));
    }

    #[test]
    fn version_two_brushes_gain_pressure_defaults() {
        let forms = sample_forms();
        let mut bytes = Vec::new();
        encode_versioned(&forms[3], 2, &mut bytes);
        let (form, used) = decode_form(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        let Shape::Brush(b) = &form.shape else {
            panic!("expected a brush");
        };
        assert_eq!(b.nodes.len(), 2);
        assert!(b.nodes.iter().all(|n| n.hardness == 1.0 && n.density == 1.0));
        assert_eq!(b.nodes[1].node.point, Point::new(30.0, 10.0));
    }

    #[test]
    fn bad_records_are_skipped() {
        let forms = sample_forms();
        let mut bytes = Vec::new();
        encode_form(&forms[0], &mut bytes);

        // Unknown version.
        let start = bytes.len();
        encode_form(&forms[1], &mut bytes);
        bytes[start + 4..start + 8].copy_from_slice(&99_u32.to_le_bytes());

        // Unknown kind.
        let start = bytes.len();
        encode_form(&forms[2], &mut bytes);
        bytes[start + 12] = 42;

        encode_form(&forms[4], &mut bytes);

        let decoded = decode_forms(&bytes, &mut Tracer::none());
        let ids: Vec<FormId> = decoded.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![FormId(1), FormId(5)]);
    }

    #[test]
    fn errors_are_specific() {
        let forms = sample_forms();
        let mut bytes = Vec::new();
        encode_form(&forms[2], &mut bytes);
        assert_eq!(decode_form(&bytes[..3]), Err(DecodeError::Truncated));
        assert_eq!(decode_form(&bytes[..bytes.len() - 1]), Err(DecodeError::Truncated));

        let mut bad = bytes.clone();
        bad[4..8].copy_from_slice(&0_u32.to_le_bytes());
        assert_eq!(decode_form(&bad), Err(DecodeError::UnsupportedVersion(0)));

        let mut bad = bytes;
        bad[12] = 0;
        assert_eq!(decode_form(&bad), Err(DecodeError::UnknownKind(0)));
        assert_eq!(
            DecodeError::UnknownKind(0).drop_reason(),
            DropReason::UnknownKind
        );
    }

    #[test]
    fn truncated_tail_stops_decoding() {
        let forms = sample_forms();
        let mut bytes = encode_forms(&forms[..2]);
        bytes.extend_from_slice(&[200, 0]);
        assert_eq!(decode_forms(&bytes, &mut Tracer::none()).len(), 2);
    }

    #[test]
    fn oversized_lists_do_not_allocate() {
        let path = Form::new(FormId(9), Shape::Path(Path::default()));
        let mut bytes = Vec::new();
        encode_form(&path, &mut bytes);
        // Corner count is the last field of an empty path record.
        let at = bytes.len() - 4;
        bytes[at..].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(decode_form(&bytes), Err(DecodeError::Truncated));
    }
}
