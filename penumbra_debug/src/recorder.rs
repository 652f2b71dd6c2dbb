// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Buffer tags of allocation failures are `&'static str` and cannot be
//! restored, so only their length is recorded.

use penumbra_core::edit::EditAction;
use penumbra_core::form::{FormId, ShapeKind};
use penumbra_core::group::GroupError;
use penumbra_core::trace::{
    AllocFailureEvent, DanglingMemberEvent, DropReason, EditEvent, FormDroppedEvent,
    RejectedEditEvent, RenderEvent, SanitizedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_ALLOC_FAILURE: u8 = 1;
const TAG_DANGLING_MEMBER: u8 = 2;
const TAG_FORM_DROPPED: u8 = 3;
const TAG_SANITIZED: u8 = 4;
const TAG_RENDER: u8 = 5;
const TAG_EDIT: u8 = 6;
const TAG_REJECTED_EDIT: u8 = 7;

const DROP_REASONS: [DropReason; 5] = [
    DropReason::UnsupportedVersion,
    DropReason::UnknownKind,
    DropReason::Truncated,
    DropReason::Invalid,
    DropReason::DuplicateId,
];

const EDIT_ACTIONS: [EditAction; 13] = [
    EditAction::Created,
    EditAction::Moved,
    EditAction::Reshaped,
    EditAction::Feathered,
    EditAction::Resized,
    EditAction::Opacity,
    EditAction::CornerAdded,
    EditAction::CornerRemoved,
    EditAction::CornerToggled,
    EditAction::Removed,
    EditAction::Reordered,
    EditAction::Duplicated,
    EditAction::Regrouped,
];

fn index_of<T: PartialEq>(table: &[T], v: T) -> u8 {
    table
        .iter()
        .position(|t| *t == v)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_u32(&mut self, v: Option<u32>) {
        self.write_u8(u8::from(v.is_some()));
        self.write_u32(v.unwrap_or(0));
    }

    fn write_group_error(&mut self, e: GroupError) {
        let (tag, a, b) = match e {
            GroupError::SelfReference(id) => (0, id, FormId(0)),
            GroupError::Cycle { group, member } => (1, group, member),
            GroupError::UnknownForm(id) => (2, id, FormId(0)),
            GroupError::NotAGroup(id) => (3, id, FormId(0)),
            GroupError::AlreadyMember { group, member } => (4, group, member),
            GroupError::NotAMember { group, member } => (5, group, member),
        };
        self.write_u8(tag);
        self.write_u32(a.0);
        self.write_u32(b.0);
    }
}

impl TraceSink for RecorderSink {
    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        self.write_u8(TAG_ALLOC_FAILURE);
        self.write_u64(e.requested as u64);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tag length capped at u32::MAX for recording"
        )]
        self.write_u32(e.tag.len().min(u32::MAX as usize) as u32);
    }

    fn on_dangling_member(&mut self, e: &DanglingMemberEvent) {
        self.write_u8(TAG_DANGLING_MEMBER);
        self.write_u32(e.group.0);
        self.write_u32(e.member.0);
    }

    fn on_form_dropped(&mut self, e: &FormDroppedEvent) {
        self.write_u8(TAG_FORM_DROPPED);
        self.write_option_u32(e.id.map(|id| id.0));
        self.write_option_u32(e.version);
        self.write_u8(index_of(&DROP_REASONS, e.reason));
    }

    fn on_sanitized(&mut self, e: &SanitizedEvent) {
        self.write_u8(TAG_SANITIZED);
        self.write_u32(e.id.0);
        self.write_u8(e.kind.tag());
        self.write_u32(e.fields);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.write_u8(TAG_RENDER);
        self.write_u32(e.form.0);
        self.write_u8(e.kind.tag());
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_u8(u8::from(e.cached));
    }

    fn on_edit(&mut self, e: &EditEvent) {
        self.write_u8(TAG_EDIT);
        self.write_u32(e.form.0);
        self.write_u8(index_of(&EDIT_ACTIONS, e.action));
    }

    fn on_rejected_edit(&mut self, e: &RejectedEditEvent) {
        self.write_u8(TAG_REJECTED_EDIT);
        self.write_u32(e.group.0);
        self.write_u32(e.member.0);
        self.write_group_error(e.reason);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`AllocFailureEvent`] without its tag.
    AllocFailure {
        /// Number of elements requested.
        requested: u64,
        /// Length of the buffer tag.
        tag_len: u32,
    },
    /// A [`DanglingMemberEvent`].
    DanglingMember(DanglingMemberEvent),
    /// A [`FormDroppedEvent`].
    FormDropped(FormDroppedEvent),
    /// A [`SanitizedEvent`].
    Sanitized(SanitizedEvent),
    /// A [`RenderEvent`].
    Render(RenderEvent),
    /// An [`EditEvent`].
    Edit(EditEvent),
    /// A [`RejectedEditEvent`].
    RejectedEdit(RejectedEditEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Stops at the first truncated record or unknown tag.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_id(&mut self) -> Option<FormId> {
        self.read_u32().map(FormId)
    }

    fn read_option_u32(&mut self) -> Option<Option<u32>> {
        let present = self.read_u8()?;
        let val = self.read_u32()?;
        Some((present != 0).then_some(val))
    }

    fn read_kind(&mut self) -> Option<ShapeKind> {
        ShapeKind::from_tag(self.read_u8()?)
    }

    fn read_group_error(&mut self) -> Option<GroupError> {
        let tag = self.read_u8()?;
        let a = self.read_id()?;
        let b = self.read_id()?;
        Some(match tag {
            0 => GroupError::SelfReference(a),
            1 => GroupError::Cycle {
                group: a,
                member: b,
            },
            2 => GroupError::UnknownForm(a),
            3 => GroupError::NotAGroup(a),
            4 => GroupError::AlreadyMember {
                group: a,
                member: b,
            },
            5 => GroupError::NotAMember {
                group: a,
                member: b,
            },
            _ => return None,
        })
    }

    fn decode_alloc_failure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::AllocFailure {
            requested: self.read_u64()?,
            tag_len: self.read_u32()?,
        })
    }

    fn decode_dangling_member(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DanglingMember(DanglingMemberEvent {
            group: self.read_id()?,
            member: self.read_id()?,
        }))
    }

    fn decode_form_dropped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FormDropped(FormDroppedEvent {
            id: self.read_option_u32()?.map(FormId),
            version: self.read_option_u32()?,
            reason: *DROP_REASONS.get(usize::from(self.read_u8()?))?,
        }))
    }

    fn decode_sanitized(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Sanitized(SanitizedEvent {
            id: self.read_id()?,
            kind: self.read_kind()?,
            fields: self.read_u32()?,
        }))
    }

    fn decode_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Render(RenderEvent {
            form: self.read_id()?,
            kind: self.read_kind()?,
            width: self.read_u32()?,
            height: self.read_u32()?,
            cached: self.read_u8()? != 0,
        }))
    }

    fn decode_edit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Edit(EditEvent {
            form: self.read_id()?,
            action: *EDIT_ACTIONS.get(usize::from(self.read_u8()?))?,
        }))
    }

    fn decode_rejected_edit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RejectedEdit(RejectedEditEvent {
            group: self.read_id()?,
            member: self.read_id()?,
            reason: self.read_group_error()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_ALLOC_FAILURE => self.decode_alloc_failure(),
            TAG_DANGLING_MEMBER => self.decode_dangling_member(),
            TAG_FORM_DROPPED => self.decode_form_dropped(),
            TAG_SANITIZED => self.decode_sanitized(),
            TAG_RENDER => self.decode_render(),
            TAG_EDIT => self.decode_edit(),
            TAG_REJECTED_EDIT => self.decode_rejected_edit(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
