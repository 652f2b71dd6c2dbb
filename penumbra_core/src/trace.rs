// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics for rasterization, loading and editing.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! engine can report. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! None of these events abort the operation that reports them: allocation
//! failures abandon one rasterization pass, dangling members are skipped and
//! dropped records are left out of the loaded set.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::edit::EditAction;
use crate::form::{FormId, ShapeKind};
use crate::group::GroupError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a stored record was left out of a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The record's version has no upgrade path.
    UnsupportedVersion,
    /// The kind discriminator is not known.
    UnknownKind,
    /// The record ended before its payload was complete.
    Truncated,
    /// A field held a value that cannot be represented.
    Invalid,
    /// Another record with the same id was already loaded.
    DuplicateId,
}

impl DropReason {
    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnsupportedVersion => "unsupported-version",
            Self::UnknownKind => "unknown-kind",
            Self::Truncated => "truncated",
            Self::Invalid => "invalid",
            Self::DuplicateId => "duplicate-id",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a buffer could not grow or a raster could not be allocated.
#[derive(Clone, Copy, Debug)]
pub struct AllocFailureEvent {
    /// Tag of the buffer that failed.
    pub tag: &'static str,
    /// Number of elements requested.
    pub requested: usize,
}

/// Emitted when a group refers to a form that is not in the registry.
#[derive(Clone, Copy, Debug)]
pub struct DanglingMemberEvent {
    /// The group being rendered or hashed.
    pub group: FormId,
    /// The missing member id.
    pub member: FormId,
}

/// Emitted when a stored record is left out of a load.
#[derive(Clone, Copy, Debug)]
pub struct FormDroppedEvent {
    /// Id from the record header, if it could be read.
    pub id: Option<FormId>,
    /// Version from the record header, if it could be read.
    pub version: Option<u32>,
    /// Why the record was dropped.
    pub reason: DropReason,
}

/// Emitted when a loaded form had out-of-range values clamped.
#[derive(Clone, Copy, Debug)]
pub struct SanitizedEvent {
    /// The form that was adjusted.
    pub id: FormId,
    /// Its kind.
    pub kind: ShapeKind,
    /// Number of fields that were changed.
    pub fields: u32,
}

/// Emitted when a raster was produced or served from a cache.
#[derive(Clone, Copy, Debug)]
pub struct RenderEvent {
    /// The form that was rasterized.
    pub form: FormId,
    /// Its kind.
    pub kind: ShapeKind,
    /// Raster width.
    pub width: u32,
    /// Raster height.
    pub height: u32,
    /// Whether the raster came from a cache.
    pub cached: bool,
}

/// Emitted when an edit is committed and a history checkpoint is due.
#[derive(Clone, Copy, Debug)]
pub struct EditEvent {
    /// The form that changed.
    pub form: FormId,
    /// What kind of change it was.
    pub action: EditAction,
}

/// Emitted when a structural edit is refused.
#[derive(Clone, Copy, Debug)]
pub struct RejectedEditEvent {
    /// The group the edit targeted.
    pub group: FormId,
    /// The member the edit involved.
    pub member: FormId,
    /// Why it was refused.
    pub reason: GroupError,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives diagnostic events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an allocation fails.
    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        _ = e;
    }

    /// Called when a group member is missing.
    fn on_dangling_member(&mut self, e: &DanglingMemberEvent) {
        _ = e;
    }

    /// Called when a stored record is dropped on load.
    fn on_form_dropped(&mut self, e: &FormDroppedEvent) {
        _ = e;
    }

    /// Called when a loaded form is sanitized.
    fn on_sanitized(&mut self, e: &SanitizedEvent) {
        _ = e;
    }

    /// Called after a raster is produced.
    fn on_render(&mut self, e: &RenderEvent) {
        _ = e;
    }

    /// Called when an edit is committed.
    fn on_edit(&mut self, e: &EditEvent) {
        _ = e;
    }

    /// Called when a structural edit is refused.
    fn on_rejected_edit(&mut self, e: &RejectedEditEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Reborrows the tracer for a nested call.
    #[inline]
    #[must_use]
    pub fn reborrow(&mut self) -> Tracer<'_> {
        #[cfg(feature = "trace")]
        {
            match &mut self.sink {
                Some(s) => Tracer { sink: Some(&mut **s) },
                None => Tracer { sink: None },
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            Tracer {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`AllocFailureEvent`].
    #[inline]
    pub fn alloc_failure(&mut self, e: &AllocFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_alloc_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DanglingMemberEvent`].
    #[inline]
    pub fn dangling_member(&mut self, e: &DanglingMemberEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dangling_member(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FormDroppedEvent`].
    #[inline]
    pub fn form_dropped(&mut self, e: &FormDroppedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_form_dropped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SanitizedEvent`].
    #[inline]
    pub fn sanitized(&mut self, e: &SanitizedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sanitized(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderEvent`].
    #[inline]
    pub fn render(&mut self, e: &RenderEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EditEvent`].
    #[inline]
    pub fn edit(&mut self, e: &EditEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_edit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RejectedEditEvent`].
    #[inline]
    pub fn rejected_edit(&mut self, e: &RejectedEditEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rejected_edit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Collect {
        dangling: Vec<(FormId, FormId)>,
        allocs: Vec<&'static str>,
    }

    impl TraceSink for Collect {
        fn on_dangling_member(&mut self, e: &DanglingMemberEvent) {
            self.dangling.push((e.group, e.member));
        }

        fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
            self.allocs.push(e.tag);
        }
    }

    #[test]
    fn events_reach_the_sink() {
        let mut sink = Collect::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.dangling_member(&DanglingMemberEvent {
                group: FormId(1),
                member: FormId(9),
            });
            let mut inner = tracer.reborrow();
            inner.alloc_failure(&AllocFailureEvent {
                tag: "outline",
                requested: 64,
            });
        }
        assert_eq!(sink.dangling, [(FormId(1), FormId(9))]);
        assert_eq!(sink.allocs, ["outline"]);
    }

    #[test]
    fn none_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.render(&RenderEvent {
            form: FormId(1),
            kind: ShapeKind::Circle,
            width: 1,
            height: 1,
            cached: false,
        });
    }
}
