// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use penumbra_core::trace::{
    AllocFailureEvent, DanglingMemberEvent, EditEvent, FormDroppedEvent, RejectedEditEvent,
    RenderEvent, SanitizedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    lines: u64,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if writeln!(self.writer, "{args}").is_ok() {
            self.lines += 1;
        }
    }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "?".to_owned(), |v| v.to_string())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        self.line(format_args!(
            "[alloc] tag={} requested={}",
            e.tag, e.requested
        ));
    }

    fn on_dangling_member(&mut self, e: &DanglingMemberEvent) {
        self.line(format_args!(
            "[dangling] group={} member={}",
            e.group, e.member
        ));
    }

    fn on_form_dropped(&mut self, e: &FormDroppedEvent) {
        self.line(format_args!(
            "[dropped] id={} version={} reason={}",
            opt(e.id),
            opt(e.version),
            e.reason.label(),
        ));
    }

    fn on_sanitized(&mut self, e: &SanitizedEvent) {
        self.line(format_args!(
            "[sanitized] id={} kind={} fields={}",
            e.id,
            e.kind.name(),
            e.fields,
        ));
    }

    fn on_render(&mut self, e: &RenderEvent) {
        let source = if e.cached { "cache" } else { "raster" };
        self.line(format_args!(
            "[render] form={} kind={} size={}x{} from={source}",
            e.form,
            e.kind.name(),
            e.width,
            e.height,
        ));
    }

    fn on_edit(&mut self, e: &EditEvent) {
        self.line(format_args!("[edit] form={} action={}", e.form, e.action.label()));
    }

    fn on_rejected_edit(&mut self, e: &RejectedEditEvent) {
        self.line(format_args!(
            "[rejected] group={} member={}: {}",
            e.group, e.member, e.reason
        ));
    }
}
