// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter for recorded events.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes them as a JSON array with one object per event, in recording
//! order. Every object carries an `"event"` name and a `"seq"` index.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as a JSON array.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes)
        .enumerate()
        .map(|(seq, e)| to_value(seq, &e))
        .collect();
    serde_json::to_writer_pretty(&mut *writer, &events).map_err(io::Error::other)?;
    writeln!(writer)
}

fn to_value(seq: usize, recorded: &RecordedEvent) -> Value {
    match recorded {
        RecordedEvent::AllocFailure { requested, tag_len } => json!({
            "event": "AllocFailure",
            "seq": seq,
            "requested": requested,
            "tag_len": tag_len,
        }),
        RecordedEvent::DanglingMember(e) => json!({
            "event": "DanglingMember",
            "seq": seq,
            "group": e.group.0,
            "member": e.member.0,
        }),
        RecordedEvent::FormDropped(e) => json!({
            "event": "FormDropped",
            "seq": seq,
            "id": e.id.map(|id| id.0),
            "version": e.version,
            "reason": e.reason.label(),
        }),
        RecordedEvent::Sanitized(e) => json!({
            "event": "Sanitized",
            "seq": seq,
            "id": e.id.0,
            "kind": e.kind.name(),
            "fields": e.fields,
        }),
        RecordedEvent::Render(e) => json!({
            "event": "Render",
            "seq": seq,
            "form": e.form.0,
            "kind": e.kind.name(),
            "width": e.width,
            "height": e.height,
            "cached": e.cached,
        }),
        RecordedEvent::Edit(e) => json!({
            "event": "Edit",
            "seq": seq,
            "form": e.form.0,
            "action": e.action.label(),
        }),
        RecordedEvent::RejectedEdit(e) => json!({
            "event": "RejectedEdit",
            "seq": seq,
            "group": e.group.0,
            "member": e.member.0,
            "reason": e.reason.to_string(),
        }),
    }
}
