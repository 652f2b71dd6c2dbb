// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mask shapes, group composition and interactive editing.
//!
//! `penumbra_core` models the regions a non-destructive image editor uses to
//! confine a local adjustment: circles, ellipses, Bezier paths, brush strokes
//! and linear gradients, combined through ordered groups into a single
//! per-pixel opacity buffer. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   pointer events ──► EditSession ──► Registry::update() ──► FormChanges
//!        │                  │                                      │
//!        │                  ▼                                      ▼
//!        │          post_expose() ──► Overlay          raster caches evict
//!        │
//!        ▼
//!   Registry::snapshot() ──► Snapshot (Send) ──► render::render() ──► MaskBuffer
//!                                                      │
//!   codec::encode_forms() ◄── history ──► Registry::load()
//! ```
//!
//! **[`form`]** — Forms: an identifier, a version, a name, an optional
//! clone source and a [`Shape`](form::Shape) payload.
//!
//! **[`shape`]** — Per-kind geometry: outlines, bounding areas, raster fill,
//! hit-testing and the editing helpers each kind supports.
//!
//! **[`group`]** — Ordered member lists with per-member combine mode, invert
//! flag and opacity; acyclicity checks, rendering and content hashing.
//!
//! **[`registry`]** — Owns every form and enforces the structural
//! invariants. Mutations are reported through [`FormChanges`](registry::FormChanges)
//! and a generation counter.
//!
//! **[`snapshot`]** — Immutable, thread-transferable copies of the forms
//! reachable from a group, for rendering off the editing thread.
//!
//! **[`edit`]** — The interactive editing state machine and the
//! [`Overlay`](edit::Overlay) drawing seam.
//!
//! **[`codec`]** — Versioned binary records with upgrade of older layouts.
//!
//! **[`raster`]** — Mask buffers, regions of interest and bounding areas.
//!
//! **[`buffer`]** — Growable float buffer that reports allocation failure.
//!
//! **[`dirty`]** — Structural dependency tracking via `understory_dirty`.
//!
//! **[`geometry`]** — Frames, polylines and the planar helpers shared by
//! the shapes.
//!
//! **[`config`]** — Raster quality and editing tunables.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod codec;
pub mod config;
pub mod dirty;
pub mod edit;
pub mod form;
pub mod geometry;
pub mod group;
pub mod raster;
pub mod registry;
pub mod shape;
pub mod snapshot;
pub mod trace;
