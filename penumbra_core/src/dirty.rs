// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The [`Registry`](crate::registry::Registry) tracks invalidation with
//! [`understory_dirty`], keyed by raw form id. Each channel is an independent
//! category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`SHAPE`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has a dependency edge
//!   from every group to each of its members. Marking a member dirty marks
//!   every group that contains it, directly or through nested groups, because
//!   a group's raster is computed from its members.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on the group whose member list
//!   changed (add, remove, reorder, ungroup). It does not propagate; the
//!   membership change itself also marks [`SHAPE`] on the group.
//!
//! - **Lifecycle**: [`LIFECYCLE`] is marked when a form is created or
//!   removed.
//!
//! # Consumption
//!
//! [`Registry::drain_changes`](crate::registry::Registry::drain_changes)
//! drains all channels into a
//! [`FormChanges`](crate::registry::FormChanges) value that raster caches use
//! to evict stale entries.

use understory_dirty::Channel;

/// Geometry, opacity, mode or inversion changed; propagates to containing
/// groups.
pub const SHAPE: Channel = Channel::new(0);

/// A group's member list changed.
pub const TOPOLOGY: Channel = Channel::new(1);

/// A form was created or removed.
pub const LIFECYCLE: Channel = Channel::new(2);
