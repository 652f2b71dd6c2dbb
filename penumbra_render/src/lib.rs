// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline-facing mask requests, raster caching and damage tracking for
//! penumbra.
//!
//! This crate sits between [`penumbra_core`]'s form registry and an image
//! processing pipeline. It defines:
//!
//! - [`PipeStage`]: a pipeline stage requesting masks, with its frame,
//!   region of interest and sampling quality
//! - [`StageHash`]: the cache key derived from a stage
//! - [`MaskCache`]: serves repeated identical requests from the last raster
//! - [`DamageRegion`]: image areas whose masks changed, for partial
//!   recomputation
//!
//! A typical redraw:
//!
//! ```text
//!   Registry::drain_changes() ──► MaskCache::apply_changes() ──► old areas
//!                │                                                   │
//!                └──► DamageRegion::from_changes() ──► new areas ──► merge
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod cache;
mod damage;
mod stage;

pub use cache::{CacheStats, MaskCache};
pub use damage::DamageRegion;
pub use stage::{PipeStage, StageHash};
