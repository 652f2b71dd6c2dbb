// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster cache keyed by pipe stage and form.

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use penumbra_core::buffer::AllocError;
use penumbra_core::form::FormId;
use penumbra_core::group::{hash, render};
use penumbra_core::raster::{MaskArea, MaskBuffer, Roi};
use penumbra_core::registry::FormChanges;
use penumbra_core::snapshot::FormSource;
use penumbra_core::trace::{AllocFailureEvent, RenderEvent, Tracer};

use crate::{DamageRegion, PipeStage, StageHash};

/// Whether a raster covers the form's own area or the stage's ROI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Extent {
    Form,
    Roi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Key {
    stage: StageHash,
    form: FormId,
    extent: Extent,
}

#[derive(Debug)]
struct Cached {
    /// Content hash of the form when the raster was produced.
    content: u64,
    /// Coverage in full-resolution image pixels.
    area: MaskArea,
    last_used: u64,
    mask: MaskBuffer,
}

/// Hit and miss counters of a [`MaskCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a stored raster.
    pub hits: u64,
    /// Requests that rasterized.
    pub misses: u64,
}

/// Serves repeated mask requests from the last raster.
///
/// Entries are keyed by [`StageHash`] and form id, and validated against the
/// form's content hash on every request, so an entry is never served for
/// geometry it was not produced from. [`apply_changes`](Self::apply_changes)
/// evicts entries early and reports the area they covered.
///
/// When full, the least recently used entry is evicted.
#[derive(Debug)]
pub struct MaskCache {
    entries: HashMap<Key, Cached>,
    capacity: usize,
    clock: u64,
    stats: CacheStats,
}

impl MaskCache {
    /// Creates a cache holding at most `capacity` rasters (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    /// Number of stored rasters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counters since creation.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops every stored raster.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mask of form `id` over its own area at full resolution.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when rasterizing fails; nothing is stored.
    pub fn get_mask<S: FormSource + ?Sized>(
        &mut self,
        src: &S,
        stage: &PipeStage,
        id: FormId,
        tracer: &mut Tracer<'_>,
    ) -> Result<&MaskBuffer, AllocError> {
        self.lookup(src, stage, id, Extent::Form, tracer)
    }

    /// Writes the mask of form `id` over `stage.roi` into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when rasterizing fails; `out` should then be
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if `out` is smaller than the stage ROI.
    pub fn get_mask_roi<S: FormSource + ?Sized>(
        &mut self,
        src: &S,
        stage: &PipeStage,
        id: FormId,
        out: &mut [f32],
        tracer: &mut Tracer<'_>,
    ) -> Result<(), AllocError> {
        let n = stage.roi.pixel_count();
        assert!(out.len() >= n, "output smaller than ROI");
        let mask = self.lookup(src, stage, id, Extent::Roi, tracer)?;
        out[..n].copy_from_slice(mask.data());
        Ok(())
    }

    /// Evicts entries of every form in `changes` and returns the image area
    /// they covered.
    pub fn apply_changes(&mut self, changes: &FormChanges) -> DamageRegion {
        let mut damage = DamageRegion::None;
        self.entries.retain(|key, entry| {
            if changes.touches(key.form) {
                damage.add(entry.area);
                false
            } else {
                true
            }
        });
        damage
    }

    fn lookup<S: FormSource + ?Sized>(
        &mut self,
        src: &S,
        stage: &PipeStage,
        id: FormId,
        extent: Extent,
        tracer: &mut Tracer<'_>,
    ) -> Result<&MaskBuffer, AllocError> {
        let key = Key {
            stage: stage.hash(),
            form: id,
            extent,
        };
        let content = hash::form_hash(src, id, tracer);
        self.clock += 1;
        let now = self.clock;

        let fresh = self
            .entries
            .get(&key)
            .is_some_and(|e| e.content == content);
        if fresh {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }

        let entry = match self.entries.entry(key) {
            Entry::Occupied(o) if fresh => {
                let entry = o.into_mut();
                if let Some(form) = src.form(id) {
                    tracer.render(&RenderEvent {
                        form: id,
                        kind: form.kind(),
                        width: entry.mask.width,
                        height: entry.mask.height,
                        cached: true,
                    });
                }
                entry
            }
            Entry::Occupied(mut o) => {
                o.insert(rasterize(src, stage, id, extent, content, tracer)?);
                o.into_mut()
            }
            Entry::Vacant(v) => v.insert(rasterize(src, stage, id, extent, content, tracer)?),
        };
        entry.last_used = now;
        Ok(&entry.mask)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| *k);
        if let Some(k) = oldest {
            self.entries.remove(&k);
        }
    }
}

fn rasterize<S: FormSource + ?Sized>(
    src: &S,
    stage: &PipeStage,
    id: FormId,
    extent: Extent,
    content: u64,
    tracer: &mut Tracer<'_>,
) -> Result<Cached, AllocError> {
    let area = render::area(src, id, stage.frame, tracer);
    let mask = match extent {
        Extent::Form => render::render(src, id, stage.frame, &stage.raster, tracer)?,
        Extent::Roi => {
            let roi: Roi = stage.roi;
            let mut mask = MaskBuffer::try_for_roi(&roi, "roi mask").inspect_err(|e| {
                tracer.alloc_failure(&AllocFailureEvent {
                    tag: e.tag,
                    requested: e.requested,
                });
            })?;
            render::render_roi(src, id, stage.frame, &roi, &stage.raster, mask.data_mut(), tracer)?;
            mask
        }
    };
    Ok(Cached {
        content,
        area,
        last_used: 0,
        mask,
    })
}
