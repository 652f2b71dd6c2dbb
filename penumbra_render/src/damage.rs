// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image areas whose masks changed.

use alloc::vec::Vec;

use penumbra_core::geometry::Frame;
use penumbra_core::group::render;
use penumbra_core::raster::MaskArea;
use penumbra_core::registry::FormChanges;
use penumbra_core::snapshot::FormSource;
use penumbra_core::trace::Tracer;

/// A region of the image whose masks need recomputing.
///
/// Areas are in full-resolution image pixels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DamageRegion {
    /// The entire image needs recomputing.
    #[default]
    Full,
    /// A list of areas that need recomputing.
    Areas(Vec<MaskArea>),
    /// Nothing changed; previous results can be reused.
    None,
}

impl DamageRegion {
    /// Areas the changed forms now cover in `src`.
    ///
    /// Removed forms are not in `src` any more; their old coverage is
    /// reported by [`MaskCache::apply_changes`](crate::MaskCache::apply_changes).
    #[must_use]
    pub fn from_changes<S: FormSource + ?Sized>(
        changes: &FormChanges,
        src: &S,
        frame: Frame,
        tracer: &mut Tracer<'_>,
    ) -> Self {
        let mut region = Self::None;
        for &id in changes.shapes.iter().chain(&changes.topology).chain(&changes.added) {
            region.add(render::area(src, id, frame, tracer));
        }
        region
    }

    /// Returns `true` if no region needs recomputing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Adds one area. Empty areas are ignored.
    pub fn add(&mut self, area: MaskArea) {
        if area.is_empty() {
            return;
        }
        match self {
            Self::Full => {}
            Self::Areas(areas) => {
                if !areas.contains(&area) {
                    areas.push(area);
                }
            }
            Self::None => *self = Self::Areas(alloc::vec![area]),
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Areas(_), Self::Areas(b)) => {
                for &area in b {
                    self.add(area);
                }
            }
        }
    }

    /// Whether `area` overlaps the damage.
    #[must_use]
    pub fn intersects(&self, area: MaskArea) -> bool {
        match self {
            Self::Full => !area.is_empty(),
            Self::Areas(areas) => areas.iter().any(|a| !a.intersect(area).is_empty()),
            Self::None => false,
        }
    }

    /// Smallest area covering the damage, clipped to `frame`.
    #[must_use]
    pub fn bounds(&self, frame: Frame) -> MaskArea {
        let whole = MaskArea {
            x: 0,
            y: 0,
            width: frame.width,
            height: frame.height,
        };
        match self {
            Self::Full => whole,
            Self::Areas(areas) => areas
                .iter()
                .fold(MaskArea::default(), |acc, &a| acc.union(a))
                .intersect(whole),
            Self::None => MaskArea::default(),
        }
    }
}
