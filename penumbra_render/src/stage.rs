// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline stages that request masks.

use core::fmt;

use penumbra_core::config::RasterConfig;
use penumbra_core::geometry::Frame;
use penumbra_core::group::hash::{fnv1a, fnv1a_extend};
use penumbra_core::raster::Roi;

/// Hash of everything about a [`PipeStage`] that changes its rasters.
///
/// Two stages with equal hashes receive identical masks for identical forms.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageHash(pub u64);

impl fmt::Debug for StageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageHash({:#018x})", self.0)
    }
}

/// A processing stage that consumes masks.
///
/// `id` distinguishes stages of the pipeline that would otherwise request
/// the same region, such as a preview and a full export of one module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipeStage {
    /// Caller-assigned stage identifier.
    pub id: u32,
    /// The full image the stage works on.
    pub frame: Frame,
    /// The region and scale the stage currently processes.
    pub roi: Roi,
    /// Curve sampling used for this stage's rasters.
    pub raster: RasterConfig,
}

impl PipeStage {
    /// A stage processing the whole `frame` at full resolution.
    #[must_use]
    pub fn full(id: u32, frame: Frame) -> Self {
        Self {
            id,
            frame,
            roi: Roi {
                x: 0,
                y: 0,
                width: frame.width,
                height: frame.height,
                scale: 1.0,
            },
            raster: RasterConfig::full(),
        }
    }

    /// Returns `self` processing `roi` instead.
    #[must_use]
    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = roi;
        self
    }

    /// Returns `self` sampling curves with `raster`.
    #[must_use]
    pub fn with_raster(mut self, raster: RasterConfig) -> Self {
        self.raster = raster;
        self
    }

    /// The stage hash.
    #[must_use]
    pub fn hash(&self) -> StageHash {
        let mut h = fnv1a(&self.id.to_le_bytes());
        for v in [self.frame.width, self.frame.height, self.roi.width, self.roi.height] {
            h = fnv1a_extend(h, &v.to_le_bytes());
        }
        for v in [self.roi.x, self.roi.y] {
            h = fnv1a_extend(h, &v.to_le_bytes());
        }
        h = fnv1a_extend(h, &self.roi.scale_factor().to_bits().to_le_bytes());
        h = fnv1a_extend(h, &self.raster.curve_step.to_bits().to_le_bytes());
        for v in [self.raster.min_samples, self.raster.max_samples] {
            h = fnv1a_extend(h, &(v as u64).to_le_bytes());
        }
        StageHash(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Frame = Frame::new(320, 240);

    #[test]
    fn equal_stages_hash_equal() {
        assert_eq!(PipeStage::full(1, FRAME).hash(), PipeStage::full(1, FRAME).hash());
    }

    #[test]
    fn every_field_reaches_the_hash() {
        let base = PipeStage::full(1, FRAME);
        let roi = Roi {
            x: 10,
            y: 0,
            width: 100,
            height: 100,
            scale: 1.0,
        };
        let variants = [
            PipeStage::full(2, FRAME),
            PipeStage::full(1, Frame::new(320, 241)),
            base.with_roi(roi),
            base.with_roi(Roi { scale: 0.5, ..roi }),
            base.with_raster(RasterConfig::preview()),
        ];
        for v in variants {
            assert_ne!(v.hash(), base.hash(), "{v:?} collides with the base stage");
        }
    }
}
