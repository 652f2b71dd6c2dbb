// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunable parameters for rasterization and interactive editing.

/// Controls how curves are flattened before rasterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterConfig {
    /// Target distance in image pixels between consecutive outline samples.
    pub curve_step: f64,
    /// Minimum samples per curve segment or per full circle.
    pub min_samples: usize,
    /// Maximum samples per curve segment or per full circle.
    pub max_samples: usize,
}

impl RasterConfig {
    /// Dense sampling suitable for full-resolution pipeline output.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            curve_step: 1.0,
            min_samples: 4,
            max_samples: 4096,
        }
    }

    /// Coarser sampling for on-screen outlines while dragging.
    #[must_use]
    pub const fn preview() -> Self {
        Self {
            curve_step: 3.0,
            min_samples: 4,
            max_samples: 512,
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self::full()
    }
}

/// What stylus pressure changes while painting a brush stroke.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BrushPressure {
    /// Pressure is ignored.
    #[default]
    Off,
    /// Pressure scales the stroke width.
    Size,
    /// Pressure scales the hardness.
    Hardness,
    /// Pressure scales the density.
    Opacity,
}

/// Initial parameters for newly created shapes.
///
/// Lengths are fractions of the smaller frame dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreationDefaults {
    /// Circle radius.
    pub circle_radius: f64,
    /// Circle feather width.
    pub circle_border: f64,
    /// Ellipse radii along and across the rotation axis.
    pub ellipse_radii: (f64, f64),
    /// Ellipse feather width.
    pub ellipse_border: f64,
    /// Feather width of new path corners.
    pub path_border: f64,
    /// Brush stroke half-width.
    pub brush_width: f64,
    /// Brush hardness in `[0, 1]`.
    pub brush_hardness: f64,
    /// Brush density in `[0, 1]`.
    pub brush_density: f64,
    /// Gradient compression in `(0, 1]`.
    pub gradient_compression: f64,
    /// Gradient steepness.
    pub gradient_steepness: f64,
}

impl Default for CreationDefaults {
    fn default() -> Self {
        Self {
            circle_radius: 0.05,
            circle_border: 0.02,
            ellipse_radii: (0.08, 0.05),
            ellipse_border: 0.02,
            path_border: 0.02,
            brush_width: 0.01,
            brush_hardness: 0.66,
            brush_density: 1.0,
            gradient_compression: 0.5,
            gradient_steepness: 0.0,
        }
    }
}

/// Controls pointer interaction with shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditConfig {
    /// Hit radius of control points and handles, in display pixels.
    pub handle_radius: f64,
    /// A click this close to the first corner (display pixels) closes a path.
    pub close_distance: f64,
    /// Relative size change per scroll step.
    pub scroll_factor: f64,
    /// Multiplier applied to steps with [`StepSize::Coarse`](crate::edit::StepSize::Coarse).
    pub coarse_multiplier: f64,
    /// Multiplier applied to steps with [`StepSize::Fine`](crate::edit::StepSize::Fine).
    pub fine_multiplier: f64,
    /// Opacity change per step.
    pub opacity_step: f32,
    /// Smallest radius or width a scroll can shrink a shape to, in image pixels.
    pub min_size: f64,
    /// Minimum pointer travel between recorded brush samples, in image pixels.
    pub brush_spacing: f64,
    /// How stylus pressure affects brush strokes.
    pub brush_pressure: BrushPressure,
    /// Parameters for new shapes.
    pub defaults: CreationDefaults,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            handle_radius: 6.0,
            close_distance: 8.0,
            scroll_factor: 0.03,
            coarse_multiplier: 10.0,
            fine_multiplier: 0.1,
            opacity_step: 0.05,
            min_size: 0.5,
            brush_spacing: 2.0,
            brush_pressure: BrushPressure::Off,
            defaults: CreationDefaults::default(),
        }
    }
}
