// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The form envelope: identity, version, shape payload and display name.

use alloc::string::String;
use core::fmt;

use kurbo::Point;

use crate::group::Group;
use crate::shape::{Brush, Circle, Ellipse, Gradient, Path};

/// Current version of the on-disk form layout.
///
/// Records written with an older version are upgraded by
/// [`codec::decode_form`](crate::codec::decode_form).
pub const MASKS_VERSION: u32 = 3;

/// Stable identifier of a form.
///
/// Ids are unique within a [`Registry`](crate::registry::Registry) and persist
/// across sessions; groups refer to their members by id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormId(pub u32);

impl fmt::Debug for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormId({})", self.0)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminator of the shape payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// A disc with a feathered rim.
    Circle,
    /// A rotated ellipse with a feathered rim.
    Ellipse,
    /// A closed Bezier outline.
    Path,
    /// An open stroke with per-node pressure data.
    Brush,
    /// A continuous gradient across the whole frame.
    Gradient,
    /// An ordered combination of other forms.
    Group,
}

impl ShapeKind {
    /// All kinds, in discriminator order.
    pub const ALL: [Self; 6] = [
        Self::Circle,
        Self::Ellipse,
        Self::Path,
        Self::Brush,
        Self::Gradient,
        Self::Group,
    ];

    /// Lowercase name used for default form names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Path => "path",
            Self::Brush => "brush",
            Self::Gradient => "gradient",
            Self::Group => "group",
        }
    }

    /// Wire discriminator.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Circle => 1,
            Self::Ellipse => 2,
            Self::Path => 3,
            Self::Brush => 4,
            Self::Gradient => 5,
            Self::Group => 6,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Circle),
            2 => Some(Self::Ellipse),
            3 => Some(Self::Path),
            4 => Some(Self::Brush),
            5 => Some(Self::Gradient),
            6 => Some(Self::Group),
            _ => None,
        }
    }

    /// Whether forms of this kind can carry a clone source.
    #[must_use]
    pub const fn supports_source(self) -> bool {
        !matches!(self, Self::Gradient | Self::Group)
    }
}

/// Shape payload of a form.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// See [`Circle`].
    Circle(Circle),
    /// See [`Ellipse`].
    Ellipse(Ellipse),
    /// See [`Path`].
    Path(Path),
    /// See [`Brush`].
    Brush(Brush),
    /// See [`Gradient`].
    Gradient(Gradient),
    /// See [`Group`].
    Group(Group),
}

impl Shape {
    /// Default payload for `kind`.
    ///
    /// Circles and ellipses start at the origin with zero size; paths, brushes
    /// and groups start empty. Editing code places them.
    #[must_use]
    pub fn empty(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Circle => Self::Circle(Circle::default()),
            ShapeKind::Ellipse => Self::Ellipse(Ellipse::default()),
            ShapeKind::Path => Self::Path(Path::default()),
            ShapeKind::Brush => Self::Brush(Brush::default()),
            ShapeKind::Gradient => Self::Gradient(Gradient::default()),
            ShapeKind::Group => Self::Group(Group::default()),
        }
    }

    /// The discriminator of this payload.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle(_) => ShapeKind::Circle,
            Self::Ellipse(_) => ShapeKind::Ellipse,
            Self::Path(_) => ShapeKind::Path,
            Self::Brush(_) => ShapeKind::Brush,
            Self::Gradient(_) => ShapeKind::Gradient,
            Self::Group(_) => ShapeKind::Group,
        }
    }
}

/// A persisted mask shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    /// Unique identifier.
    pub id: FormId,
    /// Layout version the form was created with or upgraded to.
    pub version: u32,
    /// Geometry payload.
    pub shape: Shape,
    /// Display name.
    pub name: String,
    /// Clone source position, for forms that copy pixels from elsewhere.
    ///
    /// For circles and ellipses this is where the center maps to; for paths
    /// and brushes it is where the first corner maps to.
    pub source: Option<Point>,
}

impl Form {
    /// Creates an unnamed form with the current version.
    #[must_use]
    pub fn new(id: FormId, shape: Shape) -> Self {
        Self {
            id,
            version: MASKS_VERSION,
            shape,
            name: String::new(),
            source: None,
        }
    }

    /// The discriminator of the payload.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// Group payload, if this form is a group.
    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match &self.shape {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable group payload, if this form is a group.
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.shape {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ShapeKind::from_tag(0), None);
        assert_eq!(ShapeKind::from_tag(42), None);
    }

    #[test]
    fn empty_payload_matches_kind() {
        for kind in ShapeKind::ALL {
            assert_eq!(Shape::empty(kind).kind(), kind);
        }
    }

    #[test]
    fn new_form_uses_current_version() {
        let form = Form::new(FormId(7), Shape::empty(ShapeKind::Circle));
        assert_eq!(form.version, MASKS_VERSION);
        assert!(form.as_group().is_none());
        assert_eq!(format!("{:?}", form.id), "FormId(7)");
    }
}
