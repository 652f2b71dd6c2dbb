// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Groups: ordered combinations of other forms.
//!
//! A [`Group`] lists members by id. Each [`GroupMember`] carries a
//! [`MemberState`] bitmask selecting whether it participates, whether its
//! mask is inverted, and which [`CombineMode`] merges it into the running
//! result. Members are combined front to back in list order.
//!
//! Rendering lives in [`render`], content hashing in [`hash`]. Structural
//! edits that need the whole form set (adding members, ungrouping) are on
//! [`Registry`](crate::registry::Registry), which checks acyclicity with
//! [`reaches`] before mutating anything.

use alloc::vec::Vec;
use core::fmt;

use crate::form::FormId;
use crate::snapshot::FormSource;

pub mod hash;
pub mod render;

/// Bitmask of member flags and combination mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberState(u32);

impl MemberState {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// The member participates in rendering.
    pub const USE: Self = Self(1 << 0);
    /// The member's outline is shown while editing.
    pub const SHOW: Self = Self(1 << 1);
    /// The member's mask is inverted before combining.
    pub const INVERSE: Self = Self(1 << 2);
    /// Combine with `max`.
    pub const UNION: Self = Self(1 << 3);
    /// Combine with `min`.
    pub const INTERSECTION: Self = Self(1 << 4);
    /// Subtract from the running result.
    pub const DIFFERENCE: Self = Self(1 << 5);
    /// Add to the running result, saturating at one.
    pub const SUM: Self = Self(1 << 6);
    /// Symmetric difference.
    pub const EXCLUSION: Self = Self(1 << 7);

    const MODES: u32 = Self::UNION.0
        | Self::INTERSECTION.0
        | Self::DIFFERENCE.0
        | Self::SUM.0
        | Self::EXCLUSION.0;
    const ALL: u32 = Self::USE.0 | Self::SHOW.0 | Self::INVERSE.0 | Self::MODES;

    /// The raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a state from raw bits, dropping unknown ones.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Whether all bits of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Flips the bits of `other`.
    pub fn toggle(&mut self, other: Self) {
        self.0 ^= other.0;
    }

    /// The combination mode. Union when no mode bit is set; the lowest set
    /// mode bit wins when several are.
    #[must_use]
    pub fn mode(self) -> CombineMode {
        CombineMode::ALL
            .into_iter()
            .find(|m| self.contains(m.flag()))
            .unwrap_or(CombineMode::Union)
    }

    /// Replaces the mode bits with `mode`.
    #[must_use]
    pub const fn with_mode(self, mode: CombineMode) -> Self {
        Self((self.0 & !Self::MODES) | mode.flag().0)
    }

    /// Whether exactly one mode bit is set.
    #[must_use]
    pub const fn has_single_mode(self) -> bool {
        (self.0 & Self::MODES).count_ones() == 1
    }
}

impl core::ops::BitOr for MemberState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Default for MemberState {
    fn default() -> Self {
        Self::USE | Self::SHOW | Self::UNION
    }
}

impl fmt::Debug for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(MemberState, &str); 8] = [
            (MemberState::USE, "USE"),
            (MemberState::SHOW, "SHOW"),
            (MemberState::INVERSE, "INVERSE"),
            (MemberState::UNION, "UNION"),
            (MemberState::INTERSECTION, "INTERSECTION"),
            (MemberState::DIFFERENCE, "DIFFERENCE"),
            (MemberState::SUM, "SUM"),
            (MemberState::EXCLUSION, "EXCLUSION"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

/// How a member merges into the running result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombineMode {
    /// `max(acc, b)`.
    Union,
    /// `min(acc, b)`.
    Intersection,
    /// `max(0, acc - b)`.
    Difference,
    /// `min(1, acc + b)`.
    Sum,
    /// `acc + b - 2·acc·b`.
    Exclusion,
}

impl CombineMode {
    /// All modes, in flag order.
    pub const ALL: [Self; 5] = [
        Self::Union,
        Self::Intersection,
        Self::Difference,
        Self::Sum,
        Self::Exclusion,
    ];

    /// The [`MemberState`] bit for this mode.
    #[must_use]
    pub const fn flag(self) -> MemberState {
        match self {
            Self::Union => MemberState::UNION,
            Self::Intersection => MemberState::INTERSECTION,
            Self::Difference => MemberState::DIFFERENCE,
            Self::Sum => MemberState::SUM,
            Self::Exclusion => MemberState::EXCLUSION,
        }
    }

    /// Merges `b` into `acc`.
    #[inline]
    #[must_use]
    pub fn combine(self, acc: f32, b: f32) -> f32 {
        match self {
            Self::Union => acc.max(b),
            Self::Intersection => acc.min(b),
            Self::Difference => (acc - b).max(0.0),
            Self::Sum => (acc + b).min(1.0),
            Self::Exclusion => (acc + b - 2.0 * acc * b).clamp(0.0, 1.0),
        }
    }
}

/// One entry of a group's member list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupMember {
    /// The member form.
    pub form: FormId,
    /// The group that owns this entry.
    pub parent: FormId,
    /// Flags and combination mode.
    pub state: MemberState,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: f32,
}

impl GroupMember {
    /// A participating union member at full opacity.
    #[must_use]
    pub fn new(form: FormId, parent: FormId) -> Self {
        Self {
            form,
            parent,
            state: MemberState::default(),
            opacity: 1.0,
        }
    }

    /// Returns `self` with the combination mode replaced.
    #[must_use]
    pub fn with_mode(mut self, mode: CombineMode) -> Self {
        self.state = self.state.with_mode(mode);
        self
    }

    /// Returns `self` with the opacity replaced.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Returns `self` with the mask inverted.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.state.insert(MemberState::INVERSE);
        self
    }
}

/// An ordered member list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    /// Members in combination order.
    pub members: Vec<GroupMember>,
}

impl Group {
    /// Index of the entry for `form`.
    #[must_use]
    pub fn position(&self, form: FormId) -> Option<usize> {
        self.members.iter().position(|m| m.form == form)
    }

    /// Whether `form` is a member.
    #[must_use]
    pub fn contains(&self, form: FormId) -> bool {
        self.position(form).is_some()
    }

    /// The entry for `form`.
    #[must_use]
    pub fn member(&self, form: FormId) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.form == form)
    }

    /// The mutable entry for `form`.
    pub fn member_mut(&mut self, form: FormId) -> Option<&mut GroupMember> {
        self.members.iter_mut().find(|m| m.form == form)
    }

    /// Clamps opacities, repairs mode bits and drops repeated entries;
    /// returns the number of fields changed.
    pub fn sanitize(&mut self) -> u32 {
        let mut changed = 0;
        let mut seen: Vec<FormId> = Vec::with_capacity(self.members.len());
        self.members.retain(|m| {
            if seen.contains(&m.form) {
                changed += 1;
                false
            } else {
                seen.push(m.form);
                true
            }
        });
        for m in &mut self.members {
            let opacity = if m.opacity.is_finite() {
                m.opacity.clamp(0.0, 1.0)
            } else {
                1.0
            };
            if opacity.to_bits() != m.opacity.to_bits() {
                m.opacity = opacity;
                changed += 1;
            }
            if !m.state.has_single_mode() {
                m.state = m.state.with_mode(m.state.mode());
                changed += 1;
            }
        }
        changed
    }
}

/// A structural group edit was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupError {
    /// A group cannot contain itself.
    SelfReference(FormId),
    /// Adding `member` to `group` would make `group` reachable from itself.
    Cycle {
        /// The group being edited.
        group: FormId,
        /// The form that would close the cycle.
        member: FormId,
    },
    /// No form with this id exists.
    UnknownForm(FormId),
    /// The form is not a group.
    NotAGroup(FormId),
    /// `member` is already in `group`.
    AlreadyMember {
        /// The group being edited.
        group: FormId,
        /// The existing member.
        member: FormId,
    },
    /// `member` is not in `group`.
    NotAMember {
        /// The group being edited.
        group: FormId,
        /// The missing member.
        member: FormId,
    },
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReference(id) => write!(f, "group {id} cannot contain itself"),
            Self::Cycle { group, member } => {
                write!(f, "adding {member} to group {group} would create a cycle")
            }
            Self::UnknownForm(id) => write!(f, "no form {id}"),
            Self::NotAGroup(id) => write!(f, "form {id} is not a group"),
            Self::AlreadyMember { group, member } => {
                write!(f, "{member} is already a member of group {group}")
            }
            Self::NotAMember { group, member } => {
                write!(f, "{member} is not a member of group {group}")
            }
        }
    }
}

impl core::error::Error for GroupError {}

/// Whether `target` is reachable from `from` by following group membership
/// (including `from == target`).
///
/// Missing forms end the walk along their branch.
#[must_use]
pub fn reaches<S: FormSource + ?Sized>(src: &S, from: FormId, target: FormId) -> bool {
    let mut stack = alloc::vec![from];
    let mut visited: Vec<FormId> = Vec::new();
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if visited.contains(&id) {
            continue;
        }
        visited.push(id);
        if let Some(group) = src.form(id).and_then(|f| f.as_group()) {
            stack.extend(group.members.iter().map(|m| m.form));
        }
    }
    false
}

/// Checks that `member` can join `group` without creating a cycle.
///
/// # Errors
///
/// Returns [`GroupError::SelfReference`] when `member == group` and
/// [`GroupError::Cycle`] when `group` is reachable from `member`.
pub fn check_acyclic<S: FormSource + ?Sized>(
    src: &S,
    group: FormId,
    member: FormId,
) -> Result<(), GroupError> {
    if group == member {
        return Err(GroupError::SelfReference(group));
    }
    if reaches(src, member, group) {
        return Err(GroupError::Cycle { group, member });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use hashbrown::HashMap;

    use super::*;
    use crate::form::{Form, Shape, ShapeKind};

    #[test]
    fn combine_modes() {
        assert_eq!(CombineMode::Union.combine(0.25, 0.75), 0.75);
        assert_eq!(CombineMode::Intersection.combine(0.25, 0.75), 0.25);
        assert_eq!(CombineMode::Difference.combine(0.25, 0.75), 0.0);
        assert_eq!(CombineMode::Difference.combine(0.75, 0.25), 0.5);
        assert_eq!(CombineMode::Sum.combine(0.5, 0.75), 1.0);
        assert_eq!(CombineMode::Exclusion.combine(1.0, 1.0), 0.0);
        assert_eq!(CombineMode::Exclusion.combine(1.0, 0.0), 1.0);
    }

    #[test]
    fn state_mode_round_trip() {
        for mode in CombineMode::ALL {
            let s = MemberState::default().with_mode(mode);
            assert_eq!(s.mode(), mode);
            assert!(s.has_single_mode());
            assert!(s.contains(MemberState::USE));
        }
        assert_eq!(MemberState::NONE.mode(), CombineMode::Union);
    }

    #[test]
    fn state_debug_lists_flags() {
        let s = MemberState::USE | MemberState::INVERSE | MemberState::SUM;
        assert_eq!(format!("{s:?}"), "USE | INVERSE | SUM");
        assert_eq!(format!("{:?}", MemberState::NONE), "NONE");
    }

    #[test]
    fn sanitize_repairs_members() {
        let g_id = FormId(10);
        let mut g = Group {
            members: alloc::vec![
                GroupMember::new(FormId(1), g_id).with_opacity(3.0),
                GroupMember::new(FormId(1), g_id),
                GroupMember {
                    state: MemberState::USE | MemberState::UNION | MemberState::SUM,
                    ..GroupMember::new(FormId(2), g_id)
                },
            ],
        };
        assert_eq!(g.sanitize(), 3);
        assert_eq!(g.members.len(), 2);
        assert_eq!(g.members[0].opacity, 1.0);
        assert_eq!(g.members[1].state.mode(), CombineMode::Union);
        assert!(g.members[1].state.has_single_mode());
    }

    #[test]
    fn cycles_are_detected() {
        let mut forms: HashMap<FormId, Form> = HashMap::new();
        let mut a = Form::new(FormId(1), Shape::empty(ShapeKind::Group));
        let b = Form::new(FormId(2), Shape::empty(ShapeKind::Group));
        a.as_group_mut()
            .unwrap()
            .members
            .push(GroupMember::new(FormId(2), FormId(1)));
        forms.insert(a.id, a);
        forms.insert(b.id, b);

        assert_eq!(
            check_acyclic(&forms, FormId(1), FormId(1)),
            Err(GroupError::SelfReference(FormId(1)))
        );
        assert_eq!(
            check_acyclic(&forms, FormId(2), FormId(1)),
            Err(GroupError::Cycle {
                group: FormId(2),
                member: FormId(1)
            })
        );
        assert_eq!(check_acyclic(&forms, FormId(1), FormId(3)), Ok(()));
    }
}
