// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The form registry: owning storage for every form of a session.
//!
//! Forms are owned by the [`Registry`] and referenced everywhere else by
//! [`FormId`]. Group members, edit sessions and history entries hold ids, never
//! references, so deleting a form is a single map removal followed by
//! scrubbing the id from every member list.
//!
//! Structural edits validate before they mutate: a rejected edit leaves the
//! registry exactly as it was. Every accepted mutation bumps the registry
//! generation, records a per-form revision for [`Snapshot::is_current`], and
//! marks the matching [`dirty`] channels.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::form::{Form, FormId, Shape, ShapeKind};
use crate::group::{CombineMode, GroupError, GroupMember, MemberState, check_acyclic, reaches};
use crate::shape;
use crate::snapshot::{FormSource, Snapshot};
use crate::trace::{DropReason, FormDroppedEvent, SanitizedEvent, Tracer};

/// A registry operation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A form with this id is already registered.
    DuplicateId(FormId),
    /// No form with this id is registered.
    UnknownForm(FormId),
    /// A group membership edit was refused.
    Group(GroupError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "form {id} is already registered"),
            Self::UnknownForm(id) => write!(f, "no form {id}"),
            Self::Group(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Group(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GroupError> for RegistryError {
    fn from(e: GroupError) -> Self {
        Self::Group(e)
    }
}

/// Direction of a z-order move within a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// One step later in combination order, on top of the previous member.
    Up,
    /// One step earlier in combination order.
    Down,
}

/// The set of changes since the last [`Registry::drain_changes`] call.
///
/// Cache owners use these lists to evict rasters and to accumulate damage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormChanges {
    /// Forms whose raster may have changed, including every group that
    /// contains a changed form.
    pub shapes: Vec<FormId>,
    /// Groups whose member list changed.
    pub topology: Vec<FormId>,
    /// Forms registered since the last drain.
    pub added: Vec<FormId>,
    /// Forms removed since the last drain.
    pub removed: Vec<FormId>,
}

impl FormChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.topology.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
            && self.topology.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }

    /// Whether `id` appears in any list.
    #[must_use]
    pub fn touches(&self, id: FormId) -> bool {
        self.shapes.contains(&id)
            || self.topology.contains(&id)
            || self.added.contains(&id)
            || self.removed.contains(&id)
    }
}

/// Owning storage for all forms of a session.
#[derive(Debug)]
pub struct Registry {
    forms: HashMap<FormId, Form>,
    /// Registration order, the "all forms" list.
    order: Vec<FormId>,
    revisions: HashMap<FormId, u64>,
    next_id: u32,
    generation: u64,
    dirty: DirtyTracker<u32>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            forms: HashMap::new(),
            order: Vec::new(),
            revisions: HashMap::new(),
            next_id: 1,
            generation: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    // -- Queries --

    /// Number of registered forms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Returns `true` if no forms are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Counter bumped by every accepted mutation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation of the last mutation of `id`, or `None` if it is not
    /// registered.
    #[must_use]
    pub fn revision(&self, id: FormId) -> Option<u64> {
        self.revisions.get(&id).copied()
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: FormId) -> bool {
        self.forms.contains_key(&id)
    }

    /// Looks up a form. Absence is an ordinary outcome.
    #[must_use]
    pub fn get(&self, id: FormId) -> Option<&Form> {
        self.forms.get(&id)
    }

    /// Registered ids in registration order.
    #[must_use]
    pub fn ids(&self) -> &[FormId] {
        &self.order
    }

    /// Registered forms in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Form> + '_ {
        self.order.iter().filter_map(|id| self.forms.get(id))
    }

    /// Groups whose member list contains `id`, in registration order.
    #[must_use]
    pub fn groups_containing(&self, id: FormId) -> Vec<FormId> {
        self.iter()
            .filter(|f| f.as_group().is_some_and(|g| g.contains(id)))
            .map(|f| f.id)
            .collect()
    }

    /// Copies `root` and the forms reachable from it for rendering.
    #[must_use]
    pub fn snapshot(&self, root: FormId) -> Snapshot {
        Snapshot::capture(self, root)
    }

    // -- Lifecycle --

    /// Allocates an unregistered form of `kind` with a fresh id, an empty
    /// payload and a default name.
    ///
    /// The id is reserved even if the form is never inserted.
    pub fn create(&mut self, kind: ShapeKind) -> Form {
        let id = self.fresh_id();
        let mut form = Form::new(id, Shape::empty(kind));
        shape::set_form_name(&mut form, self.forms.values());
        form
    }

    /// Registers a form.
    ///
    /// Group member entries are re-parented to the form. Members may refer to
    /// forms that are not registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the id is taken and
    /// [`RegistryError::Group`] if a member would close a cycle. The registry is
    /// unchanged on error.
    pub fn insert(&mut self, mut form: Form) -> Result<FormId, RegistryError> {
        let id = form.id;
        if self.forms.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        if let Some(group) = form.as_group_mut() {
            for m in &mut group.members {
                check_acyclic(&*self, id, m.form)?;
                m.parent = id;
            }
        }
        if let Some(group) = form.as_group() {
            for m in &group.members {
                let _ = self.dirty.add_dependency(id.0, m.form.0, dirty::SHAPE);
            }
        }
        // Groups that already listed this id as a dangling member.
        for g in self.groups_containing(id) {
            let _ = self.dirty.add_dependency(g.0, id.0, dirty::SHAPE);
        }
        if id.0 >= self.next_id {
            self.next_id = id.0.saturating_add(1);
        }
        self.forms.insert(id, form);
        self.order.push(id);
        self.touch(id);
        self.dirty.mark(id.0, dirty::LIFECYCLE);
        Ok(id)
    }

    /// Registers decoded forms, sanitizing each one.
    ///
    /// Forms that cannot be registered are reported as dropped and skipped.
    /// Returns the number of forms registered.
    pub fn load(&mut self, forms: impl IntoIterator<Item = Form>, tracer: &mut Tracer<'_>) -> usize {
        let mut loaded = 0;
        for mut form in forms {
            let fields = shape::sanitize(&mut form);
            if fields > 0 {
                tracer.sanitized(&SanitizedEvent {
                    id: form.id,
                    kind: form.kind(),
                    fields,
                });
            }
            let (id, version) = (form.id, form.version);
            match self.insert(form) {
                Ok(_) => loaded += 1,
                Err(e) => tracer.form_dropped(&FormDroppedEvent {
                    id: Some(id),
                    version: Some(version),
                    reason: match e {
                        RegistryError::DuplicateId(_) => DropReason::DuplicateId,
                        _ => DropReason::Invalid,
                    },
                }),
            }
        }
        loaded
    }

    /// Mutates a form in place.
    ///
    /// The closure may change anything but the id. When it changes a group's
    /// member list, the new list is validated; on rejection the form is
    /// restored and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownForm`] for an unknown id and
    /// [`RegistryError::Group`] when the edited member list would be cyclic.
    pub fn update<R>(&mut self, id: FormId, f: impl FnOnce(&mut Form) -> R) -> Result<R, RegistryError> {
        let mut form = self
            .forms
            .remove(&id)
            .ok_or(RegistryError::UnknownForm(id))?;
        let before: Option<Vec<FormId>> = member_ids(&form);
        let backup = form.clone();
        let result = f(&mut form);
        form.id = id;
        let after = member_ids(&form);

        if before != after {
            let added: Vec<FormId> = after
                .iter()
                .flatten()
                .filter(|m| !before.iter().flatten().any(|b| b == *m))
                .copied()
                .collect();
            if let Some(e) = added.iter().find_map(|&m| check_acyclic(&*self, id, m).err()) {
                self.forms.insert(id, backup);
                return Err(e.into());
            }
            for m in before.iter().flatten() {
                self.dirty.remove_dependency(id.0, m.0, dirty::SHAPE);
            }
            for m in after.iter().flatten() {
                let _ = self.dirty.add_dependency(id.0, m.0, dirty::SHAPE);
            }
            self.dirty.mark(id.0, dirty::TOPOLOGY);
        }
        if let Some(group) = form.as_group_mut() {
            for m in &mut group.members {
                m.parent = id;
            }
        }
        self.forms.insert(id, form);
        self.touch(id);
        Ok(result)
    }

    /// Copies a form under a fresh id and registers the copy.
    ///
    /// A copied group refers to the same members as the original.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownForm`] for an unknown id.
    pub fn duplicate(&mut self, id: FormId) -> Result<FormId, RegistryError> {
        let mut copy = self.get(id).ok_or(RegistryError::UnknownForm(id))?.clone();
        copy.id = self.fresh_id();
        shape::set_form_name(&mut copy, self.forms.values());
        self.insert(copy)
    }

    /// Copies every listed form and rewires copied groups to the copies.
    ///
    /// A member id that is itself in `ids` is replaced by its copy's id;
    /// other members keep pointing at the original forms. Returns the new ids
    /// in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownForm`] if any id is unknown; nothing is
    /// copied in that case.
    pub fn dup_forms_deep(&mut self, ids: &[FormId]) -> Result<Vec<FormId>, RegistryError> {
        if let Some(&missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(RegistryError::UnknownForm(missing));
        }
        let mut map: Vec<(FormId, FormId)> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !map.iter().any(|&(old, _)| old == id) {
                map.push((id, self.fresh_id()));
            }
        }
        let lookup = |id: FormId| {
            map.iter()
                .find(|&&(old, _)| old == id)
                .map_or(id, |&(_, new)| new)
        };
        let mut copies = Vec::with_capacity(map.len());
        for &(old, new) in &map {
            let Some(original) = self.get(old) else {
                continue;
            };
            let mut copy = original.clone();
            copy.id = new;
            if let Some(group) = copy.as_group_mut() {
                for m in &mut group.members {
                    m.form = lookup(m.form);
                    m.parent = new;
                }
            }
            copies.push(copy);
        }
        // Copies of acyclic groups rewired by a bijection stay acyclic, and
        // groups must go in before the forms they reference are checked, so
        // register without the per-member check.
        for copy in copies {
            self.insert_unchecked(copy);
        }
        Ok(ids.iter().map(|&id| lookup(id)).collect())
    }

    /// Removes a form and scrubs it from every group's member list.
    pub fn remove(&mut self, id: FormId) -> Option<Form> {
        let form = self.forms.remove(&id)?;
        for g in self.groups_containing(id) {
            if let Some(group) = self.forms.get_mut(&g).and_then(|f| f.as_group_mut()) {
                group.members.retain(|m| m.form != id);
            }
            self.dirty.mark(g.0, dirty::TOPOLOGY);
            self.dirty.mark_with(g.0, dirty::SHAPE, &EagerPolicy);
            self.touch(g);
        }
        self.order.retain(|&o| o != id);
        self.revisions.remove(&id);
        self.dirty.remove_key(id.0);
        self.generation += 1;
        self.dirty.mark(id.0, dirty::LIFECYCLE);
        Some(form)
    }

    /// Removes every form not reachable from `roots`; returns the removed ids
    /// in registration order.
    pub fn cleanup_unused(&mut self, roots: &[FormId]) -> Vec<FormId> {
        let mut keep: HashSet<FormId> = HashSet::new();
        let mut stack: Vec<FormId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            if !keep.insert(id) {
                continue;
            }
            if let Some(group) = self.get(id).and_then(Form::as_group) {
                stack.extend(group.members.iter().map(|m| m.form));
            }
        }
        let unused: Vec<FormId> = self
            .order
            .iter()
            .copied()
            .filter(|id| !keep.contains(id))
            .collect();
        for &id in &unused {
            self.remove(id);
        }
        unused
    }

    // -- Group membership --

    /// Appends `member` to `group` as a participating union member.
    ///
    /// # Errors
    ///
    /// Fails without mutating anything when `group` is unknown or not a
    /// group, `member` is unknown or already present, or the addition would
    /// make `group` contain itself.
    pub fn add_member(&mut self, group: FormId, member: FormId) -> Result<(), RegistryError> {
        self.group_ref(group)?;
        if !self.contains(member) {
            return Err(GroupError::UnknownForm(member).into());
        }
        if self.group_ref(group)?.contains(member) {
            return Err(GroupError::AlreadyMember { group, member }.into());
        }
        check_acyclic(&*self, group, member)?;
        self.group_mut(group)?
            .members
            .push(GroupMember::new(member, group));
        let _ = self.dirty.add_dependency(group.0, member.0, dirty::SHAPE);
        self.structure_changed(group);
        Ok(())
    }

    /// Detaches `member` from `group`; the member form stays registered.
    ///
    /// # Errors
    ///
    /// Fails when `group` is not a group or does not contain `member`.
    pub fn remove_member(&mut self, group: FormId, member: FormId) -> Result<GroupMember, RegistryError> {
        let g = self.group_mut(group)?;
        let idx = g
            .position(member)
            .ok_or(GroupError::NotAMember { group, member })?;
        let entry = g.members.remove(idx);
        self.dirty.remove_dependency(group.0, member.0, dirty::SHAPE);
        self.structure_changed(group);
        Ok(entry)
    }

    /// Moves `member` one step within `group`'s combination order. Returns
    /// `false` when it is already at that end.
    ///
    /// # Errors
    ///
    /// Fails when `group` is not a group or does not contain `member`.
    pub fn move_member(
        &mut self,
        group: FormId,
        member: FormId,
        direction: MoveDirection,
    ) -> Result<bool, RegistryError> {
        let g = self.group_mut(group)?;
        let idx = g
            .position(member)
            .ok_or(GroupError::NotAMember { group, member })?;
        let target = match direction {
            MoveDirection::Up if idx + 1 < g.members.len() => idx + 1,
            MoveDirection::Down if idx > 0 => idx - 1,
            _ => return Ok(false),
        };
        g.members.swap(idx, target);
        self.structure_changed(group);
        Ok(true)
    }

    /// Adds `delta` to a member's opacity, clamped to `[0, 1]`; returns the
    /// new opacity.
    ///
    /// # Errors
    ///
    /// Fails when `group` is not a group or does not contain `member`.
    pub fn change_opacity(&mut self, group: FormId, member: FormId, delta: f32) -> Result<f32, RegistryError> {
        let entry = self
            .group_mut(group)?
            .member_mut(member)
            .ok_or(GroupError::NotAMember { group, member })?;
        entry.opacity = (entry.opacity + delta).clamp(0.0, 1.0);
        let opacity = entry.opacity;
        self.shape_changed(group);
        Ok(opacity)
    }

    /// Replaces a member's flags.
    ///
    /// # Errors
    ///
    /// Fails when `group` is not a group or does not contain `member`.
    pub fn set_member_state(
        &mut self,
        group: FormId,
        member: FormId,
        state: MemberState,
    ) -> Result<(), RegistryError> {
        let entry = self
            .group_mut(group)?
            .member_mut(member)
            .ok_or(GroupError::NotAMember { group, member })?;
        entry.state = state;
        self.shape_changed(group);
        Ok(())
    }

    /// Sets a member's combination mode.
    ///
    /// # Errors
    ///
    /// Fails when `group` is not a group or does not contain `member`.
    pub fn set_member_mode(&mut self, group: FormId, member: FormId, mode: CombineMode) -> Result<(), RegistryError> {
        let state = self
            .group_ref(group)?
            .member(member)
            .ok_or(GroupError::NotAMember { group, member })?
            .state;
        self.set_member_state(group, member, state.with_mode(mode))
    }

    /// Replaces the `subgroup` entry of `parent` with the subgroup's members.
    ///
    /// Spliced members keep their flags, take `parent` as their parent and
    /// have their opacity multiplied by the subgroup entry's opacity. The
    /// first spliced member inherits the subgroup entry's combination mode,
    /// since it seeded the subgroup's result. Members already present in
    /// `parent` are not duplicated. The subgroup form stays registered.
    ///
    /// # Errors
    ///
    /// Fails when either form is not a group or `parent` does not contain
    /// `subgroup`.
    pub fn ungroup(&mut self, parent: FormId, subgroup: FormId) -> Result<(), RegistryError> {
        let spliced = self.group_ref(subgroup)?.members.clone();
        let p = self.group_ref(parent)?;
        let idx = p.position(subgroup).ok_or(GroupError::NotAMember {
            group: parent,
            member: subgroup,
        })?;
        let entry = p.members[idx];
        let mut insert: Vec<GroupMember> = Vec::with_capacity(spliced.len());
        for m in spliced {
            if p.contains(m.form) || insert.iter().any(|e| e.form == m.form) {
                continue;
            }
            let mut m = m.with_opacity(m.opacity * entry.opacity);
            m.parent = parent;
            if insert.is_empty() {
                m.state = m.state.with_mode(entry.state.mode());
            }
            insert.push(m);
        }
        let added: Vec<FormId> = insert.iter().map(|m| m.form).collect();
        let g = self.group_mut(parent)?;
        g.members.splice(idx..=idx, insert);
        self.dirty.remove_dependency(parent.0, subgroup.0, dirty::SHAPE);
        for m in added {
            let _ = self.dirty.add_dependency(parent.0, m.0, dirty::SHAPE);
        }
        self.structure_changed(parent);
        Ok(())
    }

    // -- Change tracking --

    /// Drains all dirty channels into a [`FormChanges`].
    pub fn drain_changes(&mut self) -> FormChanges {
        let mut changes = FormChanges::default();
        self.drain_changes_into(&mut changes);
        changes
    }

    /// Like [`drain_changes`](Self::drain_changes), but reuses a
    /// caller-provided buffer.
    pub fn drain_changes_into(&mut self, changes: &mut FormChanges) {
        changes.clear();

        // SHAPE propagates to containing groups.
        changes.shapes = self
            .dirty
            .drain(dirty::SHAPE)
            .affected()
            .deterministic()
            .run()
            .map(FormId)
            .collect();

        changes.topology = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .map(FormId)
            .collect();

        let lifecycle: Vec<u32> = self
            .dirty
            .drain(dirty::LIFECYCLE)
            .deterministic()
            .run()
            .collect();
        for id in lifecycle.into_iter().map(FormId) {
            if self.contains(id) {
                changes.added.push(id);
            } else {
                changes.removed.push(id);
            }
        }
    }

    // -- Internals --

    fn fresh_id(&mut self) -> FormId {
        while self.forms.contains_key(&FormId(self.next_id)) {
            self.next_id = self.next_id.wrapping_add(1).max(1);
        }
        let id = FormId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn insert_unchecked(&mut self, form: Form) {
        let id = form.id;
        if let Some(group) = form.as_group() {
            for m in &group.members {
                let _ = self.dirty.add_dependency(id.0, m.form.0, dirty::SHAPE);
            }
        }
        self.forms.insert(id, form);
        self.order.push(id);
        self.touch(id);
        self.dirty.mark(id.0, dirty::LIFECYCLE);
    }

    fn group_ref(&self, id: FormId) -> Result<&crate::group::Group, RegistryError> {
        self.get(id)
            .ok_or(RegistryError::UnknownForm(id))?
            .as_group()
            .ok_or(GroupError::NotAGroup(id).into())
    }

    fn group_mut(&mut self, id: FormId) -> Result<&mut crate::group::Group, RegistryError> {
        self.forms
            .get_mut(&id)
            .ok_or(RegistryError::UnknownForm(id))?
            .as_group_mut()
            .ok_or(GroupError::NotAGroup(id).into())
    }

    /// Records a mutation of `id` and marks it (and its containers) dirty.
    fn touch(&mut self, id: FormId) {
        self.generation += 1;
        self.revisions.insert(id, self.generation);
        self.dirty.mark_with(id.0, dirty::SHAPE, &EagerPolicy);
    }

    fn shape_changed(&mut self, group: FormId) {
        self.touch(group);
    }

    fn structure_changed(&mut self, group: FormId) {
        self.dirty.mark(group.0, dirty::TOPOLOGY);
        self.touch(group);
    }
}

impl FormSource for Registry {
    fn form(&self, id: FormId) -> Option<&Form> {
        self.get(id)
    }
}

fn member_ids(form: &Form) -> Option<Vec<FormId>> {
    form.as_group()
        .map(|g| g.members.iter().map(|m| m.form).collect())
}

/// Whether `group` (transitively) contains `member` in `registry`.
#[must_use]
pub fn contains_transitively(registry: &Registry, group: FormId, member: FormId) -> bool {
    group != member && reaches(registry, group, member)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Point;

    use super::*;
    use crate::shape::Circle;

    fn circle(reg: &mut Registry, x: f64) -> FormId {
        let mut form = reg.create(ShapeKind::Circle);
        form.shape = Shape::Circle(Circle::new(Point::new(x, 50.0), 20.0, 5.0));
        reg.insert(form).unwrap()
    }

    fn group(reg: &mut Registry, members: &[FormId]) -> FormId {
        let form = reg.create(ShapeKind::Group);
        let g = reg.insert(form).unwrap();
        for &m in members {
            reg.add_member(g, m).unwrap();
        }
        g
    }

    fn members(reg: &Registry, g: FormId) -> Vec<FormId> {
        reg.get(g)
            .and_then(Form::as_group)
            .map(|g| g.members.iter().map(|m| m.form).collect())
            .unwrap_or_default()
    }

    #[test]
    fn create_assigns_fresh_ids_and_names() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 10.0);
        assert_ne!(a, b);
        assert_eq!(reg.get(a).unwrap().name, "circle #1");
        assert_eq!(reg.get(b).unwrap().name, "circle #2");
        assert!(reg.get(FormId(999)).is_none());
        assert_eq!(reg.ids(), &[a, b]);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let dup = Form::new(a, Shape::empty(ShapeKind::Ellipse));
        assert_eq!(reg.insert(dup), Err(RegistryError::DuplicateId(a)));
        assert_eq!(reg.get(a).unwrap().kind(), ShapeKind::Circle);
    }

    #[test]
    fn insert_after_explicit_id_skips_it() {
        let mut reg = Registry::new();
        reg.insert(Form::new(FormId(10), Shape::empty(ShapeKind::Circle)))
            .unwrap();
        assert_eq!(reg.create(ShapeKind::Circle).id, FormId(11));
    }

    #[test]
    fn rejected_add_leaves_registry_unchanged() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let inner = group(&mut reg, &[a]);
        let outer = group(&mut reg, &[inner]);
        let generation = reg.generation();

        assert_eq!(
            reg.add_member(outer, outer),
            Err(RegistryError::Group(GroupError::SelfReference(outer)))
        );
        assert_eq!(
            reg.add_member(inner, outer),
            Err(RegistryError::Group(GroupError::Cycle {
                group: inner,
                member: outer
            }))
        );
        assert_eq!(
            reg.add_member(inner, a),
            Err(RegistryError::Group(GroupError::AlreadyMember {
                group: inner,
                member: a
            }))
        );
        assert_eq!(
            reg.add_member(a, inner),
            Err(RegistryError::Group(GroupError::NotAGroup(a)))
        );
        assert_eq!(reg.generation(), generation);
        assert_eq!(members(&reg, inner), vec![a]);
        assert!(contains_transitively(&reg, outer, a));
    }

    #[test]
    fn update_rejects_cyclic_member_lists() {
        let mut reg = Registry::new();
        let inner = group(&mut reg, &[]);
        let outer = group(&mut reg, &[inner]);
        let err = reg.update(inner, |f| {
            f.as_group_mut()
                .unwrap()
                .members
                .push(GroupMember::new(outer, FormId(0)));
        });
        assert!(matches!(err, Err(RegistryError::Group(GroupError::Cycle { .. }))));
        assert!(members(&reg, inner).is_empty());
    }

    #[test]
    fn update_fixes_parent_and_keeps_id() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let g = group(&mut reg, &[]);
        reg.update(g, |f| {
            f.id = FormId(77);
            f.as_group_mut()
                .unwrap()
                .members
                .push(GroupMember::new(a, FormId(0)));
        })
        .unwrap();
        let form = reg.get(g).unwrap();
        assert_eq!(form.id, g);
        assert_eq!(form.as_group().unwrap().members[0].parent, g);
    }

    #[test]
    fn duplicate_shares_members() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let g = group(&mut reg, &[a]);
        let copy = reg.duplicate(g).unwrap();
        assert_ne!(copy, g);
        assert_eq!(members(&reg, copy), vec![a]);
        assert_eq!(reg.get(copy).unwrap().as_group().unwrap().members[0].parent, copy);
        assert_eq!(reg.duplicate(FormId(404)), Err(RegistryError::UnknownForm(FormId(404))));
    }

    #[test]
    fn deep_duplication_rewires_listed_members() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let shared = circle(&mut reg, 40.0);
        let g = group(&mut reg, &[a, shared]);
        let copies = reg.dup_forms_deep(&[g, a]).unwrap();
        assert_eq!(copies.len(), 2);
        let (g2, a2) = (copies[0], copies[1]);
        assert_eq!(members(&reg, g2), vec![a2, shared]);
        assert_eq!(members(&reg, g), vec![a, shared]);
        assert_eq!(reg.get(a2).unwrap().shape, reg.get(a).unwrap().shape);

        let before = reg.len();
        assert!(reg.dup_forms_deep(&[a, FormId(404)]).is_err());
        assert_eq!(reg.len(), before);
    }

    #[test]
    fn remove_scrubs_memberships() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let g = group(&mut reg, &[a, b]);
        let removed = reg.remove(a).unwrap();
        assert_eq!(removed.id, a);
        assert_eq!(members(&reg, g), vec![b]);
        assert!(reg.revision(a).is_none());
        assert!(reg.remove(a).is_none());
    }

    #[test]
    fn move_and_opacity_steps() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let g = group(&mut reg, &[a, b]);
        assert_eq!(reg.move_member(g, a, MoveDirection::Up), Ok(true));
        assert_eq!(members(&reg, g), vec![b, a]);
        assert_eq!(reg.move_member(g, a, MoveDirection::Up), Ok(false));
        assert_eq!(reg.move_member(g, a, MoveDirection::Down), Ok(true));
        assert_eq!(members(&reg, g), vec![a, b]);

        assert_eq!(reg.change_opacity(g, a, -0.25), Ok(0.75));
        assert_eq!(reg.change_opacity(g, a, 5.0), Ok(1.0));
        assert_eq!(reg.change_opacity(g, a, -5.0), Ok(0.0));
        assert_eq!(
            reg.change_opacity(g, g, 0.1),
            Err(RegistryError::Group(GroupError::NotAMember { group: g, member: g }))
        );
    }

    #[test]
    fn ungroup_splices_members() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let c = circle(&mut reg, 80.0);
        let sub = group(&mut reg, &[a, b]);
        let parent = group(&mut reg, &[c, sub, b]);
        reg.change_opacity(parent, sub, -0.5).unwrap();
        reg.set_member_mode(parent, sub, CombineMode::Difference)
            .unwrap();
        reg.ungroup(parent, sub).unwrap();

        assert_eq!(members(&reg, parent), vec![c, a, b]);
        let g = reg.get(parent).unwrap().as_group().unwrap();
        assert_eq!(g.members[1].opacity, 0.5);
        assert_eq!(g.members[1].parent, parent);
        assert_eq!(g.members[1].state.mode(), CombineMode::Difference);
        assert!(reg.contains(sub));
    }

    #[test]
    fn ungroup_mode_goes_to_first_spliced_member() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let c = circle(&mut reg, 80.0);
        let sub = group(&mut reg, &[a, b]);
        let parent = group(&mut reg, &[c, a, sub]);
        reg.set_member_mode(parent, sub, CombineMode::Intersection)
            .unwrap();
        reg.ungroup(parent, sub).unwrap();

        assert_eq!(members(&reg, parent), vec![c, a, b]);
        let g = reg.get(parent).unwrap().as_group().unwrap();
        assert_eq!(g.members[1].state.mode(), CombineMode::Union);
        assert_eq!(g.members[2].state.mode(), CombineMode::Intersection);
    }

    #[test]
    fn cleanup_keeps_reachable_forms() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let orphan = circle(&mut reg, 80.0);
        let g = group(&mut reg, &[a]);
        let removed = reg.cleanup_unused(&[g, b]);
        assert_eq!(removed, vec![orphan]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn changes_propagate_to_containing_groups() {
        let mut reg = Registry::new();
        let a = circle(&mut reg, 0.0);
        let b = circle(&mut reg, 40.0);
        let inner = group(&mut reg, &[a]);
        let outer = group(&mut reg, &[inner]);
        let first = reg.drain_changes();
        assert_eq!(first.added.len(), 4);
        assert!(first.topology.contains(&inner));

        reg.update(a, |f| f.shape.translate(kurbo::Vec2::new(1.0, 0.0)))
            .unwrap();
        let changes = reg.drain_changes();
        assert!(changes.shapes.contains(&a));
        assert!(changes.shapes.contains(&inner));
        assert!(changes.shapes.contains(&outer));
        assert!(!changes.shapes.contains(&b));
        assert!(changes.added.is_empty());
        assert!(changes.topology.is_empty());

        reg.remove(b);
        let changes = reg.drain_changes();
        assert_eq!(changes.removed, vec![b]);
        assert!(reg.drain_changes().is_empty());
    }

    #[test]
    fn load_drops_duplicates_and_sanitizes() {
        let mut reg = Registry::new();
        let mut bad = Form::new(FormId(3), Shape::Circle(Circle::new(Point::ZERO, -4.0, 1.0)));
        bad.source = Some(Point::new(f64::NAN, 0.0));
        let twin = Form::new(FormId(3), Shape::empty(ShapeKind::Path));
        let loaded = reg.load([bad, twin], &mut Tracer::none());
        assert_eq!(loaded, 1);
        let form = reg.get(FormId(3)).unwrap();
        assert_eq!(form.kind(), ShapeKind::Circle);
        assert!(form.source.is_none());
    }
}
