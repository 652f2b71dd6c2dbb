// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only views of form sets, and immutable snapshots for rendering.
//!
//! Editing mutates a [`Registry`] through `&mut` on the interaction thread.
//! Rasterization runs elsewhere and must never observe a half-edited shape,
//! so it reads a [`Snapshot`]: a copy of every form reachable from one root,
//! taken under shared access and then owned independently of the registry.
//!
//! Each snapshot records the revision of every form it copied. When a render
//! finishes, [`Snapshot::is_current`] tells the consumer whether any of those
//! forms changed in the meantime, so an overtaken result can be discarded
//! instead of flickering onto the screen.
//!
//! [`Registry`]: crate::registry::Registry

use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::form::{Form, FormId};
use crate::registry::Registry;

/// Anything forms can be looked up in.
///
/// Group rendering, hashing and cycle checks are written against this trait so
/// they run equally on the live registry and on snapshots.
pub trait FormSource {
    /// The form with this id, if present.
    fn form(&self, id: FormId) -> Option<&Form>;
}

impl FormSource for HashMap<FormId, Form> {
    fn form(&self, id: FormId) -> Option<&Form> {
        self.get(&id)
    }
}

impl<T: FormSource + ?Sized> FormSource for &T {
    fn form(&self, id: FormId) -> Option<&Form> {
        (**self).form(id)
    }
}

#[derive(Debug)]
struct Inner {
    root: FormId,
    generation: u64,
    forms: HashMap<FormId, Form>,
    /// Every id visited while copying, with its revision (`None` if it was
    /// missing at the time).
    revisions: Vec<(FormId, Option<u64>)>,
}

/// An immutable copy of the forms reachable from a root.
///
/// Cloning is cheap (one reference count increment), and snapshots can be
/// sent to other threads.
#[derive(Clone, Debug)]
pub struct Snapshot {
    inner: Arc<Inner>,
}

impl Snapshot {
    /// Copies `root` and everything reachable from it through group
    /// membership.
    pub(crate) fn capture(registry: &Registry, root: FormId) -> Self {
        let mut forms = HashMap::new();
        let mut revisions = Vec::new();
        let mut stack = alloc::vec![root];
        while let Some(id) = stack.pop() {
            if revisions.iter().any(|&(seen, _)| seen == id) {
                continue;
            }
            revisions.push((id, registry.revision(id)));
            let Some(form) = registry.get(id) else {
                continue;
            };
            if let Some(group) = form.as_group() {
                stack.extend(group.members.iter().rev().map(|m| m.form));
            }
            forms.insert(id, form.clone());
        }
        Self {
            inner: Arc::new(Inner {
                root,
                generation: registry.generation(),
                forms,
                revisions,
            }),
        }
    }

    /// The form this snapshot was taken for.
    #[must_use]
    pub fn root(&self) -> FormId {
        self.inner.root
    }

    /// Registry generation at capture time.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Number of forms copied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.forms.len()
    }

    /// Returns `true` if the root was missing at capture time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.forms.is_empty()
    }

    /// Ids of the copied forms, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = FormId> + '_ {
        self.inner.forms.keys().copied()
    }

    /// Whether none of the copied forms (nor any id that was missing) has
    /// changed in `registry` since capture.
    #[must_use]
    pub fn is_current(&self, registry: &Registry) -> bool {
        if registry.generation() == self.inner.generation {
            return true;
        }
        self.inner
            .revisions
            .iter()
            .all(|&(id, rev)| registry.revision(id) == rev)
    }
}

impl FormSource for Snapshot {
    fn form(&self, id: FormId) -> Option<&Form> {
        self.inner.forms.get(&id)
    }
}
