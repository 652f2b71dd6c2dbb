// Copyright 2026 the Penumbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Growable float buffer for accumulating point lists.
//!
//! The number of boundary and border samples a shape produces is only known
//! after walking its curves, so outlines are accumulated into a
//! [`FloatBuffer`] that grows by doubling. Growth uses fallible reservation:
//! when the allocator refuses, the operation returns an [`AllocError`] and the
//! buffer keeps its previous contents, so the caller can abandon the current
//! rasterization pass without corrupting anything.
//!
//! Elements can be addressed relative to the current end with
//! [`get`](FloatBuffer::get) and [`set`](FloatBuffer::set), which is how
//! polyline construction looks back at the previously emitted point.

use alloc::vec::Vec;
use core::fmt;

/// Smallest capacity a buffer grows to.
const MIN_CAPACITY: usize = 16;

/// A growth request could not be satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Tag of the buffer that failed to grow.
    pub tag: &'static str,
    /// Number of elements that were requested in total.
    pub requested: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buffer `{}` failed to grow to {} elements",
            self.tag, self.requested
        )
    }
}

impl core::error::Error for AllocError {}

/// An amortized-doubling array of `f64` samples.
///
/// Points are stored as interleaved `x, y` pairs by convention; the buffer
/// itself does not care.
#[derive(Clone, Debug)]
pub struct FloatBuffer {
    data: Vec<f64>,
    tag: &'static str,
}

impl FloatBuffer {
    /// Creates a buffer with room for at least `capacity_hint` elements.
    ///
    /// `tag` names the buffer in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the initial allocation fails.
    pub fn init(capacity_hint: usize, tag: &'static str) -> Result<Self, AllocError> {
        let mut data = Vec::new();
        let capacity = capacity_hint.max(MIN_CAPACITY);
        data.try_reserve_exact(capacity).map_err(|_| AllocError {
            tag,
            requested: capacity,
        })?;
        Ok(Self { data, tag })
    }

    /// Returns the tag given at construction.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Returns the number of elements written so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// Returns the current capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Returns the elements written so far.
    #[must_use]
    pub fn buffer(&self) -> &[f64] {
        &self.data
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the buffer had to grow and could not.
    pub fn add(&mut self, value: f64) -> Result<(), AllocError> {
        self.grow_for(1)?;
        self.data.push(value);
        Ok(())
    }

    /// Appends two values, typically the `x` and `y` of a point.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the buffer had to grow and could not.
    pub fn add_pair(&mut self, a: f64, b: f64) -> Result<(), AllocError> {
        self.grow_for(2)?;
        self.data.push(a);
        self.data.push(b);
        Ok(())
    }

    /// Appends a slice of values.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the buffer had to grow and could not.
    pub fn add_n(&mut self, values: &[f64]) -> Result<(), AllocError> {
        self.grow_for(values.len())?;
        self.data.extend_from_slice(values);
        Ok(())
    }

    /// Advances the length by `n` and returns the new slots for the caller to
    /// fill in place.
    ///
    /// The slots are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the buffer had to grow and could not.
    pub fn reserve_n(&mut self, n: usize) -> Result<&mut [f64], AllocError> {
        self.grow_for(n)?;
        let start = self.data.len();
        self.data.resize(start + n, 0.0);
        Ok(&mut self.data[start..])
    }

    /// Returns the element `offset` positions back from the end.
    ///
    /// `get(1)` is the last element written.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is zero or larger than [`position`](Self::position).
    #[must_use]
    pub fn get(&self, offset: usize) -> f64 {
        self.data[self.back_index(offset)]
    }

    /// Overwrites the element `offset` positions back from the end.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is zero or larger than [`position`](Self::position).
    pub fn set(&mut self, offset: usize, value: f64) {
        let idx = self.back_index(offset);
        self.data[idx] = value;
    }

    /// Drops the last `n` elements (clamped to the current length).
    pub fn truncate_back(&mut self, n: usize) {
        let len = self.data.len().saturating_sub(n);
        self.data.truncate(len);
    }

    /// Hands the backing array to the caller and leaves the buffer empty.
    #[must_use]
    pub fn harvest(&mut self) -> Vec<f64> {
        core::mem::take(&mut self.data)
    }

    /// Clears the contents while keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    fn back_index(&self, offset: usize) -> usize {
        assert!(
            offset > 0 && offset <= self.data.len(),
            "offset {offset} out of range for buffer `{}` (len {})",
            self.tag,
            self.data.len()
        );
        self.data.len() - offset
    }

    /// Makes room for `extra` more elements, doubling the capacity or growing
    /// to the minimum that fits, whichever is larger.
    fn grow_for(&mut self, extra: usize) -> Result<(), AllocError> {
        let needed = self.data.len().checked_add(extra).ok_or(AllocError {
            tag: self.tag,
            requested: usize::MAX,
        })?;
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let target = needed
            .max(self.data.capacity().saturating_mul(2))
            .max(MIN_CAPACITY);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| AllocError {
                tag: self.tag,
                requested: target,
            })
    }
}
