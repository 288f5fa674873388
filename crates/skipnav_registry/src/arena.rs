//! Generational arena storage for registry objects.
//!
//! Objects are allocated into slots; a slot's generation counter increments
//! on every allocation and removal so handles to removed objects are
//! detected as stale. Slot storage uses persistent vectors, so cloning an
//! arena (and therefore a whole model) is cheap and shares structure.

// Slot indices are u32; the registry never holds that many objects
#![allow(clippy::cast_possible_truncation)]

use std::fmt;
use std::marker::PhantomData;

use skipnav_foundation::{Error, Handle, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Slot<T> {
    /// Even generations are free, odd generations are alive.
    generation: u32,
    value: Option<T>,
}

/// Generational storage for objects of type `T` addressed by handles `H`.
///
/// Freed slots are reused from a free list; the slot's generation is bumped
/// so the old handle stays invalid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))
)]
pub struct Arena<H, T: Clone> {
    slots: im::Vector<Slot<T>>,
    free_list: im::Vector<u32>,
    live_count: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    marker: PhantomData<H>,
}

impl<H, T: Clone> Clone for Arena<H, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            free_list: self.free_list.clone(),
            live_count: self.live_count,
            marker: PhantomData,
        }
    }
}

impl<H, T: Clone + fmt::Debug> fmt::Debug for Arena<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("live_count", &self.live_count)
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl<H, T: Clone> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            slots: im::Vector::new(),
            free_list: im::Vector::new(),
            live_count: 0,
            marker: PhantomData,
        }
    }
}

impl<H: Handle, T: Clone> Arena<H, T> {
    /// Creates a new empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value and returns its handle.
    ///
    /// Reuses slots from the free list when available.
    pub fn insert(&mut self, value: T) -> H {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop_back() {
            let slot = &mut self.slots[index as usize];
            // Was even/free, now odd/alive
            slot.generation += 1;
            slot.value = Some(value);
            H::from_parts(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push_back(Slot {
                generation: 1,
                value: Some(value),
            });
            H::from_parts(index, 1)
        }
    }

    /// Removes a value and returns it.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the handle does not refer to a live value.
    pub fn remove(&mut self, handle: H) -> Result<T> {
        self.validate(handle)?;

        let index = handle.index();
        let slot = &mut self.slots[index as usize];
        // Was odd/alive, now even/free
        slot.generation += 1;
        let value = slot
            .value
            .take()
            .ok_or_else(|| Error::stale_handle(handle))?;
        self.free_list.push_back(index);
        self.live_count -= 1;

        Ok(value)
    }

    /// Checks whether a handle refers to a live value.
    #[must_use]
    pub fn contains(&self, handle: H) -> bool {
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|slot| slot.generation == handle.generation() && slot.value.is_some())
    }

    /// Validates that a handle is live.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the slot was never allocated, has been
    /// freed, or has been reused by a newer value.
    pub fn validate(&self, handle: H) -> Result<()> {
        if self.contains(handle) {
            Ok(())
        } else {
            Err(Error::stale_handle(handle))
        }
    }

    /// Gets a value by handle.
    #[must_use]
    pub fn get(&self, handle: H) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Gets a mutable value by handle.
    #[must_use]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Gets a value by handle, failing on stale handles.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the handle is not live.
    pub fn try_get(&self, handle: H) -> Result<&T> {
        self.get(handle).ok_or_else(|| Error::stale_handle(handle))
    }

    /// Gets a mutable value by handle, failing on stale handles.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the handle is not live.
    pub fn try_get_mut(&mut self, handle: H) -> Result<&mut T> {
        self.get_mut(handle)
            .ok_or_else(|| Error::stale_handle(handle))
    }

    /// Returns the number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (H::from_parts(index as u32, slot.generation), value))
        })
    }

    /// Collects the handles of all live values matching a predicate.
    pub fn handles_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<H> {
        self.iter()
            .filter(|(_, value)| predicate(value))
            .map(|(handle, _)| handle)
            .collect()
    }
}
