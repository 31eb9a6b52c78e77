//! # Entity Handles
//!
//! Entities are opaque integer handles issued by an external entity manager.
//! The store only consumes them: it never creates, recycles or invalidates a
//! handle.

use serde::Serialize;
use std::fmt;

/// Opaque identifier for an entity.
///
/// The raw value `0` is reserved as the invalid handle and is never treated
/// as a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved invalid handle.
    pub const INVALID: Self = Self(0);

    /// Wraps a raw handle issued by the entity manager.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks that this is not the reserved invalid handle.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Set of component slots attached to one entity.
///
/// Each registered component type owns a slot number assigned at
/// registration. The mask grows in 64-slot words, so there is no upper bound
/// on the number of registered types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ComponentMask {
    words: Vec<u64>,
    count: usize,
}

impl ComponentMask {
    /// Checks if the slot is set.
    #[inline]
    pub(crate) fn contains(&self, slot: usize) -> bool {
        self.words
            .get(slot / 64)
            .is_some_and(|word| word & (1u64 << (slot % 64)) != 0)
    }

    /// Sets a slot. Returns `false` if it was already set.
    pub(crate) fn insert(&mut self, slot: usize) -> bool {
        let word = slot / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let bit = 1u64 << (slot % 64);
        if self.words[word] & bit != 0 {
            return false;
        }
        self.words[word] |= bit;
        self.count += 1;
        true
    }

    /// Clears a slot. Returns `false` if it was not set.
    pub(crate) fn remove(&mut self, slot: usize) -> bool {
        let bit = 1u64 << (slot % 64);
        match self.words.get_mut(slot / 64) {
            Some(word) if *word & bit != 0 => {
                *word &= !bit;
                self.count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of set slots.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.count
    }

    /// Checks if no slot is set.
    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterates over set slots in ascending order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..64)
                .filter(move |&bit| word & (1u64 << bit) != 0)
                .map(move |bit| index * 64 + bit)
        })
    }
}
