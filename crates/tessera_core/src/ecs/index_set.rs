//! # Index Set
//!
//! Dense/sparse dual structure mapping entity handles to contiguous slots.
//!
//! - `dense` holds the members packed at the front (cache-friendly iteration)
//! - `sparse` maps each member back to its dense slot
//! - Removal swaps the last member into the vacated slot: **O(1)**, no
//!   tombstones, order not preserved

use std::collections::HashMap;

use super::entity::EntityId;
use crate::error::{IndexError, IndexResult};

/// O(1) membership set over entity handles.
///
/// The set knows nothing about component data. Callers that keep a column of
/// values parallel to the dense array mirror the swap reported by
/// [`IndexSet::remove`] to stay aligned.
///
/// # Thread Safety
///
/// This set is NOT thread-safe. The [`ComponentStore`](crate::ComponentStore)
/// guards every set it owns with its own lock.
///
/// # Example
///
/// ```rust
/// use tessera_core::{EntityId, IndexSet};
///
/// let mut set = IndexSet::new();
/// set.insert(EntityId::new(10))?;
/// set.insert(EntityId::new(20))?;
///
/// // Swap-remove: 20 moves into slot 0
/// assert_eq!(set.remove(EntityId::new(10))?, 0);
/// assert_eq!(set.entity_at(0)?, EntityId::new(20));
/// # Ok::<(), tessera_core::IndexError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct IndexSet {
    /// Members, packed. Slots at or past `len` are stale and never exposed.
    dense: Vec<EntityId>,
    /// Member -> dense slot.
    sparse: HashMap<EntityId, usize>,
    /// Logical length.
    len: usize,
}

impl IndexSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` members.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            sparse: HashMap::with_capacity(capacity),
            len: 0,
        }
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the set has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of members the dense array can hold without reallocating.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Checks membership. **O(1)**.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.sparse.contains_key(&entity)
    }

    /// Inserts a member and returns its dense slot. **O(1)** amortized.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::AlreadyExists`] if the entity is already a member.
    pub fn insert(&mut self, entity: EntityId) -> IndexResult<usize> {
        if self.sparse.contains_key(&entity) {
            return Err(IndexError::AlreadyExists(entity));
        }

        let index = self.len;
        // Reuse a stale slot left behind by removals or `clear`
        if index < self.dense.len() {
            self.dense[index] = entity;
        } else {
            self.dense.push(entity);
        }
        self.sparse.insert(entity, index);
        self.len += 1;

        Ok(index)
    }

    /// Removes a member by swapping the last member into its slot. **O(1)**.
    ///
    /// Returns the vacated dense slot: after the call, the member previously
    /// at `len - 1` (if any other) lives at that slot.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if the entity is not a member.
    pub fn remove(&mut self, entity: EntityId) -> IndexResult<usize> {
        let index = self
            .sparse
            .remove(&entity)
            .ok_or(IndexError::NotFound(entity))?;

        let last = self.len - 1;
        if index != last {
            let moved = self.dense[last];
            self.dense[index] = moved;
            self.sparse.insert(moved, index);
        }
        self.len = last;

        Ok(index)
    }

    /// Returns the dense slot of a member.
    #[inline]
    #[must_use]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        self.sparse.get(&entity).copied()
    }

    /// Returns the member at a dense slot.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `index >= len`.
    pub fn entity_at(&self, index: usize) -> IndexResult<EntityId> {
        if index >= self.len {
            return Err(IndexError::OutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(self.dense[index])
    }

    /// Returns the live portion of the dense array.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.dense[..self.len]
    }

    /// Iterates over members in dense order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.as_slice().iter().copied()
    }

    /// Visits members in dense order until the callback returns `false`.
    ///
    /// Returns `true` if every member was visited.
    pub fn iterate<F>(&self, mut callback: F) -> bool
    where
        F: FnMut(EntityId) -> bool,
    {
        self.as_slice().iter().all(|&entity| callback(entity))
    }

    /// Returns a copy of the members.
    #[must_use]
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.as_slice().to_vec()
    }

    /// Grows the backing storage for at least `additional` more members.
    ///
    /// Membership is unchanged.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self.len + additional;
        if wanted > self.dense.len() {
            self.dense.reserve(wanted - self.dense.len());
        }
        self.sparse.reserve(additional);
    }

    /// Removes every member.
    ///
    /// The dense array keeps its allocation and is overwritten by later
    /// inserts.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.len = 0;
    }
}
