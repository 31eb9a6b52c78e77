//! # Component Storage
//!
//! Storage for a single registered component type.
//!
//! The storage uses a packed column strategy:
//! - An [`IndexSet`] tracks which entities carry the type
//! - A value column runs parallel to the set's dense array
//! - Removal mirrors the set's swap-remove, so both stay aligned

use std::mem;

use super::component::{Component, ComponentType};
use super::entity::EntityId;
use super::index_set::IndexSet;
use crate::error::IndexResult;
use crate::memory::ObjectPool;

/// Packed storage for one component type.
///
/// Invariant: `values[i]` belongs to `entities.entity_at(i)` for every
/// `i < entities.len()`, and `values.len() == entities.len()`.
pub(crate) struct ComponentStorage<C: Component> {
    /// Entities carrying this type, packed.
    entities: IndexSet,
    /// Component values, parallel to `entities`.
    values: Vec<C>,
    /// Reusable instances for this type.
    pool: ObjectPool<C>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates storage around a pool, reserving room for `capacity` entities.
    pub(crate) fn new(pool: ObjectPool<C>, capacity: usize) -> Self {
        Self {
            entities: IndexSet::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            pool,
        }
    }

    /// The component type stored here.
    #[inline]
    pub(crate) const fn component_type(&self) -> ComponentType {
        self.pool.component_type()
    }

    /// Number of entities carrying this type.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub(crate) fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// The membership set, in dense order.
    #[inline]
    pub(crate) const fn entities(&self) -> &IndexSet {
        &self.entities
    }

    /// Attaches a value. **O(1)** amortized.
    pub(crate) fn insert(&mut self, entity: EntityId, value: C) -> IndexResult<()> {
        let index = self.entities.insert(entity)?;
        debug_assert_eq!(index, self.values.len(), "value column out of step");
        self.values.push(value);
        Ok(())
    }

    /// Detaches and returns a value. **O(1)**.
    pub(crate) fn remove(&mut self, entity: EntityId) -> IndexResult<C> {
        let index = self.entities.remove(entity)?;
        Ok(self.values.swap_remove(index))
    }

    #[inline]
    pub(crate) fn get(&self, entity: EntityId) -> Option<&C> {
        self.entities
            .index_of(entity)
            .and_then(|index| self.values.get(index))
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.entities
            .index_of(entity)
            .and_then(|index| self.values.get_mut(index))
    }

    /// The value at a dense index. The index must be below `len`.
    #[inline]
    pub(crate) fn value_at(&self, index: usize) -> &C {
        &self.values[index]
    }

    #[inline]
    pub(crate) fn value_at_mut(&mut self, index: usize) -> &mut C {
        &mut self.values[index]
    }

    /// Replaces an entity's value with a fresh instance from the pool's
    /// factory. Returns `false` if the entity is not a member.
    pub(crate) fn reset(&mut self, entity: EntityId) -> bool {
        let Some(index) = self.entities.index_of(entity) else {
            return false;
        };
        self.values[index] = self.pool.construct();
        true
    }

    /// Iterates over `(entity, value)` pairs in dense order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.entities.iter().zip(self.values.iter())
    }

    /// Iterates mutably over `(entity, value)` pairs in dense order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut C)> {
        self.entities.iter().zip(self.values.iter_mut())
    }

    /// Grows the entity set and value column for `additional` more entities.
    pub(crate) fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
        self.values.reserve(additional);
    }

    #[inline]
    pub(crate) const fn pool(&self) -> &ObjectPool<C> {
        &self.pool
    }

    #[inline]
    pub(crate) fn pool_mut(&mut self) -> &mut ObjectPool<C> {
        &mut self.pool
    }

    /// Estimated bytes held by live values.
    pub(crate) fn memory_used(&self) -> usize {
        self.values.iter().map(Component::size_bytes).sum()
    }

    /// Estimated bytes reserved: entity set and value column backing
    /// storage plus every constructed pool instance.
    pub(crate) fn memory_reserved(&self) -> usize {
        self.entities.capacity() * mem::size_of::<EntityId>()
            + self.values.capacity() * mem::size_of::<C>()
            + self.pool.statistics().memory_allocated
    }

    /// Empties the entity set, the value column and the pool.
    ///
    /// Backing storage is kept.
    pub(crate) fn clear(&mut self) {
        self.entities.clear();
        self.values.clear();
        self.pool.clear();
    }
}
