//! # Component Store
//!
//! The aggregator owning one [`ComponentStorage`] (entity set, value column
//! and object pool) per registered component type, plus a per-entity
//! membership table.
//!
//! ## Locking
//!
//! One `RwLock` guards every registered type together:
//! - Reads (get, has, counts, queries, statistics) take the shared lock
//!   recursively, so a read issued while another read guard is alive on the
//!   same thread never waits behind a queued writer
//! - Mutations (register, add, remove, batches, clear, pool operations) take
//!   the exclusive lock
//!
//! The entity sets and pools inside are not synchronized on their own.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};

use super::component::{Component, ComponentType};
use super::entity::{ComponentMask, EntityId};
use super::stats::{Gauge, StorageStatistics, TypeStatistics};
use super::storage::ComponentStorage;
use crate::config::StoreConfig;
use crate::error::{IndexError, PoolError, StoreError, StoreResult};
use crate::memory::{ObjectPool, PoolHandle, PoolStatistics};

/// Everything behind the store lock.
///
/// Invariant: `memberships[e]` has slot `s` set iff `storages[s]` contains
/// `e` (and therefore holds its value).
struct Registry<C: Component> {
    /// Component type -> index into `storages`.
    slots: HashMap<ComponentType, usize>,
    /// One storage per registered type, in registration order.
    storages: Vec<ComponentStorage<C>>,
    /// Entity -> slots of the types it carries.
    memberships: HashMap<EntityId, ComponentMask>,
}

impl<C: Component> Registry<C> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            storages: Vec::new(),
            memberships: HashMap::new(),
        }
    }

    fn slot(&self, component_type: ComponentType) -> StoreResult<usize> {
        self.slots
            .get(&component_type)
            .copied()
            .ok_or(StoreError::TypeNotRegistered(component_type))
    }

    fn storage(&self, component_type: ComponentType) -> StoreResult<&ComponentStorage<C>> {
        let slot = self.slot(component_type)?;
        Ok(&self.storages[slot])
    }

    fn storage_mut(&mut self, component_type: ComponentType) -> StoreResult<&mut ComponentStorage<C>> {
        let slot = self.slot(component_type)?;
        Ok(&mut self.storages[slot])
    }

    /// The error a failed lookup of `(entity, component_type)` reports.
    fn lookup_error(&self, entity: EntityId, component_type: ComponentType) -> StoreError {
        if !entity.is_valid() {
            StoreError::InvalidEntity
        } else if !self.slots.contains_key(&component_type) {
            StoreError::TypeNotRegistered(component_type)
        } else {
            StoreError::ComponentNotFound {
                entity,
                component_type,
            }
        }
    }

    fn find(&self, entity: EntityId, component_type: ComponentType) -> Option<&C> {
        let slot = self.slots.get(&component_type)?;
        self.storages[*slot].get(entity)
    }

    /// Storage slot and dense index of `(entity, component_type)`.
    fn locate(&self, entity: EntityId, component_type: ComponentType) -> Option<(usize, usize)> {
        let slot = *self.slots.get(&component_type)?;
        let index = self.storages[slot].entities().index_of(entity)?;
        Some((slot, index))
    }

    /// Checks that `component` may be added to `entity` and returns the
    /// slot of its type. Mutates nothing.
    fn validate_add(&self, entity: EntityId, component_type: ComponentType) -> StoreResult<usize> {
        if !entity.is_valid() {
            return Err(StoreError::InvalidEntity);
        }
        let slot = self.slot(component_type)?;
        if self.storages[slot].contains(entity) {
            return Err(StoreError::DuplicateComponent {
                entity,
                component_type,
            });
        }
        Ok(slot)
    }

    /// Writes a validated component into the storage and membership table.
    fn attach(&mut self, entity: EntityId, slot: usize, component: C) -> StoreResult<()> {
        self.storages[slot].insert(entity, component)?;
        let mask = self.memberships.entry(entity).or_default();
        debug_assert!(!mask.contains(slot), "membership table out of step");
        mask.insert(slot);
        Ok(())
    }

    /// Removes a component from the storage and membership table.
    fn detach(&mut self, entity: EntityId, slot: usize) -> StoreResult<C> {
        let storage = &mut self.storages[slot];
        let component_type = storage.component_type();
        let component = storage.remove(entity).map_err(|err| match err {
            IndexError::NotFound(_) => StoreError::ComponentNotFound {
                entity,
                component_type,
            },
            other => other.into(),
        })?;

        if let Some(mask) = self.memberships.get_mut(&entity) {
            mask.remove(slot);
            if mask.is_empty() {
                self.memberships.remove(&entity);
            }
        }
        Ok(component)
    }
}

/// Thread-safe storage of components for every registered type.
///
/// Created once per world. Component types are registered before use; each
/// registration allocates the type's entity set, value column and object
/// pool.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, ComponentStore, ComponentType, EntityId};
///
/// const TRANSFORM: ComponentType = ComponentType::new("Transform");
/// const SPRITE: ComponentType = ComponentType::new("Sprite");
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum GameComponent {
///     Transform { x: f32, y: f32 },
///     Sprite { texture: u32 },
/// }
///
/// impl Component for GameComponent {
///     fn component_type(&self) -> ComponentType {
///         match self {
///             Self::Transform { .. } => TRANSFORM,
///             Self::Sprite { .. } => SPRITE,
///         }
///     }
/// }
///
/// let store = ComponentStore::new();
/// store.register_component_type(TRANSFORM, 16, || GameComponent::Transform { x: 0.0, y: 0.0 })?;
/// store.register_component_type(SPRITE, 16, || GameComponent::Sprite { texture: 0 })?;
///
/// let player = EntityId::new(1);
/// store.add_component(player, GameComponent::Transform { x: 1.0, y: 2.0 })?;
/// store.add_component(player, GameComponent::Sprite { texture: 7 })?;
///
/// assert!(store.has_component(player, SPRITE));
/// assert_eq!(store.get_entities_with_multiple_components(&[TRANSFORM, SPRITE]), vec![player]);
/// # Ok::<(), tessera_core::StoreError>(())
/// ```
pub struct ComponentStore<C: Component> {
    registry: RwLock<Registry<C>>,
    config: StoreConfig,
}

impl<C: Component> Default for ComponentStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentStore<C> {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            config,
        }
    }

    /// Returns the store's configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a component type and pre-constructs `pool_size` pooled
    /// instances with `factory`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeAlreadyRegistered`] if the type is registered
    /// - [`StoreError::Pool`] if the factory produces another type
    pub fn register_component_type<F>(
        &self,
        component_type: ComponentType,
        pool_size: usize,
        factory: F,
    ) -> StoreResult<()>
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let mut registry = self.registry.write();
        if registry.slots.contains_key(&component_type) {
            return Err(StoreError::TypeAlreadyRegistered(component_type));
        }

        let pool = ObjectPool::new(component_type, pool_size, factory)?;
        let slot = registry.storages.len();
        registry
            .storages
            .push(ComponentStorage::new(pool, self.config.initial_capacity));
        registry.slots.insert(component_type, slot);

        tracing::debug!(
            component = %component_type,
            pool_size,
            slot,
            "registered component type"
        );
        Ok(())
    }

    /// Registers a component type with the pool size from the store's
    /// configuration.
    ///
    /// # Errors
    ///
    /// Same as [`register_component_type`](Self::register_component_type).
    pub fn register_configured<F>(&self, component_type: ComponentType, factory: F) -> StoreResult<()>
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let pool_size = self.config.pool_size_for(component_type);
        self.register_component_type(component_type, pool_size, factory)
    }

    /// Checks if a component type is registered.
    #[must_use]
    pub fn is_registered(&self, component_type: ComponentType) -> bool {
        self.registry.read_recursive().slots.contains_key(&component_type)
    }

    /// Returns every registered type, in registration order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<ComponentType> {
        self.registry
            .read_recursive()
            .storages
            .iter()
            .map(ComponentStorage::component_type)
            .collect()
    }

    // =========================================================================
    // Single-component operations
    // =========================================================================

    /// Attaches a component to an entity.
    ///
    /// Validation happens before any write, so a failed add leaves the
    /// store untouched.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidEntity`] for the reserved invalid handle
    /// - [`StoreError::TypeNotRegistered`] if the component's type is unknown
    /// - [`StoreError::DuplicateComponent`] if the entity already carries the type
    pub fn add_component(&self, entity: EntityId, component: C) -> StoreResult<()> {
        let component_type = component.component_type();
        let mut registry = self.registry.write();
        let slot = registry.validate_add(entity, component_type)?;
        registry.attach(entity, slot, component)?;

        tracing::trace!(%entity, component = %component_type, "added component");
        Ok(())
    }

    /// Returns a shared guard to an entity's component.
    ///
    /// The store's shared lock is held until the guard is dropped: writers
    /// wait, other readers proceed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidEntity`] for the reserved invalid handle
    /// - [`StoreError::TypeNotRegistered`] if the type is unknown
    /// - [`StoreError::ComponentNotFound`] if the entity lacks the component
    pub fn get_component(
        &self,
        entity: EntityId,
        component_type: ComponentType,
    ) -> StoreResult<MappedRwLockReadGuard<'_, C>> {
        let registry = self.registry.read_recursive();
        RwLockReadGuard::try_map(registry, |registry| registry.find(entity, component_type))
            .map_err(|registry| registry.lookup_error(entity, component_type))
    }

    /// Returns an exclusive guard to an entity's component for in-place
    /// mutation.
    ///
    /// The store's exclusive lock is held until the guard is dropped. The
    /// value must keep its component type: if it reports another type when
    /// the guard drops, it is replaced by a fresh instance from the type's
    /// factory and an error event is logged.
    ///
    /// # Errors
    ///
    /// Same as [`get_component`](Self::get_component).
    pub fn get_component_mut(
        &self,
        entity: EntityId,
        component_type: ComponentType,
    ) -> StoreResult<ComponentMut<'_, C>> {
        let registry = self.registry.write();
        let Some((slot, index)) = registry.locate(entity, component_type) else {
            return Err(registry.lookup_error(entity, component_type));
        };
        Ok(ComponentMut {
            registry,
            entity,
            slot,
            index,
        })
    }

    /// Checks if an entity carries a component type.
    ///
    /// Unregistered types and the invalid handle report `false`.
    #[must_use]
    pub fn has_component(&self, entity: EntityId, component_type: ComponentType) -> bool {
        let registry = self.registry.read_recursive();
        registry
            .storage(component_type)
            .is_ok_and(|storage| storage.contains(entity))
    }

    /// Detaches and returns an entity's component.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidEntity`] for the reserved invalid handle
    /// - [`StoreError::TypeNotRegistered`] if the type is unknown
    /// - [`StoreError::ComponentNotFound`] if the entity lacks the component
    pub fn remove_component(&self, entity: EntityId, component_type: ComponentType) -> StoreResult<C> {
        if !entity.is_valid() {
            return Err(StoreError::InvalidEntity);
        }
        let mut registry = self.registry.write();
        let slot = registry.slot(component_type)?;
        let component = registry.detach(entity, slot)?;

        tracing::trace!(%entity, component = %component_type, "removed component");
        Ok(component)
    }

    // =========================================================================
    // Entity-level operations
    // =========================================================================

    /// Returns copies of every component attached to an entity, in
    /// registration order of their types.
    ///
    /// An entity without components yields an empty vector.
    #[must_use]
    pub fn get_all_components(&self, entity: EntityId) -> Vec<C> {
        let registry = self.registry.read_recursive();
        registry
            .memberships
            .get(&entity)
            .map(|mask| {
                mask.iter()
                    .filter_map(|slot| registry.storages[slot].get(entity).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the types attached to an entity, in registration order.
    #[must_use]
    pub fn component_types_of(&self, entity: EntityId) -> Vec<ComponentType> {
        let registry = self.registry.read_recursive();
        registry
            .memberships
            .get(&entity)
            .map(|mask| {
                let mut types = Vec::with_capacity(mask.len());
                types.extend(mask.iter().map(|slot| registry.storages[slot].component_type()));
                types
            })
            .unwrap_or_default()
    }

    /// Removes every component of an entity and returns how many were removed.
    ///
    /// An entity without components is a no-op returning `0`.
    pub fn remove_entity(&self, entity: EntityId) -> usize {
        let mut registry = self.registry.write();
        let Some(mask) = registry.memberships.remove(&entity) else {
            return 0;
        };

        let mut removed = 0;
        for slot in mask.iter() {
            if registry.storages[slot].remove(entity).is_ok() {
                removed += 1;
            }
        }
        debug_assert_eq!(removed, mask.len(), "membership table out of step");

        tracing::debug!(%entity, removed, "removed entity");
        removed
    }

    /// Number of entities carrying at least one component.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.registry.read_recursive().memberships.len()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of entities carrying a type; `0` if unregistered.
    #[must_use]
    pub fn component_count(&self, component_type: ComponentType) -> usize {
        self.registry
            .read_recursive()
            .storage(component_type)
            .map_or(0, ComponentStorage::len)
    }

    /// Returns the entities carrying a type, in dense order.
    ///
    /// An unregistered type yields an empty vector.
    #[must_use]
    pub fn get_entities_with_component(&self, component_type: ComponentType) -> Vec<EntityId> {
        self.registry
            .read_recursive()
            .storage(component_type)
            .map(|storage| storage.entities().to_vec())
            .unwrap_or_default()
    }

    /// Returns the entities carrying every one of `component_types`.
    ///
    /// The type with the fewest entities supplies the candidates, which are
    /// then filtered by membership in every other type. Any unregistered
    /// type, or an empty type list, yields an empty vector.
    #[must_use]
    pub fn get_entities_with_multiple_components(&self, component_types: &[ComponentType]) -> Vec<EntityId> {
        let registry = self.registry.read_recursive();
        let Some(storages) = component_types
            .iter()
            .map(|&component_type| registry.storage(component_type).ok())
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };
        let Some(smallest) = storages.iter().min_by_key(|storage| storage.len()) else {
            return Vec::new();
        };

        smallest
            .entities()
            .iter()
            .filter(|&entity| storages.iter().all(|storage| storage.contains(entity)))
            .collect()
    }

    /// Visits `(entity, component)` pairs of one type in dense order until
    /// the callback returns `false`.
    ///
    /// Runs under the shared lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeNotRegistered`] if the type is unknown.
    pub fn for_each_component<F>(&self, component_type: ComponentType, mut callback: F) -> StoreResult<()>
    where
        F: FnMut(EntityId, &C) -> bool,
    {
        let registry = self.registry.read_recursive();
        for (entity, component) in registry.storage(component_type)?.iter() {
            if !callback(entity, component) {
                break;
            }
        }
        Ok(())
    }

    /// Visits `(entity, component)` pairs of one type mutably.
    ///
    /// Runs under the exclusive lock. Values must keep their component type;
    /// iteration stops at the first value that reports another type, and that
    /// value is replaced by a fresh instance from the type's factory.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeNotRegistered`] if the type is unknown
    /// - [`StoreError::TypeChanged`] if the callback changed a value's type
    pub fn for_each_component_mut<F>(&self, component_type: ComponentType, mut callback: F) -> StoreResult<()>
    where
        F: FnMut(EntityId, &mut C),
    {
        let mut registry = self.registry.write();
        let storage = registry.storage_mut(component_type)?;

        let mut changed = None;
        for (entity, component) in storage.iter_mut() {
            callback(entity, component);
            let found = component.component_type();
            if found != component_type {
                changed = Some((entity, found));
                break;
            }
        }

        if let Some((entity, found)) = changed {
            storage.reset(entity);
            tracing::error!(%entity, expected = %component_type, %found, "component changed type in place");
            return Err(StoreError::TypeChanged {
                entity,
                expected: component_type,
                found,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Batch operations
    // =========================================================================

    /// Attaches `components[i]` to `entities[i]` for every `i`, all or nothing.
    ///
    /// Every pair is validated before any is applied, including pairs that
    /// would collide with each other inside the batch.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BatchLengthMismatch`] if the slices differ in length
    /// - Any error [`add_component`](Self::add_component) reports, for the
    ///   first offending pair
    pub fn add_components_batch(&self, entities: &[EntityId], components: Vec<C>) -> StoreResult<()> {
        if entities.len() != components.len() {
            return Err(StoreError::BatchLengthMismatch {
                entities: entities.len(),
                components: components.len(),
            });
        }

        let mut registry = self.registry.write();

        let mut slots = Vec::with_capacity(entities.len());
        let mut pending = HashSet::with_capacity(entities.len());
        for (&entity, component) in entities.iter().zip(&components) {
            let component_type = component.component_type();
            let slot = registry.validate_add(entity, component_type)?;
            if !pending.insert((entity, slot)) {
                return Err(StoreError::DuplicateComponent {
                    entity,
                    component_type,
                });
            }
            slots.push(slot);
        }

        for ((&entity, component), slot) in entities.iter().zip(components).zip(slots) {
            registry.attach(entity, slot, component)?;
        }

        tracing::debug!(count = entities.len(), "added component batch");
        Ok(())
    }

    /// Detaches one type from every listed entity that carries it.
    ///
    /// Best effort: entities without the component are skipped. Returns the
    /// number of components removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeNotRegistered`] if the type is unknown.
    pub fn remove_components_batch(&self, entities: &[EntityId], component_type: ComponentType) -> StoreResult<usize> {
        let mut registry = self.registry.write();
        let slot = registry.slot(component_type)?;

        let mut removed = 0;
        for &entity in entities {
            if registry.storages[slot].contains(entity) {
                registry.detach(entity, slot)?;
                removed += 1;
            }
        }

        tracing::debug!(
            component = %component_type,
            requested = entities.len(),
            removed,
            "removed component batch"
        );
        Ok(removed)
    }

    // =========================================================================
    // Pools
    // =========================================================================

    /// Acquires a pooled instance of a type.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeNotRegistered`] if the type is unknown
    /// - [`StoreError::Pool`] if the pool is exhausted
    pub fn acquire_pooled(&self, component_type: ComponentType) -> StoreResult<PoolHandle> {
        let mut registry = self.registry.write();
        Ok(registry.storage_mut(component_type)?.pool_mut().acquire()?)
    }

    /// Runs `f` on an acquired pooled instance.
    ///
    /// If `f` leaves the instance reporting another type, the instance is
    /// reconstructed by the pool's factory and the call fails.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeNotRegistered`] if the handle's type is unknown
    /// - [`StoreError::Pool`] if the handle is not currently acquired, or
    ///   with [`PoolError::ForeignInstance`] if `f` changed the type
    pub fn with_pooled_mut<R>(&self, handle: PoolHandle, f: impl FnOnce(&mut C) -> R) -> StoreResult<R> {
        let component_type = handle.component_type();
        let mut registry = self.registry.write();
        let pool = registry.storage_mut(component_type)?.pool_mut();

        let instance = pool.get_mut(handle)?;
        let result = f(&mut *instance);
        let found = instance.component_type();
        if found != component_type {
            pool.reset(handle)?;
            return Err(PoolError::ForeignInstance {
                expected: component_type,
                found,
            }
            .into());
        }
        Ok(result)
    }

    /// Returns a pooled instance to its type's pool.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeNotRegistered`] if the handle's type is unknown
    /// - [`StoreError::Pool`] if the handle is not currently acquired
    pub fn release_pooled(&self, handle: PoolHandle) -> StoreResult<()> {
        let mut registry = self.registry.write();
        registry
            .storage_mut(handle.component_type())?
            .pool_mut()
            .release(handle)?;
        Ok(())
    }

    /// Grows or shrinks a type's pool.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TypeNotRegistered`] if the type is unknown
    /// - [`StoreError::Pool`] if the shrink would drop acquired instances
    pub fn resize_pool(&self, component_type: ComponentType, new_capacity: usize) -> StoreResult<()> {
        let mut registry = self.registry.write();
        registry
            .storage_mut(component_type)?
            .pool_mut()
            .resize(new_capacity)?;
        Ok(())
    }

    /// Returns a type's pool statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeNotRegistered`] if the type is unknown.
    pub fn pool_statistics(&self, component_type: ComponentType) -> StoreResult<PoolStatistics> {
        let registry = self.registry.read_recursive();
        Ok(registry.storage(component_type)?.pool().statistics())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Grows a type's storage for `additional` more entities.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeNotRegistered`] if the type is unknown.
    pub fn reserve(&self, component_type: ComponentType, additional: usize) -> StoreResult<()> {
        let mut registry = self.registry.write();
        registry.storage_mut(component_type)?.reserve(additional);
        Ok(())
    }

    /// Returns a statistics snapshot of every registered type.
    #[must_use]
    pub fn storage_statistics(&self) -> StorageStatistics {
        let registry = self.registry.read_recursive();

        let types: Vec<TypeStatistics> = registry
            .storages
            .iter()
            .map(|storage| TypeStatistics {
                component_type: storage.component_type(),
                live_count: storage.len(),
                memory_used: storage.memory_used(),
                memory_reserved: storage.memory_reserved(),
                pool: storage.pool().statistics(),
                fragmentation: Gauge::Unimplemented,
                access_count: Gauge::Unimplemented,
                cache_hit_rate: Gauge::Unimplemented,
            })
            .collect();

        StorageStatistics {
            entity_count: registry.memberships.len(),
            component_count: types.iter().map(|stats| stats.live_count).sum(),
            memory_used: types.iter().map(|stats| stats.memory_used).sum(),
            memory_reserved: types.iter().map(|stats| stats.memory_reserved).sum(),
            types,
        }
    }

    /// Empties every registered type's entity set, value column and pool.
    ///
    /// Registrations persist.
    pub fn clear(&self) {
        let mut registry = self.registry.write();
        for storage in &mut registry.storages {
            storage.clear();
        }
        registry.memberships.clear();

        tracing::debug!(types = registry.storages.len(), "cleared component store");
    }
}

/// Exclusive guard to one component, returned by
/// [`ComponentStore::get_component_mut`].
///
/// Holds the store's write lock. On drop, a value that no longer reports its
/// column's type is replaced by a fresh instance.
pub struct ComponentMut<'a, C: Component> {
    registry: RwLockWriteGuard<'a, Registry<C>>,
    entity: EntityId,
    slot: usize,
    index: usize,
}

impl<C: Component> ComponentMut<'_, C> {
    /// The entity this component belongs to.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl<C: Component> Deref for ComponentMut<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.registry.storages[self.slot].value_at(self.index)
    }
}

impl<C: Component> DerefMut for ComponentMut<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.registry.storages[self.slot].value_at_mut(self.index)
    }
}

impl<C: Component> Drop for ComponentMut<'_, C> {
    fn drop(&mut self) {
        let entity = self.entity;
        let storage = &mut self.registry.storages[self.slot];
        let expected = storage.component_type();
        let found = storage.value_at(self.index).component_type();
        if found != expected {
            storage.reset(entity);
            tracing::error!(%entity, %expected, %found, "component changed type in place");
        }
    }
}

impl<C: Component> fmt::Debug for ComponentMut<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMut")
            .field("entity", &self.entity)
            .field("component_type", &self.registry.storages[self.slot].component_type())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFORM: ComponentType = ComponentType::new("Transform");
    const SPRITE: ComponentType = ComponentType::new("Sprite");
    const HEALTH: ComponentType = ComponentType::new("Health");
    const UNKNOWN: ComponentType = ComponentType::new("Unknown");

    #[derive(Clone, Debug, PartialEq)]
    enum TestComponent {
        Transform { x: f32, y: f32 },
        Sprite { texture: u32 },
        Health(i32),
        Unknown,
    }

    impl Component for TestComponent {
        fn component_type(&self) -> ComponentType {
            match self {
                Self::Transform { .. } => TRANSFORM,
                Self::Sprite { .. } => SPRITE,
                Self::Health(_) => HEALTH,
                Self::Unknown => UNKNOWN,
            }
        }
    }

    fn transform(x: f32) -> TestComponent {
        TestComponent::Transform { x, y: 0.0 }
    }

    fn store() -> ComponentStore<TestComponent> {
        let store = ComponentStore::new();
        store
            .register_component_type(TRANSFORM, 2, || transform(0.0))
            .unwrap();
        store
            .register_component_type(SPRITE, 2, || TestComponent::Sprite { texture: 0 })
            .unwrap();
        store
            .register_component_type(HEALTH, 2, || TestComponent::Health(0))
            .unwrap();
        store
    }

    fn e(raw: u64) -> EntityId {
        EntityId::new(raw)
    }

    #[test]
    fn test_register_twice() {
        let store = store();
        assert_eq!(
            store.register_component_type(TRANSFORM, 1, || transform(0.0)),
            Err(StoreError::TypeAlreadyRegistered(TRANSFORM))
        );
        assert_eq!(store.registered_types(), vec![TRANSFORM, SPRITE, HEALTH]);
        assert!(store.is_registered(HEALTH));
        assert!(!store.is_registered(UNKNOWN));
    }

    #[test]
    fn test_register_with_wrong_factory() {
        let store = ComponentStore::new();
        let result = store.register_component_type(SPRITE, 1, || TestComponent::Health(1));
        assert_eq!(
            result,
            Err(StoreError::Pool(PoolError::FactoryMismatch {
                expected: SPRITE,
                found: HEALTH,
            }))
        );
        assert!(!store.is_registered(SPRITE));
    }

    #[test]
    fn test_add_get_has_remove() {
        let store = store();
        store.add_component(e(1), transform(3.0)).unwrap();

        assert!(store.has_component(e(1), TRANSFORM));
        assert_eq!(*store.get_component(e(1), TRANSFORM).unwrap(), transform(3.0));

        let removed = store.remove_component(e(1), TRANSFORM).unwrap();
        assert_eq!(removed, transform(3.0));
        assert!(!store.has_component(e(1), TRANSFORM));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn test_add_errors() {
        let store = store();
        assert_eq!(
            store.add_component(e(1), TestComponent::Unknown),
            Err(StoreError::TypeNotRegistered(UNKNOWN))
        );
        assert_eq!(
            store.add_component(EntityId::INVALID, transform(0.0)),
            Err(StoreError::InvalidEntity)
        );

        store.add_component(e(1), transform(1.0)).unwrap();
        assert_eq!(
            store.add_component(e(1), transform(2.0)),
            Err(StoreError::DuplicateComponent {
                entity: e(1),
                component_type: TRANSFORM,
            })
        );
        // The original value is untouched
        assert_eq!(*store.get_component(e(1), TRANSFORM).unwrap(), transform(1.0));
    }

    #[test]
    fn test_get_errors() {
        let store = store();
        assert_eq!(
            store.get_component(e(1), TRANSFORM).err(),
            Some(StoreError::ComponentNotFound {
                entity: e(1),
                component_type: TRANSFORM,
            })
        );
        assert_eq!(
            store.get_component(e(1), UNKNOWN).err(),
            Some(StoreError::TypeNotRegistered(UNKNOWN))
        );
        assert_eq!(
            store.get_component(EntityId::INVALID, TRANSFORM).err(),
            Some(StoreError::InvalidEntity)
        );
        assert!(!store.has_component(e(1), UNKNOWN));
    }

    #[test]
    fn test_remove_errors() {
        let store = store();
        assert_eq!(
            store.remove_component(e(4), SPRITE),
            Err(StoreError::ComponentNotFound {
                entity: e(4),
                component_type: SPRITE,
            })
        );
        assert_eq!(
            store.remove_component(e(4), UNKNOWN),
            Err(StoreError::TypeNotRegistered(UNKNOWN))
        );
    }

    #[test]
    fn test_get_component_mut() {
        let store = store();
        store.add_component(e(1), TestComponent::Health(10)).unwrap();

        {
            let mut health = store.get_component_mut(e(1), HEALTH).unwrap();
            *health = TestComponent::Health(4);
        }
        assert_eq!(*store.get_component(e(1), HEALTH).unwrap(), TestComponent::Health(4));
        assert!(store.get_component_mut(e(2), HEALTH).is_err());
    }

    #[test]
    fn test_get_component_mut_type_change_is_undone() {
        let store = store();
        store.add_component(e(1), transform(4.0)).unwrap();

        {
            let mut value = store.get_component_mut(e(1), TRANSFORM).unwrap();
            assert_eq!(value.entity(), e(1));
            *value = TestComponent::Sprite { texture: 9 };
        }

        // The column is back to a Transform built by the factory
        assert_eq!(*store.get_component(e(1), TRANSFORM).unwrap(), transform(0.0));
        assert_eq!(store.get_all_components(e(1)), vec![transform(0.0)]);
        assert!(!store.has_component(e(1), SPRITE));
    }

    #[test]
    fn test_for_each_mut_type_change_is_rejected() {
        let store = store();
        store.add_component(e(1), transform(1.0)).unwrap();
        store.add_component(e(2), transform(2.0)).unwrap();

        let mut visited = 0;
        let result = store.for_each_component_mut(TRANSFORM, |_, component| {
            visited += 1;
            *component = TestComponent::Sprite { texture: 9 };
        });

        assert_eq!(visited, 1);
        let Err(StoreError::TypeChanged {
            entity,
            expected,
            found,
        }) = result
        else {
            panic!("expected TypeChanged, got {result:?}");
        };
        assert_eq!((expected, found), (TRANSFORM, SPRITE));
        assert_eq!(*store.get_component(entity, TRANSFORM).unwrap(), transform(0.0));
        for transform_value in store.get_entities_with_component(TRANSFORM) {
            assert_eq!(
                store.get_component(transform_value, TRANSFORM).unwrap().component_type(),
                TRANSFORM
            );
        }
    }

    #[test]
    fn test_with_pooled_mut_type_change_is_rejected() {
        let store = store();
        let handle = store.acquire_pooled(TRANSFORM).unwrap();

        assert_eq!(
            store.with_pooled_mut(handle, |instance| *instance = TestComponent::Sprite { texture: 3 }),
            Err(StoreError::Pool(PoolError::ForeignInstance {
                expected: TRANSFORM,
                found: SPRITE,
            }))
        );
        assert_eq!(
            store.with_pooled_mut(handle, |instance| instance.clone()),
            Ok(transform(0.0))
        );
        store.release_pooled(handle).unwrap();
    }

    #[test]
    fn test_readd_after_remove() {
        let store = store();
        store.add_component(e(1), transform(1.0)).unwrap();
        store.remove_component(e(1), TRANSFORM).unwrap();
        store.add_component(e(1), transform(2.0)).unwrap();
        assert_eq!(*store.get_component(e(1), TRANSFORM).unwrap(), transform(2.0));
    }

    #[test]
    fn test_get_all_components() {
        let store = store();
        store.add_component(e(1), TestComponent::Health(5)).unwrap();
        store.add_component(e(1), transform(1.0)).unwrap();

        assert_eq!(
            store.get_all_components(e(1)),
            vec![transform(1.0), TestComponent::Health(5)]
        );
        assert_eq!(store.component_types_of(e(1)), vec![TRANSFORM, HEALTH]);
        assert!(store.get_all_components(e(2)).is_empty());
        assert!(store.component_types_of(e(2)).is_empty());
    }

    #[test]
    fn test_remove_entity() {
        let store = store();
        store.add_component(e(1), transform(1.0)).unwrap();
        store.add_component(e(1), TestComponent::Sprite { texture: 2 }).unwrap();
        store.add_component(e(2), transform(2.0)).unwrap();

        assert_eq!(store.remove_entity(e(1)), 2);
        assert_eq!(store.remove_entity(e(1)), 0);
        assert!(!store.has_component(e(1), TRANSFORM));
        assert_eq!(store.get_entities_with_component(TRANSFORM), vec![e(2)]);
        assert_eq!(store.component_count(SPRITE), 0);
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn test_entities_with_component() {
        let store = store();
        for raw in 1..=3 {
            store.add_component(e(raw), transform(0.0)).unwrap();
        }
        store.remove_component(e(1), TRANSFORM).unwrap();

        let mut entities = store.get_entities_with_component(TRANSFORM);
        entities.sort();
        assert_eq!(entities, vec![e(2), e(3)]);
        assert!(store.get_entities_with_component(UNKNOWN).is_empty());
        assert_eq!(store.component_count(UNKNOWN), 0);
    }

    #[test]
    fn test_intersection() {
        let store = store();
        for raw in [1, 3] {
            store.add_component(e(raw), transform(0.0)).unwrap();
            store.add_component(e(raw), TestComponent::Sprite { texture: 0 }).unwrap();
        }
        store.add_component(e(2), transform(0.0)).unwrap();

        let mut both = store.get_entities_with_multiple_components(&[TRANSFORM, SPRITE]);
        both.sort();
        assert_eq!(both, vec![e(1), e(3)]);

        assert!(store
            .get_entities_with_multiple_components(&[TRANSFORM, UNKNOWN])
            .is_empty());
        assert!(store.get_entities_with_multiple_components(&[]).is_empty());
        assert!(store
            .get_entities_with_multiple_components(&[TRANSFORM, HEALTH])
            .is_empty());
    }

    #[test]
    fn test_batch_add_atomic() {
        let store = store();
        store.add_component(e(3), TestComponent::Health(1)).unwrap();

        let entities = [e(1), e(2), e(3), e(4), e(5)];
        let components = (1..=5).map(TestComponent::Health).collect();
        assert_eq!(
            store.add_components_batch(&entities, components),
            Err(StoreError::DuplicateComponent {
                entity: e(3),
                component_type: HEALTH,
            })
        );
        assert_eq!(store.component_count(HEALTH), 1);
        assert!(!store.has_component(e(1), HEALTH));
    }

    #[test]
    fn test_batch_add_duplicate_inside_batch() {
        let store = store();
        let entities = [e(1), e(1)];
        let components = vec![transform(1.0), transform(2.0)];
        assert!(store.add_components_batch(&entities, components).is_err());
        assert_eq!(store.component_count(TRANSFORM), 0);
    }

    #[test]
    fn test_batch_add_mixed_types() {
        let store = store();
        let entities = [e(1), e(1), e(2)];
        let components = vec![
            transform(1.0),
            TestComponent::Sprite { texture: 9 },
            TestComponent::Health(3),
        ];
        store.add_components_batch(&entities, components).unwrap();

        assert_eq!(store.component_types_of(e(1)), vec![TRANSFORM, SPRITE]);
        assert!(store.has_component(e(2), HEALTH));
        assert_eq!(
            store.add_components_batch(&[e(5)], Vec::new()),
            Err(StoreError::BatchLengthMismatch {
                entities: 1,
                components: 0,
            })
        );
    }

    #[test]
    fn test_batch_remove_skips_missing() {
        let store = store();
        store.add_component(e(1), transform(0.0)).unwrap();
        store.add_component(e(3), transform(0.0)).unwrap();

        let removed = store
            .remove_components_batch(&[e(1), e(2), e(3), EntityId::INVALID], TRANSFORM)
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.component_count(TRANSFORM), 0);
        assert_eq!(store.entity_count(), 0);
        assert_eq!(
            store.remove_components_batch(&[e(1)], UNKNOWN),
            Err(StoreError::TypeNotRegistered(UNKNOWN))
        );
    }

    #[test]
    fn test_for_each() {
        let store = store();
        for raw in 1..=4 {
            store.add_component(e(raw), TestComponent::Health(1)).unwrap();
        }

        store
            .for_each_component_mut(HEALTH, |entity, component| {
                *component = TestComponent::Health(entity.raw() as i32);
            })
            .unwrap();

        let mut visited = 0;
        store
            .for_each_component(HEALTH, |entity, component| {
                assert_eq!(*component, TestComponent::Health(entity.raw() as i32));
                visited += 1;
                visited < 2
            })
            .unwrap();
        assert_eq!(visited, 2);
        assert!(store.for_each_component(UNKNOWN, |_, _| true).is_err());
    }

    #[test]
    fn test_pool_scenario() {
        let store = store();
        let a = store.acquire_pooled(TRANSFORM).unwrap();
        let b = store.acquire_pooled(TRANSFORM).unwrap();

        let stats = store.pool_statistics(TRANSFORM).unwrap();
        assert_eq!((stats.used, stats.available), (2, 0));
        assert!(matches!(
            store.acquire_pooled(TRANSFORM),
            Err(StoreError::Pool(PoolError::CapacityExceeded { .. }))
        ));

        store.release_pooled(b).unwrap();
        let c = store.acquire_pooled(TRANSFORM).unwrap();
        assert_eq!(c.slot(), b.slot());

        store
            .with_pooled_mut(a, |instance| *instance = transform(8.0))
            .unwrap();
        assert!(store.release_pooled(b).is_err());
        assert!(store.acquire_pooled(UNKNOWN).is_err());
    }

    #[test]
    fn test_resize_pool() {
        let store = store();
        store.acquire_pooled(SPRITE).unwrap();
        store.resize_pool(SPRITE, 8).unwrap();
        assert_eq!(store.pool_statistics(SPRITE).unwrap().capacity, 8);
        assert!(store.resize_pool(SPRITE, 0).is_err());
        assert!(store.resize_pool(UNKNOWN, 1).is_err());
    }

    #[test]
    fn test_statistics() {
        let store = store();
        store.add_component(e(1), transform(0.0)).unwrap();
        store.add_component(e(2), transform(0.0)).unwrap();
        store.add_component(e(2), TestComponent::Health(1)).unwrap();

        let stats = store.storage_statistics();
        assert_eq!(stats.types.len(), 3);
        assert_eq!(stats.entity_count, 2);
        assert_eq!(stats.component_count, 3);

        let transforms = stats.for_type(TRANSFORM).unwrap();
        let size = std::mem::size_of::<TestComponent>();
        assert_eq!(transforms.live_count, 2);
        assert_eq!(transforms.memory_used, 2 * size);
        assert!(transforms.memory_reserved >= transforms.memory_used);
        assert_eq!(transforms.fragmentation, Gauge::Unimplemented);
        assert_eq!(stats.memory_used, 3 * size);
    }

    #[test]
    fn test_clear_keeps_registrations() {
        let store = store();
        store.add_component(e(1), transform(0.0)).unwrap();
        store.acquire_pooled(HEALTH).unwrap();

        store.clear();
        assert_eq!(store.component_count(TRANSFORM), 0);
        assert_eq!(store.entity_count(), 0);
        assert!(store.is_registered(TRANSFORM));
        assert_eq!(store.pool_statistics(HEALTH).unwrap().used, 0);

        store.add_component(e(1), transform(1.0)).unwrap();
        assert!(store.has_component(e(1), TRANSFORM));
    }

    #[test]
    fn test_configured_registration() {
        let mut config = StoreConfig::default();
        config.pools.insert("Sprite".to_owned(), 7);
        config.initial_capacity = 32;

        let store = ComponentStore::with_config(config);
        store
            .register_configured(SPRITE, || TestComponent::Sprite { texture: 0 })
            .unwrap();
        store.register_configured(HEALTH, || TestComponent::Health(0)).unwrap();

        assert_eq!(store.pool_statistics(SPRITE).unwrap().capacity, 7);
        assert_eq!(store.pool_statistics(HEALTH).unwrap().capacity, 128);
        store.reserve(SPRITE, 64).unwrap();
        assert!(store.reserve(UNKNOWN, 1).is_err());
    }
}
