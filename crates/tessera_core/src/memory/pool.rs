//! # Object Pool
//!
//! Fixed-capacity pool of pre-constructed component instances for one
//! component type. Instances are handed out and returned instead of being
//! allocated and dropped every frame.

use serde::Serialize;
use std::fmt;

use crate::ecs::{Component, ComponentType};
use crate::error::{PoolError, PoolResult};

/// Constructor producing a fresh instance for a pool.
pub type ComponentFactory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Handle to an acquired instance in an [`ObjectPool`].
///
/// A handle carries the pool's component type, the slot index and the
/// slot generation at acquisition. Releasing bumps the generation, so a
/// handle cannot be released twice or used after release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    /// Type of the pool that issued this handle.
    component_type: ComponentType,
    /// Index into the pool.
    slot: usize,
    /// Slot generation at acquisition.
    generation: u64,
}

impl PoolHandle {
    /// Returns the component type of the issuing pool.
    #[inline]
    #[must_use]
    pub const fn component_type(self) -> ComponentType {
        self.component_type
    }

    /// Returns the slot index: two handles with the same slot refer to the
    /// same underlying instance.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }
}

/// One pre-constructed instance.
struct Slot<T> {
    /// `None` once a shrink has trimmed the instance.
    value: Option<T>,
    generation: u64,
    in_use: bool,
}

/// A pool of reusable component instances of a single [`ComponentType`].
///
/// All instances are constructed up front. `acquire` and `release` are
/// **O(1)** and never allocate; the pool only grows or shrinks through an
/// explicit [`resize`](Self::resize).
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. The [`ComponentStore`](crate::ComponentStore)
/// guards the pools it owns with its own lock.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = ObjectPool::new(TRANSFORM, 2, || GameComponent::Transform(Default::default()))?;
///
/// let a = pool.acquire()?;
/// let b = pool.acquire()?;
/// assert!(pool.acquire().is_err()); // capacity exceeded
///
/// pool.release(a)?;
/// assert_eq!(pool.acquire()?.slot(), a.slot()); // same instance reused
/// ```
pub struct ObjectPool<T: Component> {
    component_type: ComponentType,
    slots: Vec<Slot<T>>,
    /// Free list of available slots. The most recently released is on top.
    available: Vec<usize>,
    /// Slots whose instance was trimmed by a shrink, reused when growing.
    vacant: Vec<usize>,
    /// Number of acquired instances.
    used: usize,
    /// Byte footprint of one instance, measured from the factory.
    instance_size: usize,
    factory: ComponentFactory<T>,
}

impl<T: Component> ObjectPool<T> {
    /// Creates a pool and pre-constructs `capacity` instances.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::FactoryMismatch`] if the factory produces a
    /// component of a type other than `component_type`.
    pub fn new<F>(component_type: ComponentType, capacity: usize, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_factory(component_type, capacity, Box::new(factory))
    }

    /// Creates a pool from an already boxed factory.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectPool::new`].
    pub fn from_factory(
        component_type: ComponentType,
        capacity: usize,
        factory: ComponentFactory<T>,
    ) -> PoolResult<Self> {
        let probe = factory();
        if probe.component_type() != component_type {
            return Err(PoolError::FactoryMismatch {
                expected: component_type,
                found: probe.component_type(),
            });
        }
        let instance_size = probe.size_bytes();

        let mut slots = Vec::with_capacity(capacity);
        if capacity > 0 {
            slots.push(Slot::fresh(probe));
            slots.extend((1..capacity).map(|_| Slot::fresh(factory())));
        }

        Ok(Self {
            component_type,
            slots,
            // Reversed so the lowest slot is handed out first
            available: (0..capacity).rev().collect(),
            vacant: Vec::new(),
            used: 0,
            instance_size,
            factory,
        })
    }

    /// Returns the component type this pool serves.
    #[inline]
    #[must_use]
    pub const fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Returns the number of constructed instances.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Returns the number of acquired instances.
    #[inline]
    #[must_use]
    pub const fn used_count(&self) -> usize {
        self.used
    }

    /// Returns the number of instances ready to be acquired.
    #[inline]
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Hands out one available instance.
    ///
    /// This is a **O(1)** operation with **zero heap allocations**. It never
    /// blocks and never grows the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CapacityExceeded`] if every instance is in use.
    pub fn acquire(&mut self) -> PoolResult<PoolHandle> {
        let Some(slot) = self.available.pop() else {
            tracing::warn!(
                component = %self.component_type,
                capacity = self.capacity(),
                "object pool exhausted"
            );
            return Err(PoolError::CapacityExceeded {
                component_type: self.component_type,
                capacity: self.capacity(),
            });
        };

        let entry = &mut self.slots[slot];
        entry.in_use = true;
        self.used += 1;

        Ok(PoolHandle {
            component_type: self.component_type,
            slot,
            generation: entry.generation,
        })
    }

    /// Returns an instance to the pool.
    ///
    /// The instance may be handed out again by the next `acquire`; the
    /// caller's handle is stale from here on.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ForeignInstance`] if the handle came from a pool of
    ///   another component type, or the instance now reports another type
    /// - [`PoolError::NotAcquired`] if the instance is not currently acquired
    ///   (double release, stale handle, or a slot this pool never issued)
    pub fn release(&mut self, handle: PoolHandle) -> PoolResult<()> {
        let slot = self.validate(handle)?;
        if let Some(found) = self.slots[slot]
            .value
            .as_ref()
            .map(Component::component_type)
            .filter(|&found| found != self.component_type)
        {
            return Err(PoolError::ForeignInstance {
                expected: self.component_type,
                found,
            });
        }

        let entry = &mut self.slots[slot];
        entry.in_use = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.used -= 1;
        self.available.push(slot);

        Ok(())
    }

    /// Gets an acquired instance.
    ///
    /// # Errors
    ///
    /// Same validation as [`release`](Self::release).
    pub fn get(&self, handle: PoolHandle) -> PoolResult<&T> {
        let slot = self.validate(handle)?;
        self.slots[slot]
            .value
            .as_ref()
            .ok_or_else(|| self.not_acquired(slot))
    }

    /// Gets an acquired instance mutably.
    ///
    /// # Errors
    ///
    /// Same validation as [`release`](Self::release).
    pub fn get_mut(&mut self, handle: PoolHandle) -> PoolResult<&mut T> {
        let slot = self.validate(handle)?;
        let err = self.not_acquired(slot);
        self.slots[slot].value.as_mut().ok_or(err)
    }

    /// Changes the number of constructed instances.
    ///
    /// Growing constructs the difference as available instances. Shrinking
    /// drops available instances only; acquired ones are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShrinkBelowUsed`] if `new_capacity` is smaller
    /// than the number of acquired instances.
    pub fn resize(&mut self, new_capacity: usize) -> PoolResult<()> {
        if new_capacity < self.used {
            return Err(PoolError::ShrinkBelowUsed {
                requested: new_capacity,
                used: self.used,
            });
        }

        let capacity = self.capacity();
        if new_capacity > capacity {
            for _ in capacity..new_capacity {
                self.grow_one();
            }
        } else if new_capacity < capacity {
            self.trim(capacity - new_capacity);
        }

        tracing::debug!(
            component = %self.component_type,
            from = capacity,
            to = new_capacity,
            "resized object pool"
        );
        Ok(())
    }

    /// Replaces an acquired instance with a freshly constructed one.
    ///
    /// # Errors
    ///
    /// Same validation as [`get`](Self::get).
    pub fn reset(&mut self, handle: PoolHandle) -> PoolResult<()> {
        let slot = self.validate(handle)?;
        self.slots[slot].value = Some((self.factory)());
        Ok(())
    }

    /// Marks every instance available again.
    ///
    /// Outstanding handles become stale. Instances keep their current
    /// contents, except ones that no longer report the pool's type, which
    /// are reconstructed.
    pub fn clear(&mut self) {
        for entry in &mut self.slots {
            if entry.in_use {
                entry.in_use = false;
                entry.generation = entry.generation.wrapping_add(1);
            }
            if entry
                .value
                .as_ref()
                .is_some_and(|value| value.component_type() != self.component_type)
            {
                entry.value = Some((self.factory)());
            }
        }
        self.available.clear();
        self.available.extend(
            (0..self.slots.len())
                .rev()
                .filter(|&slot| self.slots[slot].value.is_some()),
        );
        self.used = 0;
    }

    /// Constructs a new instance with the pool's factory, outside the pool.
    pub(crate) fn construct(&self) -> T {
        (self.factory)()
    }

    /// Byte footprint of one instance.
    #[inline]
    #[must_use]
    pub const fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// Returns a snapshot of usage statistics.
    #[must_use]
    pub fn statistics(&self) -> PoolStatistics {
        let capacity = self.capacity();
        #[allow(clippy::cast_precision_loss)]
        let usage_ratio = if capacity == 0 {
            0.0
        } else {
            self.used as f64 / capacity as f64
        };

        PoolStatistics {
            component_type: self.component_type,
            used: self.used,
            available: self.available.len(),
            capacity,
            usage_ratio,
            instance_size: self.instance_size,
            memory_used: self.used * self.instance_size,
            memory_allocated: capacity * self.instance_size,
        }
    }

    /// Iterates over acquired instances.
    pub fn iter_acquired(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        let component_type = self.component_type;
        self.slots.iter().enumerate().filter_map(move |(slot, entry)| {
            if !entry.in_use {
                return None;
            }
            let handle = PoolHandle {
                component_type,
                slot,
                generation: entry.generation,
            };
            entry.value.as_ref().map(|value| (handle, value))
        })
    }

    fn validate(&self, handle: PoolHandle) -> PoolResult<usize> {
        if handle.component_type != self.component_type {
            return Err(PoolError::ForeignInstance {
                expected: self.component_type,
                found: handle.component_type,
            });
        }
        match self.slots.get(handle.slot) {
            Some(entry) if entry.in_use && entry.generation == handle.generation => Ok(handle.slot),
            _ => Err(self.not_acquired(handle.slot)),
        }
    }

    fn not_acquired(&self, slot: usize) -> PoolError {
        PoolError::NotAcquired {
            component_type: self.component_type,
            slot,
        }
    }

    fn grow_one(&mut self) {
        let value = (self.factory)();
        if let Some(slot) = self.vacant.pop() {
            self.slots[slot].value = Some(value);
            self.available.push(slot);
        } else {
            self.slots.push(Slot::fresh(value));
            self.available.push(self.slots.len() - 1);
        }
    }

    /// Drops `count` available instances, highest slots first.
    ///
    /// The surviving free list keeps its release order.
    fn trim(&mut self, count: usize) {
        let count = count.min(self.available.len());
        if count > 0 {
            let mut doomed = self.available.clone();
            doomed.sort_unstable();
            let doomed = doomed.split_off(doomed.len() - count);
            let threshold = doomed[0];
            self.available.retain(|&slot| slot < threshold);

            for slot in doomed {
                self.slots[slot].value = None;
                self.vacant.push(slot);
            }
        }

        while self.slots.last().is_some_and(|entry| entry.value.is_none()) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.vacant.retain(|&slot| slot < len);
    }
}

impl<T> Slot<T> {
    const fn fresh(value: T) -> Self {
        Self {
            value: Some(value),
            generation: 0,
            in_use: false,
        }
    }
}

impl<T: Component> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("component_type", &self.component_type)
            .field("capacity", &self.capacity())
            .field("used", &self.used)
            .field("available", &self.available.len())
            .finish_non_exhaustive()
    }
}

/// Usage snapshot of one [`ObjectPool`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PoolStatistics {
    /// The pool's component type.
    pub component_type: ComponentType,
    /// Instances currently acquired.
    pub used: usize,
    /// Instances ready to be acquired.
    pub available: usize,
    /// Constructed instances (`used + available`).
    pub capacity: usize,
    /// `used / capacity`, `0.0` for an empty pool.
    pub usage_ratio: f64,
    /// Byte footprint of one instance.
    pub instance_size: usize,
    /// Estimated bytes held by acquired instances.
    pub memory_used: usize,
    /// Estimated bytes held by all constructed instances.
    pub memory_allocated: usize,
}
