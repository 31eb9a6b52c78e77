//! # Tessera Core
//!
//! In-process component storage engine for an Entity Component System:
//! - O(1) attach, detach and membership per (entity, type) pair
//! - Pre-constructed object pools per component type
//! - One lock composing every per-type structure into a consistent whole
//!
//! ## Architecture
//!
//! 1. **[`IndexSet`]** - dense/sparse entity set with swap-remove
//! 2. **[`ObjectPool`]** - fixed-capacity pool of reusable instances
//! 3. **[`ComponentStore`]** - registry of per-type storage behind one `RwLock`
//!
//! Entity handles come from an external entity manager; the store never
//! issues or recycles them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{ComponentStore, EntityId};
//!
//! let store = ComponentStore::new();
//! store.register_component_type(TRANSFORM, 1024, || GameComponent::Transform(Transform::default()))?;
//!
//! store.add_component(EntityId::new(1), GameComponent::Transform(Transform::default()))?;
//! let moving = store.get_entities_with_multiple_components(&[TRANSFORM, VELOCITY]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::StoreConfig;
pub use ecs::{
    Component, ComponentMut, ComponentStore, ComponentType, EntityId, Gauge, IndexSet,
    StorageStatistics, TypeStatistics,
};
pub use error::{
    ConfigError, IndexError, IndexResult, PoolError, PoolResult, StoreError, StoreResult,
};
pub use memory::{ComponentFactory, ObjectPool, PoolHandle, PoolStatistics};
