//! # Storage Error Types
//!
//! All errors that can occur in the component storage engine.
//!
//! Every failure is an ordinary value. Callers decide whether an error is
//! fatal to the frame or safely ignorable (e.g. removing an already-absent
//! component during teardown).

use thiserror::Error;

use crate::ecs::{ComponentType, EntityId};

/// Errors raised by an [`IndexSet`](crate::IndexSet).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// The entity is already a member of the set.
    #[error("entity already exists: {0}")]
    AlreadyExists(EntityId),

    /// The entity is not a member of the set.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// A dense index past the logical length was requested.
    #[error("index out of range: {index} (len {len})")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The logical length of the set.
        len: usize,
    },
}

/// Errors raised by an [`ObjectPool`](crate::ObjectPool).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Every instance in the pool is already acquired.
    #[error("pool capacity exceeded for {component_type}: capacity {capacity}")]
    CapacityExceeded {
        /// The pool's component type.
        component_type: ComponentType,
        /// The pool's capacity.
        capacity: usize,
    },

    /// The handle was issued by a pool of another component type.
    #[error("component does not belong to this pool: expected {expected}, got {found}")]
    ForeignInstance {
        /// The pool's component type.
        expected: ComponentType,
        /// The type carried by the handle.
        found: ComponentType,
    },

    /// The instance is not currently acquired (double release or stale handle).
    #[error("component not currently acquired: {component_type} slot {slot}")]
    NotAcquired {
        /// The pool's component type.
        component_type: ComponentType,
        /// The slot index carried by the handle.
        slot: usize,
    },

    /// A shrink would discard instances that are still in use.
    #[error("new capacity smaller than used count: requested {requested}, used {used}")]
    ShrinkBelowUsed {
        /// The requested capacity.
        requested: usize,
        /// Instances currently acquired.
        used: usize,
    },

    /// The pool's factory produced a value of the wrong component type.
    #[error("factory for {expected} produced a component of type {found}")]
    FactoryMismatch {
        /// The pool's component type.
        expected: ComponentType,
        /// The type the factory produced.
        found: ComponentType,
    },
}

/// Errors raised by a [`ComponentStore`](crate::ComponentStore).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The component type was registered twice.
    #[error("type already registered: {0}")]
    TypeAlreadyRegistered(ComponentType),

    /// The component type was used before registration.
    #[error("type not registered: {0}")]
    TypeNotRegistered(ComponentType),

    /// The entity does not carry a component of this type.
    #[error("component not found for entity {entity}: {component_type}")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// The missing component type.
        component_type: ComponentType,
    },

    /// The entity already carries a component of this type.
    #[error("entity {entity} already has component of type {component_type}")]
    DuplicateComponent {
        /// The entity being added to.
        entity: EntityId,
        /// The duplicated component type.
        component_type: ComponentType,
    },

    /// A value was mutated in place into another component type. The
    /// value has been replaced by a fresh instance of the expected type.
    #[error("component of entity {entity} changed type in place: expected {expected}, got {found}")]
    TypeChanged {
        /// The entity whose value was mutated.
        entity: EntityId,
        /// The column's component type.
        expected: ComponentType,
        /// The type the value reported afterwards.
        found: ComponentType,
    },

    /// The reserved invalid entity handle was passed in.
    #[error("invalid entity handle")]
    InvalidEntity,

    /// A batch received a different number of entities and components.
    #[error("batch length mismatch: {entities} entities, {components} components")]
    BatchLengthMismatch {
        /// Number of entities supplied.
        entities: usize,
        /// Number of components supplied.
        components: usize,
    },

    /// An index-set operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A pool operation failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors raised while loading a [`StoreConfig`](crate::StoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for index-set operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
