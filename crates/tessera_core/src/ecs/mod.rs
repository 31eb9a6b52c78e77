//! # Entity Component Storage
//!
//! Per-type component storage with O(1) insert, remove and membership.
//!
//! ## Design Philosophy
//!
//! - Each registered type keeps its entities packed in an [`IndexSet`]
//! - Component values live in a column parallel to that set
//! - Removal is a swap with the last member: no tombstones, no holes
//! - One lock over the whole store keeps every type consistent

mod component;
mod entity;
mod index_set;
mod stats;
mod storage;
mod store;

pub use component::{Component, ComponentType};
pub use entity::EntityId;
pub use index_set::IndexSet;
pub use stats::{Gauge, StorageStatistics, TypeStatistics};
pub use store::{ComponentMut, ComponentStore};
