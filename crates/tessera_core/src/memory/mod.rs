//! # Memory Management
//!
//! Pre-constructed instance pools for zero-allocation component churn.
//!
//! ## Design Philosophy
//!
//! Instances are constructed when a component type is registered. During
//! gameplay:
//! - No per-frame construction or drop of pooled instances
//! - Exhaustion is reported immediately, never waited on
//! - Growth and shrink happen only on explicit request

mod pool;

pub use pool::{ComponentFactory, ObjectPool, PoolHandle, PoolStatistics};
