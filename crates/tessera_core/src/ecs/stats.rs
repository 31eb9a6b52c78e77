//! # Storage Statistics
//!
//! Snapshots for external monitoring and telemetry collectors.
//! All types serialize with `serde`.

use serde::Serialize;

use super::component::ComponentType;
use crate::memory::PoolStatistics;

/// A metric slot that a collector may or may not have a value for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Gauge {
    /// A measured value.
    Measured(f64),
    /// The store does not measure this metric.
    Unimplemented,
}

/// Statistics for one registered component type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeStatistics {
    /// The component type.
    pub component_type: ComponentType,
    /// Entities currently carrying this type.
    pub live_count: usize,
    /// Estimated bytes held by live values.
    pub memory_used: usize,
    /// Estimated bytes reserved by the entity set, value column and pool.
    pub memory_reserved: usize,
    /// The type's object pool.
    pub pool: PoolStatistics,
    /// Storage fragmentation. Not measured.
    pub fragmentation: Gauge,
    /// Number of reads of this type. Not measured.
    pub access_count: Gauge,
    /// Cache hit rate of reads. Not measured.
    pub cache_hit_rate: Gauge,
}

/// Statistics for a whole [`ComponentStore`](crate::ComponentStore).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StorageStatistics {
    /// Per-type statistics, in registration order.
    pub types: Vec<TypeStatistics>,
    /// Entities carrying at least one component.
    pub entity_count: usize,
    /// Components attached across all types.
    pub component_count: usize,
    /// Sum of `memory_used` across all types.
    pub memory_used: usize,
    /// Sum of `memory_reserved` across all types.
    pub memory_reserved: usize,
}

impl StorageStatistics {
    /// Looks up the statistics of one type.
    #[must_use]
    pub fn for_type(&self, component_type: ComponentType) -> Option<&TypeStatistics> {
        self.types
            .iter()
            .find(|stats| stats.component_type == component_type)
    }
}
