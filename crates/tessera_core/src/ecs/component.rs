//! # Component System
//!
//! Components are pure data records tagged with a [`ComponentType`].
//! The store is generic over one component type `C`, which a game implements
//! as a closed sum type (an `enum` with one variant per kind).

use serde::Serialize;
use std::fmt;

/// Identifier naming a component kind (e.g. `Transform`, `Sprite`).
///
/// Backed by an interned static name, so it is `Copy`, cheap to compare and
/// usable in `const` position.
///
/// # Example
///
/// ```rust
/// use tessera_core::ComponentType;
///
/// const TRANSFORM: ComponentType = ComponentType::new("Transform");
/// assert_eq!(TRANSFORM.name(), "Transform");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ComponentType(&'static str);

impl ComponentType {
    /// Creates a component type from its name.
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the name of this component type.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Trait for values stored in a [`ComponentStore`](crate::ComponentStore).
///
/// Implementors must:
/// - Report which [`ComponentType`] a value belongs to (used for dispatch)
/// - Report an estimated byte footprint (used for statistics)
/// - Be `Clone`: reads that outlive the store lock hand out copies
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, ComponentType};
///
/// const HEALTH: ComponentType = ComponentType::new("Health");
/// const NAME: ComponentType = ComponentType::new("Name");
///
/// #[derive(Clone, Debug)]
/// enum GameComponent {
///     Health { current: i32, max: i32 },
///     Name(String),
/// }
///
/// impl Component for GameComponent {
///     fn component_type(&self) -> ComponentType {
///         match self {
///             Self::Health { .. } => HEALTH,
///             Self::Name(_) => NAME,
///         }
///     }
///
///     fn size_bytes(&self) -> usize {
///         match self {
///             Self::Name(name) => std::mem::size_of::<Self>() + name.capacity(),
///             _ => std::mem::size_of::<Self>(),
///         }
///     }
/// }
/// ```
pub trait Component: Clone + Send + Sync + 'static {
    /// The kind of this component value.
    fn component_type(&self) -> ComponentType;

    /// Estimated memory footprint of this value in bytes.
    ///
    /// Defaults to the inline size of the value. Override when the value
    /// owns heap data worth accounting for.
    fn size_bytes(&self) -> usize {
        std::mem::size_of_val(self)
    }
}
