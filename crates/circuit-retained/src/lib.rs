//! Retained state for Circuit-RS.
//!
//! Values remembered with [`remember_retained`] are registered with the
//! [`RetainedStateRegistry`] found in the current composition. A
//! [`Continuity`] kept in a [`ScopedObjectStore`] outlives the composition, so
//! a recreated composition can consume what the previous one saved.

pub mod continuity;
pub mod registry;
pub mod remember;
pub mod scope;

pub use continuity::{
    continuity_factory, continuity_retained_state_registry, local_can_retain_checker,
    with_continuity, CanRetainChecker, Continuity,
};
pub use registry::{
    local_retained_state_registry, Entry, NoOpRetainedStateRegistry, RetainedStateRegistry,
    RetainedStateRegistryImpl, RetainedValue, ValueProvider,
};
pub use remember::{remember_retained, remember_retained_keyed};
pub use scope::{
    local_scoped_object_store, CreatedObject, ObjectRequest, ScopeError, ScopedObject,
    ScopedObjectFactory, ScopedObjectStore,
};
