//! Process-scoped retained state registry.

use std::rc::Rc;

use circuit_runtime::hash::map::HashMap;
use circuit_runtime::{Composer, CompositionLocal, RememberObserver};

use crate::registry::{
    local_retained_state_registry, Entry, RetainedStateRegistry, RetainedStateRegistryImpl,
    RetainedValue, ValueProvider,
};
use crate::scope::{
    CreatedObject, ObjectRequest, ScopeError, ScopedObject, ScopedObjectFactory, ScopedObjectStore,
};

/// Answers whether the teardown in progress is a transient recreation whose
/// state should be saved.
pub trait CanRetainChecker {
    fn can_retain(&self) -> bool;
}

impl<F> CanRetainChecker for F
where
    F: Fn() -> bool,
{
    fn can_retain(&self) -> bool {
        self()
    }
}

thread_local! {
    static NEVER_RETAIN: Rc<dyn CanRetainChecker> = Rc::new(|| false) as Rc<dyn CanRetainChecker>;
    static LOCAL_CAN_RETAIN_CHECKER: CompositionLocal<Rc<dyn CanRetainChecker>> =
        CompositionLocal::new(|| NEVER_RETAIN.with(Rc::clone));
}

/// The host's retainability checker; never retains unless provided.
pub fn local_can_retain_checker() -> CompositionLocal<Rc<dyn CanRetainChecker>> {
    LOCAL_CAN_RETAIN_CHECKER.with(Clone::clone)
}

/// A [`RetainedStateRegistryImpl`] that lives in a [`ScopedObjectStore`] so
/// it survives recreation of the composition that uses it.
#[derive(Debug, Default)]
pub struct Continuity {
    delegate: RetainedStateRegistryImpl,
}

impl Continuity {
    pub const KEY: &'static str = "CircuitContinuity";

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance stored in `store`, creating it on first use.
    pub fn obtain(store: &ScopedObjectStore) -> Result<Rc<Self>, ScopeError> {
        Self::obtain_with(store, &continuity_factory)
    }

    pub fn obtain_with(
        store: &ScopedObjectStore,
        factory: &dyn ScopedObjectFactory,
    ) -> Result<Rc<Self>, ScopeError> {
        store.get_or_create::<Self>(Self::KEY, factory)
    }

    /// Snapshot of the saved values per key.
    pub fn peek_retained(&self) -> HashMap<String, Vec<RetainedValue>> {
        self.delegate.retained_snapshot()
    }

    /// Snapshot of the number of registered providers per key.
    pub fn peek_providers(&self) -> HashMap<String, usize> {
        self.delegate.provider_counts()
    }
}

impl RetainedStateRegistry for Continuity {
    fn consume_value(&self, key: &str) -> Option<RetainedValue> {
        self.delegate.consume_value(key)
    }

    fn register_value(&self, key: &str, provider: ValueProvider) -> Entry {
        self.delegate.register_value(key, provider)
    }

    fn perform_save(&self) {
        self.delegate.perform_save();
    }

    fn forget_unclaimed_values(&self) {
        self.delegate.forget_unclaimed_values();
    }
}

impl ScopedObject for Continuity {
    fn on_cleared(&self) {
        log::debug!("continuity cleared");
        self.delegate.clear();
    }
}

/// Factory that knows how to build a [`Continuity`].
pub fn continuity_factory(request: &ObjectRequest<'_>) -> Result<CreatedObject, ScopeError> {
    if request.is::<Continuity>() {
        Ok(CreatedObject::new(Continuity::new()))
    } else {
        Err(request.unknown())
    }
}

struct SaveOnTeardown {
    continuity: Rc<Continuity>,
    can_retain: Rc<dyn CanRetainChecker>,
}

impl SaveOnTeardown {
    fn save_if_retainable(&self) {
        if self.can_retain.can_retain() {
            log::debug!("saving continuity before teardown");
            self.continuity.perform_save();
        }
    }
}

impl RememberObserver for SaveOnTeardown {
    fn on_forgotten(&self) {
        self.save_if_retainable();
    }

    fn on_abandoned(&self) {
        self.save_if_retainable();
    }
}

fn identity<T: ?Sized>(value: &Rc<T>) -> usize {
    Rc::as_ptr(value) as *const () as usize
}

/// Attaches `continuity` to the current composition.
///
/// State is saved when this position leaves the composition during a
/// retainable teardown. One frame after attaching, values nobody claimed
/// are forgotten. `can_retain` should be the same `Rc` across passes; a new
/// checker re-attaches.
pub fn continuity_retained_state_registry(
    cx: &mut Composer<'_>,
    continuity: &Rc<Continuity>,
    can_retain: &Rc<dyn CanRetainChecker>,
) -> Rc<dyn RetainedStateRegistry> {
    cx.remember_observer_keyed(&(identity(continuity), identity(can_retain)), || {
        SaveOnTeardown {
            continuity: continuity.clone(),
            can_retain: can_retain.clone(),
        }
    });

    let registry = continuity.clone();
    cx.launched_effect(&identity(continuity), move |scope| async move {
        scope.frame_clock().next_frame().await;
        log::trace!("forgetting unclaimed retained values");
        registry.forget_unclaimed_values();
    });

    continuity.clone()
}

/// Composes `content` with `continuity` installed as the current retained
/// state registry.
pub fn with_continuity<R>(
    cx: &mut Composer<'_>,
    continuity: &Rc<Continuity>,
    can_retain: &Rc<dyn CanRetainChecker>,
    content: impl FnOnce(&mut Composer<'_>) -> R,
) -> R {
    let registry = continuity_retained_state_registry(cx, continuity, can_retain);
    cx.provide([local_retained_state_registry().provides(registry)], content)
}

#[cfg(test)]
#[path = "tests/continuity_tests.rs"]
mod tests;
