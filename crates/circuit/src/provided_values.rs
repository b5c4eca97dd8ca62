//! Composition locals scoped to a single back stack record.

use std::cell::RefCell;
use std::rc::Rc;

use circuit_retained::{
    continuity_factory, continuity_retained_state_registry, local_can_retain_checker,
    local_retained_state_registry, local_scoped_object_store, CanRetainChecker, Continuity,
    CreatedObject, ObjectRequest, ScopeError, ScopedObject, ScopedObjectStore,
};
use circuit_runtime::hash::map::HashMap;
use circuit_runtime::{Composer, ProvidedValue};

use crate::backstack::{Record, RecordKey};

/// Supplies locals visible only inside one record's content. Runs inside
/// that record's composition, so anything it remembers lives and dies with
/// the record.
pub trait BackStackRecordLocalProvider {
    fn provide_values(&self, cx: &mut Composer<'_>, record: &Record) -> Vec<ProvidedValue>;

    /// Called once when `record` is mounted. The returned teardown runs when
    /// the record's content is dropped, even if it was never composed.
    fn on_mount(&self, _cx: &Composer<'_>, _record: &Record) -> Option<RecordTeardown> {
        None
    }
}

/// Work to run when a record's mounted content goes away.
pub struct RecordTeardown(Option<Box<dyn FnOnce()>>);

impl RecordTeardown {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(teardown)))
    }
}

impl Drop for RecordTeardown {
    fn drop(&mut self) {
        if let Some(teardown) = self.0.take() {
            teardown();
        }
    }
}

/// Per-record retained state registries, kept in the host's scoped object
/// store so they survive recreation.
#[derive(Debug, Default)]
pub struct BackStackRecordLocalProviderStore {
    registries: RefCell<HashMap<RecordKey, Rc<Continuity>>>,
}

impl BackStackRecordLocalProviderStore {
    pub const KEY: &'static str = "BackStackRecordLocalProviderStore";

    pub fn obtain(store: &ScopedObjectStore) -> Result<Rc<Self>, ScopeError> {
        store.get_or_create::<Self>(Self::KEY, &circuit_object_factory)
    }

    pub fn registry_for(&self, key: RecordKey) -> Rc<Continuity> {
        self.registries
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| Rc::new(Continuity::new()))
            .clone()
    }

    /// Drops the registry of a record that left its back stack.
    pub fn discard(&self, key: RecordKey) {
        let removed = self.registries.borrow_mut().remove(&key);
        if let Some(registry) = removed {
            log::debug!("discarding retained state of {key}");
            registry.on_cleared();
        }
    }

    pub fn contains(&self, key: RecordKey) -> bool {
        self.registries.borrow().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.registries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.borrow().is_empty()
    }
}

impl ScopedObject for BackStackRecordLocalProviderStore {
    fn on_cleared(&self) {
        let registries = std::mem::take(&mut *self.registries.borrow_mut());
        for registry in registries.into_values() {
            registry.on_cleared();
        }
    }
}

/// Builds every scoped object the navigator stores.
pub fn circuit_object_factory(request: &ObjectRequest<'_>) -> Result<CreatedObject, ScopeError> {
    if request.is::<BackStackRecordLocalProviderStore>() {
        Ok(CreatedObject::new(BackStackRecordLocalProviderStore::default()))
    } else {
        continuity_factory(request)
    }
}

fn record_store(cx: &Composer<'_>) -> Option<Rc<BackStackRecordLocalProviderStore>> {
    let scope = cx.current(&local_scoped_object_store())?;
    match BackStackRecordLocalProviderStore::obtain(&scope) {
        Ok(store) => Some(store),
        Err(err) => {
            log::error!("record locals unavailable: {err}");
            None
        }
    }
}

/// Gives each record its own retained state registry. The registry is
/// discarded with the record's content unless the teardown is retainable.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetainedRecordLocalProvider;

impl BackStackRecordLocalProvider for RetainedRecordLocalProvider {
    fn provide_values(&self, cx: &mut Composer<'_>, record: &Record) -> Vec<ProvidedValue> {
        let Some(store) = record_store(cx) else {
            return Vec::new();
        };
        let can_retain = cx.current(&local_can_retain_checker());
        let continuity = store.registry_for(record.key());
        let registry = continuity_retained_state_registry(cx, &continuity, &can_retain);
        vec![local_retained_state_registry().provides(registry)]
    }

    fn on_mount(&self, cx: &Composer<'_>, record: &Record) -> Option<RecordTeardown> {
        let store = record_store(cx)?;
        let can_retain: Rc<dyn CanRetainChecker> = cx.current(&local_can_retain_checker());
        let key = record.key();
        Some(RecordTeardown::new(move || {
            if !can_retain.can_retain() {
                store.discard(key);
            }
        }))
    }
}

#[cfg(test)]
#[path = "tests/provided_values_tests.rs"]
mod tests;
