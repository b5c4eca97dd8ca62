//! Keyed store of values that outlive the composition that produced them.
//!
//! Providers registered with [`RetainedStateRegistry::register_value`] are the
//! source of future saves; [`RetainedStateRegistry::perform_save`] snapshots
//! them into the retained map, which is the sink that
//! [`RetainedStateRegistry::consume_value`] drains after recreation.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use circuit_runtime::hash::map::HashMap;
use circuit_runtime::CompositionLocal;

/// A value captured by [`RetainedStateRegistry::perform_save`].
pub type RetainedValue = Rc<dyn Any>;

/// Produces the value to retain for one registration.
pub type ValueProvider = Box<dyn Fn() -> RetainedValue>;

pub trait RetainedStateRegistry {
    /// Pops the most recently saved value under `key`, if any. Providers are
    /// never consulted; repeated calls drain the saved sequence from its end.
    fn consume_value(&self, key: &str) -> Option<RetainedValue>;

    /// Registers `provider` under `key`. Several providers may share a key;
    /// their values are saved in registration order.
    fn register_value(&self, key: &str, provider: ValueProvider) -> Entry;

    /// Replaces the saved sequence of every key that has at least one
    /// provider with the providers' current values.
    fn perform_save(&self);

    /// Drops saved values whose key has no registered provider.
    fn forget_unclaimed_values(&self);
}

#[derive(Default)]
struct RegistryState {
    retained: HashMap<String, Vec<RetainedValue>>,
    providers: HashMap<String, Vec<(u64, Rc<dyn Fn() -> RetainedValue>)>>,
    next_provider_id: u64,
}

impl RegistryState {
    fn unregister(&mut self, key: &str, id: u64) -> bool {
        let Some(list) = self.providers.get_mut(key) else {
            return false;
        };
        let Some(index) = list.iter().position(|(candidate, _)| *candidate == id) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.providers.remove(key);
        }
        true
    }
}

/// Handle returned by [`RetainedStateRegistry::register_value`].
#[must_use = "dropping an Entry keeps the provider registered; call `unregister` to remove it"]
pub struct Entry {
    state: Weak<RefCell<RegistryState>>,
    key: String,
    id: u64,
}

impl Entry {
    /// An entry that is not attached to any registry.
    pub fn detached(key: &str) -> Self {
        Self {
            state: Weak::new(),
            key: key.to_owned(),
            id: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes exactly the provider this entry was issued for.
    pub fn unregister(self) {
        if let Some(state) = self.state.upgrade() {
            if state.borrow_mut().unregister(&self.key, self.id) {
                log::trace!("unregistered provider {} for `{}`", self.id, self.key);
            }
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

/// Default in-memory [`RetainedStateRegistry`].
#[derive(Clone, Default)]
pub struct RetainedStateRegistryImpl {
    state: Rc<RefCell<RegistryState>>,
}

impl RetainedStateRegistryImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose retained map is seeded with `values`.
    pub fn with_restored(values: impl IntoIterator<Item = (String, Vec<RetainedValue>)>) -> Self {
        let registry = Self::default();
        registry.state.borrow_mut().retained = values
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .collect();
        registry
    }

    /// Clears both maps without going through the registry contract.
    pub(crate) fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.retained.clear();
        state.providers.clear();
    }

    pub(crate) fn retained_snapshot(&self) -> HashMap<String, Vec<RetainedValue>> {
        self.state.borrow().retained.clone()
    }

    pub(crate) fn provider_counts(&self) -> HashMap<String, usize> {
        self.state
            .borrow()
            .providers
            .iter()
            .map(|(key, list)| (key.clone(), list.len()))
            .collect()
    }
}

impl RetainedStateRegistry for RetainedStateRegistryImpl {
    fn consume_value(&self, key: &str) -> Option<RetainedValue> {
        let mut state = self.state.borrow_mut();
        let values = state.retained.get_mut(key)?;
        let value = values.pop();
        if values.is_empty() {
            state.retained.remove(key);
        }
        log::trace!("consume `{key}` -> {}", value.is_some());
        value
    }

    fn register_value(&self, key: &str, provider: ValueProvider) -> Entry {
        let mut state = self.state.borrow_mut();
        let id = state.next_provider_id;
        state.next_provider_id += 1;
        state
            .providers
            .entry(key.to_owned())
            .or_default()
            .push((id, Rc::from(provider)));
        log::trace!("registered provider {id} for `{key}`");
        Entry {
            state: Rc::downgrade(&self.state),
            key: key.to_owned(),
            id,
        }
    }

    fn perform_save(&self) {
        // Providers run without the state borrowed so they may read other
        // registries or composition state freely.
        let snapshot: Vec<(String, Vec<Rc<dyn Fn() -> RetainedValue>>)> = self
            .state
            .borrow()
            .providers
            .iter()
            .map(|(key, list)| {
                let providers = list.iter().map(|(_, provider)| Rc::clone(provider)).collect();
                (key.clone(), providers)
            })
            .collect();
        let saved: Vec<(String, Vec<RetainedValue>)> = snapshot
            .into_iter()
            .map(|(key, providers)| {
                let values = providers.iter().map(|provider| provider()).collect();
                (key, values)
            })
            .collect();
        let mut state = self.state.borrow_mut();
        log::debug!("saving {} retained keys", saved.len());
        for (key, values) in saved {
            state.retained.insert(key, values);
        }
    }

    fn forget_unclaimed_values(&self) {
        let mut state = self.state.borrow_mut();
        let RegistryState {
            retained,
            providers,
            ..
        } = &mut *state;
        let before = retained.len();
        retained.retain(|key, values| !values.is_empty() && providers.contains_key(key));
        let forgotten = before - retained.len();
        if forgotten > 0 {
            log::debug!("forgot {forgotten} unclaimed retained keys");
        }
    }
}

impl fmt::Debug for RetainedStateRegistryImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RetainedStateRegistryImpl")
            .field("retained", &state.retained.len())
            .field("providers", &state.providers.len())
            .finish()
    }
}

/// Registry used when none has been provided: nothing is ever retained.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpRetainedStateRegistry;

impl RetainedStateRegistry for NoOpRetainedStateRegistry {
    fn consume_value(&self, _key: &str) -> Option<RetainedValue> {
        None
    }

    fn register_value(&self, key: &str, _provider: ValueProvider) -> Entry {
        Entry::detached(key)
    }

    fn perform_save(&self) {}

    fn forget_unclaimed_values(&self) {}
}

thread_local! {
    static LOCAL_RETAINED_STATE_REGISTRY: CompositionLocal<Rc<dyn RetainedStateRegistry>> =
        CompositionLocal::new(|| Rc::new(NoOpRetainedStateRegistry) as Rc<dyn RetainedStateRegistry>);
}

/// Composition local holding the registry `remember_retained` talks to.
pub fn local_retained_state_registry() -> CompositionLocal<Rc<dyn RetainedStateRegistry>> {
    LOCAL_RETAINED_STATE_REGISTRY.with(Clone::clone)
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
