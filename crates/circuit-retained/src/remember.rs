use std::cell::RefCell;
use std::rc::Rc;

use circuit_runtime::{Composer, Owned, RememberObserver};

use crate::registry::{local_retained_state_registry, Entry, RetainedStateRegistry, RetainedValue};

struct RetainedHolder<T: 'static> {
    registry: Rc<dyn RetainedStateRegistry>,
    key: String,
    value: Owned<T>,
    entry: RefCell<Option<Entry>>,
}

impl<T: 'static> RetainedHolder<T> {
    fn release(&self) {
        if let Some(entry) = self.entry.borrow_mut().take() {
            entry.unregister();
        }
    }
}

impl<T: 'static> RememberObserver for RetainedHolder<T> {
    fn on_remembered(&self) {
        let value = self.value.clone();
        let entry = self.registry.register_value(
            &self.key,
            Box::new(move || Rc::new(value.clone()) as RetainedValue),
        );
        if let Some(previous) = self.entry.borrow_mut().replace(entry) {
            previous.unregister();
        }
    }

    fn on_forgotten(&self) {
        self.release();
    }

    fn on_abandoned(&self) {
        self.release();
    }
}

/// Remembers a value that survives recreation of the composition through the
/// current retained state registry. The key is this call's position.
pub fn remember_retained<T: 'static>(cx: &mut Composer<'_>, init: impl FnOnce() -> T) -> Owned<T> {
    let key = cx.composite_key_hash().to_string();
    remember_retained_keyed(cx, &key, init)
}

/// Like [`remember_retained`] with an explicit registry key.
pub fn remember_retained_keyed<T: 'static>(
    cx: &mut Composer<'_>,
    key: &str,
    init: impl FnOnce() -> T,
) -> Owned<T> {
    let registry = cx.current(&local_retained_state_registry());
    let registry_id = Rc::as_ptr(&registry) as *const () as usize;
    let holder = cx.remember_observer_keyed(&(key, registry_id), || {
        let restored = registry
            .consume_value(key)
            .and_then(|value| value.downcast::<Owned<T>>().ok())
            .map(|value| (*value).clone());
        if restored.is_some() {
            log::trace!("restored retained value for `{key}`");
        }
        RetainedHolder {
            registry: registry.clone(),
            key: key.to_owned(),
            value: restored.unwrap_or_else(|| Owned::new(init())),
            entry: RefCell::new(None),
        }
    });
    holder.value.clone()
}

#[cfg(test)]
#[path = "tests/remember_tests.rs"]
mod tests;
