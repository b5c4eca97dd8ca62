//! System back handling.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use circuit_runtime::{Composer, CompositionLocal, RememberObserver};

struct BackCallback {
    enabled: Cell<bool>,
    on_back: RefCell<Rc<dyn Fn()>>,
}

/// Routes back presses to the most recently registered enabled handler.
#[derive(Default)]
pub struct BackDispatcher {
    callbacks: RefCell<Vec<Rc<BackCallback>>>,
}

impl BackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a handler consumed the press.
    pub fn on_back_pressed(&self) -> bool {
        let handler = self
            .callbacks
            .borrow()
            .iter()
            .rev()
            .find(|callback| callback.enabled.get())
            .map(|callback| Rc::clone(&*callback.on_back.borrow()));
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => {
                log::trace!("back press not handled");
                false
            }
        }
    }

    pub fn has_enabled_callbacks(&self) -> bool {
        self.callbacks
            .borrow()
            .iter()
            .any(|callback| callback.enabled.get())
    }

    fn add(&self, callback: Rc<BackCallback>) {
        self.callbacks.borrow_mut().push(callback);
    }

    fn remove(&self, callback: &Rc<BackCallback>) {
        self.callbacks
            .borrow_mut()
            .retain(|candidate| !Rc::ptr_eq(candidate, callback));
    }
}

impl fmt::Debug for BackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackDispatcher")
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}

thread_local! {
    static LOCAL_BACK_DISPATCHER: CompositionLocal<Option<Rc<BackDispatcher>>> =
        CompositionLocal::new(|| None);
}

pub fn local_back_dispatcher() -> CompositionLocal<Option<Rc<BackDispatcher>>> {
    LOCAL_BACK_DISPATCHER.with(Clone::clone)
}

struct BackRegistration {
    dispatcher: Rc<BackDispatcher>,
    callback: Rc<BackCallback>,
}

impl RememberObserver for BackRegistration {
    fn on_remembered(&self) {
        self.dispatcher.add(self.callback.clone());
    }

    fn on_forgotten(&self) {
        self.dispatcher.remove(&self.callback);
    }
}

/// Handles back presses with `on_back` while `enabled` and this position
/// stays in the composition. Without a dispatcher in scope it does nothing.
pub fn back_handler(cx: &mut Composer<'_>, enabled: bool, on_back: impl Fn() + 'static) {
    let Some(dispatcher) = cx.current(&local_back_dispatcher()) else {
        return;
    };
    let identity = Rc::as_ptr(&dispatcher) as usize;
    let registration = cx.remember_observer_keyed(&identity, || BackRegistration {
        dispatcher,
        callback: Rc::new(BackCallback {
            enabled: Cell::new(enabled),
            on_back: RefCell::new(Rc::new(|| {})),
        }),
    });
    registration.callback.enabled.set(enabled);
    *registration.callback.on_back.borrow_mut() = Rc::new(on_back);
}

#[cfg(test)]
#[path = "tests/back_tests.rs"]
mod tests;
