use super::*;
use crate::remember::remember_retained_keyed;
use circuit_runtime::{location, Composition, DefaultScheduler, Owned, Runtime};
use std::cell::Cell;
use std::sync::Arc;

struct Host {
    runtime: Runtime,
    store: ScopedObjectStore,
    retaining: Rc<Cell<bool>>,
    checker: Rc<dyn CanRetainChecker>,
}

impl Host {
    fn new() -> Self {
        let retaining = Rc::new(Cell::new(false));
        let checker: Rc<dyn CanRetainChecker> = {
            let retaining = retaining.clone();
            Rc::new(move || retaining.get())
        };
        Self {
            runtime: Runtime::new(Arc::new(DefaultScheduler)),
            store: ScopedObjectStore::new(),
            retaining,
            checker,
        }
    }

    fn continuity(&self) -> Rc<Continuity> {
        Continuity::obtain(&self.store).expect("continuity is always constructible")
    }

    fn composition(&self) -> Composition {
        Composition::new(self.runtime.clone(), location!())
    }

    fn render(&self, composition: &mut Composition, keys: &[&str]) -> Vec<Owned<u32>> {
        let continuity = self.continuity();
        let checker = self.checker.clone();
        composition.render(0, |cx| {
            with_continuity(cx, &continuity, &checker, |cx| {
                keys.iter()
                    .map(|key| remember_retained_keyed(cx, key, || 0u32))
                    .collect::<Vec<_>>()
            })
        })
    }

    fn frame(&self, time: u64) {
        let handle = self.runtime.handle();
        handle.drain_ui();
        handle.drain_frame_callbacks(time);
        handle.drain_ui();
    }
}

#[test]
fn obtain_reattaches_to_the_same_instance() {
    let host = Host::new();
    assert!(Rc::ptr_eq(&host.continuity(), &host.continuity()));
    assert!(host.store.contains(Continuity::KEY));
}

#[test]
fn retainable_teardown_saves_before_holders_unregister() {
    let host = Host::new();
    let mut first = host.composition();
    let values = host.render(&mut first, &["count"]);
    values[0].replace(3);

    host.retaining.set(true);
    drop(first);
    host.retaining.set(false);

    let continuity = host.continuity();
    assert_eq!(continuity.peek_retained().get("count").map(Vec::len), Some(1));
    assert!(continuity.peek_providers().is_empty());

    let mut second = host.composition();
    let restored = host.render(&mut second, &["count"]);
    assert_eq!(restored[0].get(), 3);
}

#[test]
fn final_teardown_saves_nothing() {
    let host = Host::new();
    let mut first = host.composition();
    host.render(&mut first, &["count"])[0].replace(3);
    drop(first);

    assert!(host.continuity().peek_retained().is_empty());

    let mut second = host.composition();
    assert_eq!(host.render(&mut second, &["count"])[0].get(), 0);
}

#[test]
fn unclaimed_values_are_forgotten_one_frame_after_attach() {
    let host = Host::new();
    let mut first = host.composition();
    host.render(&mut first, &["kept", "dropped"]);
    host.retaining.set(true);
    drop(first);
    host.retaining.set(false);

    let mut second = host.composition();
    host.render(&mut second, &["kept"]);
    let continuity = host.continuity();
    assert!(continuity.peek_retained().contains_key("dropped"));

    host.frame(16);

    let retained = continuity.peek_retained();
    assert!(!retained.contains_key("dropped"));
    assert!(!retained.contains_key("kept"), "consumed on restore");
    assert_eq!(continuity.peek_providers().get("kept"), Some(&1));
}

#[test]
fn forget_effect_is_cancelled_when_disposed_first() {
    let host = Host::new();
    let continuity = host.continuity();
    let orphan = continuity.register_value("orphan", Box::new(|| Rc::new(1u8) as RetainedValue));
    continuity.perform_save();
    orphan.unregister();

    let mut composition = host.composition();
    host.render(&mut composition, &[]);
    host.runtime.handle().drain_ui();
    drop(composition);

    host.frame(16);
    assert!(continuity.peek_retained().contains_key("orphan"));
}

#[test]
fn clearing_the_scope_empties_both_maps() {
    let host = Host::new();
    let mut composition = host.composition();
    host.render(&mut composition, &["count"]);
    let continuity = host.continuity();
    continuity.perform_save();

    host.store.clear();

    assert!(continuity.peek_retained().is_empty());
    assert!(continuity.peek_providers().is_empty());
    assert!(!host.store.contains(Continuity::KEY));
}
