use super::*;
use circuit_runtime::{location, Composition, DefaultScheduler, Runtime};
use std::sync::Arc;

fn compose(
    composition: &mut Composition,
    dispatcher: &Rc<BackDispatcher>,
    handlers: &[(bool, &'static str)],
    log: &Rc<RefCell<Vec<&'static str>>>,
) {
    composition.render(0, |cx| {
        cx.provide([local_back_dispatcher().provides(Some(dispatcher.clone()))], |cx| {
            for (enabled, name) in handlers.iter().copied() {
                let log = log.clone();
                cx.with_key(name, |cx| back_handler(cx, enabled, move || log.borrow_mut().push(name)));
            }
        })
    });
}

#[test]
fn latest_enabled_handler_wins() {
    let dispatcher = Rc::new(BackDispatcher::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut composition = Composition::new(Runtime::new(Arc::new(DefaultScheduler)), location!());

    compose(&mut composition, &dispatcher, &[(true, "outer"), (true, "inner")], &log);
    assert!(dispatcher.on_back_pressed());

    compose(&mut composition, &dispatcher, &[(true, "outer"), (false, "inner")], &log);
    assert!(dispatcher.on_back_pressed());

    assert_eq!(*log.borrow(), ["inner", "outer"]);
}

#[test]
fn forgotten_handlers_unregister() {
    let dispatcher = Rc::new(BackDispatcher::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut composition = Composition::new(Runtime::new(Arc::new(DefaultScheduler)), location!());

    compose(&mut composition, &dispatcher, &[(true, "only")], &log);
    assert!(dispatcher.has_enabled_callbacks());

    compose(&mut composition, &dispatcher, &[], &log);
    assert!(!dispatcher.has_enabled_callbacks());
    assert!(!dispatcher.on_back_pressed());
    assert!(log.borrow().is_empty());
}

#[test]
fn without_a_dispatcher_nothing_registers() {
    let mut composition = Composition::new(Runtime::new(Arc::new(DefaultScheduler)), location!());
    composition.render(0, |cx| back_handler(cx, true, || {}));
    assert_eq!(composition.slot_count(), 0);
}
