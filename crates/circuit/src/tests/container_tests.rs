use super::*;
use crate::back::back_handler;
use circuit_retained::remember_retained;
use circuit_runtime::{Owned, RememberObserver};

struct Lifecycle(Rc<RefCell<Vec<&'static str>>>);

impl RememberObserver for Lifecycle {
    fn on_remembered(&self) {
        self.0.borrow_mut().push("remembered");
    }

    fn on_forgotten(&self) {
        self.0.borrow_mut().push("forgotten");
    }
}

#[test]
fn frames_without_content_are_empty() {
    let mut host = ContentHost::new().expect("host");
    assert!(host.frame(0).is_ok());
    assert!(!host.take_frame_request());
}

#[test]
fn rendering_requests_a_frame_and_replaces_content() {
    let mut host = ContentHost::new().expect("host");
    let events = Rc::new(RefCell::new(Vec::new()));
    let container = host.container();

    container.render({
        let events = events.clone();
        Rc::new(move |cx: &mut Composer<'_>| {
            let events = events.clone();
            cx.remember_observer(move || Lifecycle(events));
        })
    });
    assert!(host.take_frame_request());
    host.frame(1).expect("frame");
    host.frame(2).expect("frame");
    assert_eq!(*events.borrow(), ["remembered"]);

    container.render(Rc::new(|_cx: &mut Composer<'_>| {}));
    host.frame(3).expect("frame");
    assert_eq!(*events.borrow(), ["remembered", "forgotten"]);
}

#[test]
fn recreate_restores_retained_values() {
    let mut host = ContentHost::new().expect("host");
    let latest: Rc<RefCell<Option<Owned<u32>>>> = Rc::default();
    host.container().render({
        let latest = latest.clone();
        Rc::new(move |cx: &mut Composer<'_>| {
            let value = remember_retained(cx, || 0u32);
            *latest.borrow_mut() = Some(value);
        })
    });

    host.frame(1).expect("frame");
    let before = latest.borrow().clone().expect("composed");
    before.replace(5);

    host.recreate().expect("recreate");
    host.frame(2).expect("frame");
    let after = latest.borrow().clone().expect("composed");
    assert_eq!(after.get(), 5);
    assert!(after.ptr_eq(&before));

    host.frame(3).expect("frame");
    assert!(host.continuity().peek_retained().is_empty());
}

#[test]
fn replacing_content_does_not_retain() {
    let mut host = ContentHost::new().expect("host");
    let latest: Rc<RefCell<Option<Owned<u32>>>> = Rc::default();
    let content: Content = {
        let latest = latest.clone();
        Rc::new(move |cx: &mut Composer<'_>| {
            let value = remember_retained(cx, || 0u32);
            *latest.borrow_mut() = Some(value);
        })
    };

    host.container().render(content.clone());
    host.frame(1).expect("frame");
    latest.borrow().as_ref().expect("composed").replace(5);

    host.container().render(content);
    host.frame(2).expect("frame");
    assert_eq!(latest.borrow().as_ref().expect("composed").get(), 0);
}

#[test]
fn back_presses_reach_handlers_in_content() {
    let mut host = ContentHost::new().expect("host");
    let presses = Rc::new(Cell::new(0));
    host.container().render({
        let presses = presses.clone();
        Rc::new(move |cx: &mut Composer<'_>| {
            let presses = presses.clone();
            back_handler(cx, true, move || presses.set(presses.get() + 1));
        })
    });

    assert!(!host.back_pressed());
    host.frame(1).expect("frame");
    assert!(host.back_pressed());
    assert_eq!(presses.get(), 1);
}

#[test]
fn disposed_hosts_refuse_frames() {
    let mut host = ContentHost::new().expect("host");
    let continuity = host.continuity();
    host.container().render(Rc::new(|cx: &mut Composer<'_>| {
        remember_retained(cx, || 1u8);
    }));
    host.frame(1).expect("frame");
    assert_eq!(continuity.peek_providers().len(), 1);

    host.dispose();

    assert!(host.is_disposed());
    assert!(host.scope().is_empty());
    assert!(continuity.peek_providers().is_empty());
    assert_eq!(host.frame(2), Err(RenderError::Disposed));
    assert_eq!(host.recreate(), Err(RenderError::Disposed));
}
