use super::*;
use crate::screen::Screen;
use std::cell::{Cell, RefCell};

#[derive(Debug, PartialEq)]
struct Named(&'static str);

impl Screen for Named {}

fn counting_handler() -> (Rc<Cell<u32>>, Rc<dyn OnPopHandler>) {
    let calls = Rc::new(Cell::new(0));
    let handler: Rc<dyn OnPopHandler> = {
        let calls = calls.clone();
        Rc::new(move || calls.set(calls.get() + 1))
    };
    (calls, handler)
}

#[test]
fn pop_past_root_defers_to_the_handler() {
    let (calls, handler) = counting_handler();
    let navigator = BackStackNavigator::new(SaveableBackStack::with_root(Named("a")), Some(handler));

    navigator.go_to(Named("b").into());
    assert_eq!(navigator.pop(), Some(AnyScreen::new(Named("b"))));
    assert_eq!(navigator.back_stack().size(), 1);
    assert_eq!(calls.get(), 0);

    assert_eq!(navigator.pop(), None);
    assert_eq!(navigator.back_stack().size(), 1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn pop_at_root_without_a_handler_is_inert() {
    let navigator = BackStackNavigator::new(SaveableBackStack::with_root(Named("a")), None);
    assert_eq!(navigator.pop(), None);
    assert_eq!(
        navigator.back_stack().top().map(|record| record.screen().clone()),
        Some(AnyScreen::new(Named("a")))
    );
}

#[derive(Default)]
struct RecordingContainer {
    renders: RefCell<Vec<crate::container::Content>>,
}

impl ContentContainer for RecordingContainer {
    fn render(&self, content: crate::container::Content) {
        self.renders.borrow_mut().push(content);
    }
}

#[test]
fn root_navigator_replaces_content_and_pops_to_the_handler() {
    let (calls, handler) = counting_handler();
    let container = Rc::new(RecordingContainer::default());
    let circuit = CircuitConfig::builder().build();
    let root = navigator(&circuit, container.clone(), Some(handler));

    root.go_to(Named("a").into());
    root.go_to(Named("b").into());
    assert_eq!(container.renders.borrow().len(), 2);

    assert_eq!(root.pop(), None);
    assert_eq!(calls.get(), 1);
}
