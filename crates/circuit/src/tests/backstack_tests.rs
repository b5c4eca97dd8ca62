use super::*;
use crate::screen::Screen;
use circuit_runtime::{DefaultScheduler, Runtime};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Named(&'static str);

impl Screen for Named {
    fn route(&self) -> String {
        self.0.to_owned()
    }
}

fn routes(stack: &SaveableBackStack) -> Vec<String> {
    stack
        .records()
        .iter()
        .map(|record| record.route().to_owned())
        .collect()
}

#[test]
fn root_detection_follows_length() {
    let stack = SaveableBackStack::new();
    assert!(!stack.is_at_root());
    stack.push(Named("a"));
    assert!(stack.is_at_root());
    stack.push(Named("b"));
    assert!(!stack.is_at_root());
}

#[test]
fn push_then_pop_returns_records_in_lifo_order() {
    let stack = SaveableBackStack::with_root(Named("a"));
    stack.push(Named("b"));
    assert_eq!(routes(&stack), ["b", "a"]);

    let popped = stack.pop().expect("b is above the root");
    assert_eq!(popped.screen(), &AnyScreen::new(Named("b")));
    assert_eq!(routes(&stack), ["a"]);
}

#[test]
fn pop_at_root_keeps_the_root() {
    let stack = SaveableBackStack::with_root(Named("a"));
    assert!(stack.pop().is_none());
    assert_eq!(stack.size(), 1);
    assert_eq!(stack.top(), stack.root());
}

#[test]
fn pushing_n_and_popping_n_minus_one_leaves_the_root() {
    let stack = SaveableBackStack::new();
    let names = ["root", "one", "two", "three", "four"];
    for name in names {
        stack.push(Named(name));
    }
    for _ in 1..names.len() {
        assert!(stack.pop().is_some());
    }
    assert_eq!(routes(&stack), ["root"]);
}

#[test]
fn equal_screens_get_distinct_keys() {
    let stack = SaveableBackStack::with_root(Named("a"));
    let first = stack.push(Named("b"));
    stack.pop();
    let second = stack.push(Named("b"));

    assert_ne!(first, second);
    assert!(second > first);
}

#[test]
fn mutations_request_a_frame_once_attached() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let stack = SaveableBackStack::with_root(Named("a"));
    assert!(!runtime.needs_frame());

    stack.attach(runtime.handle());
    stack.push(Named("b"));
    assert!(runtime.needs_frame());

    runtime.set_needs_frame(false);
    stack.pop();
    assert!(runtime.needs_frame());

    runtime.set_needs_frame(false);
    stack.pop();
    assert!(!runtime.needs_frame(), "a refused pop changes nothing");
}
