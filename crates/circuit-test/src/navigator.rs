use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use circuit::{AnyScreen, Navigator, SaveableBackStack};

/// [`Navigator`] for presenter tests.
///
/// Navigation really happens on an owned [`SaveableBackStack`], and every
/// call is queued so a test can assert on what the presenter asked for.
pub struct FakeNavigator {
    back_stack: SaveableBackStack,
    go_to_events: RefCell<VecDeque<AnyScreen>>,
    pop_events: RefCell<VecDeque<Option<AnyScreen>>>,
}

impl FakeNavigator {
    pub fn new(root: impl Into<AnyScreen>) -> Self {
        Self {
            back_stack: SaveableBackStack::with_root(root),
            go_to_events: RefCell::new(VecDeque::new()),
            pop_events: RefCell::new(VecDeque::new()),
        }
    }

    pub fn back_stack(&self) -> &SaveableBackStack {
        &self.back_stack
    }

    /// Screens on the back stack, top first.
    pub fn screens(&self) -> Vec<AnyScreen> {
        self.back_stack
            .records()
            .iter()
            .map(|record| record.screen().clone())
            .collect()
    }

    /// Oldest `go_to` not yet taken.
    pub fn take_next_screen(&self) -> Option<AnyScreen> {
        self.go_to_events.borrow_mut().pop_front()
    }

    /// Oldest `pop` not yet taken, holding what that pop returned.
    pub fn take_pop(&self) -> Option<Option<AnyScreen>> {
        self.pop_events.borrow_mut().pop_front()
    }

    /// Panics unless the next `go_to` was for `expected`.
    pub fn assert_go_to(&self, expected: impl Into<AnyScreen>) {
        let expected = expected.into();
        match self.take_next_screen() {
            Some(screen) => assert_eq!(screen, expected, "unexpected go_to"),
            None => panic!("expected go_to({expected:?}) but there was none"),
        }
    }

    /// Panics unless a `pop` was recorded.
    pub fn assert_pop(&self) -> Option<AnyScreen> {
        match self.take_pop() {
            Some(result) => result,
            None => panic!("expected a pop but there was none"),
        }
    }

    pub fn assert_no_unconsumed_events(&self) {
        assert!(
            self.go_to_events.borrow().is_empty(),
            "unconsumed go_to events: {:?}",
            self.go_to_events.borrow()
        );
        assert!(
            self.pop_events.borrow().is_empty(),
            "unconsumed pop events: {:?}",
            self.pop_events.borrow()
        );
    }
}

impl Navigator for FakeNavigator {
    fn go_to(&self, screen: AnyScreen) {
        log::trace!("fake go_to {}", screen.route());
        self.go_to_events.borrow_mut().push_back(screen.clone());
        self.back_stack.push(screen);
    }

    fn pop(&self) -> Option<AnyScreen> {
        let popped = self.back_stack.pop().map(|record| record.screen().clone());
        log::trace!("fake pop -> {popped:?}");
        self.pop_events.borrow_mut().push_back(popped.clone());
        popped
    }
}

impl fmt::Debug for FakeNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeNavigator")
            .field("back_stack", &self.back_stack)
            .field("pending_go_to", &self.go_to_events.borrow().len())
            .field("pending_pop", &self.pop_events.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit::Screen;

    #[derive(Debug, PartialEq)]
    struct Named(&'static str);

    impl Screen for Named {}

    #[test]
    fn records_navigation_and_moves_the_stack() {
        let navigator = FakeNavigator::new(Named("home"));

        navigator.go_to(Named("detail").into());
        assert_eq!(navigator.screens(), [AnyScreen::new(Named("detail")), AnyScreen::new(Named("home"))]);
        navigator.assert_go_to(Named("detail"));

        assert_eq!(navigator.pop(), Some(AnyScreen::new(Named("detail"))));
        assert_eq!(navigator.pop(), None);
        assert_eq!(navigator.assert_pop(), Some(AnyScreen::new(Named("detail"))));
        assert_eq!(navigator.assert_pop(), None);
        navigator.assert_no_unconsumed_events();
    }

    #[test]
    #[should_panic(expected = "expected a pop")]
    fn missing_pop_fails_the_assertion() {
        FakeNavigator::new(Named("home")).assert_pop();
    }
}
