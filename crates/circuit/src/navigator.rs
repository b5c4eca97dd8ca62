//! Navigation commands.

use std::fmt;
use std::rc::Rc;

use circuit_runtime::Composer;

use crate::backstack::{remember_saveable_back_stack, SaveableBackStack};
use crate::config::CircuitConfig;
use crate::container::ContentContainer;
use crate::navigator_content::{factory_navigator, NavigatorOptions};
use crate::screen::AnyScreen;

pub trait Navigator {
    fn go_to(&self, screen: AnyScreen);

    /// Returns the popped screen, or `None` when already at the root.
    fn pop(&self) -> Option<AnyScreen>;
}

/// Called when a navigator is asked to pop past its root.
pub trait OnPopHandler {
    fn on_pop(&self);
}

impl<F: Fn()> OnPopHandler for F {
    fn on_pop(&self) {
        self();
    }
}

/// Navigator that starts a new navigation session in a content container
/// on every [`Navigator::go_to`].
#[derive(Clone)]
pub struct CircuitNavigator {
    circuit: Rc<CircuitConfig>,
    container: Rc<dyn ContentContainer>,
    on_root_pop: Option<Rc<dyn OnPopHandler>>,
    options: NavigatorOptions,
}

/// Returns a navigator rendering `circuit`'s screens into `container`.
pub fn navigator(
    circuit: &Rc<CircuitConfig>,
    container: Rc<dyn ContentContainer>,
    on_root_pop: Option<Rc<dyn OnPopHandler>>,
) -> CircuitNavigator {
    CircuitNavigator::new(circuit.clone(), container, on_root_pop)
}

impl CircuitNavigator {
    pub fn new(
        circuit: Rc<CircuitConfig>,
        container: Rc<dyn ContentContainer>,
        on_root_pop: Option<Rc<dyn OnPopHandler>>,
    ) -> Self {
        Self {
            circuit,
            container,
            on_root_pop,
            options: NavigatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: NavigatorOptions) -> Self {
        self.options = options;
        self
    }
}

impl Navigator for CircuitNavigator {
    fn go_to(&self, screen: AnyScreen) {
        log::debug!("starting navigation at {}", screen.route());
        let circuit = self.circuit.clone();
        let container = self.container.clone();
        let on_root_pop = self.on_root_pop.clone();
        let options = self.options.clone();
        self.container.render(Rc::new(move |cx: &mut Composer<'_>| {
            let back_stack = remember_saveable_back_stack(cx, || screen.clone());
            let navigator = cx
                .remember_keyed(&back_stack.id(), || {
                    Rc::new(BackStackNavigator::new(back_stack.clone(), on_root_pop.clone()))
                        as Rc<dyn Navigator>
                })
                .get();
            factory_navigator(cx, &circuit, &back_stack, &navigator, &container, &options);
        }));
    }

    fn pop(&self) -> Option<AnyScreen> {
        if let Some(handler) = &self.on_root_pop {
            handler.on_pop();
        }
        None
    }
}

impl fmt::Debug for CircuitNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitNavigator")
            .field("circuit", &self.circuit)
            .field("on_root_pop", &self.on_root_pop.is_some())
            .finish()
    }
}

/// Navigator over a single back stack: `go_to` pushes, `pop` pops until the
/// root and then defers to the root pop handler.
pub struct BackStackNavigator {
    back_stack: SaveableBackStack,
    on_root_pop: Option<Rc<dyn OnPopHandler>>,
}

impl BackStackNavigator {
    pub fn new(back_stack: SaveableBackStack, on_root_pop: Option<Rc<dyn OnPopHandler>>) -> Self {
        Self {
            back_stack,
            on_root_pop,
        }
    }

    pub fn back_stack(&self) -> &SaveableBackStack {
        &self.back_stack
    }
}

impl Navigator for BackStackNavigator {
    fn go_to(&self, screen: AnyScreen) {
        self.back_stack.push(screen);
    }

    fn pop(&self) -> Option<AnyScreen> {
        if self.back_stack.is_at_root() {
            if let Some(handler) = &self.on_root_pop {
                handler.on_pop();
            }
            return None;
        }
        self.back_stack.pop().map(|record| record.screen().clone())
    }
}

impl fmt::Debug for BackStackNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackStackNavigator")
            .field("back_stack", &self.back_stack)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/navigator_tests.rs"]
mod tests;
