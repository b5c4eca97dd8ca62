use std::fmt;
use std::rc::Rc;

use crate::container::ContentContainer;
use crate::navigator::Navigator;
use crate::presenter::{AnyPresenter, PresenterFactory};
use crate::screen::AnyScreen;
use crate::ui::{AnyUi, UiFactory};

/// Ordered presenter and UI factory chains. The first factory that answers
/// for a screen wins.
#[derive(Clone, Default)]
pub struct CircuitConfig {
    presenter_factories: Vec<Rc<dyn PresenterFactory>>,
    ui_factories: Vec<Rc<dyn UiFactory>>,
}

impl CircuitConfig {
    pub fn builder() -> CircuitConfigBuilder {
        CircuitConfigBuilder::default()
    }

    pub fn presenter(&self, screen: &AnyScreen, navigator: &Rc<dyn Navigator>) -> Option<AnyPresenter> {
        self.presenter_factories
            .iter()
            .find_map(|factory| factory.create(screen, navigator))
    }

    pub fn ui(&self, screen: &AnyScreen, container: &Rc<dyn ContentContainer>) -> Option<AnyUi> {
        self.ui_factories
            .iter()
            .find_map(|factory| factory.create(screen, container))
    }

    /// A builder seeded with this configuration's factories.
    pub fn new_builder(&self) -> CircuitConfigBuilder {
        CircuitConfigBuilder {
            config: self.clone(),
        }
    }
}

impl fmt::Debug for CircuitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitConfig")
            .field("presenter_factories", &self.presenter_factories.len())
            .field("ui_factories", &self.ui_factories.len())
            .finish()
    }
}

#[derive(Default)]
pub struct CircuitConfigBuilder {
    config: CircuitConfig,
}

impl CircuitConfigBuilder {
    pub fn add_presenter_factory(mut self, factory: impl PresenterFactory + 'static) -> Self {
        self.config.presenter_factories.push(Rc::new(factory));
        self
    }

    pub fn add_ui_factory(mut self, factory: impl UiFactory + 'static) -> Self {
        self.config.ui_factories.push(Rc::new(factory));
        self
    }

    pub fn build(self) -> Rc<CircuitConfig> {
        Rc::new(self.config)
    }
}

impl fmt::Debug for CircuitConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CircuitConfigBuilder").field(&self.config).finish()
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
