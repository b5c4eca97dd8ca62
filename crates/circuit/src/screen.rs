//! Navigable destinations.

use std::any::{self, Any};
use std::fmt;
use std::rc::Rc;

/// Object-safe equality for screens.
pub trait ScreenEq {
    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: PartialEq + Any> ScreenEq for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// A destination presenters and UIs are resolved for.
///
/// Screens are plain data: the minimum a presenter needs to start producing
/// state.
///
/// ```
/// use circuit::Screen;
///
/// #[derive(Debug, PartialEq)]
/// struct Profile {
///     user_id: u64,
/// }
///
/// impl Screen for Profile {}
///
/// assert_eq!(Profile { user_id: 1 }.route(), "Profile");
/// ```
pub trait Screen: ScreenEq + fmt::Debug + 'static {
    /// Name shown for this destination, the type name by default.
    fn route(&self) -> String {
        short_type_name(any::type_name::<Self>()).to_owned()
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Shared, type-erased [`Screen`].
#[derive(Clone)]
pub struct AnyScreen(Rc<dyn Screen>);

impl AnyScreen {
    pub fn new<S: Screen>(screen: S) -> Self {
        Self(Rc::new(screen))
    }

    pub fn route(&self) -> String {
        self.0.route()
    }

    pub fn is<S: Screen>(&self) -> bool {
        self.0.as_any().is::<S>()
    }

    pub fn downcast_ref<S: Screen>(&self) -> Option<&S> {
        self.0.as_any().downcast_ref::<S>()
    }
}

impl<S: Screen> From<S> for AnyScreen {
    fn from(screen: S) -> Self {
        Self::new(screen)
    }
}

impl PartialEq for AnyScreen {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_any())
    }
}

impl fmt::Debug for AnyScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
