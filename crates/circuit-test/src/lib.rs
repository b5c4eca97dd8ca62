//! Test doubles and harness for Circuit-RS

pub mod navigator;
pub mod rule;

pub use navigator::FakeNavigator;
pub use rule::CircuitTestRule;

pub mod prelude {
    pub use crate::navigator::FakeNavigator;
    pub use crate::rule::CircuitTestRule;
}
