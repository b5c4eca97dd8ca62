#![doc = r"Composition runtime services for Circuit-RS: slot storage, composition locals, frame callbacks and cooperative tasks."]

pub mod composer;
pub mod frame_clock;
pub mod hash;
pub mod owned;
pub mod platform;
pub mod runtime;

pub use composer::{
    Composer, Composition, CompositionLocal, EffectScope, ProvidedValue, RememberObserver,
    SlotStore,
};
pub use frame_clock::{FrameCallbackRegistration, FrameClock, NextFrame};
pub use hash::location_key;
pub use owned::Owned;
pub use platform::{Clock, RuntimeScheduler};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle, TaskHandle, TaskId};

pub type Key = u64;

/// Key derived from the call site, for root compositions and groups.
#[macro_export]
macro_rules! location {
    () => {
        $crate::location_key(file!(), line!(), column!())
    };
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod runtime_tests;
