//! Hashing and map selection shared by the slot store and group keys.
//!
//! The `std-hash` feature swaps `hashbrown`/`ahash` for the standard library
//! implementations.

use core::hash::Hash;
use std::hash::Hasher;

use crate::Key;

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

#[cfg(feature = "std-hash")]
mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

#[inline]
pub fn hash_one<T: Hash + ?Sized>(v: &T) -> Key {
    let mut h = default::new();
    v.hash(&mut h);
    h.finish()
}

/// Derives the key of a child position from its parent group key.
#[inline]
pub fn combine(parent: Key, child: Key) -> Key {
    let mut h = default::new();
    parent.hash(&mut h);
    child.hash(&mut h);
    h.finish()
}

pub fn location_key(file: &str, line: u32, column: u32) -> Key {
    let mut h = default::new();
    file.hash(&mut h);
    line.hash(&mut h);
    column.hash(&mut h);
    h.finish()
}
