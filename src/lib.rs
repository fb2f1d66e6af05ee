//! Concurrent linked lists under two synchronization disciplines, and a
//! read-during-write benchmark that compares them.
//!
//! - [`list::locked::LockedList`]: a doubly linked list behind a single mutex,
//!   with an index table for O(1) lookup by id.
//! - [`list::lockfree::LockFreeList`]: a singly linked list where writers
//!   publish new heads with a compare-and-swap and readers never block.
//!
//! Both are reachable through [`list::Engine`], which picks an implementation
//! from a [`list::Discipline`]. The `bench` module (feature `std`) drives an
//! engine with one producer and many consumers and reports how long each
//! consumer needs to observe the whole list.
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod list;

#[cfg(feature = "std")]
pub mod bench;

pub use error::Error;

#[allow(unused)]
pub(crate) mod logging {
    #[cfg(feature = "std")]
    pub use log::*;

    // No-op macros when the `log` facade is not compiled in
    #[cfg(not(feature = "std"))]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    #[cfg(not(feature = "std"))]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    #[cfg(not(feature = "std"))]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    #[cfg(not(feature = "std"))]
    macro_rules! log_warn {
        ($($arg:tt)*) => {};
    }

    #[cfg(not(feature = "std"))]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    #[cfg(not(feature = "std"))]
    pub(crate) use {debug, error, info, log_warn as warn, trace};
}
