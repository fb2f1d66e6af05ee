//! Concurrent list engines.
//!
//! Two engines store the same kind of data under different synchronization
//! disciplines:
//!
//! - [`locked::LockedList`]: one mutex guards the whole structure. Appends,
//!   removals, lookups and complete traversals are serialized. An index table
//!   answers "is id `n` present" in O(1).
//! - [`lockfree::LockFreeList`]: writers publish new heads atomically and
//!   readers walk a snapshot without ever blocking.
//!
//! [`Engine`] holds either one, chosen by a [`Discipline`], and implements
//! [`prelude::ConcurrentList`] so callers can drive both the same way.
//!
//! # Examples
//!
//! ```
//! use core::ops::ControlFlow;
//! use listbench::list::{prelude::*, Discipline, Engine};
//!
//! let engine = Engine::<u32>::new(Discipline::LockFree, 3).unwrap();
//! for value in [10, 20, 30] {
//!     engine.insert(value).unwrap();
//! }
//!
//! let mut values = vec![];
//! engine.visit(|_, value| {
//!     values.push(*value);
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(values, vec![30, 20, 10]);
//! ```
use alloc::format;
use core::fmt;
use core::ops::ControlFlow;
use core::str::FromStr;

use crate::error::Error;

use self::traits::ConcurrentList;

mod index;
mod locked_impl;
mod lockfree_impl;
mod node;
mod traits;

#[cfg(test)]
mod tests;

pub mod locked {
    pub use super::locked_impl::*;
}

pub mod lockfree {
    pub use super::lockfree_impl::*;
}

pub mod prelude {
    pub use super::traits::*;
}

/// Identifier of a node, unique within one engine instance.
pub type NodeId = u64;

/// The synchronization discipline of a list engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// A single mutex guards every read and write.
    Locked,
    /// Readers never block; writers publish nodes with an atomic head swap.
    LockFree,
}

impl Discipline {
    pub const ALL: [Discipline; 2] = [Discipline::Locked, Discipline::LockFree];

    pub fn name(&self) -> &'static str {
        match self {
            Discipline::Locked => "locked",
            Discipline::LockFree => "lockfree",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Discipline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" | "mutex" => Ok(Discipline::Locked),
            "lockfree" | "lock-free" | "rcu" => Ok(Discipline::LockFree),
            other => Err(Error::Usage(format!(
                "unknown discipline `{other}`, expected `locked` or `lockfree`"
            ))),
        }
    }
}

/// A list engine of either discipline.
pub enum Engine<T> {
    Locked(locked::LockedList<T>),
    LockFree(lockfree::LockFreeList<T>),
}

impl<T> Engine<T> {
    /// Create an empty engine.
    ///
    /// # Arguments
    /// * `discipline` - Which engine to build
    /// * `capacity` - The number of ids the locked engine's index table covers.
    ///   Ignored by the lock-free engine, which has no table.
    ///
    /// # Returns
    /// * `Err(Error::Allocation)` - If the index table could not be allocated
    pub fn new(discipline: Discipline, capacity: usize) -> Result<Self, Error> {
        match discipline {
            Discipline::Locked => locked::LockedList::with_capacity(capacity).map(Engine::Locked),
            Discipline::LockFree => Ok(Engine::LockFree(lockfree::LockFreeList::new())),
        }
    }

    /// The locked engine's index operations, if this is a locked engine.
    pub fn as_indexed(&self) -> Option<&locked::LockedList<T>> {
        match self {
            Engine::Locked(list) => Some(list),
            Engine::LockFree(_) => None,
        }
    }
}

impl<T: Send + Sync> ConcurrentList<T> for Engine<T> {
    fn discipline(&self) -> Discipline {
        match self {
            Engine::Locked(_) => Discipline::Locked,
            Engine::LockFree(_) => Discipline::LockFree,
        }
    }

    fn insert(&self, payload: T) -> Result<NodeId, Error> {
        match self {
            Engine::Locked(list) => list.append(payload),
            Engine::LockFree(list) => list.insert_at_head(payload),
        }
    }

    fn visit<F>(&self, visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>,
    {
        match self {
            Engine::Locked(list) => list.for_each(visitor),
            Engine::LockFree(list) => list.traverse(visitor),
        }
    }

    fn len(&self) -> usize {
        match self {
            Engine::Locked(list) => list.len(),
            Engine::LockFree(list) => list.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

