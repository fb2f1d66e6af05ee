use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::error::Error;

use super::NodeId;
use super::node::LockedNode;

/// A fixed-size table mapping an id to the node carrying it.
///
/// The table is sized once at construction. Ids outside `0..capacity` are
/// rejected with [`Error::Range`] instead of being looked up.
pub(crate) struct IndexTable<T> {
    slots: Box<[Option<NonNull<LockedNode<T>>>]>,
}

impl<T> IndexTable<T> {
    /// Allocate a table with `capacity` empty slots.
    ///
    /// # Returns
    /// * `Err(Error::Allocation)` - If the slots could not be reserved
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::Allocation("index table"))?;
        slots.resize(capacity, None);
        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, id: NodeId) -> Result<usize, Error> {
        usize::try_from(id)
            .ok()
            .filter(|&slot| slot < self.slots.len())
            .ok_or(Error::Range {
                id,
                capacity: self.slots.len(),
            })
    }

    /// Look up the node recorded for `id`, if any.
    pub(crate) fn get(&self, id: NodeId) -> Result<Option<NonNull<LockedNode<T>>>, Error> {
        let slot = self.slot(id)?;
        Ok(self.slots[slot])
    }

    /// Record `node` as the holder of `id`.
    pub(crate) fn set(&mut self, id: NodeId, node: NonNull<LockedNode<T>>) -> Result<(), Error> {
        let slot = self.slot(id)?;
        self.slots[slot] = Some(node);
        Ok(())
    }

    /// Forget the node recorded for `id`. Out of range ids are ignored.
    pub(crate) fn clear(&mut self, id: NodeId) {
        if let Ok(slot) = self.slot(id) {
            self.slots[slot] = None;
        }
    }

    /// Forget every recorded node.
    pub(crate) fn clear_all(&mut self) {
        self.slots.fill(None);
    }
}
