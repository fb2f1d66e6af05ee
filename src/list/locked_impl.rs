use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ops::ControlFlow;
use core::ptr::NonNull;

use spin::Mutex;

use crate::error::Error;
use crate::logging::{debug, trace};

use super::index::IndexTable;
use super::node::{Link, LinkWithPrev, LockedNode};
use super::traits::{ConcurrentList, IndexedList};
use super::{Discipline, NodeId};

/// Everything the mutex protects. Head, tail, count, the id counter and the
/// index table always change together in one critical section.
struct LockedState<T> {
    head: Option<NonNull<LockedNode<T>>>,
    tail: Option<NonNull<LockedNode<T>>>,
    count: usize,
    next_id: NodeId,
    index: IndexTable<T>,
}

impl<T> LockedState<T> {
    fn nodes(&self) -> Nodes<'_, T> {
        Nodes {
            current: self.head,
            _state: PhantomData,
        }
    }

    fn find(&self, id: NodeId) -> Option<NonNull<LockedNode<T>>> {
        // SAFETY: every node reachable from head is live while the lock is held.
        self.nodes().find(|node| unsafe { node.as_ref() }.id == id)
    }

    fn link_at_tail(&mut self, node: NonNull<LockedNode<T>>) {
        // SAFETY: `node` is detached, `tail` is live, and the lock is held.
        unsafe {
            (*node.as_ptr()).set_prev(self.tail);
            match self.tail {
                Some(tail) => (*tail.as_ptr()).set_next(Some(node)),
                None => self.head = Some(node),
            }
        }
        self.tail = Some(node);
        self.count += 1;
    }

    /// Detach `node` from its neighbors and fix up head and tail.
    ///
    /// # Safety
    ///
    /// `node` must currently be linked into this list.
    unsafe fn unlink(&mut self, node: NonNull<LockedNode<T>>) {
        unsafe {
            let node_ref = &mut *node.as_ptr();
            let (prev, next) = (node_ref.prev(), node_ref.next());

            match prev {
                Some(prev) => (*prev.as_ptr()).set_next(next),
                None => self.head = next,
            }
            match next {
                Some(next) => (*next.as_ptr()).set_prev(prev),
                None => self.tail = prev,
            }

            node_ref.set_prev(None);
            node_ref.set_next(None);
        }
        self.count -= 1;
    }

    fn free_all(&mut self) {
        let mut current = self.head.take();
        while let Some(node) = current {
            // SAFETY: the chain is owned by this state and walked exactly once.
            unsafe {
                current = node.as_ref().next();
                LockedNode::free(node);
            }
        }
        self.tail = None;
        self.count = 0;
        self.index.clear_all();
    }
}

// SAFETY: the raw links are only dereferenced through `&mut LockedState` or
// under the mutex, so moving the state between threads only moves `T`s.
unsafe impl<T: Send> Send for LockedState<T> {}

/// Head-to-tail iterator over the nodes of a locked state.
struct Nodes<'a, T> {
    current: Option<NonNull<LockedNode<T>>>,
    _state: PhantomData<&'a LockedState<T>>,
}

impl<T> Iterator for Nodes<'_, T> {
    type Item = NonNull<LockedNode<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.current.inspect(|current| {
            // SAFETY: the borrowed state keeps the chain alive and unmodified.
            self.current = unsafe { current.as_ref() }.next();
        })
    }
}

/// A doubly linked list guarded by a single mutex.
///
/// Every operation, including a full traversal, holds the lock for its whole
/// duration, so readers and writers are serialized against each other. An index
/// table sized at construction gives O(1) existence checks by id.
///
/// Ids come from a counter owned by the list and start at zero, so a list with
/// capacity `n` hands out exactly the ids `0..n`. Appending past the capacity
/// fails with [`Error::Range`] instead of growing the table.
pub struct LockedList<T> {
    state: Mutex<LockedState<T>>,
}

impl<T> LockedList<T> {
    /// Create an empty list whose index table covers `capacity` ids.
    ///
    /// # Returns
    /// * `Err(Error::Allocation)` - If the index table could not be allocated
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        let index = IndexTable::try_with_capacity(capacity)?;
        debug!("Created locked list with {} index slots", capacity);
        Ok(Self {
            state: Mutex::new(LockedState {
                head: None,
                tail: None,
                count: 0,
                next_id: 0,
                index,
            }),
        })
    }

    /// Append a payload at the tail of the list.
    ///
    /// # Returns
    /// * `Ok(id)` - The id assigned to the new node
    /// * `Err(Error::Range)` - If the index table has no slot for the next id
    /// * `Err(Error::Allocation)` - If the node could not be allocated
    pub fn append(&self, payload: T) -> Result<NodeId, Error> {
        let mut state = self.state.lock();
        let id = state.next_id;
        if id >= state.index.capacity() as NodeId {
            debug!("Append rejected, id {} exceeds the index table", id);
            return Err(Error::Range {
                id,
                capacity: state.index.capacity(),
            });
        }

        let node = LockedNode::try_alloc(id, payload)?;
        if let Err(err) = state.index.set(id, node) {
            // SAFETY: the node was never linked.
            unsafe { LockedNode::free(node) };
            return Err(err);
        }
        state.link_at_tail(node);
        state.next_id += 1;
        Ok(id)
    }

    /// Remove the node carrying `id`, walking from the head to find it.
    ///
    /// The index table slot for `id` is cleared along with the node.
    ///
    /// # Returns
    /// True if a node was found and removed
    pub fn remove(&self, id: NodeId) -> bool {
        let mut state = self.state.lock();
        let Some(node) = state.find(id) else {
            trace!("Remove of id {} found nothing", id);
            return false;
        };

        // SAFETY: `find` returned a node linked into this list.
        unsafe {
            state.unlink(node);
            state.index.clear(id);
            LockedNode::free(node);
        }
        true
    }

    /// Check if a node with `id` is present, using the index table.
    ///
    /// The table entry is validated against the node's own id, so a stale or
    /// mismatched slot reads as absent.
    ///
    /// # Returns
    /// * `Err(Error::Range)` - If `id` is outside the index table
    pub fn contains_by_id(&self, id: NodeId) -> Result<bool, Error> {
        let state = self.state.lock();
        let found = state
            .index
            .get(id)?
            // SAFETY: occupied slots point to linked nodes while the lock is held.
            .is_some_and(|node| unsafe { node.as_ref() }.id == id);
        Ok(found)
    }

    /// Check if a node with `id` is present by walking the whole list.
    pub fn contains_by_id_linear(&self, id: NodeId) -> bool {
        self.state.lock().find(id).is_some()
    }

    /// Apply `visitor` to every node from head to tail, holding the lock for
    /// the whole traversal. The visitor stops the walk by returning
    /// `ControlFlow::Break(())`.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>,
    {
        let state = self.state.lock();
        for node in state.nodes() {
            // SAFETY: nodes stay linked while the lock is held.
            let node = unsafe { node.as_ref() };
            if visitor(node.id, &node.payload).is_break() {
                break;
            }
        }
    }

    /// Ids of all nodes, head to tail.
    pub fn ids(&self) -> Vec<NodeId> {
        let state = self.state.lock();
        // SAFETY: nodes stay linked while the lock is held.
        state.nodes().map(|node| unsafe { node.as_ref() }.id).collect()
    }

    /// Remove every node. Ids are not reused afterwards.
    pub fn clear(&self) {
        self.state.lock().free_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ids the index table covers.
    pub fn capacity(&self) -> usize {
        self.state.lock().index.capacity()
    }
}

impl<T> Drop for LockedList<T> {
    fn drop(&mut self) {
        self.state.get_mut().free_all();
    }
}

impl<T: Send> ConcurrentList<T> for LockedList<T> {
    fn discipline(&self) -> Discipline {
        Discipline::Locked
    }

    fn insert(&self, payload: T) -> Result<NodeId, Error> {
        self.append(payload)
    }

    fn visit<F>(&self, visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>,
    {
        self.for_each(visitor)
    }

    fn len(&self) -> usize {
        LockedList::len(self)
    }

    fn is_empty(&self) -> bool {
        LockedList::is_empty(self)
    }
}

impl<T: Send> IndexedList<T> for LockedList<T> {
    fn contains_by_id(&self, id: NodeId) -> Result<bool, Error> {
        LockedList::contains_by_id(self, id)
    }

    fn contains_by_id_linear(&self, id: NodeId) -> bool {
        LockedList::contains_by_id_linear(self, id)
    }

    fn remove(&self, id: NodeId) -> bool {
        LockedList::remove(self, id)
    }

    fn capacity(&self) -> usize {
        LockedList::capacity(self)
    }
}
