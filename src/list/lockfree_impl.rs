use alloc::sync::Arc;
use core::ops::ControlFlow;
use core::ptr;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;
use crossbeam_utils::CachePadded;

use crate::error::Error;
use crate::logging::trace;

use super::node::PublishedNode;
use super::traits::ConcurrentList;
use super::{Discipline, NodeId};

/// A simple backoff strategy for spin-then-yield.
/// This helps reduce contention during high-frequency CAS loops.
#[inline]
fn backoff(step: &mut usize) {
    if *step < 10 {
        // Spin for a few iterations, doubling each time.
        (0..1 << *step).for_each(|_| core::hint::spin_loop());
        *step += 1;
    } else {
        (0..1 << 10).for_each(|_| core::hint::spin_loop());
    }
}

#[inline]
fn node_ptr<T>(node: &Option<Arc<PublishedNode<T>>>) -> *const PublishedNode<T> {
    node.as_ref().map_or(ptr::null(), Arc::as_ptr)
}

/// A singly linked list where readers never block.
///
/// Writers build a complete node whose `next` is the current head and publish
/// it by swapping the head pointer with a compare-and-swap. A reader loads the
/// head once and walks the chain from there; it never waits for a writer and
/// never sees a node before all of its fields are written. Nodes are never
/// modified or unlinked once published.
///
/// Concurrent inserts land in no particular order, and a traversal may miss
/// nodes published after it loaded the head.
///
/// # Reclamation
///
/// Nodes are reference counted, and a traversal holds the head it started
/// from, which keeps every node it can reach alive until it finishes. That
/// is the grace period a removal operation would need: publish a chain without
/// the node, and the node is freed when the last traversal that could see it
/// drops its snapshot. Removal is not offered here. All nodes are freed when
/// the list is dropped.
pub struct LockFreeList<T> {
    head: CachePadded<ArcSwapOption<PublishedNode<T>>>,
    next_id: CachePadded<AtomicU64>,
    count: AtomicUsize,
}

impl<T> LockFreeList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            head: CachePadded::new(ArcSwapOption::empty()),
            next_id: CachePadded::new(AtomicU64::new(0)),
            count: AtomicUsize::new(0),
        }
    }

    /// Publish a new node carrying `payload` at the head of the list.
    ///
    /// Safe to call from any number of threads at once. Losing the head race
    /// is retried until the node is published, so no insertion is lost.
    ///
    /// # Returns
    /// The id assigned to the new node
    pub fn insert_at_head(&self, payload: T) -> Result<NodeId, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = Arc::new(payload);

        let mut backoff_step = 0;
        loop {
            let current = self.head.load();
            let candidate = Arc::new(PublishedNode {
                id,
                payload: Arc::clone(&payload),
                next: (*current).clone(),
            });

            // `compare_and_swap` returns whatever was the head before the call.
            // The node is published only if that is still the head we linked to.
            let previous = self.head.compare_and_swap(&current, Some(candidate));
            if node_ptr(&*previous) == node_ptr(&*current) {
                self.count.fetch_add(1, Ordering::Release);
                return Ok(id);
            }

            trace!("Lost the head race for id {}, retrying", id);
            backoff(&mut backoff_step);
        }
    }

    /// Walk the list from a snapshot of the head taken at the start of the call.
    ///
    /// Never takes a lock. The visitor stops the walk by returning
    /// `ControlFlow::Break(())`.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>,
    {
        let snapshot = self.head.load_full();
        let mut cursor = snapshot.as_deref();
        while let Some(node) = cursor {
            if visitor(node.id, &*node.payload).is_break() {
                break;
            }
            cursor = node.next.as_deref();
        }
    }

    /// Number of nodes published so far.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for LockFreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeList<T> {
    fn drop(&mut self) {
        // Unlink one node at a time so a long chain is not dropped recursively.
        let mut cursor = self.head.swap(None);
        while let Some(node) = cursor {
            cursor = match Arc::try_unwrap(node) {
                Ok(mut node) => node.next.take(),
                Err(_) => None,
            };
        }
    }
}

impl<T: Send + Sync> ConcurrentList<T> for LockFreeList<T> {
    fn discipline(&self) -> Discipline {
        Discipline::LockFree
    }

    fn insert(&self, payload: T) -> Result<NodeId, Error> {
        self.insert_at_head(payload)
    }

    fn visit<F>(&self, visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>,
    {
        self.traverse(visitor)
    }

    fn len(&self) -> usize {
        LockFreeList::len(self)
    }

    fn is_empty(&self) -> bool {
        LockFreeList::is_empty(self)
    }
}
