use alloc::alloc::{Layout, alloc};
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::ptr::NonNull;

use crate::error::Error;

use super::NodeId;

/// A link to the next node of a list.
pub(crate) trait Link: Sized {
    /// Get the next pointer in the linked list
    fn next(&self) -> Option<NonNull<Self>>;

    /// Set the next pointer in the linked list
    fn set_next(&mut self, next: Option<NonNull<Self>>);
}

/// A link with a previous pointer.
pub(crate) trait LinkWithPrev: Link {
    /// Get the previous pointer in the linked list
    fn prev(&self) -> Option<NonNull<Self>>;

    /// Set the previous pointer in the linked list
    fn set_prev(&mut self, prev: Option<NonNull<Self>>);
}

/// A node of the locked, doubly linked list.
///
/// Links are only read or written while the owning list's mutex is held.
pub(crate) struct LockedNode<T> {
    pub(crate) id: NodeId,
    pub(crate) payload: T,
    next: Option<NonNull<Self>>,
    prev: Option<NonNull<Self>>,
}

impl<T> LockedNode<T> {
    /// Allocate a detached node on the heap.
    ///
    /// Unlike `Box::new` this reports allocation failure instead of aborting.
    pub(crate) fn try_alloc(id: NodeId, payload: T) -> Result<NonNull<Self>, Error> {
        let layout = Layout::new::<Self>();
        // SAFETY: the layout is never zero sized, `id` alone is 8 bytes.
        let raw = unsafe { alloc(layout) }.cast::<Self>();
        let node = NonNull::new(raw).ok_or(Error::Allocation("list node"))?;
        // SAFETY: freshly allocated with the layout of `Self`.
        unsafe {
            node.as_ptr().write(Self {
                id,
                payload,
                next: None,
                prev: None,
            });
        }
        Ok(node)
    }

    /// Free a node allocated with [`LockedNode::try_alloc`].
    ///
    /// # Safety
    ///
    /// The node must be unlinked and no other pointer to it may be used afterwards.
    pub(crate) unsafe fn free(node: NonNull<Self>) {
        // SAFETY: allocated by the global allocator with `Layout::new::<Self>()`.
        drop(unsafe { Box::from_raw(node.as_ptr()) });
    }
}

impl<T> Link for LockedNode<T> {
    fn next(&self) -> Option<NonNull<Self>> {
        self.next
    }

    fn set_next(&mut self, next: Option<NonNull<Self>>) {
        self.next = next;
    }
}

impl<T> LinkWithPrev for LockedNode<T> {
    fn prev(&self) -> Option<NonNull<Self>> {
        self.prev
    }

    fn set_prev(&mut self, prev: Option<NonNull<Self>>) {
        self.prev = prev;
    }
}

/// A node of the lock-free list.
///
/// Every field is set before the node becomes reachable and never changes
/// afterwards, so readers can follow `next` without synchronization.
pub(crate) struct PublishedNode<T> {
    pub(crate) id: NodeId,
    pub(crate) payload: Arc<T>,
    pub(crate) next: Option<Arc<PublishedNode<T>>>,
}
