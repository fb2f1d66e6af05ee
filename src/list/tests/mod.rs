use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};


/// Payload that counts how many times it has been dropped.
pub(super) struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub(super) fn new(drops: &Arc<AtomicUsize>) -> Self {
        Self(Arc::clone(drops))
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
