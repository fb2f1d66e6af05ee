use core::ops::ControlFlow;

use crate::error::Error;

use super::{Discipline, NodeId};

/// A trait defining the operations every list engine supports.
///
/// This trait provides a unified interface over the synchronization
/// disciplines, so the benchmark harness can drive either engine.
pub trait ConcurrentList<T>: Send + Sync {
    /// The synchronization discipline implemented by this engine.
    fn discipline(&self) -> Discipline;

    /// Insert a payload into the list.
    ///
    /// # Arguments
    /// * `payload` - The value to store in the new node
    ///
    /// # Returns
    /// The id assigned to the new node
    fn insert(&self, payload: T) -> Result<NodeId, Error>;

    /// Visit every node reachable at the time of the call.
    ///
    /// # Arguments
    /// * `visitor` - Called with the id and payload of each node. Returning
    ///   `ControlFlow::Break(())` stops the traversal.
    fn visit<F>(&self, visitor: F)
    where
        F: FnMut(NodeId, &T) -> ControlFlow<()>;

    /// Get the number of live nodes.
    fn len(&self) -> usize;

    /// Check if the list has no live nodes.
    fn is_empty(&self) -> bool;
}

/// A trait for engines that keep an index from id to node.
///
/// Only the locked engine implements it: the lock-free engine has no table
/// and does not support removal.
pub trait IndexedList<T>: ConcurrentList<T> {
    /// Check if a node with this id is present, in O(1).
    ///
    /// # Returns
    /// * `Ok(bool)` - Whether the node is present
    /// * `Err(Error::Range)` - If the id is outside the index table
    fn contains_by_id(&self, id: NodeId) -> Result<bool, Error>;

    /// Check if a node with this id is present by walking the list.
    fn contains_by_id_linear(&self, id: NodeId) -> bool;

    /// Remove the node with this id.
    ///
    /// # Returns
    /// True if a node was found and removed
    fn remove(&self, id: NodeId) -> bool;

    /// Number of slots in the index table.
    fn capacity(&self) -> usize;
}
