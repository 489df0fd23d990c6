use crossbeam::epoch::Shared;
use parking_lot::MutexGuard;

use crate::node::Node;

/// Locks held by one commit attempt, in acquisition order.
///
/// Predecessors at consecutive levels are often the same node; it is locked
/// once. Everything is released when the set is dropped.
pub(crate) struct LockSet<'g, K> {
    held: Vec<(Shared<'g, Node<K>>, MutexGuard<'g, ()>)>,
}

impl<'g, K> LockSet<'g, K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            held: Vec::with_capacity(capacity),
        }
    }

    /// Locks `node` unless this set already holds it. Returns the node.
    ///
    /// `node` must be non-null and protected by the guard behind `'g`.
    pub(crate) fn lock(&mut self, node: Shared<'g, Node<K>>) -> &'g Node<K> {
        let node_ref = unsafe { node.deref() };
        if !self.held.iter().any(|(held, _)| *held == node) {
            let guard = node_ref.lock();
            self.held.push((node, guard));
        }
        node_ref
    }

    pub(crate) fn len(&self) -> usize {
        self.held.len()
    }
}
