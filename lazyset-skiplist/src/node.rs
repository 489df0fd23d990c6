use std::{
    cmp::Ordering,
    sync::atomic::{AtomicBool, Ordering::*},
};

use crossbeam::epoch::{Atomic, Guard, Shared};
use parking_lot::{Mutex, MutexGuard};

/// Key slot of a node. The sentinels sit outside the key space, so `K` does not
/// need a minimum or maximum value of its own.
pub(crate) enum NodeKey<K> {
    Head,
    Key(K),
    Tail,
}

impl<K: Ord> NodeKey<K> {
    /// Orders this slot against a user key.
    pub(crate) fn cmp_key(&self, key: &K) -> Ordering {
        match self {
            NodeKey::Head => Ordering::Less,
            NodeKey::Key(k) => k.cmp(key),
            NodeKey::Tail => Ordering::Greater,
        }
    }
}

pub(crate) struct Node<K> {
    key: NodeKey<K>,
    // len == top_level + 1, fixed at construction
    tower: Box<[Atomic<Self>]>,
    marked: AtomicBool,
    fully_linked: AtomicBool,
    lock: Mutex<()>,
}

impl<K> Node<K> {
    pub(crate) fn new(key: K, top_level: usize) -> Self {
        Self::with_key(NodeKey::Key(key), top_level, false)
    }

    /// Sentinels span every level and are fully linked from birth.
    pub(crate) fn sentinel(key: NodeKey<K>, max_level: usize) -> Self {
        debug_assert!(!matches!(key, NodeKey::Key(_)));
        Self::with_key(key, max_level, true)
    }

    fn with_key(key: NodeKey<K>, top_level: usize, fully_linked: bool) -> Self {
        let tower = (0..=top_level).map(|_| Atomic::null()).collect();
        Self {
            key,
            tower,
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(fully_linked),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &NodeKey<K> {
        &self.key
    }

    pub(crate) fn top_level(&self) -> usize {
        self.tower.len() - 1
    }

    pub(crate) fn next<'g>(&self, level: usize, guard: &'g Guard) -> Shared<'g, Self> {
        self.tower[level].load(SeqCst, guard)
    }

    /// Caller holds this node's lock, or the node is not reachable yet.
    pub(crate) fn set_next(&self, level: usize, next: Shared<'_, Self>) {
        self.tower[level].store(next, SeqCst);
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(SeqCst)
    }

    /// Logical deletion. Caller holds this node's lock.
    pub(crate) fn mark(&self) {
        self.marked.store(true, SeqCst);
    }

    pub(crate) fn is_fully_linked(&self) -> bool {
        self.fully_linked.load(SeqCst)
    }

    /// Publish point of an insertion.
    pub(crate) fn set_fully_linked(&self) {
        self.fully_linked.store(true, SeqCst);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}
