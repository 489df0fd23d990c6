use std::{
    cmp::Ordering::*,
    fmt,
    sync::atomic::Ordering::{Relaxed, SeqCst},
};

use crossbeam::{
    epoch::{self, Atomic, Guard, Owned, Shared},
    utils::Backoff,
};
use parking_lot::MutexGuard;

use crate::{
    level::random_level,
    lock_set::LockSet,
    node::{Node, NodeKey},
};

pub const DEFAULT_MAX_LEVEL: usize = 20;
pub const MAX_LEVEL_LIMIT: usize = 64;
pub const DEFAULT_PROMOTION_PROBABILITY: f64 = 0.5;

/// A concurrent ordered set over a lazy, lock-coupled skip list.
///
/// Traversals never lock. `add` and `remove` plan against an optimistic
/// snapshot, lock the affected predecessors from level 0 upward, validate the
/// snapshot under those locks and commit or retry. Deletion is two-phase: the
/// node is marked under its own lock first, then unlinked. Unlinked nodes are
/// reclaimed through `crossbeam::epoch` once no pinned reader can reach them.
///
/// The collector may drop a removed key on any thread and after the list itself
/// is gone, hence `K: Send + 'static`:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// let list = lazyset_skiplist::SkipList::new();
/// list.add(Rc::new(1));
/// ```
///
/// ```compile_fail
/// let owned = String::from("borrowed");
/// let list = lazyset_skiplist::SkipList::new();
/// list.add(owned.as_str());
/// drop(list);
/// ```
pub struct SkipList<K> {
    head: Atomic<Node<K>>,
    tail: Atomic<Node<K>>,
    max_level: usize,
    promotion_probability: f64,
}

/// Per-level predecessors and successors found by `locate`.
type Window<'g, K> = Vec<Shared<'g, Node<K>>>;

impl<K: Ord + Send + 'static> Default for SkipList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Send + 'static> SkipList<K> {
    pub fn new() -> Self {
        Self::with_levels(DEFAULT_MAX_LEVEL, DEFAULT_PROMOTION_PROBABILITY)
    }

    /// `max_level` is the highest 0-based level a node may reach;
    /// `promotion_probability` is the chance of climbing one more level.
    pub fn with_levels(max_level: usize, promotion_probability: f64) -> Self {
        assert!(
            max_level <= MAX_LEVEL_LIMIT,
            "max_level must not exceed {MAX_LEVEL_LIMIT}, got {max_level}"
        );
        assert!(
            promotion_probability > 0.0 && promotion_probability < 1.0,
            "promotion_probability must be in (0, 1), got {promotion_probability}"
        );

        // Nothing else can observe the sentinels before `Self` is returned.
        let guard = unsafe { epoch::unprotected() };
        let tail = Owned::new(Node::sentinel(NodeKey::Tail, max_level)).into_shared(guard);
        let head = Node::sentinel(NodeKey::Head, max_level);
        for level in 0..=max_level {
            head.set_next(level, tail);
        }

        tracing::debug!(max_level, promotion_probability, "skip list created");

        Self {
            head: Atomic::new(head),
            tail: Atomic::from(tail),
            max_level,
            promotion_probability,
        }
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn promotion_probability(&self) -> f64 {
        self.promotion_probability
    }

    fn window<'g>(&self) -> Window<'g, K> {
        vec![Shared::null(); self.max_level + 1]
    }

    /// Fills `preds[l]` with the last node `< key` and `succs[l]` with the
    /// first node `>= key` on every level, and returns the highest level whose
    /// successor holds `key`.
    fn locate<'g>(
        &self,
        key: &K,
        preds: &mut [Shared<'g, Node<K>>],
        succs: &mut [Shared<'g, Node<K>>],
        guard: &'g Guard,
    ) -> Option<usize> {
        let mut found = None;
        let mut pred = self.head.load(SeqCst, guard);

        for level in (0..=self.max_level).rev() {
            let mut curr = unsafe { pred.deref() }.next(level, guard);
            loop {
                debug_assert!(!curr.is_null());
                let node = unsafe { curr.deref() };
                match node.key().cmp_key(key) {
                    Less => {
                        pred = curr;
                        curr = node.next(level, guard);
                    }
                    Equal => {
                        if found.is_none() {
                            found = Some(level);
                        }
                        break;
                    }
                    Greater => break,
                }
            }

            preds[level] = pred;
            succs[level] = curr;
        }

        found
    }

    /// A node may be deleted once it is published, was found at its own top
    /// level and nobody has marked it yet.
    fn eligible_for_removal(candidate: &Node<K>, found_level: usize) -> bool {
        candidate.is_fully_linked()
            && candidate.top_level() == found_level
            && !candidate.is_marked()
    }

    /// Inserts `key`. Returns `false` if it is already present.
    pub fn add(&self, key: K) -> bool {
        let top_level = random_level(
            &mut rand::rng(),
            self.max_level,
            self.promotion_probability,
        );

        let guard = &epoch::pin();
        let mut preds = self.window();
        let mut succs = self.window();

        loop {
            if let Some(found_level) = self.locate(&key, &mut preds, &mut succs, guard) {
                let found = unsafe { succs[found_level].deref() };
                if !found.is_marked() {
                    // the inserter is between linking and publishing
                    let backoff = Backoff::new();
                    while !found.is_fully_linked() {
                        backoff.snooze();
                    }
                    return false;
                }
                tracing::trace!(found_level, "add: key is being removed, retrying");
                continue;
            }

            let mut locks = LockSet::with_capacity(top_level + 1);
            let mut valid = true;
            for level in 0..=top_level {
                let pred = locks.lock(preds[level]);
                let succ = unsafe { succs[level].deref() };
                valid = !pred.is_marked()
                    && !succ.is_marked()
                    && pred.next(level, guard) == succs[level];
                if !valid {
                    break;
                }
            }
            if !valid {
                tracing::trace!(
                    top_level,
                    locked = locks.len(),
                    "add: validation failed, retrying"
                );
                continue;
            }

            let node = Owned::new(Node::new(key, top_level)).into_shared(guard);
            let node_ref = unsafe { node.deref() };
            for level in 0..=top_level {
                node_ref.set_next(level, succs[level]);
            }
            for level in 0..=top_level {
                unsafe { preds[level].deref() }.set_next(level, node);
            }
            node_ref.set_fully_linked();

            drop(locks);
            return true;
        }
    }

    /// Removes `key`. Returns `false` if it is absent or another thread removed
    /// it first.
    pub fn remove(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        let mut preds = self.window();
        let mut succs = self.window();
        // the node this call has marked, and its lock, held until it is unlinked
        let mut victim: Option<Shared<'_, Node<K>>> = None;
        let mut victim_lock: Option<MutexGuard<'_, ()>> = None;

        loop {
            let found_level = self.locate(key, &mut preds, &mut succs, guard);

            let node = match victim {
                Some(node) => node,
                None => {
                    let Some(found_level) = found_level else {
                        return false;
                    };
                    let candidate = succs[found_level];
                    let candidate_ref = unsafe { candidate.deref() };
                    if !Self::eligible_for_removal(candidate_ref, found_level) {
                        return false;
                    }

                    let node_lock = candidate_ref.lock();
                    if candidate_ref.is_marked() {
                        return false;
                    }
                    candidate_ref.mark();
                    victim = Some(candidate);
                    victim_lock = Some(node_lock);
                    candidate
                }
            };
            let node_ref = unsafe { node.deref() };
            let top_level = node_ref.top_level();

            let mut locks = LockSet::with_capacity(top_level + 1);
            let mut valid = true;
            for level in 0..=top_level {
                let pred = locks.lock(preds[level]);
                valid = !pred.is_marked() && pred.next(level, guard) == node;
                if !valid {
                    break;
                }
            }
            if !valid {
                tracing::trace!(
                    top_level,
                    locked = locks.len(),
                    "remove: validation failed, retrying"
                );
                continue;
            }

            for level in (0..=top_level).rev() {
                unsafe { preds[level].deref() }.set_next(level, node_ref.next(level, guard));
            }

            drop(victim_lock.take());
            drop(locks);
            unsafe { guard.defer_destroy(node) };
            return true;
        }
    }

    /// Lock-free membership test.
    ///
    /// Lifecycle flags are not consulted: a key is still reported between its
    /// logical mark and its physical unlink, and as soon as it is linked at any
    /// level the descent passes through, even before it is published.
    pub fn search(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        let mut curr = self.head.load(SeqCst, guard);

        for level in (0..=self.max_level).rev() {
            loop {
                let next = unsafe { curr.deref() }.next(level, guard);
                match unsafe { next.deref() }.key().cmp_key(key) {
                    Less => curr = next,
                    Equal => return true,
                    Greater => break,
                }
            }
        }

        let last = unsafe { curr.deref() }.next(0, guard);
        unsafe { last.deref() }.key().cmp_key(key) == Equal
    }

    /// Whether level 0 links head directly to tail. May be stale as soon as it
    /// returns.
    pub fn empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(SeqCst, guard);
        unsafe { head.deref() }.next(0, guard) == self.tail.load(SeqCst, guard)
    }
}

impl<K> Drop for SkipList<K> {
    fn drop(&mut self) {
        // `&mut self`: no traversal is in flight. Removed nodes were handed to
        // the collector already, everything else is still on level 0.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next(0, guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for SkipList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &epoch::pin();
        let head = self.head.load(SeqCst, guard);
        let mut curr = unsafe { head.deref() }.next(0, guard);

        let mut set = f.debug_set();
        while let Some(node) = unsafe { curr.as_ref() } {
            if let NodeKey::Key(key) = node.key() {
                if !node.is_marked() {
                    set.entry(key);
                }
            }
            curr = node.next(0, guard);
        }
        set.finish()
    }
}
