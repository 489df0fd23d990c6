use std::{fmt, sync::Arc};

use lazyset_skiplist::SkipList;

use crate::{
    error::Result,
    options::{Options, SkipSetOptions},
};

/// A concurrent ordered set of `K`.
///
/// Share it across threads behind an `Arc`; every operation takes `&self`.
/// `add`/`remove` report whether they changed the set, `search` never blocks.
/// Removed keys are dropped later by the epoch collector, possibly on another
/// thread, so keys must be `Send + 'static`:
///
/// ```compile_fail
/// let set = lazyset::SkipSet::new();
/// set.add(std::rc::Rc::new(1));
/// ```
pub struct SkipSet<K> {
    options: Arc<SkipSetOptions>,
    list: SkipList<K>,
}

impl<K: Ord + Send + 'static> Default for SkipSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Send + 'static> SkipSet<K> {
    pub fn new() -> Self {
        Self::open(Arc::default())
    }

    pub fn with_options(options: &Options) -> Result<Self> {
        options.open()
    }

    pub(crate) fn open(options: Arc<SkipSetOptions>) -> Self {
        tracing::debug!(?options, "opening skip set");
        let list = SkipList::with_levels(options.max_level, options.promotion_probability);
        Self { options, list }
    }

    pub fn options(&self) -> &SkipSetOptions {
        &self.options
    }

    /// Inserts `key`; `false` if it was already present.
    pub fn add(&self, key: K) -> bool {
        self.list.add(key)
    }

    /// Removes `key`; `false` if it was absent or removed concurrently.
    pub fn remove(&self, key: &K) -> bool {
        self.list.remove(key)
    }

    /// May report a key that is mid-removal as present.
    pub fn search(&self, key: &K) -> bool {
        self.list.search(key)
    }

    pub fn empty(&self) -> bool {
        self.list.empty()
    }
}

impl<K: fmt::Debug> fmt::Debug for SkipSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.list, f)
    }
}
