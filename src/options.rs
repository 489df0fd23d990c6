use std::sync::Arc;

use lazyset_skiplist::prelude::{DEFAULT_MAX_LEVEL, DEFAULT_PROMOTION_PROBABILITY, MAX_LEVEL_LIMIT};

use crate::{
    SkipSet,
    error::{Error, Result},
};

/// Validated settings a [`SkipSet`] is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipSetOptions {
    pub(crate) max_level: usize,

    pub(crate) promotion_probability: f64,
}

impl Default for SkipSetOptions {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            promotion_probability: DEFAULT_PROMOTION_PROBABILITY,
        }
    }
}

impl SkipSetOptions {
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn promotion_probability(&self) -> f64 {
        self.promotion_probability
    }
}

#[derive(Debug)]
pub struct Options {
    max_level: usize,

    promotion_probability: f64,
}

impl Default for Options {
    fn default() -> Self {
        let defaults = SkipSetOptions::default();
        Self {
            max_level: defaults.max_level,
            promotion_probability: defaults.promotion_probability,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest 0-based level a key may be indexed at. Sampled levels are capped
    /// here, and every lookup descends from this level.
    pub fn max_level(&mut self, level: usize) -> &mut Self {
        self.max_level = level;
        self
    }

    /// Chance that a new key climbs one more level, `0.5` by default.
    pub fn promotion_probability(&mut self, p: f64) -> &mut Self {
        self.promotion_probability = p;
        self
    }

    pub fn build(&self) -> Result<Arc<SkipSetOptions>> {
        if self.max_level > MAX_LEVEL_LIMIT {
            return Err(Error::InvalidOption(format!(
                "max_level {} exceeds the limit of {}",
                self.max_level, MAX_LEVEL_LIMIT
            )));
        }
        // also rejects NaN
        if !(self.promotion_probability > 0.0 && self.promotion_probability < 1.0) {
            return Err(Error::InvalidOption(format!(
                "promotion_probability {} is not in (0, 1)",
                self.promotion_probability
            )));
        }

        Ok(Arc::new(SkipSetOptions {
            max_level: self.max_level,
            promotion_probability: self.promotion_probability,
        }))
    }

    pub fn open<K: Ord + Send + 'static>(&self) -> Result<SkipSet<K>> {
        Ok(SkipSet::open(self.build()?))
    }
}
