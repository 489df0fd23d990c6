mod level;
mod lock_set;
mod node;
mod skip_list;

pub use skip_list::SkipList;

pub mod prelude {
    pub use crate::skip_list::{
        DEFAULT_MAX_LEVEL, DEFAULT_PROMOTION_PROBABILITY, MAX_LEVEL_LIMIT, SkipList,
    };
}
