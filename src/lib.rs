mod set;

#[cfg(test)]
mod test_utils;

pub mod error;
pub mod options;

pub use set::SkipSet;
