//! Time-based memoization of directory results.

pub mod entry;
pub mod memo;
