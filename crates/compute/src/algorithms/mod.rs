//! Correlation algorithms over generated high-level events.

pub mod cascades;
pub mod overlap;
pub mod paths;
pub mod trie;
