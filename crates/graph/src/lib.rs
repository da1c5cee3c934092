pub mod store;

pub use store::{GraphStats, HleGraph, NodeIdx};
