pub mod algorithms;
pub mod engine;
pub mod pipeline;

pub use algorithms::cascades::CascadeAssignment;
pub use algorithms::paths::MinedPath;
pub use engine::{CascadeRun, HlaPath, HlemEngine, PathRun, RunSummary};
pub use pipeline::generation::HleSet;
pub use pipeline::linkage::EntityLinkage;
