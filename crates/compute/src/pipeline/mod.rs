//! Event mining pipeline.
//!
//! The stages run strictly in order, each consuming the previous one's
//! output:
//!
//! - **Windowing**: equal-width time windows over the log.
//! - **Features**: instance collection and per-window measurement.
//! - **Thresholds**: percentile bounds over each measurement pool.
//! - **Generation**: traffic-filtered high-level events.
//! - **Linkage**: entity affinity values for cascade correlation.
//! - **Filter**: frequency selection of high-level activities.

pub mod features;
pub mod filter;
pub mod generation;
pub mod linkage;
pub mod thresholds;
pub mod windowing;
