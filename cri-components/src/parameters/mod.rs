//! Component parameters
//!
//! Parameter structures for the interpretive components. Each struct carries
//! defaults matching the published dashboard and can be overridden from the
//! `[pulse]`, `[composite]` and `[regions]` sections of a configuration file.

mod pulse;
mod regions;

pub use pulse::{CompositeWeights, PulseParameters};
pub use regions::{RegionOverride, RegionalRiskParameters};
