pub mod analyzer;
pub mod indicators;
pub mod volume;

#[cfg(test)]
mod indicators_tests;

pub use analyzer::*;
pub use volume::{analyze_volume_trend, VolumeTrendReading};
