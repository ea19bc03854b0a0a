pub mod relative_strength;

pub use relative_strength::{align_by_date, beta_and_correlation, RelativeStrengthAnalyzer, RelativeStrengthReading};
