use analysis_core::stats::round_to;
use analysis_core::AnalystTargets;
use serde::{Deserialize, Serialize};

/// Horizon label and months from now; one year reaches the target.
pub const PROJECTION_HORIZONS: [(&str, u32); 4] = [("1 Month", 1), ("3 Months", 3), ("6 Months", 6), ("1 Year", 12)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub horizon: String,
    pub months: u32,
    pub low: f64,
    pub mean: f64,
    pub high: f64,
}

/// Straight-line path from the current price to the analyst targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystProjection {
    pub current_price: f64,
    pub target_low: f64,
    pub target_mean: f64,
    pub target_high: f64,
    pub analyst_count: Option<u32>,
    /// Implied move to the mean target, in percent.
    pub upside_percent: f64,
    pub points: Vec<ProjectionPoint>,
}

fn interpolate(current: f64, target: f64, fraction: f64) -> f64 {
    round_to(current + (target - current) * fraction, 2)
}

/// `None` unless the current price and every target are positive and finite.
pub fn project_targets(current_price: f64, targets: &AnalystTargets) -> Option<AnalystProjection> {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(current_price) || ![targets.low, targets.mean, targets.high].into_iter().all(usable) {
        return None;
    }

    let points = PROJECTION_HORIZONS
        .iter()
        .map(|(label, months)| {
            let fraction = *months as f64 / 12.0;
            ProjectionPoint {
                horizon: label.to_string(),
                months: *months,
                low: interpolate(current_price, targets.low, fraction),
                mean: interpolate(current_price, targets.mean, fraction),
                high: interpolate(current_price, targets.high, fraction),
            }
        })
        .collect();

    Some(AnalystProjection {
        current_price: round_to(current_price, 2),
        target_low: targets.low,
        target_mean: targets.mean,
        target_high: targets.high,
        analyst_count: targets.analyst_count,
        upside_percent: round_to((targets.mean / current_price - 1.0) * 100.0, 2),
        points,
    })
}
