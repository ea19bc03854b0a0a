//! Calendar and history-matching signals: day-of-week, monthly seasonality with
//! weekly momentum, and same-point-in-past lookbacks.

pub mod historical;
pub mod seasonal;
pub mod weekday;
pub mod weekly;

use analysis_core::{AnalysisError, Bar, SignalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use historical::{analyze_historical, HistoricalReading, LookbackMatch};
pub use seasonal::{analyze_seasonal, MonthStat, SeasonalReading};
pub use weekday::{analyze_weekday, WeekdayReading, WeekdayStat};
pub use weekly::{weekly_trend, TrendDirection, WeeklyTrend};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub weekday: SignalResult<WeekdayReading>,
    pub seasonal: SignalResult<SeasonalReading>,
    pub historical_pattern: SignalResult<HistoricalReading>,
}

impl PatternReport {
    pub fn neutral(reason: &str) -> Self {
        Self {
            weekday: SignalResult::neutral(reason),
            seasonal: SignalResult::neutral(reason),
            historical_pattern: SignalResult::neutral(reason),
        }
    }

    /// Weekly streak the aggregator turns into the `weekly_trend` signal.
    pub fn weekly_trend(&self) -> &WeeklyTrend {
        &self.seasonal.detail.weekly_trend
    }
}

pub struct PatternAnalysisEngine;

impl PatternAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Weekday and historical lookbacks read the two-year history; seasonality
    /// reads the five-year one. Each part degrades to neutral on its own.
    pub fn analyze(
        &self,
        history_2y: &[Bar],
        history_5y: &[Bar],
        as_of: DateTime<Utc>,
    ) -> Result<PatternReport, AnalysisError> {
        let weekday = AnalysisError::recover(analyze_weekday(history_2y, as_of), "weekday", |_| {
            SignalResult::insufficient()
        })?;
        let seasonal = AnalysisError::recover(analyze_seasonal(history_5y, as_of), "seasonal", |_| {
            SignalResult::insufficient()
        })?;
        let historical_pattern = AnalysisError::recover(analyze_historical(history_2y), "historical_pattern", |_| {
            SignalResult::insufficient()
        })?;

        Ok(PatternReport {
            weekday,
            seasonal,
            historical_pattern,
        })
    }
}

impl Default for PatternAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
