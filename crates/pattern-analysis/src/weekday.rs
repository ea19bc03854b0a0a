use analysis_core::stats::round_to;
use analysis_core::{AnalysisError, Bar, SignalResult};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minimum daily bars before weekday statistics mean anything.
pub const MIN_WEEKDAY_BARS: usize = 30;

/// Returns inside this window count twice.
const RECENT_WINDOW_DAYS: i64 = 180;
const RECENT_WEIGHT: f64 = 2.0;

pub const WEEKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStat {
    /// 0 = Monday .. 4 = Friday
    pub weekday: u8,
    pub name: String,
    /// Recency-weighted mean daily return, percent.
    pub avg_return: f64,
    /// Recency-weighted share of positive days, percent.
    pub pct_positive: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayReading {
    pub weekday_stats: Vec<WeekdayStat>,
    pub today_weekday: u8,
    pub today_name: String,
    pub today_avg_return: f64,
    pub today_pct_positive: f64,
}

impl Default for WeekdayReading {
    fn default() -> Self {
        Self {
            weekday_stats: Vec::new(),
            today_weekday: 0,
            today_name: WEEKDAY_NAMES[0].to_string(),
            today_avg_return: 0.0,
            today_pct_positive: 50.0,
        }
    }
}

/// Weekday index of a timestamp with Saturday and Sunday folded onto Friday.
pub fn trading_weekday(ts: DateTime<Utc>) -> u8 {
    (ts.weekday().num_days_from_monday() as u8).min(4)
}

/// Aggregate dated daily returns into per-weekday statistics.
///
/// Weekend-dated returns are ignored; returns dated within 180 days of `as_of`
/// count double.
pub fn weekday_statistics(returns: &[(DateTime<Utc>, f64)], as_of: DateTime<Utc>) -> Vec<WeekdayStat> {
    let recent_cutoff = as_of - Duration::days(RECENT_WINDOW_DAYS);
    // (weighted return sum, weighted positive count, weight total, raw count)
    let mut acc = [(0.0f64, 0.0f64, 0.0f64, 0usize); 5];

    for &(ts, ret) in returns {
        if !ret.is_finite() {
            continue;
        }
        let day = ts.weekday().num_days_from_monday() as usize;
        if day > 4 {
            continue;
        }
        let weight = if ts >= recent_cutoff { RECENT_WEIGHT } else { 1.0 };
        let slot = &mut acc[day];
        slot.0 += ret * weight;
        if ret > 0.0 {
            slot.1 += weight;
        }
        slot.2 += weight;
        slot.3 += 1;
    }

    acc.iter()
        .enumerate()
        .filter(|(_, (_, _, total, _))| *total > 0.0)
        .map(|(day, &(sum, positive, total, count))| WeekdayStat {
            weekday: day as u8,
            name: WEEKDAY_NAMES[day].to_string(),
            avg_return: round_to(sum / total * 100.0, 4),
            pct_positive: round_to(positive / total * 100.0, 1),
            count,
        })
        .collect()
}

/// Signal for `today` from precomputed weekday statistics.
pub fn score_weekday(stats: Vec<WeekdayStat>, today: u8) -> SignalResult<WeekdayReading> {
    let today = today.min(4);
    let (avg_return, pct_positive) = stats
        .iter()
        .find(|s| s.weekday == today)
        .map(|s| (s.avg_return, s.pct_positive))
        .unwrap_or((0.0, 50.0));

    let name = WEEKDAY_NAMES[today as usize];
    let signal = (pct_positive - 50.0) / 25.0;

    SignalResult::new(
        signal,
        format!("{}: {:.1}% historically positive", name, pct_positive),
        WeekdayReading {
            weekday_stats: stats,
            today_weekday: today,
            today_name: name.to_string(),
            today_avg_return: avg_return,
            today_pct_positive: pct_positive,
        },
    )
}

/// Day-of-week seasonality over a daily series, evaluated for the weekday of `as_of`.
pub fn analyze_weekday(bars: &[Bar], as_of: DateTime<Utc>) -> Result<SignalResult<WeekdayReading>, AnalysisError> {
    if bars.len() < MIN_WEEKDAY_BARS {
        return Err(AnalysisError::InsufficientData(format!(
            "weekday pattern needs {} bars, got {}",
            MIN_WEEKDAY_BARS,
            bars.len()
        )));
    }

    let returns: Vec<(DateTime<Utc>, f64)> = bars
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].timestamp, w[1].close / w[0].close - 1.0))
        .collect();

    Ok(score_weekday(weekday_statistics(&returns, as_of), trading_weekday(as_of)))
}
