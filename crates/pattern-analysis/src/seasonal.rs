use analysis_core::stats::{clamp_signal, round_to};
use analysis_core::{AnalysisError, Bar, SignalResult};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::weekly::{weekly_trend, WeeklyTrend};

/// One year of daily bars.
pub const MIN_SEASONAL_BARS: usize = 252;

/// Same recency window as the weekday statistics.
const RECENT_WINDOW_DAYS: i64 = 180;
const RECENT_WEIGHT: f64 = 2.0;

const MONTH_WEIGHT: f64 = 0.4;
const WEEKLY_WEIGHT: f64 = 0.3;
const YTD_WEIGHT: f64 = 0.3;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthStat {
    /// 1 = January
    pub month: u32,
    pub name: String,
    /// Recency-weighted mean monthly return, percent.
    pub avg_return: f64,
    pub pct_positive: f64,
    pub years: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalReading {
    pub monthly_stats: Vec<MonthStat>,
    pub current_month: u32,
    pub current_month_name: String,
    pub current_month_avg: f64,
    pub current_month_pct_positive: f64,
    /// Year-to-date return, percent.
    pub ytd_return: f64,
    /// Prior year's return over the same calendar span, percent.
    pub last_year_ytd: f64,
    pub ytd_vs_last_year: f64,
    pub weekly_trend: WeeklyTrend,
}

impl Default for SeasonalReading {
    fn default() -> Self {
        Self {
            monthly_stats: Vec::new(),
            current_month: 1,
            current_month_name: String::new(),
            current_month_avg: 0.0,
            current_month_pct_positive: 50.0,
            ytd_return: 0.0,
            last_year_ytd: 0.0,
            ytd_vs_last_year: 0.0,
            weekly_trend: WeeklyTrend::default(),
        }
    }
}

/// Month-over-month returns keyed by the month (and month-end time) they finished in.
fn monthly_returns(bars: &[Bar]) -> Vec<(DateTime<Utc>, u32, f64)> {
    let mut month_ends: Vec<(DateTime<Utc>, f64)> = Vec::new();
    let mut current = None;
    for bar in bars {
        let key = (bar.timestamp.year(), bar.timestamp.month());
        if current == Some(key) {
            if let Some(last) = month_ends.last_mut() {
                *last = (bar.timestamp, bar.close);
            }
        } else {
            month_ends.push((bar.timestamp, bar.close));
            current = Some(key);
        }
    }

    month_ends
        .windows(2)
        .filter(|w| w[0].1 != 0.0)
        .map(|w| (w[1].0, w[1].0.month(), w[1].1 / w[0].1 - 1.0))
        .filter(|(_, _, r)| r.is_finite())
        .collect()
}

/// Per-calendar-month statistics; months ending within 180 days of `as_of` count double.
pub fn monthly_statistics(bars: &[Bar], as_of: DateTime<Utc>) -> Vec<MonthStat> {
    let recent_cutoff = as_of - Duration::days(RECENT_WINDOW_DAYS);
    let mut acc = [(0.0f64, 0.0f64, 0.0f64, 0usize); 12];

    for (ts, month, ret) in monthly_returns(bars) {
        let weight = if ts >= recent_cutoff { RECENT_WEIGHT } else { 1.0 };
        let slot = &mut acc[(month - 1) as usize];
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
        .map(|(i, &(sum, positive, total, years))| MonthStat {
            month: i as u32 + 1,
            name: MONTH_NAMES[i].to_string(),
            avg_return: round_to(sum / total * 100.0, 2),
            pct_positive: round_to(positive / total * 100.0, 1),
            years,
        })
        .collect()
}

/// Percent return from the first to the last close among `bars`.
fn span_return(bars: &[&Bar]) -> f64 {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if bars.len() > 1 && first.close != 0.0 => {
            (last.close / first.close - 1.0) * 100.0
        }
        _ => 0.0,
    }
}

/// Year-to-date return for `as_of`'s year and the prior year's return up to the same calendar day.
pub fn ytd_comparison(bars: &[Bar], as_of: DateTime<Utc>) -> (f64, f64) {
    let year = as_of.year();
    let cutoff = (as_of.month(), as_of.day());

    let this_year: Vec<&Bar> = bars
        .iter()
        .filter(|b| b.timestamp.year() == year && b.timestamp <= as_of)
        .collect();
    let last_year: Vec<&Bar> = bars
        .iter()
        .filter(|b| b.timestamp.year() == year - 1 && (b.timestamp.month(), b.timestamp.day()) <= cutoff)
        .collect();

    (span_return(&this_year), span_return(&last_year))
}

/// Monthly seasonality, YTD comparison and weekly streak over a long daily series.
pub fn analyze_seasonal(bars: &[Bar], as_of: DateTime<Utc>) -> Result<SignalResult<SeasonalReading>, AnalysisError> {
    if bars.len() < MIN_SEASONAL_BARS {
        return Err(AnalysisError::InsufficientData(format!(
            "seasonal pattern needs {} bars, got {}",
            MIN_SEASONAL_BARS,
            bars.len()
        )));
    }

    let monthly_stats = monthly_statistics(bars, as_of);
    let current_month = as_of.month();
    let (current_month_avg, month_pct) = monthly_stats
        .iter()
        .find(|s| s.month == current_month)
        .map(|s| (s.avg_return, s.pct_positive))
        .unwrap_or((0.0, 50.0));

    let (ytd_return, last_ytd) = ytd_comparison(bars, as_of);
    let ytd_vs_last = round_to(ytd_return - last_ytd, 2);

    let trend = weekly_trend(bars);

    let month_signal = clamp_signal((month_pct - 50.0) / 25.0);
    let weekly_signal = clamp_signal(trend.seasonal_component());
    let ytd_signal = clamp_signal(ytd_vs_last / 20.0);
    let combined = month_signal * MONTH_WEIGHT + weekly_signal * WEEKLY_WEIGHT + ytd_signal * YTD_WEIGHT;

    let month_name = MONTH_NAMES[(current_month - 1) as usize];
    let interpretation = format!("{}: {:.1}% historically positive", month_name, month_pct);

    Ok(SignalResult::new(
        combined,
        interpretation,
        SeasonalReading {
            monthly_stats,
            current_month,
            current_month_name: month_name.to_string(),
            current_month_avg,
            current_month_pct_positive: month_pct,
            ytd_return: round_to(ytd_return, 2),
            last_year_ytd: round_to(last_ytd, 2),
            ytd_vs_last_year: ytd_vs_last,
            weekly_trend: trend,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(ts: DateTime<Utc>, close: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            vwap: None,
        }
    }

    /// Calendar-day bars with a constant daily growth rate.
    fn growth_series(start: DateTime<Utc>, days: i64, daily: f64) -> Vec<Bar> {
        let mut price = 100.0;
        (0..days)
            .map(|d| {
                price *= 1.0 + daily;
                bar(start + Duration::days(d), price)
            })
            .collect()
    }

    #[test]
    fn test_rising_series_all_months_positive() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let bars = growth_series(start, 3 * 365, 0.001);
        let as_of = bars.last().unwrap().timestamp;

        let stats = monthly_statistics(&bars, as_of);
        assert_eq!(stats.len(), 12);
        assert!(stats.iter().all(|s| s.pct_positive == 100.0));

        let result = analyze_seasonal(&bars, as_of).unwrap();
        assert_eq!(result.detail.current_month_pct_positive, 100.0);
        assert!(result.signal > 0.5);
        assert!(result.signal <= 1.0);
    }

    #[test]
    fn test_ytd_comparison() {
        let bars = vec![
            bar(Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap(), 100.0),
            bar(Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap(), 105.0),
            bar(Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap(), 150.0),
            bar(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(), 200.0),
            bar(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), 220.0),
        ];
        let as_of = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let (ytd, last) = ytd_comparison(&bars, as_of);
        assert!((ytd - 10.0).abs() < 1e-9);
        assert!((last - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_recency_weighting() {
        // Jan 2022 falls, Jan 2024 rises; the recent January counts twice
        let bars = vec![
            bar(Utc.with_ymd_and_hms(2021, 12, 31, 0, 0, 0).unwrap(), 100.0),
            bar(Utc.with_ymd_and_hms(2022, 1, 31, 0, 0, 0).unwrap(), 90.0),
            bar(Utc.with_ymd_and_hms(2023, 12, 29, 0, 0, 0).unwrap(), 100.0),
            bar(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(), 110.0),
        ];
        let as_of = Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap();
        let stats = monthly_statistics(&bars, as_of);
        let january = stats.iter().find(|s| s.month == 1).unwrap();
        assert_eq!(january.years, 2);
        assert_eq!(january.pct_positive, 66.7);
    }

    #[test]
    fn test_month_older_than_recency_window_counts_once() {
        // July 2023 ended 189 days before as_of, outside the double-weight window
        let bars = vec![
            bar(Utc.with_ymd_and_hms(2022, 6, 30, 0, 0, 0).unwrap(), 100.0),
            bar(Utc.with_ymd_and_hms(2022, 7, 29, 0, 0, 0).unwrap(), 90.0),
            bar(Utc.with_ymd_and_hms(2023, 6, 30, 0, 0, 0).unwrap(), 100.0),
            bar(Utc.with_ymd_and_hms(2023, 7, 31, 0, 0, 0).unwrap(), 110.0),
        ];
        let as_of = Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap();
        let stats = monthly_statistics(&bars, as_of);
        let july = stats.iter().find(|s| s.month == 7).unwrap();
        assert_eq!(july.years, 2);
        assert_eq!(july.pct_positive, 50.0);
    }

    #[test]
    fn test_short_history_is_insufficient() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = growth_series(start, 100, 0.001);
        let err = analyze_seasonal(&bars, start).unwrap_err();
        assert!(err.is_soft());
    }
}
