use analysis_core::stats::{clamp_signal, round_to};
use analysis_core::{AnalysisError, Bar, SignalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// (trading days back, label, weight); nearer lookbacks weigh more.
pub const LOOKBACKS: [(usize, &str, f64); 5] = [
    (5, "1 Week Ago", 0.30),
    (21, "1 Month Ago", 0.25),
    (63, "3 Months Ago", 0.20),
    (126, "6 Months Ago", 0.15),
    (252, "1 Year Ago", 0.10),
];

/// Daily move treated as a full-strength signal.
const REFERENCE_MOVE: f64 = 0.02;
const DAY_BLEND: f64 = 0.6;
const CONTEXT_BLEND: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackMatch {
    pub label: String,
    pub offset: usize,
    pub date: DateTime<Utc>,
    /// Return on the matched day, percent.
    pub day_return: f64,
    /// Return across the day before through the day after, percent.
    pub context_return: Option<f64>,
    pub signal: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReading {
    pub lookbacks: Vec<LookbackMatch>,
}

fn ratio(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    let r = to / from - 1.0;
    r.is_finite().then_some(r)
}

/// Evaluate one lookback offset; None when the target falls outside the series.
pub fn lookback_signal(bars: &[Bar], offset: usize) -> Option<(f64, f64, Option<f64>, DateTime<Utc>)> {
    let n = bars.len();
    let t = n.checked_sub(1 + offset)?;
    if t < 1 {
        return None;
    }

    let day = ratio(bars[t - 1].close, bars[t].close)?;
    let context = if t >= 2 && t + 1 < n {
        ratio(bars[t - 2].close, bars[t + 1].close)
    } else {
        None
    };

    let blended = match context {
        Some(c) => DAY_BLEND * day + CONTEXT_BLEND * c,
        None => day,
    };

    Some((clamp_signal(blended / REFERENCE_MOVE), day, context, bars[t].timestamp))
}

/// What the stock did at fixed trading-day offsets in the past, blended by recency.
pub fn analyze_historical(bars: &[Bar]) -> Result<SignalResult<HistoricalReading>, AnalysisError> {
    let mut lookbacks = Vec::new();
    for (offset, label, weight) in LOOKBACKS {
        if let Some((signal, day, context, date)) = lookback_signal(bars, offset) {
            lookbacks.push(LookbackMatch {
                label: label.to_string(),
                offset,
                date,
                day_return: round_to(day * 100.0, 2),
                context_return: context.map(|c| round_to(c * 100.0, 2)),
                signal: round_to(signal, 3),
                weight,
            });
        }
    }

    if lookbacks.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "no historical lookback fits in {} bars",
            bars.len()
        )));
    }

    let total_weight: f64 = lookbacks.iter().map(|l| l.weight).sum();
    let combined = lookbacks.iter().map(|l| l.signal * l.weight).sum::<f64>() / total_weight;

    let positive = lookbacks.iter().filter(|l| l.day_return > 0.0).count();
    let interpretation = format!("{} of {} past reference days were positive", positive, lookbacks.len());

    Ok(SignalResult::new(combined, interpretation, HistoricalReading { lookbacks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn series(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 21, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
                vwap: None,
            })
            .collect()
    }

    #[test]
    fn test_lookback_blend() {
        let mut closes = vec![100.0; 12];
        // n = 12, offset 5 -> t = 6
        closes[6] = 101.0;
        closes[7] = 101.0;
        let (signal, day, context, _) = lookback_signal(&series(&closes), 5).unwrap();
        assert!((day - 0.01).abs() < 1e-12);
        assert!((context.unwrap() - 0.01).abs() < 1e-12);
        // 0.01 / 0.02
        assert!((signal - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_skips_far_lookbacks() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = analyze_historical(&series(&closes)).unwrap();
        let offsets: Vec<usize> = result.detail.lookbacks.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![5, 21]);
        assert!(result.signal > 0.0);
    }

    #[test]
    fn test_weights_renormalised() {
        // Only the 5-day lookback fits; combined equals its own signal
        let mut closes = vec![100.0; 10];
        closes[4] = 98.0;
        let result = analyze_historical(&series(&closes)).unwrap();
        assert_eq!(result.detail.lookbacks.len(), 1);
        assert_eq!(result.signal, result.detail.lookbacks[0].signal);
        assert!(result.signal < 0.0);
    }

    #[test]
    fn test_no_lookback_is_insufficient() {
        let err = analyze_historical(&series(&[100.0; 5])).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }
}
