use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::AnalysisError;
use crate::stats::finalize_signal;

/// Interpretation used by every analyzer's neutral default.
pub const INSUFFICIENT_DATA: &str = "Insufficient Data";

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

/// Immutable, time-ordered price history shared read-only between analyzers.
///
/// Construction sorts by timestamp and drops duplicate timestamps (the later
/// bar wins), so every consumer can rely on strictly ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Arc<[Bar]>,
}

impl PriceSeries {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self { bars: deduped.into() }
    }

    /// Build a series, rejecting an empty input.
    pub fn try_new(bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData("empty price series".to_string()));
        }
        Ok(Self::new(bars))
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Bars at or after `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> PriceSeries {
        let start = self.bars.partition_point(|b| b.timestamp < cutoff);
        Self { bars: self.bars[start..].to_vec().into() }
    }
}

impl Deref for PriceSeries {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        &self.bars
    }
}

impl Default for PriceSeries {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Bar>> for PriceSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

/// Lookback window requested from the market data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryHorizon {
    TwoYears,
    FiveYears,
}

impl HistoryHorizon {
    pub fn days(&self) -> i64 {
        match self {
            HistoryHorizon::TwoYears => 730,
            HistoryHorizon::FiveYears => 1826,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            HistoryHorizon::TwoYears => "2y",
            HistoryHorizon::FiveYears => "5y",
        }
    }
}

/// News article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub publisher: Option<String>,
    /// Unknown publish times are weighted like week-old news.
    #[serde(default)]
    pub published_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub article_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Analyst price targets, when the provider has them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystTargets {
    pub low: f64,
    pub mean: f64,
    pub high: f64,
    #[serde(default)]
    pub analyst_count: Option<u32>,
}

/// Closed set of signals combined into a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    Rsi,
    Macd,
    MaTrend,
    Bollinger,
    Stochastic,
    AtrVolatility,
    Weekday,
    Seasonal,
    WeeklyTrend,
    HistoricalPattern,
    RelativeStrength,
    VolumeTrend,
    Sentiment,
    MlPrediction,
}

impl SignalName {
    pub const ALL: [SignalName; 14] = [
        SignalName::Rsi,
        SignalName::Macd,
        SignalName::MaTrend,
        SignalName::Bollinger,
        SignalName::Stochastic,
        SignalName::AtrVolatility,
        SignalName::Weekday,
        SignalName::Seasonal,
        SignalName::WeeklyTrend,
        SignalName::HistoricalPattern,
        SignalName::RelativeStrength,
        SignalName::VolumeTrend,
        SignalName::Sentiment,
        SignalName::MlPrediction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Rsi => "rsi",
            SignalName::Macd => "macd",
            SignalName::MaTrend => "ma_trend",
            SignalName::Bollinger => "bollinger",
            SignalName::Stochastic => "stochastic",
            SignalName::AtrVolatility => "atr_volatility",
            SignalName::Weekday => "weekday",
            SignalName::Seasonal => "seasonal",
            SignalName::WeeklyTrend => "weekly_trend",
            SignalName::HistoricalPattern => "historical_pattern",
            SignalName::RelativeStrength => "relative_strength",
            SignalName::VolumeTrend => "volume_trend",
            SignalName::Sentiment => "sentiment",
            SignalName::MlPrediction => "ml_prediction",
        }
    }

    /// Title shown in a signal breakdown.
    pub fn display_name(&self) -> &'static str {
        match self {
            SignalName::Rsi => "RSI (14)",
            SignalName::Macd => "MACD",
            SignalName::MaTrend => "Moving Averages",
            SignalName::Bollinger => "Bollinger Bands",
            SignalName::Stochastic => "Stochastic Oscillator",
            SignalName::AtrVolatility => "ATR Volatility",
            SignalName::Weekday => "Day-of-Week Pattern",
            SignalName::Seasonal => "Seasonal Pattern",
            SignalName::WeeklyTrend => "Weekly Momentum",
            SignalName::HistoricalPattern => "Historical Date Pattern",
            SignalName::RelativeStrength => "Relative Strength",
            SignalName::VolumeTrend => "Volume Trend",
            SignalName::Sentiment => "News Sentiment",
            SignalName::MlPrediction => "ML Prediction",
        }
    }

    /// Phrase used when this signal is the strongest driver in a summary.
    pub fn driver_phrase(&self) -> &'static str {
        match self {
            SignalName::Rsi => "RSI",
            SignalName::Macd => "MACD",
            SignalName::MaTrend => "moving average trends",
            SignalName::Bollinger => "Bollinger Band positioning",
            SignalName::Stochastic => "the stochastic oscillator",
            SignalName::AtrVolatility => "the volatility regime",
            SignalName::Weekday => "day-of-week patterns",
            SignalName::Seasonal => "seasonal trends",
            SignalName::WeeklyTrend => "weekly momentum",
            SignalName::HistoricalPattern => "historical date patterns",
            SignalName::RelativeStrength => "relative strength against the market",
            SignalName::VolumeTrend => "volume trends",
            SignalName::Sentiment => "news sentiment",
            SignalName::MlPrediction => "the machine-learning model",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        SignalName::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == needle)
            .ok_or_else(|| AnalysisError::Configuration(format!("unknown signal name '{}'", s.trim())))
    }
}

/// One analyzer's directional opinion plus its typed diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult<D> {
    /// Always within [-1, 1], rounded to 3 decimals.
    pub signal: f64,
    pub interpretation: String,
    pub detail: D,
}

impl<D> SignalResult<D> {
    pub fn new(signal: f64, interpretation: impl Into<String>, detail: D) -> Self {
        Self {
            signal: finalize_signal(signal),
            interpretation: interpretation.into(),
            detail,
        }
    }
}

impl<D: Default> SignalResult<D> {
    /// The documented neutral default: signal 0.0 and an explanatory interpretation.
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            signal: 0.0,
            interpretation: reason.into(),
            detail: D::default(),
        }
    }

    pub fn insufficient() -> Self {
        Self::neutral(INSUFFICIENT_DATA)
    }
}

/// Final directional call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score > 0.25 {
            Recommendation::Buy
        } else if score < -0.25 {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative bucket for a single signal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl SignalLabel {
    pub fn from_signal(signal: f64) -> Self {
        match signal {
            s if s > 0.5 => SignalLabel::StrongBullish,
            s if s > 0.15 => SignalLabel::Bullish,
            s if s > -0.15 => SignalLabel::Neutral,
            s if s > -0.5 => SignalLabel::Bearish,
            _ => SignalLabel::StrongBearish,
        }
    }

    /// Human-readable label for the signal
    pub fn to_label(&self) -> &'static str {
        match self {
            SignalLabel::StrongBullish => "Strong Bullish",
            SignalLabel::Bullish => "Bullish",
            SignalLabel::Neutral => "Neutral",
            SignalLabel::Bearish => "Bearish",
            SignalLabel::StrongBearish => "Strong Bearish",
        }
    }
}
