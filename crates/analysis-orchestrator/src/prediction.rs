use analysis_core::{Recommendation, SignalName, SignalResult, INSUFFICIENT_DATA};
use chrono::{DateTime, Utc};
use ml_engine::MlReading;
use pattern_analysis::PatternReport;
use quant_analysis::RelativeStrengthReading;
use sentiment_analysis::SentimentReading;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use technical_analysis::TechnicalReport;

use crate::aggregator::{SignalBreakdown, SignalInput};
use crate::projection::AnalystProjection;

pub const DISCLAIMER: &str = "This prediction is generated from statistical and technical signals for \
informational purposes only. It is not financial advice; past patterns do not guarantee future results.";

/// Typed output of every analyzer for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReports {
    pub technical: TechnicalReport,
    pub patterns: PatternReport,
    pub relative_strength: SignalResult<RelativeStrengthReading>,
    pub sentiment: SignalResult<SentimentReading>,
    pub ml_prediction: SignalResult<MlReading>,
}

fn input<D>(result: &SignalResult<D>) -> SignalInput {
    SignalInput::new(result.signal, result.interpretation.clone())
}

impl AnalysisReports {
    /// Flatten the reports into one input per weighted signal.
    ///
    /// `weekly_trend` is derived from the seasonal streak rather than scored
    /// by its own analyzer.
    pub fn signal_inputs(&self) -> BTreeMap<SignalName, SignalInput> {
        let technical = &self.technical;
        let patterns = &self.patterns;

        let weekly = patterns.weekly_trend();
        let weekly_trend = if patterns.seasonal.interpretation == INSUFFICIENT_DATA {
            SignalInput::new(0.0, INSUFFICIENT_DATA)
        } else {
            SignalInput::new(weekly.momentum_signal(), weekly.describe())
        };

        [
            (SignalName::Rsi, input(&technical.rsi)),
            (SignalName::Macd, input(&technical.macd)),
            (SignalName::MaTrend, input(&technical.ma_trend)),
            (SignalName::Bollinger, input(&technical.bollinger)),
            (SignalName::Stochastic, input(&technical.stochastic)),
            (SignalName::AtrVolatility, input(&technical.atr_volatility)),
            (SignalName::Weekday, input(&patterns.weekday)),
            (SignalName::Seasonal, input(&patterns.seasonal)),
            (SignalName::WeeklyTrend, weekly_trend),
            (SignalName::HistoricalPattern, input(&patterns.historical_pattern)),
            (SignalName::RelativeStrength, input(&self.relative_strength)),
            (SignalName::VolumeTrend, input(&technical.volume_trend)),
            (SignalName::Sentiment, input(&self.sentiment)),
            (SignalName::MlPrediction, input(&self.ml_prediction)),
        ]
        .into_iter()
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub ticker: String,
    pub recommendation: Recommendation,
    /// Percent, within [15, 95].
    pub confidence: f64,
    /// Weighted signal total, within [-1, 1].
    pub combined_score: f64,
    pub signal_breakdown: BTreeMap<SignalName, SignalBreakdown>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    pub current_price: f64,
    pub disclaimer: String,
    pub analyses: AnalysisReports,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst_projection: Option<AnalystProjection>,
}
