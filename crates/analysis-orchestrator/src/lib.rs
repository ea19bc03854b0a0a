//! Multi-signal prediction engine.
//!
//! A run fetches one [`MarketSnapshot`], fans it out to the independent
//! analyzers, substitutes neutral defaults for analyzers that lacked data, and
//! folds the resulting signals into a [`Prediction`].

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod prediction;
pub mod projection;
pub mod snapshot;
pub mod weights;

use analysis_core::{AnalysisError, MarketDataProvider, SignalResult, INSUFFICIENT_DATA};
use chrono::{DateTime, Utc};
use ml_engine::MlSignalAnalyzer;
use pattern_analysis::{PatternAnalysisEngine, PatternReport};
use quant_analysis::RelativeStrengthAnalyzer;
use sentiment_analysis::SentimentAnalysisEngine;
use std::sync::Arc;
use technical_analysis::{TechnicalAnalysisEngine, TechnicalReport};

pub use aggregator::{build_summary, confidence, Aggregate, SignalAggregator, SignalBreakdown, SignalInput};
pub use cache::{CachingProvider, TtlCache, CACHE_TTL_SECS};
pub use config::PredictionConfig;
pub use prediction::{AnalysisReports, Prediction, DISCLAIMER};
pub use projection::{project_targets, AnalystProjection, ProjectionPoint};
pub use snapshot::MarketSnapshot;
pub use weights::{WeightTable, DEFAULT_WEIGHTS};

/// Stateless analyzers shared with blocking tasks.
struct Analyzers {
    technical: TechnicalAnalysisEngine,
    patterns: PatternAnalysisEngine,
    relative_strength: RelativeStrengthAnalyzer,
    sentiment: SentimentAnalysisEngine,
    ml: MlSignalAnalyzer,
}

/// Prefix calculation failures with the analyzer that raised them.
fn in_analyzer(analyzer: &str, error: AnalysisError) -> AnalysisError {
    match error {
        AnalysisError::CalculationError(msg) => AnalysisError::CalculationError(format!("{}: {}", analyzer, msg)),
        other => other,
    }
}

pub struct PredictionEngine {
    config: PredictionConfig,
    analyzers: Arc<Analyzers>,
    aggregator: SignalAggregator,
}

impl PredictionEngine {
    pub fn new(config: PredictionConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let analyzers = Analyzers {
            technical: TechnicalAnalysisEngine::new(),
            patterns: PatternAnalysisEngine::new(),
            relative_strength: RelativeStrengthAnalyzer::new(config.benchmark.clone()),
            sentiment: SentimentAnalysisEngine::new(),
            ml: MlSignalAnalyzer::new(config.ml.clone()),
        };

        Ok(Self {
            aggregator: SignalAggregator::new(config.weights.clone()),
            analyzers: Arc::new(analyzers),
            config,
        })
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    pub async fn get_prediction<P>(&self, provider: &P, ticker: &str) -> Result<Prediction, AnalysisError>
    where
        P: MarketDataProvider + ?Sized,
    {
        self.get_prediction_at(provider, ticker, Utc::now()).await
    }

    /// Predict as of a fixed instant; the same provider data and instant give the same prediction.
    pub async fn get_prediction_at<P>(
        &self,
        provider: &P,
        ticker: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Prediction, AnalysisError>
    where
        P: MarketDataProvider + ?Sized,
    {
        let ticker = ticker.trim().to_ascii_uppercase();
        tracing::info!("Starting prediction for {} (benchmark: {})", ticker, self.config.benchmark);

        let snapshot = MarketSnapshot::fetch(provider, &ticker, &self.config.benchmark, self.config.news_limit, as_of)
            .await
            .inspect_err(|e| tracing::error!(ticker = %ticker, error = %e, "cannot analyze ticker"))?;

        self.predict(snapshot).await
    }

    /// Run every analyzer over an already-fetched snapshot and combine the results.
    pub async fn predict(&self, snapshot: MarketSnapshot) -> Result<Prediction, AnalysisError> {
        let snapshot = Arc::new(snapshot);
        let analyses = self.run_analyzers(&snapshot).await?;

        let aggregate = self.aggregator.aggregate(&analyses.signal_inputs());
        let summary = build_summary(
            &aggregate,
            analyses.technical.rsi.detail.value,
            &analyses.technical.ma_trend.detail.position,
        );
        let analyst_projection = snapshot
            .analyst_targets
            .as_ref()
            .and_then(|targets| project_targets(snapshot.current_price, targets));

        tracing::info!(
            ticker = %snapshot.ticker,
            recommendation = %aggregate.recommendation,
            confidence = aggregate.confidence,
            combined_score = aggregate.combined_score,
            signals = aggregate.signals_analyzed,
            "prediction complete"
        );

        Ok(Prediction {
            ticker: snapshot.ticker.clone(),
            recommendation: aggregate.recommendation,
            confidence: aggregate.confidence,
            combined_score: aggregate.combined_score,
            signal_breakdown: aggregate.breakdown,
            summary,
            generated_at: snapshot.as_of,
            current_price: snapshot.current_price,
            disclaimer: DISCLAIMER.to_string(),
            analyses,
            analyst_projection,
        })
    }

    async fn run_analyzers(&self, snapshot: &Arc<MarketSnapshot>) -> Result<AnalysisReports, AnalysisError> {
        let (technical, patterns, relative_strength, sentiment, ml_prediction) = tokio::join!(
            self.run("technical", snapshot, |a, s| a.technical.analyze(&s.history_2y)),
            self.run("patterns", snapshot, |a, s| {
                a.patterns.analyze(&s.history_2y, &s.history_5y, s.as_of)
            }),
            self.run("relative_strength", snapshot, |a, s| {
                a.relative_strength.analyze(&s.history_2y, &s.benchmark)
            }),
            self.run("sentiment", snapshot, |a, s| a.sentiment.analyze(&s.news, s.as_of)),
            self.run("ml_prediction", snapshot, |a, s| a.ml.analyze(&s.history_2y)),
        );

        Ok(AnalysisReports {
            technical: AnalysisError::recover(technical, "technical", |_| {
                TechnicalReport::neutral(INSUFFICIENT_DATA)
            })?,
            patterns: AnalysisError::recover(patterns, "patterns", |_| PatternReport::neutral(INSUFFICIENT_DATA))?,
            relative_strength: AnalysisError::recover(relative_strength, "relative_strength", |_| {
                SignalResult::insufficient()
            })?,
            sentiment: AnalysisError::recover(sentiment, "sentiment", |_| SignalResult::insufficient())?,
            ml_prediction: AnalysisError::recover(ml_prediction, "ml_prediction", |_| SignalResult::insufficient())?,
        })
    }

    /// Run one analyzer, on the blocking pool when parallel execution is enabled.
    ///
    /// A panicking analyzer surfaces as `TaskFailed` without disturbing the others.
    async fn run<T, F>(&self, name: &'static str, snapshot: &Arc<MarketSnapshot>, job: F) -> Result<T, AnalysisError>
    where
        T: Send + 'static,
        F: FnOnce(&Analyzers, &MarketSnapshot) -> Result<T, AnalysisError> + Send + 'static,
    {
        let result = if self.config.parallel {
            let analyzers = Arc::clone(&self.analyzers);
            let snapshot = Arc::clone(snapshot);
            tokio::task::spawn_blocking(move || job(&analyzers, &snapshot))
                .await
                .map_err(|e| AnalysisError::TaskFailed(format!("{} analyzer: {}", name, e)))
                .and_then(|inner| inner)
        } else {
            job(&self.analyzers, snapshot)
        };

        result.map_err(|e| {
            let e = in_analyzer(name, e);
            if !e.is_soft() {
                tracing::error!(analyzer = name, error = %e, "analyzer failed");
            }
            e
        })
    }
}

#[cfg(test)]
mod engine_tests;
