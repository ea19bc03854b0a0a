use async_trait::async_trait;
use crate::{AnalysisError, AnalystTargets, Bar, HistoryHorizon, NewsArticle};

/// Source of market data for one prediction run.
///
/// Every method may fail or come back empty; the prediction engine treats either
/// as missing data rather than passing provider errors to its callers.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily OHLCV bars covering `horizon`, any order.
    async fn get_history(&self, ticker: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError>;

    async fn get_current_price(&self, ticker: &str) -> Result<Option<f64>, AnalysisError>;

    async fn get_recent_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError>;

    /// History of the market index used for relative strength.
    async fn get_benchmark_history(&self, benchmark: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError>;

    async fn get_analyst_targets(&self, _ticker: &str) -> Result<Option<AnalystTargets>, AnalysisError> {
        Ok(None)
    }
}
