//! Market data replayed from a JSON snapshot file.

use analysis_core::{AnalysisError, AnalystTargets, Bar, HistoryHorizon, MarketDataProvider, NewsArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk layout: daily bars for the ticker (up to five years) plus optional extras.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub ticker: String,
    /// Defaults to the last bar's timestamp.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    pub history: Vec<Bar>,
    #[serde(default)]
    pub benchmark: Vec<Bar>,
    #[serde(default)]
    pub news: Vec<NewsArticle>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub analyst_targets: Option<AnalystTargets>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse snapshot file {}", path.display()))
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
            .or_else(|| self.history.iter().map(|b| b.timestamp).max())
            .unwrap_or_else(Utc::now)
    }
}

/// Bars within `horizon` of the latest bar.
fn window(bars: &[Bar], horizon: HistoryHorizon) -> Vec<Bar> {
    let Some(last) = bars.iter().map(|b| b.timestamp).max() else {
        return Vec::new();
    };
    let cutoff = last - Duration::days(horizon.days());
    bars.iter().filter(|b| b.timestamp >= cutoff).cloned().collect()
}

pub struct SnapshotFileProvider {
    snapshot: SnapshotFile,
}

impl SnapshotFileProvider {
    pub fn new(snapshot: SnapshotFile) -> Self {
        Self { snapshot }
    }

    fn holds(&self, ticker: &str) -> bool {
        self.snapshot.ticker.eq_ignore_ascii_case(ticker)
    }
}

#[async_trait]
impl MarketDataProvider for SnapshotFileProvider {
    async fn get_history(&self, ticker: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        if !self.holds(ticker) {
            return Ok(Vec::new());
        }
        Ok(window(&self.snapshot.history, horizon))
    }

    async fn get_current_price(&self, ticker: &str) -> Result<Option<f64>, AnalysisError> {
        Ok(self.snapshot.current_price.filter(|_| self.holds(ticker)))
    }

    async fn get_recent_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        if !self.holds(ticker) {
            return Ok(Vec::new());
        }
        let mut news = self.snapshot.news.clone();
        // Newest first; undated articles last
        news.sort_by(|a, b| b.published_utc.cmp(&a.published_utc));
        news.truncate(limit);
        Ok(news)
    }

    async fn get_benchmark_history(&self, benchmark: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        if self.snapshot.benchmark.is_empty() {
            return Err(AnalysisError::ProviderUnavailable(format!(
                "snapshot has no {} history",
                benchmark
            )));
        }
        Ok(window(&self.snapshot.benchmark, horizon))
    }

    async fn get_analyst_targets(&self, ticker: &str) -> Result<Option<AnalystTargets>, AnalysisError> {
        Ok(self.snapshot.analyst_targets.clone().filter(|_| self.holds(ticker)))
    }
}
