//! One immutable view of the market for a single prediction run.

use analysis_core::{
    AnalysisError, AnalystTargets, HistoryHorizon, MarketDataProvider, NewsArticle, PriceSeries,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Everything the analyzers read, fetched once and shared read-only.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Instant the prediction is made for; calendar analyzers and news ages use it.
    pub as_of: DateTime<Utc>,
    pub history_2y: PriceSeries,
    pub history_5y: PriceSeries,
    /// Empty when the benchmark could not be fetched.
    pub benchmark: PriceSeries,
    pub news: Arc<[NewsArticle]>,
    pub current_price: f64,
    pub analyst_targets: Option<AnalystTargets>,
}

/// Provider failures become empty data; the analyzers decide what is enough.
fn or_empty<T: Default>(result: Result<T, AnalysisError>, ticker: &str, source: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(ticker, source, error = %e, "market data request failed");
        T::default()
    })
}

impl MarketSnapshot {
    /// Fetch every input concurrently. Fails only when no price history exists at all.
    pub async fn fetch<P>(
        provider: &P,
        ticker: &str,
        benchmark: &str,
        news_limit: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Self, AnalysisError>
    where
        P: MarketDataProvider + ?Sized,
    {
        let (history_2y, history_5y, benchmark_bars, current_price, news, targets) = tokio::join!(
            provider.get_history(ticker, HistoryHorizon::TwoYears),
            provider.get_history(ticker, HistoryHorizon::FiveYears),
            provider.get_benchmark_history(benchmark, HistoryHorizon::TwoYears),
            provider.get_current_price(ticker),
            provider.get_recent_news(ticker, news_limit),
            provider.get_analyst_targets(ticker),
        );

        let mut news = or_empty(news, ticker, "news");
        news.truncate(news_limit);

        Self::from_parts(
            ticker,
            as_of,
            PriceSeries::new(or_empty(history_2y, ticker, "history_2y")),
            PriceSeries::new(or_empty(history_5y, ticker, "history_5y")),
            PriceSeries::new(or_empty(benchmark_bars, benchmark, "benchmark")),
            news,
            or_empty(current_price, ticker, "current_price"),
            or_empty(targets, ticker, "analyst_targets"),
        )
    }

    /// Assemble a snapshot from already-loaded data.
    ///
    /// A missing horizon is filled from the other one; a missing or unusable
    /// current price falls back to the last usable two-year close.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        ticker: &str,
        as_of: DateTime<Utc>,
        history_2y: PriceSeries,
        history_5y: PriceSeries,
        benchmark: PriceSeries,
        news: Vec<NewsArticle>,
        current_price: Option<f64>,
        analyst_targets: Option<AnalystTargets>,
    ) -> Result<Self, AnalysisError> {
        let (history_2y, history_5y) = match (history_2y.is_empty(), history_5y.is_empty()) {
            (true, true) => {
                return Err(AnalysisError::DataUnavailable {
                    ticker: ticker.to_string(),
                })
            }
            (true, false) => {
                tracing::debug!(ticker, "two-year history derived from five-year history");
                let cutoff = history_5y
                    .last()
                    .map(|b| b.timestamp - Duration::days(HistoryHorizon::TwoYears.days()))
                    .unwrap_or(as_of);
                (history_5y.since(cutoff), history_5y)
            }
            (false, true) => {
                tracing::debug!(ticker, "five-year history unavailable, using two-year history");
                (history_2y.clone(), history_2y)
            }
            (false, false) => (history_2y, history_5y),
        };

        let usable = |p: &f64| p.is_finite() && *p > 0.0;
        let last_close = history_2y.iter().rev().map(|b| b.close).find(usable).unwrap_or(0.0);
        let current_price = current_price.filter(usable).unwrap_or(last_close);

        Ok(Self {
            ticker: ticker.to_string(),
            as_of,
            history_2y,
            history_5y,
            benchmark,
            news: news.into(),
            current_price,
            analyst_targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Bar;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn series(days: i64, close: f64) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 21, 0, 0).unwrap();
        (0..days)
            .map(|d| Bar {
                timestamp: start + Duration::days(d),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
                vwap: None,
            })
            .collect()
    }

    struct FlakyProvider;

    #[async_trait]
    impl MarketDataProvider for FlakyProvider {
        async fn get_history(&self, _ticker: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
            match horizon {
                HistoryHorizon::TwoYears => Err(AnalysisError::ProviderUnavailable("timeout".into())),
                HistoryHorizon::FiveYears => Ok(series(1500, 42.0)),
            }
        }

        async fn get_current_price(&self, _ticker: &str) -> Result<Option<f64>, AnalysisError> {
            Ok(Some(f64::NAN))
        }

        async fn get_recent_news(&self, _ticker: &str, _limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
            Ok((0..30)
                .map(|i| NewsArticle {
                    title: format!("headline {}", i),
                    publisher: None,
                    published_utc: None,
                    article_url: None,
                    description: None,
                })
                .collect())
        }

        async fn get_benchmark_history(&self, _benchmark: &str, _horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
            Err(AnalysisError::ProviderUnavailable("no index feed".into()))
        }
    }

    #[tokio::test]
    async fn test_fetch_degrades_provider_failures() {
        let as_of = Utc.with_ymd_and_hms(2024, 2, 9, 21, 0, 0).unwrap();
        let snapshot = MarketSnapshot::fetch(&FlakyProvider, "AAPL", "SPY", 20, as_of).await.unwrap();
        assert_eq!(snapshot.history_5y.len(), 1500);
        assert_eq!(snapshot.history_2y.len(), 731);
        assert!(snapshot.benchmark.is_empty());
        assert_eq!(snapshot.news.len(), 20);
        assert_eq!(snapshot.current_price, 42.0);
        assert!(snapshot.analyst_targets.is_none());
    }

    #[test]
    fn test_no_history_is_data_unavailable() {
        let as_of = Utc.with_ymd_and_hms(2024, 2, 9, 21, 0, 0).unwrap();
        let err = MarketSnapshot::from_parts(
            "ZZZZ",
            as_of,
            PriceSeries::default(),
            PriceSeries::default(),
            PriceSeries::default(),
            Vec::new(),
            Some(10.0),
            None,
        )
        .unwrap_err();
        assert_eq!(err, AnalysisError::DataUnavailable { ticker: "ZZZZ".into() });
    }

    #[test]
    fn test_provider_price_preferred_over_last_close() {
        let as_of = Utc.with_ymd_and_hms(2024, 2, 9, 21, 0, 0).unwrap();
        let snapshot = MarketSnapshot::from_parts(
            "AAPL",
            as_of,
            series(10, 42.0).into(),
            PriceSeries::default(),
            PriceSeries::default(),
            Vec::new(),
            Some(43.5),
            None,
        )
        .unwrap();
        assert_eq!(snapshot.current_price, 43.5);
        assert_eq!(snapshot.history_5y.len(), 10);
    }
}
