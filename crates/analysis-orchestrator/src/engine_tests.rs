use super::*;
use analysis_core::{AnalystTargets, Bar, HistoryHorizon, NewsArticle, Recommendation, SignalName};
use async_trait::async_trait;
use chrono::{Datelike, Duration, TimeZone, Weekday};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

const TRADING_DAYS_2Y: usize = 504;

/// In-memory provider replaying fixed data.
#[derive(Default)]
struct StaticProvider {
    history: Vec<Bar>,
    benchmark: Vec<Bar>,
    news: Vec<NewsArticle>,
    price: Option<f64>,
    targets: Option<AnalystTargets>,
    fail_benchmark: bool,
    fail_news: bool,
    history_calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn get_history(&self, _ticker: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match horizon {
            HistoryHorizon::TwoYears => {
                let start = self.history.len().saturating_sub(TRADING_DAYS_2Y);
                self.history[start..].to_vec()
            }
            HistoryHorizon::FiveYears => self.history.clone(),
        })
    }

    async fn get_current_price(&self, _ticker: &str) -> Result<Option<f64>, AnalysisError> {
        Ok(self.price)
    }

    async fn get_recent_news(&self, _ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        if self.fail_news {
            return Err(AnalysisError::ProviderUnavailable("news API returned 503".into()));
        }
        Ok(self.news.iter().take(limit).cloned().collect())
    }

    async fn get_benchmark_history(&self, _benchmark: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        if self.fail_benchmark {
            return Err(AnalysisError::ProviderUnavailable("benchmark feed down".into()));
        }
        let start = match horizon {
            HistoryHorizon::TwoYears => self.benchmark.len().saturating_sub(TRADING_DAYS_2Y),
            HistoryHorizon::FiveYears => 0,
        };
        Ok(self.benchmark[start..].to_vec())
    }

    async fn get_analyst_targets(&self, _ticker: &str) -> Result<Option<AnalystTargets>, AnalysisError> {
        Ok(self.targets.clone())
    }
}

fn trading_days(count: usize) -> Vec<DateTime<Utc>> {
    let mut day = Utc.with_ymd_and_hms(2019, 1, 2, 21, 0, 0).unwrap();
    let mut days = Vec::with_capacity(count);
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    trading_days(closes.len())
        .into_iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (timestamp, close))| Bar {
            timestamp,
            open: close * 0.998,
            high: close * 1.01,
            low: close * 0.99,
            close: *close,
            volume: 1_000_000.0 + ((i * 37) % 23) as f64 * 50_000.0,
            vwap: None,
        })
        .collect()
}

fn random_walk(seed: u64, count: usize, drift: f64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0;
    (0..count)
        .map(|_| {
            price *= 1.0 + drift + rng.gen_range(-0.02..0.02);
            price
        })
        .collect()
}

fn news(as_of: DateTime<Utc>) -> Vec<NewsArticle> {
    [
        ("Company beats expectations as revenue surges", 3),
        ("Analysts upgrade shares after strong quarter", 30),
        ("Regulators open probe into accounting practices", 100),
        ("Shares slip as supplier warns of delays", 400),
    ]
    .into_iter()
    .map(|(title, hours)| NewsArticle {
        title: title.to_string(),
        publisher: Some("Wire".to_string()),
        published_utc: Some(as_of - Duration::hours(hours)),
        article_url: None,
        description: None,
    })
    .collect()
}

fn provider_for(closes: &[f64]) -> StaticProvider {
    let history = bars_from_closes(closes);
    let benchmark = bars_from_closes(&random_walk(99, closes.len(), 0.0003));
    let as_of = history.last().map(|b| b.timestamp).unwrap_or_else(Utc::now);
    StaticProvider {
        history,
        benchmark,
        news: news(as_of),
        ..Default::default()
    }
}

fn as_of(provider: &StaticProvider) -> DateTime<Utc> {
    provider.history.last().map(|b| b.timestamp).unwrap()
}

fn engine(parallel: bool) -> PredictionEngine {
    PredictionEngine::new(PredictionConfig {
        parallel,
        ..Default::default()
    })
    .unwrap()
}

fn assert_bounded(prediction: &Prediction) {
    assert!((-1.0..=1.0).contains(&prediction.combined_score), "score {}", prediction.combined_score);
    assert!((15.0..=95.0).contains(&prediction.confidence), "confidence {}", prediction.confidence);
    assert_eq!(prediction.signal_breakdown.len(), SignalName::ALL.len());
    for (name, entry) in &prediction.signal_breakdown {
        assert!((-1.0..=1.0).contains(&entry.signal), "{} signal {}", name, entry.signal);
        assert!(entry.signal.is_finite());
    }
    assert_eq!(prediction.recommendation, Recommendation::from_score(prediction.combined_score));
}

#[tokio::test]
async fn test_full_history_prediction() {
    let provider = provider_for(&random_walk(7, 1260, 0.0005));
    let at = as_of(&provider);
    let prediction = engine(true).get_prediction_at(&provider, " aapl ", at).await.unwrap();

    assert_eq!(prediction.ticker, "AAPL");
    assert_eq!(prediction.generated_at, at);
    assert_eq!(prediction.current_price, provider.history.last().unwrap().close);
    assert_eq!(prediction.disclaimer, DISCLAIMER);
    assert!(prediction.summary.starts_with("Based on analysis of 14 signals"));
    assert_eq!(prediction.analyses.sentiment.detail.articles_analyzed, 4);
    assert!(prediction.analyses.ml_prediction.detail.training_rows > 0);
    assert!(prediction.analyst_projection.is_none());
    assert_bounded(&prediction);
}

#[tokio::test]
async fn test_identical_snapshot_gives_identical_prediction() {
    let provider = provider_for(&random_walk(11, 1260, 0.0));
    let at = as_of(&provider);
    let engine = engine(true);

    let first = engine.get_prediction_at(&provider, "MSFT", at).await.unwrap();
    let second = engine.get_prediction_at(&provider, "MSFT", at).await.unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_parallel_and_sequential_agree() {
    let provider = provider_for(&random_walk(21, 900, 0.0002));
    let at = as_of(&provider);
    let parallel = engine(true).get_prediction_at(&provider, "NVDA", at).await.unwrap();
    let sequential = engine(false).get_prediction_at(&provider, "NVDA", at).await.unwrap();
    assert_eq!(
        serde_json::to_value(&parallel).unwrap(),
        serde_json::to_value(&sequential).unwrap()
    );
}

#[tokio::test]
async fn test_no_history_is_data_unavailable() {
    let provider = StaticProvider::default();
    let err = engine(true).get_prediction(&provider, "GONE").await.unwrap_err();
    assert_eq!(err, AnalysisError::DataUnavailable { ticker: "GONE".into() });
}

#[tokio::test]
async fn test_short_history_degrades_to_neutral() {
    let provider = provider_for(&random_walk(3, 60, 0.0));
    let prediction = engine(true).get_prediction_at(&provider, "NEW", as_of(&provider)).await.unwrap();

    let rsi = &prediction.signal_breakdown[&SignalName::Rsi];
    assert_eq!(rsi.signal, 0.0);
    assert_eq!(rsi.detail, INSUFFICIENT_DATA);
    assert_eq!(prediction.analyses.ml_prediction.signal, 0.0);
    assert_eq!(prediction.analyses.ml_prediction.interpretation, INSUFFICIENT_DATA);
    assert!(prediction.summary.contains("RSI is at 50.0."));
    assert_bounded(&prediction);
}

#[tokio::test]
async fn test_provider_failures_are_neutral() {
    let mut provider = provider_for(&random_walk(5, 700, 0.0));
    provider.fail_benchmark = true;
    provider.fail_news = true;
    let prediction = engine(true).get_prediction_at(&provider, "AMD", as_of(&provider)).await.unwrap();

    assert_eq!(prediction.analyses.relative_strength.signal, 0.0);
    assert_eq!(prediction.analyses.sentiment.signal, 0.0);
    assert_eq!(prediction.analyses.sentiment.detail.articles_analyzed, 0);
    assert_bounded(&prediction);
}

#[tokio::test]
async fn test_analyst_projection_included() {
    let mut provider = provider_for(&random_walk(13, 600, 0.0));
    provider.price = Some(100.0);
    provider.targets = Some(AnalystTargets {
        low: 90.0,
        mean: 115.0,
        high: 140.0,
        analyst_count: Some(8),
    });
    let prediction = engine(true).get_prediction_at(&provider, "TSLA", as_of(&provider)).await.unwrap();

    assert_eq!(prediction.current_price, 100.0);
    let projection = prediction.analyst_projection.unwrap();
    assert_eq!(projection.upside_percent, 15.0);
    assert_eq!(projection.points.last().unwrap().mean, 115.0);
}

#[tokio::test]
async fn test_caching_provider_reuses_history() {
    let provider = CachingProvider::new(provider_for(&random_walk(17, 700, 0.0)), 300);
    let at = as_of(provider.inner());
    let engine = engine(true);
    engine.get_prediction_at(&provider, "META", at).await.unwrap();
    engine.get_prediction_at(&provider, "META", at).await.unwrap();
    // One fetch per horizon on the first run, none on the second
    assert_eq!(provider.inner().history_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pathological_series_stay_bounded() {
    let mut nan_tail = random_walk(31, 600, 0.0);
    for close in nan_tail.iter_mut().skip(250) {
        *close = f64::NAN;
    }

    let cases: Vec<(&str, Vec<f64>)> = vec![
        ("flat", vec![50.0; 600]),
        ("monotone up", (0..600).map(|i| 10.0 * 1.002f64.powi(i)).collect()),
        ("monotone down", (0..600).map(|i| 500.0 * 0.998f64.powi(i)).collect()),
        ("single point", vec![42.0]),
        ("nan after warmup", nan_tail),
    ];

    let engine = engine(true);
    for (name, closes) in cases {
        let provider = provider_for(&closes);
        let prediction = engine
            .get_prediction_at(&provider, name, as_of(&provider))
            .await
            .unwrap_or_else(|e| panic!("{}: {}", name, e));
        assert_bounded(&prediction);
    }
}

#[tokio::test]
async fn test_random_walks_stay_bounded() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let engine = engine(true);
    for seed in 0..6u64 {
        let length = rng.gen_range(30..800);
        let drift = rng.gen_range(-0.003..0.003);
        let provider = provider_for(&random_walk(seed, length, drift));
        let prediction = engine
            .get_prediction_at(&provider, "RAND", as_of(&provider))
            .await
            .unwrap();
        assert_bounded(&prediction);
    }
}

#[test]
fn test_invalid_config_rejected() {
    let config = PredictionConfig {
        news_limit: 0,
        ..Default::default()
    };
    assert!(matches!(PredictionEngine::new(config), Err(AnalysisError::Configuration(_))));
}
