//! TTL caching in front of a market data provider.
//!
//! Entries are evicted lazily when a read finds them stale; `purge_expired`
//! sweeps the whole map for long-lived callers. Only successful provider
//! responses are cached.

use analysis_core::{AnalysisError, AnalystTargets, Bar, HistoryHorizon, MarketDataProvider, NewsArticle};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::hash::Hash;

/// Default time-to-live for cached provider responses.
pub const CACHE_TTL_SECS: i64 = 300;

struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs.max(0)),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.cached_at < self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(key) {
            if self.is_fresh(&entry, now) {
                return Some(entry.data.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !self.is_fresh(entry, now));
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                data: value,
                cached_at: Utc::now(),
            },
        );
    }

    /// Drop every stale entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Wraps a provider so repeated requests within the TTL are served from memory.
pub struct CachingProvider<P> {
    inner: P,
    history: TtlCache<(String, HistoryHorizon), Vec<Bar>>,
    benchmark: TtlCache<(String, HistoryHorizon), Vec<Bar>>,
    news: TtlCache<(String, usize), Vec<NewsArticle>>,
    prices: TtlCache<String, Option<f64>>,
    targets: TtlCache<String, Option<AnalystTargets>>,
}

impl<P: MarketDataProvider> CachingProvider<P> {
    pub fn new(inner: P, ttl_secs: i64) -> Self {
        Self {
            inner,
            history: TtlCache::new(ttl_secs),
            benchmark: TtlCache::new(ttl_secs),
            news: TtlCache::new(ttl_secs),
            prices: TtlCache::new(ttl_secs),
            targets: TtlCache::new(ttl_secs),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn purge_expired(&self) -> usize {
        self.history.purge_expired()
            + self.benchmark.purge_expired()
            + self.news.purge_expired()
            + self.prices.purge_expired()
            + self.targets.purge_expired()
    }

    /// A fresh five-year history also answers a two-year request.
    fn history_from_superset(&self, ticker: &str, horizon: HistoryHorizon) -> Option<Vec<Bar>> {
        if horizon != HistoryHorizon::TwoYears {
            return None;
        }
        let longer = self.history.get(&(ticker.to_string(), HistoryHorizon::FiveYears))?;
        let last = longer.iter().map(|b| b.timestamp).max()?;
        let cutoff = last - Duration::days(horizon.days());
        Some(longer.into_iter().filter(|b| b.timestamp >= cutoff).collect())
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachingProvider<P> {
    async fn get_history(&self, ticker: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        let key = (ticker.to_string(), horizon);
        if let Some(bars) = self.history.get(&key) {
            return Ok(bars);
        }
        if let Some(bars) = self.history_from_superset(ticker, horizon) {
            tracing::debug!(ticker, horizon = horizon.key(), "history served from cached superset");
            return Ok(bars);
        }
        let bars = self.inner.get_history(ticker, horizon).await?;
        self.history.insert(key, bars.clone());
        Ok(bars)
    }

    async fn get_current_price(&self, ticker: &str) -> Result<Option<f64>, AnalysisError> {
        let key = ticker.to_string();
        if let Some(price) = self.prices.get(&key) {
            return Ok(price);
        }
        let price = self.inner.get_current_price(ticker).await?;
        self.prices.insert(key, price);
        Ok(price)
    }

    async fn get_recent_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let key = (ticker.to_string(), limit);
        if let Some(news) = self.news.get(&key) {
            return Ok(news);
        }
        let news = self.inner.get_recent_news(ticker, limit).await?;
        self.news.insert(key, news.clone());
        Ok(news)
    }

    async fn get_benchmark_history(&self, benchmark: &str, horizon: HistoryHorizon) -> Result<Vec<Bar>, AnalysisError> {
        let key = (benchmark.to_string(), horizon);
        if let Some(bars) = self.benchmark.get(&key) {
            return Ok(bars);
        }
        let bars = self.inner.get_benchmark_history(benchmark, horizon).await?;
        self.benchmark.insert(key, bars.clone());
        Ok(bars)
    }

    async fn get_analyst_targets(&self, ticker: &str) -> Result<Option<AnalystTargets>, AnalysisError> {
        let key = ticker.to_string();
        if let Some(targets) = self.targets.get(&key) {
            return Ok(targets);
        }
        let targets = self.inner.get_analyst_targets(ticker).await?;
        self.targets.insert(key, targets.clone());
        Ok(targets)
    }
}
