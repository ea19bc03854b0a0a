use analysis_core::AnalysisError;
use ml_engine::MlConfig;
use std::env;
use std::str::FromStr;

use crate::cache::CACHE_TTL_SECS;
use crate::weights::WeightTable;

pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_NEWS_LIMIT: usize = 20;
pub const MAX_NEWS_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Market index used for relative strength.
    pub benchmark: String,
    pub news_limit: usize,
    pub cache_ttl_secs: i64,
    /// Run analyzers on the blocking thread pool concurrently.
    pub parallel: bool,
    pub weights: WeightTable,
    pub ml: MlConfig,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            benchmark: DEFAULT_BENCHMARK.to_string(),
            news_limit: DEFAULT_NEWS_LIMIT,
            cache_ttl_secs: CACHE_TTL_SECS,
            parallel: true,
            weights: WeightTable::default(),
            ml: MlConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AnalysisError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AnalysisError::Configuration(format!("{} has an invalid value '{}'", key, value))),
        None => Ok(default),
    }
}

impl PredictionConfig {
    /// Load from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, AnalysisError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AnalysisError> {
        let defaults = Self::default();

        let benchmark = lookup("PREDICTION_BENCHMARK")
            .map(|b| b.trim().to_ascii_uppercase())
            .filter(|b| !b.is_empty())
            .unwrap_or(defaults.benchmark);

        let news_limit: usize = parse_var("PREDICTION_NEWS_LIMIT", lookup("PREDICTION_NEWS_LIMIT"), defaults.news_limit)?;

        let weights = match lookup("PREDICTION_WEIGHTS").filter(|w| !w.trim().is_empty()) {
            Some(text) => WeightTable::parse(&text)?,
            None => defaults.weights,
        };

        let config = Self {
            benchmark,
            news_limit: news_limit.clamp(1, MAX_NEWS_LIMIT),
            cache_ttl_secs: parse_var("PREDICTION_CACHE_TTL_SECS", lookup("PREDICTION_CACHE_TTL_SECS"), defaults.cache_ttl_secs)?,
            parallel: parse_var("PREDICTION_PARALLEL", lookup("PREDICTION_PARALLEL"), defaults.parallel)?,
            weights,
            ml: defaults.ml,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.benchmark.trim().is_empty() {
            return Err(AnalysisError::Configuration("benchmark symbol is empty".to_string()));
        }
        if !(1..=MAX_NEWS_LIMIT).contains(&self.news_limit) {
            return Err(AnalysisError::Configuration(format!(
                "news limit must be between 1 and {}, got {}",
                MAX_NEWS_LIMIT, self.news_limit
            )));
        }
        if self.cache_ttl_secs < 0 {
            return Err(AnalysisError::Configuration(format!(
                "cache TTL cannot be negative, got {}",
                self.cache_ttl_secs
            )));
        }
        if !(0.5..=0.95).contains(&self.ml.train_fraction) || self.ml.folds == 0 {
            return Err(AnalysisError::Configuration(
                "ML training needs at least one fold and a train fraction in [0.5, 0.95]".to_string(),
            ));
        }
        self.weights.validate()
    }
}
