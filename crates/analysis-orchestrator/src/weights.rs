//! Per-signal weights for the combined score.

use analysis_core::{AnalysisError, SignalName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Allowed drift of the weight total from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub const DEFAULT_WEIGHTS: [(SignalName, f64); 14] = [
    (SignalName::Rsi, 0.10),
    (SignalName::Macd, 0.08),
    (SignalName::MaTrend, 0.10),
    (SignalName::Bollinger, 0.06),
    (SignalName::Stochastic, 0.05),
    (SignalName::AtrVolatility, 0.04),
    (SignalName::Weekday, 0.04),
    (SignalName::Seasonal, 0.06),
    (SignalName::WeeklyTrend, 0.06),
    (SignalName::HistoricalPattern, 0.06),
    (SignalName::RelativeStrength, 0.08),
    (SignalName::VolumeTrend, 0.07),
    (SignalName::Sentiment, 0.10),
    (SignalName::MlPrediction, 0.10),
];

/// Validated weight table: every signal exactly once, non-negative, summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: BTreeMap<SignalName, f64>,
}

impl WeightTable {
    pub fn new(entries: impl IntoIterator<Item = (SignalName, f64)>) -> Result<Self, AnalysisError> {
        let mut weights = BTreeMap::new();
        for (name, weight) in entries {
            if weights.insert(name, weight).is_some() {
                return Err(AnalysisError::Configuration(format!(
                    "signal '{}' is weighted more than once",
                    name
                )));
            }
        }
        let table = Self { weights };
        table.validate()?;
        Ok(table)
    }

    /// Parse `name=weight` pairs separated by commas, e.g. `rsi=0.1,macd=0.08,...`.
    pub fn parse(text: &str) -> Result<Self, AnalysisError> {
        let entries = text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (name, weight) = part.split_once('=').ok_or_else(|| {
                    AnalysisError::Configuration(format!("expected name=weight, got '{}'", part))
                })?;
                let name: SignalName = name.parse()?;
                let weight: f64 = weight.trim().parse().map_err(|_| {
                    AnalysisError::Configuration(format!("invalid weight '{}' for {}", weight.trim(), name))
                })?;
                Ok((name, weight))
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;
        Self::new(entries)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let missing: Vec<&str> = SignalName::ALL
            .iter()
            .filter(|name| !self.weights.contains_key(name))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "weight table is missing: {}",
                missing.join(", ")
            )));
        }

        if let Some((name, weight)) = self.weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "weight for {} must be a non-negative number, got {}",
                name, weight
            )));
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::Configuration(format!(
                "weights must sum to 1.0, got {:.6}",
                total
            )));
        }
        Ok(())
    }

    pub fn weight(&self, name: SignalName) -> f64 {
        self.weights.get(&name).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalName, f64)> + '_ {
        self.weights.iter().map(|(name, weight)| (*name, *weight))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.into_iter().collect(),
        }
    }
}

impl FromStr for WeightTable {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
