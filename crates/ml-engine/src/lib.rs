//! Next-day direction classifier built fresh from one price history.

pub mod features;
pub mod model;
pub mod walk_forward;

use analysis_core::stats::{mean, round_to};
use analysis_core::{AnalysisError, Bar, SignalResult};
use serde::{Deserialize, Serialize};

use features::{build_features, FEATURE_COUNT};
use walk_forward::{cross_validate, evaluate, fit_on, walk_forward_folds, TrainingParams};

pub use features::FEATURE_NAMES;
pub use model::{LogisticRegression, Standardizer};

#[derive(Debug, Clone)]
pub struct MlConfig {
    pub min_history: usize,
    pub min_clean_rows: usize,
    pub folds: usize,
    /// Share of rows the final model trains on; the rest is a holdout.
    pub train_fraction: f64,
    pub learning_rate: f64,
    pub iterations: usize,
    pub l2: f64,
    /// Lowest accuracy multiplier applied to the raw probability signal.
    pub min_accuracy_multiplier: f64,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            min_history: 300,
            min_clean_rows: 200,
            folds: 5,
            train_fraction: 0.85,
            learning_rate: 0.1,
            iterations: 400,
            l2: 0.01,
            min_accuracy_multiplier: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlReading {
    pub probability_up: f64,
    pub cv_accuracy: f64,
    pub fold_accuracies: Vec<f64>,
    pub holdout_accuracy: Option<f64>,
    pub accuracy_multiplier: f64,
    pub training_rows: usize,
    pub features_used: usize,
}

impl Default for MlReading {
    fn default() -> Self {
        Self {
            probability_up: 0.5,
            cv_accuracy: 0.0,
            fold_accuracies: Vec::new(),
            holdout_accuracy: None,
            accuracy_multiplier: 0.0,
            training_rows: 0,
            features_used: FEATURE_COUNT,
        }
    }
}

/// Discount applied to the raw signal: chance-level models contribute little.
pub fn accuracy_multiplier(cv_accuracy: f64, floor: f64) -> f64 {
    ((cv_accuracy - 0.5) * 4.0).clamp(0.0, 1.0).max(floor)
}

pub struct MlSignalAnalyzer {
    config: MlConfig,
}

impl MlSignalAnalyzer {
    pub fn new(config: MlConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, bars: &[Bar]) -> Result<SignalResult<MlReading>, AnalysisError> {
        let cfg = &self.config;
        if bars.len() < cfg.min_history {
            return Err(AnalysisError::InsufficientData(format!(
                "ML model needs {} bars, got {}",
                cfg.min_history,
                bars.len()
            )));
        }

        let feature_set = build_features(bars);
        let n = feature_set.samples.len();
        if n < cfg.min_clean_rows {
            return Err(AnalysisError::InsufficientData(format!(
                "ML model needs {} clean rows, got {}",
                cfg.min_clean_rows, n
            )));
        }
        let latest = feature_set
            .latest
            .ok_or_else(|| AnalysisError::InsufficientData("latest bar has incomplete features".to_string()))?;

        let (rows, labels): (Vec<Vec<f64>>, Vec<f64>) = feature_set.samples.into_iter().unzip();
        let params = TrainingParams {
            learning_rate: cfg.learning_rate,
            iterations: cfg.iterations,
            l2: cfg.l2,
        };

        let folds = walk_forward_folds(n, cfg.folds);
        let fold_accuracies = cross_validate(&rows, &labels, &folds, params)?;
        let cv_accuracy = if fold_accuracies.is_empty() { 0.5 } else { mean(&fold_accuracies) };

        let train_end = ((n as f64 * cfg.train_fraction) as usize).clamp(1, n);
        let (model, scaler) = fit_on(&rows, &labels, 0..train_end, params)?;
        let holdout_accuracy = if train_end < n {
            Some(evaluate(&model, &scaler, &rows, &labels, train_end..n)?)
        } else {
            None
        };

        let probability_up = model.predict_proba_row(&scaler.transform_row(&latest))?;
        let multiplier = accuracy_multiplier(cv_accuracy, cfg.min_accuracy_multiplier);
        let signal = (probability_up - 0.5) * 2.0 * multiplier;

        let direction = if probability_up > 0.5 { "Up" } else if probability_up < 0.5 { "Down" } else { "Flat" };
        let interpretation = format!(
            "Model leans {} ({:.1}% up, {:.1}% walk-forward accuracy)",
            direction,
            probability_up * 100.0,
            cv_accuracy * 100.0
        );

        tracing::debug!(rows = n, cv_accuracy, probability_up, "ML direction model trained");

        Ok(SignalResult::new(
            signal,
            interpretation,
            MlReading {
                probability_up: round_to(probability_up, 4),
                cv_accuracy: round_to(cv_accuracy, 4),
                fold_accuracies: fold_accuracies.iter().map(|a| round_to(*a, 4)).collect(),
                holdout_accuracy: holdout_accuracy.map(|a| round_to(a, 4)),
                accuracy_multiplier: round_to(multiplier, 3),
                training_rows: train_end,
                features_used: FEATURE_COUNT,
            },
        ))
    }
}

impl Default for MlSignalAnalyzer {
    fn default() -> Self {
        Self::new(MlConfig::default())
    }
}
