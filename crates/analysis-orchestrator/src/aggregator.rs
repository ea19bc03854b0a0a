//! Weighted combination of per-signal opinions into one recommendation.

use analysis_core::stats::{clamp_signal, finalize_signal, population_variance, round_to};
use analysis_core::{Recommendation, SignalLabel, SignalName, INSUFFICIENT_DATA};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::weights::WeightTable;

pub const CONFIDENCE_FLOOR: f64 = 15.0;
pub const CONFIDENCE_CEILING: f64 = 95.0;

/// Below this magnitude a signal counts as agreeing with a flat combined score.
const NEUTRAL_BAND: f64 = 0.1;

/// One analyzer's contribution before weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalInput {
    pub signal: f64,
    pub interpretation: String,
}

impl SignalInput {
    pub fn new(signal: f64, interpretation: impl Into<String>) -> Self {
        Self {
            signal: finalize_signal(signal),
            interpretation: interpretation.into(),
        }
    }

    fn missing() -> Self {
        Self::new(0.0, INSUFFICIENT_DATA)
    }

    /// False when the analyzer fell back to its neutral default.
    pub fn is_available(&self) -> bool {
        self.interpretation != INSUFFICIENT_DATA
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub display_name: String,
    pub signal: f64,
    pub label: String,
    pub weight: f64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub combined_score: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub agreement: f64,
    pub signals_analyzed: usize,
    /// Signal with the largest magnitude; `None` when every signal is zero.
    pub strongest: Option<SignalName>,
    pub breakdown: BTreeMap<SignalName, SignalBreakdown>,
}

/// Share of signals pointing the same way as `score`; for a flat score, the
/// share that are themselves near zero.
pub fn agreement_ratio(signals: &[f64], score: f64) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let agreeing = signals
        .iter()
        .filter(|s| {
            if score > 0.0 {
                **s > 0.0
            } else if score < 0.0 {
                **s < 0.0
            } else {
                s.abs() < NEUTRAL_BAND
            }
        })
        .count();
    agreeing as f64 / signals.len() as f64
}

/// Weighted magnitude of the signals that oppose `score`.
pub fn weighted_opposition(weighted: &[(f64, f64)], score: f64) -> f64 {
    weighted
        .iter()
        .filter(|(signal, _)| (score > 0.0 && *signal < 0.0) || (score < 0.0 && *signal > 0.0))
        .map(|(signal, weight)| weight * signal.abs())
        .sum()
}

/// Bounded confidence: grows with |score| and agreement, shrinks with opposition and spread.
pub fn confidence(score: f64, agreement: f64, opposition: f64, variance: f64) -> f64 {
    let raw = CONFIDENCE_FLOOR + score.abs() * (0.5 + 0.5 * agreement) * 100.0 + 10.0 * agreement
        - 40.0 * opposition
        - 20.0 * variance;
    let raw = if raw.is_finite() { raw } else { CONFIDENCE_FLOOR };
    round_to(raw.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING), 1)
}

pub struct SignalAggregator {
    weights: WeightTable,
}

impl SignalAggregator {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Combine the inputs; weighted signals absent from `inputs` count as 0.0.
    pub fn aggregate(&self, inputs: &BTreeMap<SignalName, SignalInput>) -> Aggregate {
        let entries: Vec<(SignalName, SignalInput, f64)> = self
            .weights
            .iter()
            .map(|(name, weight)| {
                let input = inputs.get(&name).cloned().unwrap_or_else(SignalInput::missing);
                (name, input, weight)
            })
            .collect();

        let combined_score = round_to(
            clamp_signal(entries.iter().map(|(_, input, weight)| input.signal * weight).sum()),
            3,
        );

        let signals: Vec<f64> = entries.iter().map(|(_, input, _)| input.signal).collect();
        let weighted: Vec<(f64, f64)> = entries.iter().map(|(_, input, weight)| (input.signal, *weight)).collect();
        let agreement = agreement_ratio(&signals, combined_score);
        let opposition = weighted_opposition(&weighted, combined_score);
        let variance = population_variance(&signals);

        let mut strongest: Option<(SignalName, f64)> = None;
        for (name, input, _) in &entries {
            let magnitude = input.signal.abs();
            if magnitude > strongest.map(|(_, m)| m).unwrap_or(0.0) {
                strongest = Some((*name, magnitude));
            }
        }

        let breakdown = entries
            .iter()
            .map(|(name, input, weight)| {
                (
                    *name,
                    SignalBreakdown {
                        display_name: name.display_name().to_string(),
                        signal: input.signal,
                        label: SignalLabel::from_signal(input.signal).to_label().to_string(),
                        weight: *weight,
                        detail: input.interpretation.clone(),
                    },
                )
            })
            .collect();

        Aggregate {
            combined_score,
            recommendation: Recommendation::from_score(combined_score),
            confidence: confidence(combined_score, agreement, opposition, variance),
            agreement: round_to(agreement, 3),
            signals_analyzed: entries.iter().filter(|(_, input, _)| input.is_available()).count(),
            strongest: strongest.map(|(name, _)| name),
            breakdown,
        }
    }
}

/// One-paragraph explanation of an aggregate.
pub fn build_summary(aggregate: &Aggregate, rsi: f64, ma_position: &str) -> String {
    let outlook = if aggregate.combined_score > 0.0 {
        "upward"
    } else if aggregate.combined_score < 0.0 {
        "downward"
    } else {
        "sideways"
    };

    let mut summary = format!(
        "Based on analysis of {} signals, the overall outlook is {} with a {} recommendation at {:.1}% confidence.",
        aggregate.signals_analyzed, outlook, aggregate.recommendation, aggregate.confidence
    );

    match aggregate.strongest.and_then(|name| aggregate.breakdown.get(&name).map(|b| (name, b))) {
        Some((name, entry)) => summary.push_str(&format!(
            " The strongest signal comes from {} ({}).",
            name.driver_phrase(),
            entry.label
        )),
        None => summary.push_str(" No single signal stands out."),
    }

    if ma_position == "Unknown" {
        summary.push_str(&format!(" RSI is at {:.1}.", rsi));
    } else {
        summary.push_str(&format!(
            " RSI is at {:.1} and the stock is in a {}.",
            rsi,
            ma_position.to_lowercase()
        ));
    }
    summary
}
