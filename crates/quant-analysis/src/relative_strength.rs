use analysis_core::stats::round_to;
use analysis_core::{AnalysisError, Bar, SignalResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;

const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 20;
const BETA_WINDOW: usize = 60;
const SHORT_WEIGHT: f64 = 0.4;
const LONG_WEIGHT: f64 = 0.6;
/// Combined excess return that maps to a full-strength signal.
const REFERENCE_EXCESS: f64 = 0.05;
const IN_LINE_BAND: f64 = 0.005;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrengthReading {
    pub benchmark: String,
    /// Returns below are percentages.
    pub stock_return_5d: f64,
    pub benchmark_return_5d: f64,
    pub excess_5d: f64,
    pub stock_return_20d: f64,
    pub benchmark_return_20d: f64,
    pub excess_20d: f64,
    pub combined_excess: f64,
    pub beta_60d: Option<f64>,
    pub correlation_60d: Option<f64>,
}

/// Closes of the two series on the dates both traded, oldest first.
pub fn align_by_date(stock: &[Bar], benchmark: &[Bar]) -> Vec<(f64, f64)> {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark
        .iter()
        .map(|b| (b.timestamp.date_naive(), b.close))
        .collect();

    stock
        .iter()
        .filter_map(|b| bench_by_date.get(&b.timestamp.date_naive()).map(|&bench| (b.close, bench)))
        .collect()
}

fn window_return(closes: &[f64], window: usize) -> Option<f64> {
    let n = closes.len();
    if n <= window {
        return None;
    }
    let from = closes[n - 1 - window];
    let to = closes[n - 1];
    if from == 0.0 {
        return None;
    }
    let r = to / from - 1.0;
    r.is_finite().then_some(r)
}

fn returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Beta and correlation of the stock against the benchmark over the last `window` returns.
pub fn beta_and_correlation(stock: &[f64], benchmark: &[f64], window: usize) -> Option<(f64, f64)> {
    let n = stock.len().min(benchmark.len()).min(window);
    if n < 2 {
        return None;
    }
    let s = &stock[stock.len() - n..];
    let b = &benchmark[benchmark.len() - n..];

    let bench_variance = b.variance();
    let stock_variance = s.variance();
    if !(bench_variance > 0.0) || !(stock_variance > 0.0) {
        return None;
    }
    let covariance = s.covariance(b);
    let beta = covariance / bench_variance;
    let correlation = covariance / (bench_variance.sqrt() * stock_variance.sqrt());
    (beta.is_finite() && correlation.is_finite()).then_some((beta, correlation))
}

pub struct RelativeStrengthAnalyzer {
    benchmark: String,
}

impl RelativeStrengthAnalyzer {
    pub fn new(benchmark: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
        }
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Excess 5- and 20-day return over the benchmark.
    ///
    /// A missing benchmark is not an error: the result is neutral with an
    /// explanatory interpretation.
    pub fn analyze(&self, stock: &[Bar], benchmark: &[Bar]) -> Result<SignalResult<RelativeStrengthReading>, AnalysisError> {
        if benchmark.is_empty() {
            return Ok(SignalResult::neutral("Benchmark data unavailable"));
        }

        let paired = align_by_date(stock, benchmark);
        if paired.len() <= LONG_WINDOW {
            return Err(AnalysisError::InsufficientData(format!(
                "relative strength needs {} overlapping days with {}, got {}",
                LONG_WINDOW + 1,
                self.benchmark,
                paired.len()
            )));
        }

        let stock_closes: Vec<f64> = paired.iter().map(|p| p.0).collect();
        let bench_closes: Vec<f64> = paired.iter().map(|p| p.1).collect();

        let (Some(s5), Some(b5), Some(s20), Some(b20)) = (
            window_return(&stock_closes, SHORT_WINDOW),
            window_return(&bench_closes, SHORT_WINDOW),
            window_return(&stock_closes, LONG_WINDOW),
            window_return(&bench_closes, LONG_WINDOW),
        ) else {
            return Err(AnalysisError::InvalidData(format!(
                "non-positive closes in the last {} days",
                LONG_WINDOW
            )));
        };

        let excess_5 = s5 - b5;
        let excess_20 = s20 - b20;
        let combined = SHORT_WEIGHT * excess_5 + LONG_WEIGHT * excess_20;

        let beta = beta_and_correlation(&returns(&stock_closes), &returns(&bench_closes), BETA_WINDOW);

        let interpretation = if combined > IN_LINE_BAND {
            format!("Outperforming {}", self.benchmark)
        } else if combined < -IN_LINE_BAND {
            format!("Underperforming {}", self.benchmark)
        } else {
            format!("In line with {}", self.benchmark)
        };

        Ok(SignalResult::new(
            combined / REFERENCE_EXCESS,
            interpretation,
            RelativeStrengthReading {
                benchmark: self.benchmark.clone(),
                stock_return_5d: round_to(s5 * 100.0, 2),
                benchmark_return_5d: round_to(b5 * 100.0, 2),
                excess_5d: round_to(excess_5 * 100.0, 2),
                stock_return_20d: round_to(s20 * 100.0, 2),
                benchmark_return_20d: round_to(b20 * 100.0, 2),
                excess_20d: round_to(excess_20 * 100.0, 2),
                combined_excess: round_to(combined * 100.0, 2),
                beta_60d: beta.map(|(b, _)| round_to(b, 3)),
                correlation_60d: beta.map(|(_, c)| round_to(c, 3)),
            },
        ))
    }
}
