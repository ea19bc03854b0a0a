use analysis_core::stats::{mean, round_to};
use analysis_core::{AnalysisError, Bar, SignalResult};
use serde::{Deserialize, Serialize};

use crate::indicators::*;
use crate::volume::{analyze_volume_trend, VolumeTrendReading};

/// Minimum history for the 200-day moving average.
pub const MIN_TECHNICAL_BARS: usize = 200;

const SQUEEZE_LOOKBACK: usize = 120;
const SQUEEZE_RATIO: f64 = 0.75;
const CROSSOVER_BONUS: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiReading {
    pub value: f64,
}

impl Default for RsiReading {
    fn default() -> Self {
        Self { value: 50.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaTrendReading {
    pub ma20: f64,
    pub ma50: f64,
    pub ma200: f64,
    pub current_price: f64,
    pub above_ma20: bool,
    pub above_ma50: bool,
    pub above_ma200: bool,
    pub position: String,
    pub crossovers: Vec<String>,
}

impl Default for MaTrendReading {
    fn default() -> Self {
        Self {
            ma20: 0.0,
            ma50: 0.0,
            ma200: 0.0,
            current_price: 0.0,
            above_ma20: false,
            above_ma50: false,
            above_ma200: false,
            position: "Unknown".to_string(),
            crossovers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub percent_b: f64,
    pub bandwidth: f64,
    pub squeeze: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
}

impl Default for StochasticReading {
    fn default() -> Self {
        Self { k: 50.0, d: 50.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrReading {
    pub atr_14: f64,
    pub atr_50: f64,
    pub ratio: f64,
    /// ATR(14) as a percentage of price
    pub atr_percent: f64,
    pub regime: String,
}

impl Default for AtrReading {
    fn default() -> Self {
        Self {
            atr_14: 0.0,
            atr_50: 0.0,
            ratio: 1.0,
            atr_percent: 0.0,
            regime: "Unknown".to_string(),
        }
    }
}

/// All technical sub-signals for one price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReport {
    pub rsi: SignalResult<RsiReading>,
    pub macd: SignalResult<MacdReading>,
    pub ma_trend: SignalResult<MaTrendReading>,
    pub bollinger: SignalResult<BollingerReading>,
    pub stochastic: SignalResult<StochasticReading>,
    pub atr_volatility: SignalResult<AtrReading>,
    pub volume_trend: SignalResult<VolumeTrendReading>,
}

impl TechnicalReport {
    pub fn neutral(reason: &str) -> Self {
        Self {
            rsi: SignalResult::neutral(reason),
            macd: SignalResult::neutral(reason),
            ma_trend: SignalResult::neutral(reason),
            bollinger: SignalResult::neutral(reason),
            stochastic: SignalResult::neutral(reason),
            atr_volatility: SignalResult::neutral(reason),
            volume_trend: SignalResult::neutral(reason),
        }
    }
}

/// RSI mapping: oversold is bullish, overbought bearish, linear around 50 in between.
pub fn score_rsi(value: f64) -> SignalResult<RsiReading> {
    let value = round_to(value, 1);
    let (interpretation, signal) = if value < 30.0 {
        ("Oversold", 0.5 + (30.0 - value) / 60.0)
    } else if value > 70.0 {
        ("Overbought", -0.5 - (value - 70.0) / 60.0)
    } else {
        ("Neutral", (50.0 - value) / 40.0)
    };
    SignalResult::new(signal, interpretation, RsiReading { value })
}

/// MACD mapping from the histogram normalised by price, with a crossover kick.
pub fn score_macd(
    macd_line: f64,
    signal_line: f64,
    histogram: f64,
    prev_histogram: Option<f64>,
    price: f64,
) -> SignalResult<MacdReading> {
    let hist_normalized = if price != 0.0 { histogram / price * 100.0 } else { 0.0 };
    let (mut interpretation, mut signal) = if histogram > 0.0 {
        ("Bullish", (hist_normalized * 10.0).min(1.0))
    } else if histogram < 0.0 {
        ("Bearish", (hist_normalized * 10.0).max(-1.0))
    } else {
        ("Neutral", 0.0)
    };

    if let Some(prev) = prev_histogram {
        if prev < 0.0 && histogram > 0.0 {
            interpretation = "Bullish Crossover";
            signal = (signal + CROSSOVER_BONUS).min(1.0);
        } else if prev > 0.0 && histogram < 0.0 {
            interpretation = "Bearish Crossover";
            signal = (signal - CROSSOVER_BONUS).max(-1.0);
        }
    }

    SignalResult::new(
        signal,
        interpretation,
        MacdReading {
            macd_line: round_to(macd_line, 4),
            signal_line: round_to(signal_line, 4),
            histogram: round_to(histogram, 4),
        },
    )
}

/// Moving-average position: count of MAs below price, plus an alignment bonus.
pub fn score_ma_trend(price: f64, ma20: f64, ma50: f64, ma200: f64, crossovers: Vec<String>) -> SignalResult<MaTrendReading> {
    let above_ma20 = price > ma20;
    let above_ma50 = price > ma50;
    let above_ma200 = price > ma200;
    let above_count = [above_ma20, above_ma50, above_ma200].iter().filter(|&&a| a).count();

    let position = match above_count {
        3 => "Strong Uptrend",
        2 => "Moderate Uptrend",
        1 => "Moderate Downtrend",
        _ => "Strong Downtrend",
    };

    let alignment_bonus = if ma20 > ma50 && ma50 > ma200 {
        0.2
    } else if ma20 < ma50 && ma50 < ma200 {
        -0.2
    } else {
        0.0
    };

    let signal = (above_count as f64 - 1.5) / 1.5 + alignment_bonus;

    SignalResult::new(
        signal,
        position,
        MaTrendReading {
            ma20: round_to(ma20, 2),
            ma50: round_to(ma50, 2),
            ma200: round_to(ma200, 2),
            current_price: round_to(price, 2),
            above_ma20,
            above_ma50,
            above_ma200,
            position: position.to_string(),
            crossovers,
        },
    )
}

/// Bollinger mapping: mild mean reversion inside the bands, strong near them.
pub fn score_bollinger(upper: f64, middle: f64, lower: f64, percent_b: f64, bandwidth: f64, avg_bandwidth: Option<f64>) -> SignalResult<BollingerReading> {
    let (mut interpretation, mut signal) = if percent_b < 0.2 {
        ("Near Lower Band (Oversold)".to_string(), 0.5 + (0.2 - percent_b) * 2.5)
    } else if percent_b > 0.8 {
        ("Near Upper Band (Overbought)".to_string(), -0.5 - (percent_b - 0.8) * 2.5)
    } else {
        ("Within Bands".to_string(), (0.5 - percent_b) / 0.6 * 0.5)
    };

    let squeeze = avg_bandwidth.map(|avg| avg > 0.0 && bandwidth < avg * SQUEEZE_RATIO).unwrap_or(false);
    if squeeze {
        signal *= 0.5;
        interpretation.push_str(" - Squeeze");
    }

    SignalResult::new(
        signal,
        interpretation,
        BollingerReading {
            upper: round_to(upper, 2),
            middle: round_to(middle, 2),
            lower: round_to(lower, 2),
            percent_b: round_to(percent_b, 3),
            bandwidth: round_to(bandwidth, 4),
            squeeze,
        },
    )
}

/// Stochastic mapping with 20/80 bands and %K/%D crossovers.
pub fn score_stochastic(k: f64, d: f64, cross: Option<bool>) -> SignalResult<StochasticReading> {
    let (mut interpretation, mut signal) = if k < 20.0 {
        ("Oversold".to_string(), 0.5 + (20.0 - k) / 40.0)
    } else if k > 80.0 {
        ("Overbought".to_string(), -0.5 - (k - 80.0) / 40.0)
    } else {
        ("Neutral".to_string(), (50.0 - k) / 60.0)
    };

    match cross {
        Some(true) => {
            interpretation.push_str(" - Bullish Crossover");
            signal += CROSSOVER_BONUS;
        }
        Some(false) => {
            interpretation.push_str(" - Bearish Crossover");
            signal -= CROSSOVER_BONUS;
        }
        None => {}
    }

    SignalResult::new(signal, interpretation, StochasticReading { k: round_to(k, 1), d: round_to(d, 1) })
}

/// Volatility regime from ATR(14)/ATR(50); elevated volatility reads as caution.
pub fn classify_atr_regime(ratio: f64) -> (&'static str, f64) {
    if ratio > 1.5 {
        ("Very High", -0.4)
    } else if ratio > 1.2 {
        ("High", -0.2)
    } else if ratio >= 0.8 {
        ("Normal", 0.0)
    } else if ratio >= 0.6 {
        ("Low", 0.1)
    } else {
        ("Very Low", 0.15)
    }
}

/// Most recent MA50/MA200 sign flip within the last five bars.
fn detect_ma_crossovers(sma_50: &[f64], sma_200: &[f64]) -> Vec<String> {
    let n = sma_50.len().min(sma_200.len()).min(5);
    if n < 2 {
        return Vec::new();
    }
    let fast = &sma_50[sma_50.len() - n..];
    let slow = &sma_200[sma_200.len() - n..];

    for i in (1..n).rev() {
        if let Some(up) = last_cross(&fast[i - 1..=i], &slow[i - 1..=i]) {
            let label = if up {
                "Golden Cross (MA50 crossed above MA200)"
            } else {
                "Death Cross (MA50 crossed below MA200)"
            };
            return vec![label.to_string()];
        }
    }
    Vec::new()
}

pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, bars: &[Bar]) -> Result<TechnicalReport, AnalysisError> {
        if bars.len() < MIN_TECHNICAL_BARS {
            return Err(AnalysisError::InsufficientData(format!(
                "need at least {} bars for technical analysis, got {}",
                MIN_TECHNICAL_BARS,
                bars.len()
            )));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let current_price = closes[closes.len() - 1];
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AnalysisError::InvalidData(format!("last close is not a usable price: {}", current_price)));
        }

        // RSI
        let rsi_values = rsi(&closes, 14);
        let rsi = match rsi_values.last() {
            Some(&v) if v.is_finite() => score_rsi(v),
            _ => SignalResult::insufficient(),
        };

        // MACD
        let macd_result = macd(&closes, 12, 26, 9);
        let hist = &macd_result.histogram;
        let macd = match (macd_result.macd_line.last(), macd_result.signal_line.last(), hist.last()) {
            (Some(&m), Some(&s), Some(&h)) if h.is_finite() => {
                let prev = hist.len().checked_sub(2).map(|i| hist[i]);
                score_macd(m, s, h, prev, current_price)
            }
            _ => SignalResult::insufficient(),
        };

        // Moving averages
        let sma_20 = sma(&closes, 20);
        let sma_50 = sma(&closes, 50);
        let sma_200 = sma(&closes, 200);
        let ma_trend = match (sma_20.last(), sma_50.last(), sma_200.last()) {
            (Some(&m20), Some(&m50), Some(&m200)) if [m20, m50, m200].iter().all(|v| v.is_finite()) => {
                let crossovers = detect_ma_crossovers(&sma_50, &sma_200);
                score_ma_trend(current_price, m20, m50, m200, crossovers)
            }
            _ => SignalResult::insufficient(),
        };

        // Bollinger Bands
        let bb = bollinger_bands(&closes, 20, 2.0);
        let bandwidths = bb.bandwidth();
        let bollinger = match (bb.upper.last(), bb.middle.last(), bb.lower.last(), bandwidths.last()) {
            (Some(&u), Some(&m), Some(&l), Some(&bw)) if [u, m, l, bw].iter().all(|v| v.is_finite()) => {
                let idx = bb.upper.len() - 1;
                let percent_b = bb.percent_b(idx, current_price).unwrap_or(0.5);
                let window = &bandwidths[bandwidths.len().saturating_sub(SQUEEZE_LOOKBACK)..];
                let avg_bandwidth = if window.len() >= 20 { Some(mean(window)) } else { None };
                score_bollinger(u, m, l, percent_b, bw, avg_bandwidth)
            }
            _ => SignalResult::insufficient(),
        };

        // Stochastic Oscillator
        let stoch = stochastic(bars, 14, 3);
        let stochastic = match (stoch.k.last(), stoch.d.last()) {
            (Some(&k), Some(&d)) if k.is_finite() && d.is_finite() => score_stochastic(k, d, last_cross(&stoch.k, &stoch.d)),
            _ => SignalResult::insufficient(),
        };

        // ATR volatility regime
        let atr_14 = atr(bars, 14);
        let atr_50 = atr(bars, 50);
        let atr_volatility = match (atr_14.last(), atr_50.last()) {
            (Some(&short), Some(&long)) if short.is_finite() && long.is_finite() => {
                let ratio = if long > 0.0 { short / long } else { 1.0 };
                let (regime, signal) = classify_atr_regime(ratio);
                SignalResult::new(
                    signal,
                    format!("{} Volatility", regime),
                    AtrReading {
                        atr_14: round_to(short, 4),
                        atr_50: round_to(long, 4),
                        ratio: round_to(ratio, 3),
                        atr_percent: round_to(short / current_price * 100.0, 2),
                        regime: regime.to_string(),
                    },
                )
            }
            _ => SignalResult::insufficient(),
        };

        let volume_trend = analyze_volume_trend(bars).unwrap_or_else(|e| {
            tracing::debug!("volume trend unavailable: {}", e);
            SignalResult::insufficient()
        });

        Ok(TechnicalReport {
            rsi,
            macd,
            ma_trend,
            bollinger,
            stochastic,
            atr_volatility,
            volume_trend,
        })
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
