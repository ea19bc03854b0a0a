use analysis_core::stats::{mean, round_to};
use analysis_core::{AnalysisError, Bar, SignalResult};
use serde::{Deserialize, Serialize};

use crate::indicators::{adx, obv, sma};

const OBV_SMA_PERIOD: usize = 20;
const PRICE_LOOKBACK: usize = 20;
const ADX_PERIOD: usize = 14;
const ADX_TRENDING: f64 = 25.0;
const HIGH_VOLUME_RATIO: f64 = 1.5;

/// Minimum bars for OBV smoothing and a settled ADX.
pub const MIN_VOLUME_BARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTrendReading {
    pub obv_trend: String,
    pub price_trend: String,
    pub divergence: bool,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    /// Latest volume over its 20-bar average
    pub volume_ratio: f64,
}

impl Default for VolumeTrendReading {
    fn default() -> Self {
        Self {
            obv_trend: "Flat".to_string(),
            price_trend: "Flat".to_string(),
            divergence: false,
            adx: None,
            plus_di: None,
            minus_di: None,
            volume_ratio: 1.0,
        }
    }
}

fn direction(delta: f64) -> &'static str {
    if delta > 0.0 {
        "Rising"
    } else if delta < 0.0 {
        "Falling"
    } else {
        "Flat"
    }
}

/// Volume confirmation: OBV against price direction, boosted by a trending ADX.
pub fn analyze_volume_trend(bars: &[Bar]) -> Result<SignalResult<VolumeTrendReading>, AnalysisError> {
    if bars.len() < MIN_VOLUME_BARS {
        return Err(AnalysisError::InsufficientData(format!(
            "volume trend needs {} bars, got {}",
            MIN_VOLUME_BARS,
            bars.len()
        )));
    }

    let obv_values = obv(bars);
    let obv_sma = sma(&obv_values, OBV_SMA_PERIOD);
    let (Some(&obv_now), Some(&obv_avg)) = (obv_values.last(), obv_sma.last()) else {
        return Err(AnalysisError::InsufficientData("OBV unavailable".to_string()));
    };

    let n = bars.len();
    let price_delta = bars[n - 1].close - bars[n - 1 - PRICE_LOOKBACK].close;
    let obv_delta = obv_now - obv_avg;
    if !price_delta.is_finite() || !obv_delta.is_finite() {
        return Err(AnalysisError::InvalidData(format!(
            "non-finite volume trend inputs: price delta {}, OBV delta {}",
            price_delta, obv_delta
        )));
    }
    let price_trend = direction(price_delta);
    let obv_trend = direction(obv_delta);

    let mut divergence = false;
    let (mut interpretation, mut signal) = match (price_delta > 0.0, obv_delta > 0.0) {
        _ if price_delta == 0.0 || obv_delta == 0.0 => ("No Clear Volume Trend".to_string(), 0.0),
        (true, true) => ("Volume Confirms Uptrend".to_string(), 0.4),
        (false, false) => ("Volume Confirms Downtrend".to_string(), -0.4),
        (true, false) => {
            divergence = true;
            ("Bearish Volume Divergence".to_string(), -0.5)
        }
        (false, true) => {
            divergence = true;
            ("Bullish Volume Divergence".to_string(), 0.5)
        }
    };

    let adx_result = adx(bars, ADX_PERIOD);
    let adx_now = adx_result.adx.last().copied();
    let plus_di = adx_result.plus_di.last().copied();
    let minus_di = adx_result.minus_di.last().copied();
    if let (Some(a), Some(p), Some(m)) = (adx_now, plus_di, minus_di) {
        if a > ADX_TRENDING {
            if p > m {
                signal += 0.3;
                interpretation.push_str(" - Strong Uptrend (ADX)");
            } else if m > p {
                signal -= 0.3;
                interpretation.push_str(" - Strong Downtrend (ADX)");
            }
        }
    }

    let volumes: Vec<f64> = bars[n - OBV_SMA_PERIOD..].iter().map(|b| b.volume).collect();
    let avg_volume = mean(&volumes);
    let volume_ratio = if avg_volume > 0.0 { bars[n - 1].volume / avg_volume } else { 1.0 };
    if volume_ratio > HIGH_VOLUME_RATIO {
        signal *= 1.2;
    }

    Ok(SignalResult::new(
        signal,
        interpretation,
        VolumeTrendReading {
            obv_trend: obv_trend.to_string(),
            price_trend: price_trend.to_string(),
            divergence,
            adx: adx_now.map(|v| round_to(v, 1)),
            plus_di: plus_di.map(|v| round_to(v, 1)),
            minus_di: minus_di.map(|v| round_to(v, 1)),
            volume_ratio: round_to(volume_ratio, 2),
        },
    ))
}
