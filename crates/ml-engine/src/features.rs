//! Per-day feature rows for the direction classifier.
//!
//! Every indicator is right-aligned to the bar index; a row is usable only
//! when every feature is present and finite.

use analysis_core::stats::std_dev;
use analysis_core::Bar;
use chrono::Datelike;
use technical_analysis::indicators::{
    adx, align_end, atr, bollinger_bands, daily_returns, macd, obv, rsi, sma, stochastic,
};

pub const FEATURE_NAMES: [&str; 40] = [
    "rsi",
    "macd_hist_norm",
    "bb_percent_b",
    "bb_width_ratio",
    "volume_ratio_5",
    "volume_ratio_20",
    "obv_slope",
    "price_to_ma20",
    "price_to_ma50",
    "price_to_ma200",
    "return_1d",
    "return_5d",
    "return_10d",
    "return_20d",
    "atr_ratio",
    "volatility_20d",
    "stoch_k",
    "stoch_d",
    "adx",
    "di_diff",
    "close_position",
    "roc_10",
    "ma20_slope",
    "dow_mon",
    "dow_tue",
    "dow_wed",
    "dow_thu",
    "dow_fri",
    "month_jan",
    "month_feb",
    "month_mar",
    "month_apr",
    "month_may",
    "month_jun",
    "month_jul",
    "month_aug",
    "month_sep",
    "month_oct",
    "month_nov",
    "month_dec",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Labelled training rows plus the unlabelled row for the latest bar.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    /// Rows in time order; label 1.0 when the next close is higher.
    pub samples: Vec<(Vec<f64>, f64)>,
    /// Features for the final bar, whose outcome is unknown.
    pub latest: Option<Vec<f64>>,
}

fn quotient(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some(a / b),
        _ => None,
    }
}

fn ratio(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    quotient(a, b).map(|q| q - 1.0)
}

fn lagged_return(closes: &[f64], i: usize, lag: usize) -> Option<f64> {
    let from = *closes.get(i.checked_sub(lag)?)?;
    (from != 0.0).then(|| closes[i] / from - 1.0)
}

pub fn build_features(bars: &[Bar]) -> FeatureSet {
    let n = bars.len();
    if n < 2 {
        return FeatureSet::default();
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let rsi_14 = align_end(&rsi(&closes, 14), n);
    let macd_hist = align_end(&macd(&closes, 12, 26, 9).histogram, n);

    let bb = bollinger_bands(&closes, 20, 2.0);
    let offset = n - bb.upper.len().min(n);
    let percent_b: Vec<f64> = (0..bb.upper.len())
        .map(|j| bb.percent_b(j, closes[j + offset]).unwrap_or(f64::NAN))
        .collect();
    let percent_b = align_end(&percent_b, n);
    let bandwidth = bb.bandwidth();
    let bandwidth_avg = align_end(&sma(&bandwidth, 50), n);
    let bandwidth = align_end(&bandwidth, n);

    let vol_5 = align_end(&sma(&volumes, 5), n);
    let vol_20 = align_end(&sma(&volumes, 20), n);
    let obv_values = obv(bars);

    let ma_20 = align_end(&sma(&closes, 20), n);
    let ma_50 = align_end(&sma(&closes, 50), n);
    let ma_200 = align_end(&sma(&closes, 200), n);

    let atr_14 = align_end(&atr(bars, 14), n);
    let atr_50 = align_end(&atr(bars, 50), n);

    let rets = daily_returns(&closes);
    let rolling_vol: Vec<f64> = rets.windows(20).map(std_dev).collect();
    let rolling_vol = align_end(&rolling_vol, n);

    let stoch = stochastic(bars, 14, 3);
    let stoch_k = align_end(&stoch.k, n);
    let stoch_d = align_end(&stoch.d, n);

    let adx_result = adx(bars, 14);
    let adx_14 = align_end(&adx_result.adx, n);
    let plus_di = align_end(&adx_result.plus_di, n);
    let minus_di = align_end(&adx_result.minus_di, n);

    let row_at = |i: usize| -> Option<Vec<f64>> {
        let bar = &bars[i];
        let close = closes[i];

        let obv_slope = {
            let prev = *obv_values.get(i.checked_sub(5)?)?;
            let scale = vol_20[i]? * 5.0;
            (scale > 0.0).then(|| (obv_values[i] - prev) / scale)?
        };
        let range = bar.high - bar.low;
        let close_position = if range > 0.0 { (close - bar.low) / range } else { 0.5 };
        let ma20_slope = ratio(ma_20[i], ma_20[i.checked_sub(5)?])?;

        let mut row = vec![
            rsi_14[i]? / 100.0,
            macd_hist[i]? / close * 100.0,
            percent_b[i]?,
            quotient(bandwidth[i], bandwidth_avg[i])?,
            quotient(Some(volumes[i]), vol_5[i])?,
            quotient(Some(volumes[i]), vol_20[i])?,
            obv_slope,
            ratio(Some(close), ma_20[i])?,
            ratio(Some(close), ma_50[i])?,
            ratio(Some(close), ma_200[i])?,
            lagged_return(&closes, i, 1)?,
            lagged_return(&closes, i, 5)?,
            lagged_return(&closes, i, 10)?,
            lagged_return(&closes, i, 20)?,
            quotient(atr_14[i], atr_50[i])?,
            rolling_vol[i]?,
            stoch_k[i]? / 100.0,
            stoch_d[i]? / 100.0,
            adx_14[i]? / 100.0,
            (plus_di[i]? - minus_di[i]?) / 100.0,
            close_position,
            lagged_return(&closes, i, 10)? * 100.0,
            ma20_slope,
        ];

        let weekday = bar.timestamp.weekday().num_days_from_monday().min(4) as usize;
        row.extend((0..5).map(|d| if d == weekday { 1.0 } else { 0.0 }));
        let month = bar.timestamp.month0() as usize;
        row.extend((0..12).map(|m| if m == month { 1.0 } else { 0.0 }));

        row.iter().all(|v| v.is_finite()).then_some(row)
    };

    let samples = (0..n - 1)
        .filter_map(|i| {
            let row = row_at(i)?;
            let label = if closes[i + 1] > closes[i] { 1.0 } else { 0.0 };
            Some((row, label))
        })
        .collect();

    FeatureSet {
        samples,
        latest: row_at(n - 1),
    }
}
