#[cfg(test)]
mod tests {
    use super::super::analyzer::score_rsi;
    use super::super::indicators::*;
    use analysis_core::Bar;
    use chrono::{Duration, TimeZone, Utc};

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // Helper function to create sample bars
    fn sample_bars() -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
        (0..15)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar {
                    timestamp: start + Duration::days(i),
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                    volume: 1000000.0,
                    vwap: None,
                }
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001);
        assert!((result[1] - 3.0).abs() < 0.001);
        assert!((result[2] - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(sma(&[1.0, 2.0], 5).is_empty());
        assert!(sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_sma_recovers_after_nan_leaves_window() {
        let data = vec![1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 4);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!((result[2] - 4.0).abs() < 0.001);
        assert!((result[3] - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_sma_real_prices() {
        let result = sma(&sample_prices(), 5);
        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[0] - expected_first).abs() < 0.01);
        assert_eq!(result.len(), 16);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        assert_eq!(result[0], 22.0);
        // multiplier 0.5: 22 -> 23 -> 23 -> 24 -> 25
        assert!((result[4] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = ema(&data, 3);
        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_bounds() {
        let result = rsi(&sample_prices(), 14);
        assert_eq!(result.len(), 6);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(rsi(&[1.0, 2.0, 3.0], 14).is_empty());
    }

    #[test]
    fn test_rsi_twenty_five_maps_to_oversold() {
        // Four gains of 1.5 and ten losses of 1.8: RS = 6 / 18
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = closes[closes.len() - 1];
            closes.push(if i < 4 { last + 1.5 } else { last - 1.8 });
        }
        assert_eq!(closes.len(), 15);

        let values = rsi(&closes, 14);
        assert_eq!(values.len(), 1);
        assert!((values[0] - 25.0).abs() < 1e-9);

        let scored = score_rsi(values[0]);
        assert_eq!(scored.interpretation, "Oversold");
        assert_eq!(scored.signal, 0.583);
    }

    #[test]
    fn test_rsi_flat_series_is_fifty() {
        let values = rsi(&[10.0; 30], 14);
        assert!(values.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_rsi_uptrend_is_overbought() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert!(*rsi(&uptrend, 14).last().unwrap() > 70.0);
    }

    #[test]
    fn test_macd_lengths_match_input() {
        let prices = sample_prices();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), prices.len());
        assert_eq!(result.signal_line.len(), prices.len());
        assert_eq!(result.histogram.len(), prices.len());
        for i in 0..prices.len() {
            let expected = result.macd_line[i] - result.signal_line[i];
            assert!((result.histogram[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let result = bollinger_bands(&sample_prices(), 10, 2.0);
        assert_eq!(result.upper.len(), 11);
        for i in 0..result.upper.len() {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
    }

    #[test]
    fn test_bollinger_collapsed_band() {
        let result = bollinger_bands(&[100.0; 20], 10, 2.0);
        assert_eq!(result.percent_b(0, 100.0), Some(0.5));
        assert!(result.bandwidth().iter().all(|&w| w == 0.0));
        assert_eq!(result.percent_b(99, 100.0), None);
    }

    #[test]
    fn test_atr_basic() {
        let result = atr(&sample_bars(), 5);
        assert_eq!(result.len(), 10);
        // high-low 3.0, high-prev close 2.0, low-prev close 1.0
        for &value in &result {
            assert!((value - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_atr_insufficient_data() {
        assert!(atr(&sample_bars()[..5], 14).is_empty());
    }

    #[test]
    fn test_atr_increases_with_volatility() {
        let normal_atr = atr(&sample_bars(), 5);
        let mut volatile_bars = sample_bars();
        for bar in &mut volatile_bars {
            bar.high += 10.0;
            bar.low -= 10.0;
        }
        let volatile_atr = atr(&volatile_bars, 5);
        assert!(volatile_atr[0] > normal_atr[0]);
    }

    #[test]
    fn test_obv_direction() {
        let bars = sample_bars();
        let result = obv(&bars);
        assert_eq!(result.len(), bars.len());
        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }

        let mut falling = sample_bars();
        falling.reverse();
        let result = obv(&falling);
        for i in 1..result.len() {
            assert!(result[i] < result[i - 1]);
        }
    }

    #[test]
    fn test_stochastic_bounds() {
        let result = stochastic(&sample_bars(), 14, 3);
        assert_eq!(result.k.len(), 2);
        assert!(result.d.is_empty());
        for &value in &result.k {
            assert!((0.0..=100.0).contains(&value));
        }
        assert!(stochastic(&sample_bars()[..5], 14, 3).k.is_empty());
    }

    #[test]
    fn test_adx_trending_market() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar {
                    timestamp: start + Duration::days(i),
                    open: base,
                    high: base + 0.5,
                    low: base - 0.5,
                    close: base,
                    volume: 1000.0,
                    vwap: None,
                }
            })
            .collect();
        let result = adx(&bars, 14);
        assert!(!result.adx.is_empty());
        assert!(*result.adx.last().unwrap() > 25.0);
        assert!(result.plus_di.last().unwrap() > result.minus_di.last().unwrap());
        assert!(adx(&bars[..20], 14).adx.is_empty());
    }

    #[test]
    fn test_last_cross() {
        assert_eq!(last_cross(&[1.0, 3.0], &[2.0, 2.0]), Some(true));
        assert_eq!(last_cross(&[3.0, 1.0], &[2.0, 2.0]), Some(false));
        assert_eq!(last_cross(&[3.0, 4.0], &[2.0, 2.0]), None);
        assert_eq!(last_cross(&[3.0], &[2.0]), None);
    }

    #[test]
    fn test_align_end_and_returns() {
        let aligned = align_end(&[1.0, f64::NAN, 3.0], 5);
        assert_eq!(aligned, vec![None, None, Some(1.0), None, Some(3.0)]);
        let returns = daily_returns(&[100.0, 110.0, 99.0]);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }
}
