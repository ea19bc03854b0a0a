use analysis_core::stats::{mean, round_to};
use analysis_core::Bar;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weekly closes considered for momentum (four week-over-week returns).
pub const WEEKLY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
        };
        f.write_str(s)
    }
}

/// Direction and streak of the last few weekly closes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub direction: TrendDirection,
    /// Consecutive most-recent weeks moving in `direction`.
    pub streak: u32,
    /// Mean week-over-week return, percent.
    pub avg_weekly_return: f64,
    pub up_weeks: u32,
    pub down_weeks: u32,
}

impl WeeklyTrend {
    /// Momentum signal derived from the streak: `0.3 + 0.15 per week`, capped at 1.
    pub fn momentum_signal(&self) -> f64 {
        let magnitude = (0.3 + self.streak as f64 * 0.15).min(1.0);
        match self.direction {
            TrendDirection::Up => magnitude,
            TrendDirection::Down => -magnitude,
            TrendDirection::Flat => 0.0,
        }
    }

    /// Component used inside the seasonal blend: `0.5 + 0.1 per week`.
    pub fn seasonal_component(&self) -> f64 {
        match self.direction {
            TrendDirection::Up => 0.5 + self.streak as f64 * 0.1,
            TrendDirection::Down => -0.5 - self.streak as f64 * 0.1,
            TrendDirection::Flat => 0.0,
        }
    }

    pub fn describe(&self) -> String {
        match self.direction {
            TrendDirection::Flat => "No clear weekly direction".to_string(),
            d => format!(
                "{} {} week{} in a row ({}/{} weeks up)",
                if d == TrendDirection::Up { "Up" } else { "Down" },
                self.streak,
                if self.streak == 1 { "" } else { "s" },
                self.up_weeks,
                self.up_weeks + self.down_weeks
            ),
        }
    }
}

/// Last close of each ISO week, oldest first.
pub fn weekly_closes(bars: &[Bar]) -> Vec<f64> {
    let mut closes: Vec<f64> = Vec::new();
    let mut current_week = None;
    for bar in bars {
        let week = bar.timestamp.iso_week();
        let key = (week.year(), week.week());
        if current_week == Some(key) {
            if let Some(last) = closes.last_mut() {
                *last = bar.close;
            }
        } else {
            closes.push(bar.close);
            current_week = Some(key);
        }
    }
    closes
}

/// Classify the trailing weekly returns of `bars`.
pub fn weekly_trend(bars: &[Bar]) -> WeeklyTrend {
    let closes = weekly_closes(bars);
    let tail = &closes[closes.len().saturating_sub(WEEKLY_WINDOW)..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect();

    if returns.len() < 2 {
        return WeeklyTrend::default();
    }

    let up_weeks = returns.iter().filter(|&&r| r > 0.0).count() as u32;
    let down_weeks = returns.iter().filter(|&&r| r < 0.0).count() as u32;
    let direction = if up_weeks > down_weeks {
        TrendDirection::Up
    } else if down_weeks > up_weeks {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    let streak = returns
        .iter()
        .rev()
        .take_while(|&&r| match direction {
            TrendDirection::Up => r > 0.0,
            TrendDirection::Down => r < 0.0,
            TrendDirection::Flat => false,
        })
        .count() as u32;

    WeeklyTrend {
        direction,
        streak,
        avg_weekly_return: round_to(mean(&returns) * 100.0, 2),
        up_weeks,
        down_weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn daily_bars(weekly_closes: &[f64]) -> Vec<Bar> {
        // Monday 2024-01-01; five trading days per week, close fixed per week
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap();
        let mut bars = Vec::new();
        for (w, &close) in weekly_closes.iter().enumerate() {
            for d in 0..5 {
                bars.push(Bar {
                    timestamp: start + Duration::weeks(w as i64) + Duration::days(d),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1.0,
                    vwap: None,
                });
            }
        }
        bars
    }

    #[test]
    fn test_weekly_closes_one_per_week() {
        let closes = weekly_closes(&daily_bars(&[1.0, 2.0, 3.0]));
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_uptrend_streak() {
        let trend = weekly_trend(&daily_bars(&[100.0, 90.0, 95.0, 96.0, 99.0, 101.0]));
        assert_eq!(trend.direction, TrendDirection::Up);
        // last five closes: 90 95 96 99 101 -> four up weeks
        assert_eq!(trend.streak, 4);
        assert_eq!(trend.up_weeks, 4);
        assert!((trend.momentum_signal() - 0.9).abs() < 1e-12);
        assert!((trend.seasonal_component() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_downtrend_streak_broken() {
        let trend = weekly_trend(&daily_bars(&[100.0, 98.0, 99.0, 97.0, 95.0]));
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.streak, 2);
        assert_eq!(trend.down_weeks, 3);
        assert!((trend.momentum_signal() + 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_long_streak_caps_momentum() {
        let trend = WeeklyTrend {
            direction: TrendDirection::Up,
            streak: 10,
            ..Default::default()
        };
        assert_eq!(trend.momentum_signal(), 1.0);
    }

    #[test]
    fn test_too_few_weeks_is_flat() {
        let trend = weekly_trend(&daily_bars(&[100.0, 101.0]));
        assert_eq!(trend, WeeklyTrend::default());
        assert_eq!(trend.momentum_signal(), 0.0);
    }
}
