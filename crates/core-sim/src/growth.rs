//! Single-pass log-wealth statistics.
//!
//! The growth rate of a path is the ordinary-least-squares slope of
//! `ln(wealth_t)` against the trial index `t`, over the full history including
//! `t = 0`. Means and co-moments are updated incrementally so the estimate is
//! available without retaining the history.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthUndefined {
    /// Some wealth value was zero or negative, so its logarithm is undefined.
    NonPositiveWealth,
    /// Wealth overflowed to infinity.
    NonFiniteWealth,
    /// A slope needs at least two points.
    SinglePoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogGrowth {
    Estimated {
        slope: f64,
        mean_log_wealth: f64,
        std_log_wealth: f64,
    },
    Undefined { reason: GrowthUndefined },
}

impl LogGrowth {
    pub fn slope(&self) -> Option<f64> {
        match self {
            Self::Estimated { slope, .. } => Some(*slope),
            Self::Undefined { .. } => None,
        }
    }

    pub fn mean_log_wealth(&self) -> Option<f64> {
        match self {
            Self::Estimated {
                mean_log_wealth, ..
            } => Some(*mean_log_wealth),
            Self::Undefined { .. } => None,
        }
    }

    pub fn std_log_wealth(&self) -> Option<f64> {
        match self {
            Self::Estimated { std_log_wealth, .. } => Some(*std_log_wealth),
            Self::Undefined { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogGrowthAccumulator {
    count: u64,
    mean_t: f64,
    mean_y: f64,
    m2_t: f64,
    m2_y: f64,
    co_moment: f64,
    undefined: Option<GrowthUndefined>,
}

impl LogGrowthAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the wealth observed at trial index `t`. Observations must arrive
    /// in trial order starting at `t = 0`.
    pub fn observe(&mut self, wealth: f64) {
        if self.undefined.is_some() {
            return;
        }
        if !wealth.is_finite() {
            self.undefined = Some(GrowthUndefined::NonFiniteWealth);
            return;
        }
        if wealth <= 0.0 {
            self.undefined = Some(GrowthUndefined::NonPositiveWealth);
            return;
        }

        let t = self.count as f64;
        let y = wealth.ln();
        self.count += 1;
        let n = self.count as f64;

        let delta_t = t - self.mean_t;
        let delta_y = y - self.mean_y;
        self.mean_t += delta_t / n;
        self.mean_y += delta_y / n;
        self.m2_t += delta_t * (t - self.mean_t);
        self.m2_y += delta_y * (y - self.mean_y);
        self.co_moment += delta_t * (y - self.mean_y);
    }

    pub fn finish(&self) -> LogGrowth {
        if let Some(reason) = self.undefined {
            return LogGrowth::Undefined { reason };
        }
        if self.count < 2 {
            return LogGrowth::Undefined {
                reason: GrowthUndefined::SinglePoint,
            };
        }

        LogGrowth::Estimated {
            slope: self.co_moment / self.m2_t,
            mean_log_wealth: self.mean_y,
            std_log_wealth: (self.m2_y / self.count as f64).sqrt(),
        }
    }
}

/// Nearest-rank percentile of an ascending slice. Panics on an empty slice.
pub fn percentile_nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    let count = sorted.len();
    let rank = (percentile * count).div_ceil(100);
    sorted[rank.saturating_sub(1)]
}

#[cfg(test)]
mod tests {
    use super::{percentile_nearest_rank, GrowthUndefined, LogGrowth, LogGrowthAccumulator};

    fn growth_of(history: &[f64]) -> LogGrowth {
        let mut accumulator = LogGrowthAccumulator::new();
        for &wealth in history {
            accumulator.observe(wealth);
        }
        accumulator.finish()
    }

    fn batch_ols_slope(history: &[f64]) -> f64 {
        let n = history.len() as f64;
        let ts: Vec<f64> = (0..history.len()).map(|t| t as f64).collect();
        let ys: Vec<f64> = history.iter().map(|w| w.ln()).collect();
        let mean_t = ts.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let cov: f64 = ts
            .iter()
            .zip(&ys)
            .map(|(t, y)| (t - mean_t) * (y - mean_y))
            .sum();
        let var: f64 = ts.iter().map(|t| (t - mean_t).powi(2)).sum();
        cov / var
    }

    #[test]
    fn constant_growth_recovers_exact_log_rate() {
        let history: Vec<f64> = (0..50).map(|t| 100.0 * 1.05_f64.powi(t)).collect();

        let slope = growth_of(&history).slope().unwrap();

        assert!((slope - 1.05_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn streaming_slope_matches_batch_regression() {
        let history = [1_000.0, 1_500.0, 750.0, 1_125.0, 1_687.5, 843.75, 843.75, 1_265.625];

        let streaming = growth_of(&history);
        let expected = batch_ols_slope(&history);

        assert!((streaming.slope().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn reports_mean_and_population_std_of_log_wealth() {
        let e = std::f64::consts::E;
        let growth = growth_of(&[1.0, e * e]);

        assert!((growth.mean_log_wealth().unwrap() - 1.0).abs() < 1e-12);
        assert!((growth.std_log_wealth().unwrap() - 1.0).abs() < 1e-12);
        assert!((growth.slope().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_wealth_is_flagged_not_negative_infinity() {
        let growth = growth_of(&[10.0, 5.0, 0.0]);

        assert_eq!(
            growth,
            LogGrowth::Undefined {
                reason: GrowthUndefined::NonPositiveWealth
            }
        );
        assert_eq!(growth.slope(), None);
    }

    #[test]
    fn overflowed_wealth_is_not_reported_as_non_positive() {
        assert_eq!(
            growth_of(&[10.0, 1e308, f64::INFINITY]),
            LogGrowth::Undefined {
                reason: GrowthUndefined::NonFiniteWealth
            }
        );
        assert_eq!(
            growth_of(&[10.0, f64::NAN]),
            LogGrowth::Undefined {
                reason: GrowthUndefined::NonFiniteWealth
            }
        );
    }

    #[test]
    fn single_observation_has_no_slope() {
        assert_eq!(
            growth_of(&[1_000.0]),
            LogGrowth::Undefined {
                reason: GrowthUndefined::SinglePoint
            }
        );
    }

    #[test]
    fn nearest_rank_percentiles() {
        let sorted = [1, 2, 3, 4, 100];

        assert_eq!(percentile_nearest_rank(&sorted, 50), 3);
        assert_eq!(percentile_nearest_rank(&sorted, 90), 100);
        assert_eq!(percentile_nearest_rank(&sorted, 99), 100);
        assert_eq!(percentile_nearest_rank(&[7], 1), 7);
    }
}
