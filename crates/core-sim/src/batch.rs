//! Batch Aggregator: runs independent paths under shared parameters and folds
//! their results into one immutable [`BatchSummary`].

use serde::Serialize;

use crate::config::{BetConfig, SimLimits};
use crate::error::SimError;
use crate::growth::{percentile_nearest_rank, GrowthUndefined, LogGrowth};
use crate::path::{PathResult, PathSimulator};
use crate::sampler::path_rng;
use crate::stake::{resolve_stake, Stake, StakePlan};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchRequest {
    bet: BetConfig,
    limits: SimLimits,
    num_paths: u64,
    retain_histories: bool,
    seed: u64,
}

impl BatchRequest {
    pub fn new(
        bet: BetConfig,
        limits: SimLimits,
        num_paths: u64,
        retain_histories: bool,
        seed: u64,
    ) -> Result<Self, SimError> {
        if num_paths == 0 {
            return Err(SimError::NoPaths);
        }

        Ok(Self {
            bet,
            limits,
            num_paths,
            retain_histories,
            seed,
        })
    }

    pub fn bet(&self) -> &BetConfig {
        &self.bet
    }

    pub fn limits(&self) -> SimLimits {
        self.limits
    }

    pub fn num_paths(&self) -> u64 {
        self.num_paths
    }

    pub fn retain_histories(&self) -> bool {
        self.retain_histories
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Stake sizing for every path of this batch, evaluated at the starting
    /// wealth.
    pub fn resolve_stake(&self) -> Result<StakePlan, SimError> {
        resolve_stake(&self.bet, self.limits.starting_wealth())
    }

    pub fn simulator(&self, stake: Stake) -> PathSimulator {
        PathSimulator::new(&self.bet, stake, self.limits, self.retain_histories)
    }
}

/// Runs the given path indices with their per-path random streams. The output
/// for an index is the same whichever caller runs it.
pub fn simulate_paths<I>(request: &BatchRequest, stake: Stake, path_indices: I) -> Vec<PathResult>
where
    I: IntoIterator<Item = u64>,
{
    let simulator = request.simulator(stake);
    path_indices
        .into_iter()
        .map(|path_index| simulator.run(path_index, &mut path_rng(request.seed(), path_index)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WealthStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl WealthStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0_u64;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }

        (count > 0).then(|| Self {
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthSummary {
    pub estimated_paths: u64,
    /// Paths whose wealth touched zero or below; excluded from the mean.
    pub non_positive_paths: u64,
    /// Paths stopped by wealth overflow; excluded from the mean.
    pub non_finite_paths: u64,
    /// Paths with a single observation (zero trials); excluded from the mean.
    pub single_point_paths: u64,
    pub mean_slope: Option<f64>,
    pub mean_log_wealth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuinTiming {
    pub mean: f64,
    pub min: u64,
    pub max: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    /// Ruined paths that survived the most trials before ruin.
    pub longest_survivors: Vec<u64>,
}

impl RuinTiming {
    fn from_ruins(ruins: &[(u64, u64)]) -> Option<Self> {
        if ruins.is_empty() {
            return None;
        }

        let mut times: Vec<u64> = ruins.iter().map(|&(_, time)| time).collect();
        times.sort_unstable();
        let min = times[0];
        let max = times[times.len() - 1];
        let mean = times.iter().map(|&time| time as f64).sum::<f64>() / times.len() as f64;

        Some(Self {
            mean,
            min,
            max,
            p50: percentile_nearest_rank(&times, 50),
            p90: percentile_nearest_rank(&times, 90),
            p99: percentile_nearest_rank(&times, 99),
            longest_survivors: ruins
                .iter()
                .filter(|&&(_, time)| time == max)
                .map(|&(path, _)| path)
                .collect(),
        })
    }
}

/// One row of the per-path table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathRow {
    pub path: u64,
    pub mean_log_wealth: Option<f64>,
    pub std_log_wealth: Option<f64>,
    pub slope_log_wealth: Option<f64>,
    pub time_to_ruin: Option<u64>,
    pub peak_wealth: f64,
    pub min_wealth: f64,
    pub final_wealth: f64,
    pub ruined: bool,
    pub trial_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_undefined: Option<GrowthUndefined>,
}

impl From<&PathResult> for PathRow {
    fn from(result: &PathResult) -> Self {
        let growth_undefined = match result.growth {
            LogGrowth::Estimated { .. } => None,
            LogGrowth::Undefined { reason } => Some(reason),
        };

        Self {
            path: result.path_index,
            mean_log_wealth: result.growth.mean_log_wealth(),
            std_log_wealth: result.growth.std_log_wealth(),
            slope_log_wealth: result.growth.slope(),
            time_to_ruin: result.time_to_ruin(),
            peak_wealth: result.peak_wealth,
            min_wealth: result.min_wealth,
            final_wealth: result.final_wealth,
            ruined: result.ruined(),
            trial_count: result.trial_count,
            growth_undefined,
        }
    }
}

/// Batch means across the per-path table. `ruined` holds the ruin probability
/// and `time_to_ruin` the mean over ruined paths only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateRow {
    pub mean_log_wealth: Option<f64>,
    pub std_log_wealth: Option<f64>,
    pub slope_log_wealth: Option<f64>,
    pub time_to_ruin: Option<f64>,
    pub peak_wealth: f64,
    pub min_wealth: f64,
    pub final_wealth: f64,
    pub ruined: f64,
    pub trial_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub num_paths: u64,
    pub ruin_count: u64,
    /// Proportion in `[0, 1]`.
    pub ruin_probability: f64,
    pub ruin_std_error: f64,
    pub final_wealth: WealthStats,
    pub peak_wealth: WealthStats,
    pub min_wealth: WealthStats,
    pub growth: GrowthSummary,
    pub ruin_timing: Option<RuinTiming>,
    /// Ordered by path index. Exported as table rows, not in the JSON summary.
    #[serde(skip)]
    pub paths: Vec<PathRow>,
}

impl BatchSummary {
    /// Folds path results in path-index order, so the summary does not depend
    /// on the order in which paths finished.
    pub fn from_paths(mut results: Vec<PathResult>) -> Result<Self, SimError> {
        results.sort_by_key(|result| result.path_index);
        let paths: Vec<PathRow> = results.iter().map(PathRow::from).collect();
        Self::from_rows(paths)
    }

    fn from_rows(paths: Vec<PathRow>) -> Result<Self, SimError> {
        let final_wealth = WealthStats::from_values(paths.iter().map(|row| row.final_wealth))
            .ok_or(SimError::EmptyBatch)?;
        let peak_wealth = WealthStats::from_values(paths.iter().map(|row| row.peak_wealth))
            .ok_or(SimError::EmptyBatch)?;
        let min_wealth = WealthStats::from_values(paths.iter().map(|row| row.min_wealth))
            .ok_or(SimError::EmptyBatch)?;

        let num_paths = paths.len() as u64;
        let ruins: Vec<(u64, u64)> = paths
            .iter()
            .filter_map(|row| row.time_to_ruin.map(|time| (row.path, time)))
            .collect();
        let ruin_count = ruins.len() as u64;
        let ruin_probability = ruin_count as f64 / num_paths as f64;
        let ruin_std_error = (ruin_probability * (1.0 - ruin_probability) / num_paths as f64).sqrt();

        Ok(Self {
            num_paths,
            ruin_count,
            ruin_probability,
            ruin_std_error,
            final_wealth,
            peak_wealth,
            min_wealth,
            growth: summarize_growth(&paths),
            ruin_timing: RuinTiming::from_ruins(&ruins),
            paths,
        })
    }

    /// One log-wealth slope per path; `None` where the regression is undefined.
    pub fn growth_rate_estimates(&self) -> Vec<Option<f64>> {
        self.paths.iter().map(|row| row.slope_log_wealth).collect()
    }

    /// Trial count at ruin per path; `None` for paths that never ruined.
    pub fn time_to_ruin(&self) -> Vec<Option<u64>> {
        self.paths.iter().map(|row| row.time_to_ruin).collect()
    }

    pub fn aggregate_row(&self) -> AggregateRow {
        let n = self.num_paths as f64;
        let std_log_wealth = mean_defined(self.paths.iter().map(|row| row.std_log_wealth));

        AggregateRow {
            mean_log_wealth: self.growth.mean_log_wealth,
            std_log_wealth,
            slope_log_wealth: self.growth.mean_slope,
            time_to_ruin: self.ruin_timing.as_ref().map(|timing| timing.mean),
            peak_wealth: self.peak_wealth.mean,
            min_wealth: self.min_wealth.mean,
            final_wealth: self.final_wealth.mean,
            ruined: self.ruin_probability,
            trial_count: self.paths.iter().map(|row| row.trial_count as f64).sum::<f64>() / n,
        }
    }
}

fn summarize_growth(paths: &[PathRow]) -> GrowthSummary {
    let count_reason = |reason| {
        paths
            .iter()
            .filter(|row| row.growth_undefined == Some(reason))
            .count() as u64
    };

    GrowthSummary {
        estimated_paths: paths
            .iter()
            .filter(|row| row.slope_log_wealth.is_some())
            .count() as u64,
        non_positive_paths: count_reason(GrowthUndefined::NonPositiveWealth),
        non_finite_paths: count_reason(GrowthUndefined::NonFiniteWealth),
        single_point_paths: count_reason(GrowthUndefined::SinglePoint),
        mean_slope: mean_defined(paths.iter().map(|row| row.slope_log_wealth)),
        mean_log_wealth: mean_defined(paths.iter().map(|row| row.mean_log_wealth)),
    }
}

fn mean_defined(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (count, sum) = values
        .flatten()
        .fold((0_u64, 0.0), |(count, sum), value| (count + 1, sum + value));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutput {
    pub plan: StakePlan,
    pub summary: BatchSummary,
    /// Wealth histories in path-index order, present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histories: Option<Vec<Vec<f64>>>,
}

impl BatchOutput {
    /// Sorts results by path index, detaches retained histories and builds
    /// the summary.
    pub fn assemble(
        plan: StakePlan,
        mut results: Vec<PathResult>,
        retain_histories: bool,
    ) -> Result<Self, SimError> {
        results.sort_by_key(|result| result.path_index);
        let histories = retain_histories.then(|| {
            results
                .iter_mut()
                .map(|result| result.wealth_history.take().unwrap_or_default())
                .collect()
        });

        Ok(Self {
            plan,
            summary: BatchSummary::from_paths(results)?,
            histories,
        })
    }
}

/// Sequential run of a whole batch on the calling thread.
pub fn run_batch(request: &BatchRequest) -> Result<BatchOutput, SimError> {
    let plan = request.resolve_stake()?;
    tracing::info!(
        num_paths = request.num_paths(),
        seed = request.seed(),
        stake = ?plan.stake,
        "running batch"
    );

    let results = simulate_paths(request, plan.stake, 0..request.num_paths());
    let output = BatchOutput::assemble(plan, results, request.retain_histories())?;
    tracing::debug!(
        ruin_count = output.summary.ruin_count,
        ruin_probability = output.summary.ruin_probability,
        "batch summarized"
    );
    Ok(output)
}
