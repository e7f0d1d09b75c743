mod batch;
mod config;
mod error;
mod growth;
mod path;
mod sampler;
mod stake;

pub use batch::{
    run_batch, simulate_paths, AggregateRow, BatchOutput, BatchRequest, BatchSummary,
    GrowthSummary, PathRow, RuinTiming, WealthStats,
};
pub use config::{BetConfig, SimLimits};
pub use error::SimError;
pub use growth::{percentile_nearest_rank, GrowthUndefined, LogGrowth, LogGrowthAccumulator};
pub use path::{PathResult, PathSimulator, PathState, PathTermination};
pub use sampler::{classify_outcome, path_rng, sample_outcome, Outcome};
pub use stake::{resolve_stake, Stake, StakePlan};
