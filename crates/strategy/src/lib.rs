pub mod edge;
pub mod error;
pub mod perception;
pub mod sizing;
pub mod utility;

pub use edge::{bet_edge, BetEdge};
pub use error::StrategyError;
pub use perception::{transform_probability, Perception};
pub use sizing::{
    clamp_fraction, crra_fraction, risk_neutral_fraction, solve_fraction, solve_fraction_with,
    ClampDirection, ClampedFraction, FractionSolution, FractionStatus, StakePolicy,
};
pub use utility::{SolverSettings, DEFAULT_MAX_ITERATIONS};
