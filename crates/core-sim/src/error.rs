use strategy::StrategyError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("starting wealth must be finite and positive, got {0}")]
    InvalidStartingWealth(f64),
    #[error("lower threshold must be finite and non-negative, got {0}")]
    InvalidLowerThreshold(f64),
    #[error("lower threshold {lower_threshold} must be below starting wealth {starting_wealth}")]
    ThresholdNotBelowStart {
        lower_threshold: f64,
        starting_wealth: f64,
    },
    #[error("kelly scale must be finite and non-negative, got {0}")]
    InvalidScale(f64),
    #[error("a batch needs at least one path")]
    NoPaths,
    #[error("cannot summarize an empty set of paths")]
    EmptyBatch,
}

impl SimError {
    /// True for malformed inputs that prevent any simulation from starting.
    pub fn is_domain_error(&self) -> bool {
        match self {
            Self::Strategy(err) => err.is_domain_error(),
            Self::EmptyBatch => false,
            _ => true,
        }
    }

    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            Self::Strategy(StrategyError::SolverNonconvergence { .. })
        )
    }
}
