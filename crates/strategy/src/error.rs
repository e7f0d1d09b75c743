use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("probability {0} must lie in [0, 1]")]
    ProbabilityOutOfRange(f64),
    #[error("probability {0} must lie strictly between 0 and 1 for a distorted perception")]
    ProbabilityNotInOpenInterval(f64),
    #[error("win probability {p_win} and loss probability {p_lose} sum to more than 1")]
    ProbabilitySumExceedsOne { p_win: f64, p_lose: f64 },
    #[error("net odds must be finite and positive, got {0}")]
    NonPositiveNetOdds(f64),
    #[error("risk aversion gamma must be finite, got {0}")]
    InvalidGamma(f64),
    #[error("utility-optimal sizing needs a positive risk aversion gamma, got {0}")]
    NonPositiveUtilityGamma(f64),
    #[error("utility optimizer needs at least one iteration")]
    InvalidMaxIterations,
    #[error("perception alpha must be finite and positive, got {0}")]
    InvalidPerceptionAlpha(f64),
    #[error("stake fraction must be finite, got {0}")]
    InvalidStakeFraction(f64),
    #[error("stake amount must be finite and non-negative, got {0}")]
    InvalidStakeAmount(f64),
    #[error("fun weight must be finite and non-negative, got {0}")]
    InvalidFunWeight(f64),
    #[error("fun scale must be finite and non-negative, got {0}")]
    InvalidFunScale(f64),
    #[error("reference wealth must be finite and positive, got {0}")]
    InvalidReferenceWealth(f64),
    #[error("fixed-amount stakes are absolute and have no wealth fraction")]
    AbsoluteStake,
    #[error("utility optimizer did not converge: {reason}")]
    SolverNonconvergence { reason: String },
}

impl StrategyError {
    /// True for every input-validation failure, false for optimizer failures
    /// and for asking the fraction solver to size an absolute stake.
    pub fn is_domain_error(&self) -> bool {
        !matches!(
            self,
            Self::SolverNonconvergence { .. } | Self::AbsoluteStake
        )
    }
}

pub(crate) fn check_probability(p: f64) -> Result<f64, StrategyError> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(StrategyError::ProbabilityOutOfRange(p));
    }

    Ok(p)
}

pub(crate) fn check_net_odds(net_odds: f64) -> Result<f64, StrategyError> {
    if !net_odds.is_finite() || net_odds <= 0.0 {
        return Err(StrategyError::NonPositiveNetOdds(net_odds));
    }

    Ok(net_odds)
}
