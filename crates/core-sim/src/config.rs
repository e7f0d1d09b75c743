use serde::Serialize;
use strategy::{Perception, StakePolicy, StrategyError, DEFAULT_MAX_ITERATIONS};

use crate::error::SimError;

// Absorbs rounding in `p + (1 - p)`.
const PROBABILITY_SUM_SLACK: f64 = 1e-12;

/// One ternary bet, repeated i.i.d. for every trial of a path. Residual
/// probability mass `1 - p_win - p_lose` is a push.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetConfig {
    p_win: f64,
    p_lose: f64,
    net_odds: f64,
    stake_policy: StakePolicy,
    perception: Perception,
    scale: f64,
    solver_max_iterations: u64,
}

impl BetConfig {
    pub fn new(
        p_win: f64,
        p_lose: f64,
        net_odds: f64,
        stake_policy: StakePolicy,
    ) -> Result<Self, SimError> {
        for p in [p_win, p_lose] {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(StrategyError::ProbabilityOutOfRange(p).into());
            }
        }
        if p_win + p_lose > 1.0 + PROBABILITY_SUM_SLACK {
            return Err(StrategyError::ProbabilitySumExceedsOne { p_win, p_lose }.into());
        }
        if !net_odds.is_finite() || net_odds <= 0.0 {
            return Err(StrategyError::NonPositiveNetOdds(net_odds).into());
        }

        Ok(Self {
            p_win,
            p_lose,
            net_odds,
            stake_policy: stake_policy.validate()?,
            perception: Perception::Identity,
            scale: 1.0,
            solver_max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    /// Win/lose bet with no push outcome.
    pub fn binary(p_win: f64, net_odds: f64, stake_policy: StakePolicy) -> Result<Self, SimError> {
        Self::new(p_win, 1.0 - p_win, net_odds, stake_policy)
    }

    pub fn with_perception(mut self, perception: Perception) -> Result<Self, SimError> {
        self.perception = perception.validate()?;
        Ok(self)
    }

    /// Multiplier on the solved fraction before clamping (0.5 is half-Kelly).
    pub fn with_scale(mut self, scale: f64) -> Result<Self, SimError> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(SimError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Iteration cap for the `UtilityOptimal` optimizer. Hitting it aborts the
    /// batch instead of betting zero.
    pub fn with_solver_max_iterations(mut self, max_iterations: u64) -> Result<Self, SimError> {
        if max_iterations == 0 {
            return Err(StrategyError::InvalidMaxIterations.into());
        }
        self.solver_max_iterations = max_iterations;
        Ok(self)
    }

    pub fn p_win(&self) -> f64 {
        self.p_win
    }

    pub fn p_lose(&self) -> f64 {
        self.p_lose
    }

    pub fn p_push(&self) -> f64 {
        (1.0 - self.p_win - self.p_lose).max(0.0)
    }

    pub fn net_odds(&self) -> f64 {
        self.net_odds
    }

    pub fn stake_policy(&self) -> StakePolicy {
        self.stake_policy
    }

    pub fn perception(&self) -> Perception {
        self.perception
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn solver_max_iterations(&self) -> u64 {
        self.solver_max_iterations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimLimits {
    starting_wealth: f64,
    lower_threshold: f64,
    upper_bet_limit: u64,
}

impl SimLimits {
    pub fn new(
        starting_wealth: f64,
        lower_threshold: f64,
        upper_bet_limit: u64,
    ) -> Result<Self, SimError> {
        if !starting_wealth.is_finite() || starting_wealth <= 0.0 {
            return Err(SimError::InvalidStartingWealth(starting_wealth));
        }
        if !lower_threshold.is_finite() || lower_threshold < 0.0 {
            return Err(SimError::InvalidLowerThreshold(lower_threshold));
        }
        if lower_threshold >= starting_wealth {
            return Err(SimError::ThresholdNotBelowStart {
                lower_threshold,
                starting_wealth,
            });
        }

        Ok(Self {
            starting_wealth,
            lower_threshold,
            upper_bet_limit,
        })
    }

    pub fn starting_wealth(&self) -> f64 {
        self.starting_wealth
    }

    pub fn lower_threshold(&self) -> f64 {
        self.lower_threshold
    }

    pub fn upper_bet_limit(&self) -> u64 {
        self.upper_bet_limit
    }
}
