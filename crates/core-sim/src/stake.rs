use serde::Serialize;
use strategy::{
    bet_edge, clamp_fraction, solve_fraction_with, transform_probability, BetEdge,
    ClampedFraction, SolverSettings, StakePolicy,
};

use crate::config::BetConfig;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Stake {
    /// Share of current wealth, already clamped to `[0, 1]`.
    Fraction(f64),
    /// Absolute wager, capped at the wealth on hand.
    Amount(f64),
}

impl Stake {
    pub fn wager(self, wealth: f64) -> f64 {
        match self {
            Self::Fraction(fraction) => wealth * fraction,
            Self::Amount(amount) => amount.min(wealth),
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Fraction(value) | Self::Amount(value) => value <= 0.0,
        }
    }
}

/// Sizing decided once from a `BetConfig`, shared read-only by every path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StakePlan {
    pub stake: Stake,
    pub perceived_p_win: f64,
    /// Scaled fraction before clamping; `None` for absolute stakes.
    pub sizing: Option<ClampedFraction>,
    /// The closed form was undefined and the stake fell back to zero.
    pub degenerate: bool,
    pub edge: Option<BetEdge>,
}

impl StakePlan {
    pub fn was_clamped(&self) -> bool {
        self.sizing.is_some_and(|sizing| sizing.was_clamped())
    }
}

/// Resolves the stake for a path starting at `reference_wealth`: perception
/// first, then the fraction solver, then scaling and clamping.
pub fn resolve_stake(bet: &BetConfig, reference_wealth: f64) -> Result<StakePlan, SimError> {
    let perceived_p_win = perceive(bet)?;

    let policy = bet.stake_policy();
    if let StakePolicy::FixedAmount { amount } = policy {
        return Ok(StakePlan {
            stake: Stake::Amount(amount),
            perceived_p_win,
            sizing: None,
            degenerate: false,
            edge: None,
        });
    }

    let settings = SolverSettings {
        reference_wealth,
        max_iterations: bet.solver_max_iterations(),
    };
    let solution = solve_fraction_with(perceived_p_win, bet.net_odds(), policy, settings)?;
    if solution.is_degenerate() {
        tracing::warn!(
            perceived_p_win,
            net_odds = bet.net_odds(),
            "stake sizing degenerate, betting nothing"
        );
    }

    let sizing = clamp_fraction(solution.fraction * bet.scale());
    if let Some(direction) = sizing.clamp {
        tracing::warn!(
            raw = sizing.raw,
            clamped = sizing.fraction,
            ?direction,
            "stake fraction clamped"
        );
    }

    let edge = bet_edge(
        bet.p_win(),
        bet.p_lose(),
        perceived_p_win,
        bet.net_odds(),
        sizing.fraction,
    );

    Ok(StakePlan {
        stake: Stake::Fraction(sizing.fraction),
        perceived_p_win,
        sizing: Some(sizing),
        degenerate: solution.is_degenerate(),
        edge: Some(edge),
    })
}

// Certain and impossible wins are not distorted.
fn perceive(bet: &BetConfig) -> Result<f64, SimError> {
    let p_win = bet.p_win();
    if p_win <= 0.0 || p_win >= 1.0 || !bet.stake_policy().uses_probability() {
        return Ok(p_win);
    }

    Ok(transform_probability(p_win, bet.perception())?)
}
