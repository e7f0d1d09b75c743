use serde::Serialize;

use crate::error::{check_net_odds, check_probability, StrategyError};
use crate::utility::{maximize_expected_utility, SolverSettings, UtilityParams};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StakePolicy {
    /// Absolute wager per trial, independent of wealth.
    FixedAmount { amount: f64 },
    FixedFraction { fraction: f64 },
    /// Closed-form optimum for CRRA utility; `gamma = 1` is Kelly.
    CrraOptimal { gamma: f64 },
    RiskNeutral,
    /// Numerical optimum of CRRA utility plus an entertainment term
    /// `fun_weight * ln(1 + fun_scale * f * b)`. `gamma` must be positive:
    /// without risk aversion the optimum sits on a bound and would not agree
    /// with `CrraOptimal`.
    UtilityOptimal {
        gamma: f64,
        fun_weight: f64,
        fun_scale: f64,
    },
}

impl StakePolicy {
    pub fn kelly() -> Self {
        Self::CrraOptimal { gamma: 1.0 }
    }

    pub fn validate(self) -> Result<Self, StrategyError> {
        match self {
            Self::FixedAmount { amount } => {
                if !amount.is_finite() || amount < 0.0 {
                    return Err(StrategyError::InvalidStakeAmount(amount));
                }
            }
            Self::FixedFraction { fraction } => {
                if !fraction.is_finite() {
                    return Err(StrategyError::InvalidStakeFraction(fraction));
                }
            }
            Self::CrraOptimal { gamma } => check_gamma(gamma)?,
            Self::RiskNeutral => {}
            Self::UtilityOptimal {
                gamma,
                fun_weight,
                fun_scale,
            } => {
                check_gamma(gamma)?;
                if gamma <= 0.0 {
                    return Err(StrategyError::NonPositiveUtilityGamma(gamma));
                }
                if !fun_weight.is_finite() || fun_weight < 0.0 {
                    return Err(StrategyError::InvalidFunWeight(fun_weight));
                }
                if !fun_scale.is_finite() || fun_scale < 0.0 {
                    return Err(StrategyError::InvalidFunScale(fun_scale));
                }
            }
        }

        Ok(self)
    }

    pub fn is_absolute(self) -> bool {
        matches!(self, Self::FixedAmount { .. })
    }

    /// True when the solved fraction depends on the win probability.
    pub fn uses_probability(self) -> bool {
        !matches!(self, Self::FixedAmount { .. } | Self::FixedFraction { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionStatus {
    Solved,
    /// The closed form was undefined for these inputs; the fraction is zero.
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FractionSolution {
    pub fraction: f64,
    pub status: FractionStatus,
}

impl FractionSolution {
    fn solved(fraction: f64) -> Self {
        Self {
            fraction,
            status: FractionStatus::Solved,
        }
    }

    fn degenerate() -> Self {
        Self {
            fraction: 0.0,
            status: FractionStatus::Degenerate,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.status == FractionStatus::Degenerate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampDirection {
    BelowZero,
    AboveOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClampedFraction {
    pub fraction: f64,
    pub raw: f64,
    pub clamp: Option<ClampDirection>,
}

impl ClampedFraction {
    pub fn was_clamped(&self) -> bool {
        self.clamp.is_some()
    }
}

/// Stakes outside `[0, 1]` are never placed: no leverage and no short side.
pub fn clamp_fraction(raw: f64) -> ClampedFraction {
    let (fraction, clamp) = if raw < 0.0 {
        (0.0, Some(ClampDirection::BelowZero))
    } else if raw > 1.0 {
        (1.0, Some(ClampDirection::AboveOne))
    } else {
        (raw, None)
    };

    ClampedFraction {
        fraction,
        raw,
        clamp,
    }
}

pub fn risk_neutral_fraction(p_win: f64, net_odds: f64) -> f64 {
    (p_win * net_odds - (1.0 - p_win)) / net_odds
}

/// Unclamped CRRA optimum. `gamma = 0` falls back to the risk-neutral stake.
pub fn crra_fraction(p_win: f64, net_odds: f64, gamma: f64) -> FractionSolution {
    if gamma == 0.0 {
        return FractionSolution::solved(risk_neutral_fraction(p_win, net_odds));
    }
    if p_win >= 1.0 {
        tracing::error!(p_win, net_odds, gamma, "crra sizing undefined for a certain win");
        return FractionSolution::degenerate();
    }

    let ratio = (p_win * net_odds) / (1.0 - p_win);
    let scaled = ratio.powf(1.0 / gamma);
    let fraction = (scaled - 1.0) / (net_odds + scaled);
    if !fraction.is_finite() {
        tracing::error!(p_win, net_odds, gamma, "crra sizing produced a non-finite fraction");
        return FractionSolution::degenerate();
    }

    FractionSolution::solved(fraction)
}

pub fn solve_fraction(
    perceived_p_win: f64,
    net_odds: f64,
    policy: StakePolicy,
) -> Result<FractionSolution, StrategyError> {
    solve_fraction_with(perceived_p_win, net_odds, policy, SolverSettings::default())
}

/// Solves the unclamped stake fraction. `settings` only matter for
/// `UtilityOptimal`, where the reference wealth sets the scale of the wealth
/// term against the entertainment term.
pub fn solve_fraction_with(
    perceived_p_win: f64,
    net_odds: f64,
    policy: StakePolicy,
    settings: SolverSettings,
) -> Result<FractionSolution, StrategyError> {
    let policy = policy.validate()?;
    let p_win = check_probability(perceived_p_win)?;
    let net_odds = check_net_odds(net_odds)?;

    match policy {
        StakePolicy::FixedAmount { .. } => Err(StrategyError::AbsoluteStake),
        StakePolicy::FixedFraction { fraction } => Ok(FractionSolution::solved(fraction)),
        StakePolicy::RiskNeutral => Ok(FractionSolution::solved(risk_neutral_fraction(
            p_win, net_odds,
        ))),
        StakePolicy::CrraOptimal { gamma } => Ok(crra_fraction(p_win, net_odds, gamma)),
        StakePolicy::UtilityOptimal {
            gamma,
            fun_weight,
            fun_scale,
        } => {
            let wealth = settings.reference_wealth;
            if !wealth.is_finite() || wealth <= 0.0 {
                return Err(StrategyError::InvalidReferenceWealth(wealth));
            }
            let params = UtilityParams {
                p_win,
                net_odds,
                gamma,
                fun_weight,
                fun_scale,
                wealth,
                max_iterations: settings.max_iterations,
            };
            maximize_expected_utility(params).map(FractionSolution::solved)
        }
    }
}

fn check_gamma(gamma: f64) -> Result<(), StrategyError> {
    if !gamma.is_finite() {
        return Err(StrategyError::InvalidGamma(gamma));
    }

    Ok(())
}
