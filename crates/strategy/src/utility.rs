//! Numerical stake sizing for utilities without a closed form.
//!
//! The objective is CRRA utility of wealth after one bet plus a separable
//! entertainment term that rewards larger stakes:
//!
//! `E[U] = p * U(W (1 + f b)) + (1 - p) * U(W (1 - f)) + c * ln(1 + alpha f b)`
//!
//! maximized over `f` in `[0, 1]` with Brent's bounded minimizer on `-E[U]`.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::brent::BrentOpt;
use serde::Serialize;

use crate::error::StrategyError;

pub const DEFAULT_MAX_ITERATIONS: u64 = 500;
const ABSOLUTE_TOLERANCE: f64 = 1e-11;

/// Optimizer inputs beyond the bet itself. The closed-form policies ignore
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolverSettings {
    /// Wealth at which the utility term is evaluated.
    pub reference_wealth: f64,
    pub max_iterations: u64,
}

impl SolverSettings {
    pub fn at_wealth(reference_wealth: f64) -> Self {
        Self {
            reference_wealth,
            ..Self::default()
        }
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            reference_wealth: 1.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityParams {
    pub p_win: f64,
    pub net_odds: f64,
    pub gamma: f64,
    pub fun_weight: f64,
    pub fun_scale: f64,
    pub wealth: f64,
    pub max_iterations: u64,
}

impl UtilityParams {
    pub fn expected_utility(&self, fraction: f64) -> f64 {
        let win_wealth = self.wealth * (1.0 + fraction * self.net_odds);
        let lose_wealth = self.wealth * (1.0 - fraction);
        let p_lose = 1.0 - self.p_win;

        // Zero-weight branches are skipped so 0 * -inf never turns into NaN.
        let mut total = 0.0;
        if self.p_win > 0.0 {
            total += self.p_win * crra_utility(win_wealth, self.gamma);
        }
        if p_lose > 0.0 {
            total += p_lose * crra_utility(lose_wealth, self.gamma);
        }
        if self.fun_weight > 0.0 {
            total += self.fun_weight * (1.0 + self.fun_scale * fraction * self.net_odds).ln();
        }

        total
    }
}

pub fn crra_utility(wealth: f64, gamma: f64) -> f64 {
    if gamma == 1.0 {
        wealth.ln()
    } else {
        wealth.powf(1.0 - gamma) / (1.0 - gamma)
    }
}

struct NegativeExpectedUtility(UtilityParams);

impl CostFunction for NegativeExpectedUtility {
    type Param = f64;
    type Output = f64;

    fn cost(&self, fraction: &Self::Param) -> Result<Self::Output, Error> {
        let cost = -self.0.expected_utility(*fraction);
        // Ruinous stakes evaluate to +inf cost, which Brent handles; NaN it does not.
        if cost.is_nan() {
            return Ok(f64::INFINITY);
        }
        Ok(cost)
    }
}

/// Returns the utility-maximizing fraction in `[0, 1]`, or
/// `SolverNonconvergence` when Brent's method stops for any reason other than
/// convergence, including the iteration cap. A converged optimum of zero is a
/// valid answer, not a failure, and is returned as exactly `0.0`.
pub fn maximize_expected_utility(params: UtilityParams) -> Result<f64, StrategyError> {
    if params.max_iterations == 0 {
        return Err(StrategyError::InvalidMaxIterations);
    }

    let solver = BrentOpt::new(0.0, 1.0)
        .set_tolerance(f64::EPSILON.sqrt(), ABSOLUTE_TOLERANCE);

    let result = Executor::new(NegativeExpectedUtility(params), solver)
        .configure(|state| state.max_iters(params.max_iterations))
        .run()
        .map_err(|err| nonconvergence(params, err.to_string()))?;

    let state = result.state();
    match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
        status => return Err(nonconvergence(params, format!("{status:?}"))),
    }

    let fraction = state
        .get_best_param()
        .copied()
        .ok_or_else(|| nonconvergence(params, "no best parameter recorded".to_string()))?;
    if !fraction.is_finite() {
        return Err(nonconvergence(params, format!("non-finite optimum {fraction}")));
    }

    let fraction = snap_to_bound(&params, fraction.clamp(0.0, 1.0));
    tracing::debug!(
        fraction,
        iterations = state.get_iter(),
        gamma = params.gamma,
        fun_weight = params.fun_weight,
        "utility optimizer converged"
    );

    Ok(fraction)
}

// Brent only approaches the bounds, never lands on them. A bound that is at
// least as good as the interior point wins, so "bet nothing" is an exact zero.
fn snap_to_bound(params: &UtilityParams, fraction: f64) -> f64 {
    let mut best = (fraction, params.expected_utility(fraction));
    for bound in [0.0, 1.0] {
        let utility = params.expected_utility(bound);
        if utility >= best.1 {
            best = (bound, utility);
        }
    }
    best.0
}

fn nonconvergence(params: UtilityParams, reason: String) -> StrategyError {
    tracing::error!(
        p_win = params.p_win,
        net_odds = params.net_odds,
        gamma = params.gamma,
        %reason,
        "utility optimizer failed"
    );
    StrategyError::SolverNonconvergence { reason }
}
