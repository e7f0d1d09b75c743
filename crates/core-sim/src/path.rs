use rand::Rng;
use serde::Serialize;

use crate::config::{BetConfig, SimLimits};
use crate::growth::{LogGrowth, LogGrowthAccumulator};
use crate::sampler::{sample_outcome, Outcome};
use crate::stake::Stake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTermination {
    /// Wealth fell to or below the lower threshold.
    Ruined,
    /// The trial cap was reached without ruin.
    LimitReached,
    /// The stake was zero, so no trial was played and no draw consumed.
    NoStake,
    /// Wealth grew past the largest finite `f64`; the path cannot continue.
    Overflow,
}

/// Mutable state of one running path. Never shared between paths.
#[derive(Debug, Clone)]
pub struct PathState {
    pub wealth: f64,
    pub trial_index: u64,
    pub peak: f64,
    pub trough: f64,
    history: Option<Vec<f64>>,
    growth: LogGrowthAccumulator,
}

impl PathState {
    pub fn new(starting_wealth: f64, retain_history: bool) -> Self {
        let mut growth = LogGrowthAccumulator::new();
        growth.observe(starting_wealth);

        Self {
            wealth: starting_wealth,
            trial_index: 0,
            peak: starting_wealth,
            trough: starting_wealth,
            history: retain_history.then(|| vec![starting_wealth]),
            growth,
        }
    }

    pub fn apply(&mut self, outcome: Outcome, wager: f64, net_odds: f64) {
        match outcome {
            Outcome::Win => self.wealth += wager * net_odds,
            Outcome::Lose => self.wealth -= wager,
            Outcome::Push => {}
        }

        self.trial_index += 1;
        self.peak = self.peak.max(self.wealth);
        self.trough = self.trough.min(self.wealth);
        self.growth.observe(self.wealth);
        if let Some(history) = self.history.as_mut() {
            history.push(self.wealth);
        }
    }

    fn finish(self, path_index: u64, termination: PathTermination) -> PathResult {
        PathResult {
            path_index,
            final_wealth: self.wealth,
            peak_wealth: self.peak,
            min_wealth: self.trough,
            trial_count: self.trial_index,
            termination,
            growth: self.growth.finish(),
            wealth_history: self.history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult {
    pub path_index: u64,
    pub final_wealth: f64,
    pub peak_wealth: f64,
    pub min_wealth: f64,
    pub trial_count: u64,
    pub termination: PathTermination,
    pub growth: LogGrowth,
    /// Wealth after each trial, index 0 being the starting wealth. Present
    /// only when history retention was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wealth_history: Option<Vec<f64>>,
}

impl PathResult {
    pub fn ruined(&self) -> bool {
        self.termination == PathTermination::Ruined
    }

    /// Trial at which the threshold was first breached; `None` when the path
    /// never ruined.
    pub fn time_to_ruin(&self) -> Option<u64> {
        self.ruined().then_some(self.trial_count)
    }
}

/// Drives single wealth paths for one bet, stake and set of limits.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator {
    p_win: f64,
    p_lose: f64,
    net_odds: f64,
    stake: Stake,
    limits: SimLimits,
    retain_history: bool,
}

impl PathSimulator {
    pub fn new(bet: &BetConfig, stake: Stake, limits: SimLimits, retain_history: bool) -> Self {
        Self {
            p_win: bet.p_win(),
            p_lose: bet.p_lose(),
            net_odds: bet.net_odds(),
            stake,
            limits,
            retain_history,
        }
    }

    /// Runs one path to ruin or to the trial cap. Each trial consumes exactly
    /// one draw from `rng`; a zero stake returns at once without drawing.
    pub fn run<R: Rng + ?Sized>(&self, path_index: u64, rng: &mut R) -> PathResult {
        let mut state = PathState::new(self.limits.starting_wealth(), self.retain_history);

        if self.stake.is_zero() {
            return state.finish(path_index, PathTermination::NoStake);
        }

        loop {
            if state.trial_index >= self.limits.upper_bet_limit() {
                return state.finish(path_index, PathTermination::LimitReached);
            }

            let wager = self.stake.wager(state.wealth);
            let outcome = sample_outcome(rng, self.p_win, self.p_lose);
            state.apply(outcome, wager, self.net_odds);

            // A later loss would turn `inf - inf` into NaN and dodge the ruin check.
            if !state.wealth.is_finite() {
                tracing::warn!(path_index, trial = state.trial_index, "wealth overflowed");
                return state.finish(path_index, PathTermination::Overflow);
            }

            // The breaching value is already recorded before the path stops.
            if state.wealth <= self.limits.lower_threshold() {
                return state.finish(path_index, PathTermination::Ruined);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use strategy::StakePolicy;

    use super::{PathSimulator, PathTermination};
    use crate::growth::{GrowthUndefined, LogGrowth};
    use crate::sampler::path_rng;
    use crate::stake::Stake;
    use crate::{BetConfig, SimLimits};

    /// Counts draws and replays a fixed tape of uniforms.
    struct TapeRng {
        tape: Vec<f64>,
        draws: usize,
    }

    impl TapeRng {
        fn new(tape: Vec<f64>) -> Self {
            Self { tape, draws: 0 }
        }
    }

    impl RngCore for TapeRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let u = self.tape[self.draws % self.tape.len()];
            self.draws += 1;
            // rand's f64 sampling keeps the top 53 bits as the mantissa.
            ((u * (1_u64 << 53) as f64) as u64) << 11
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    const WIN: f64 = 0.1;
    const LOSE: f64 = 0.7;
    const PUSH: f64 = 0.95;

    fn coin_flip_with_push() -> BetConfig {
        BetConfig::new(0.45, 0.45, 1.0, StakePolicy::FixedFraction { fraction: 0.5 }).unwrap()
    }

    fn simulator(stake: Stake, limits: SimLimits, retain: bool) -> PathSimulator {
        PathSimulator::new(&coin_flip_with_push(), stake, limits, retain)
    }

    #[test]
    fn applies_win_lose_and_push_to_wealth() {
        let limits = SimLimits::new(100.0, 0.0, 3).unwrap();
        let mut rng = TapeRng::new(vec![WIN, LOSE, PUSH]);

        let result = simulator(Stake::Fraction(0.5), limits, true).run(0, &mut rng);

        assert_eq!(result.wealth_history, Some(vec![100.0, 150.0, 75.0, 75.0]));
        assert_eq!(result.termination, PathTermination::LimitReached);
        assert_eq!(result.trial_count, 3);
        assert_eq!(result.peak_wealth, 150.0);
        assert_eq!(result.min_wealth, 75.0);
        assert_eq!(rng.draws, 3);
    }

    #[test]
    fn zero_stake_short_circuits_without_drawing() {
        let limits = SimLimits::new(1_000.0, 0.0, 1_000).unwrap();
        let mut rng = TapeRng::new(vec![WIN]);

        let result = simulator(Stake::Fraction(0.0), limits, true).run(4, &mut rng);

        assert_eq!(result.termination, PathTermination::NoStake);
        assert_eq!(result.trial_count, 0);
        assert_eq!(result.final_wealth, 1_000.0);
        assert_eq!(result.wealth_history, Some(vec![1_000.0]));
        assert!(!result.ruined());
        assert_eq!(rng.draws, 0);
    }

    #[test]
    fn breaching_value_is_recorded_before_ruin() {
        let limits = SimLimits::new(100.0, 30.0, 1_000).unwrap();
        let mut rng = TapeRng::new(vec![LOSE]);

        let result = simulator(Stake::Fraction(0.5), limits, true).run(0, &mut rng);

        assert_eq!(result.wealth_history, Some(vec![100.0, 50.0, 25.0]));
        assert_eq!(result.termination, PathTermination::Ruined);
        assert_eq!(result.time_to_ruin(), Some(2));
        assert_eq!(result.final_wealth, 25.0);
        assert_eq!(result.min_wealth, 25.0);
    }

    #[test]
    fn landing_exactly_on_threshold_is_ruin() {
        let limits = SimLimits::new(100.0, 50.0, 1_000).unwrap();
        let mut rng = TapeRng::new(vec![LOSE]);

        let result = simulator(Stake::Fraction(0.5), limits, false).run(0, &mut rng);

        assert!(result.ruined());
        assert_eq!(result.trial_count, 1);
        assert_eq!(result.wealth_history, None);
    }

    #[test]
    fn zero_trial_cap_stops_immediately() {
        let limits = SimLimits::new(100.0, 0.0, 0).unwrap();
        let mut rng = TapeRng::new(vec![WIN]);

        let result = simulator(Stake::Fraction(0.5), limits, false).run(0, &mut rng);

        assert_eq!(result.termination, PathTermination::LimitReached);
        assert_eq!(result.time_to_ruin(), None);
        assert_eq!(rng.draws, 0);
    }

    #[test]
    fn fixed_amount_never_overshoots_below_zero() {
        let limits = SimLimits::new(50.0, 0.0, 1_000).unwrap();
        let mut rng = TapeRng::new(vec![LOSE]);

        let result = simulator(Stake::Amount(20.0), limits, true).run(0, &mut rng);

        assert_eq!(result.wealth_history, Some(vec![50.0, 30.0, 10.0, 0.0]));
        assert!(result.ruined());
        assert_eq!(result.min_wealth, 0.0);
        assert_eq!(
            result.growth,
            LogGrowth::Undefined {
                reason: GrowthUndefined::NonPositiveWealth
            }
        );
    }

    #[test]
    fn overflowing_wealth_stops_the_path() {
        let bet = BetConfig::binary(0.9, 35.0, StakePolicy::kelly()).unwrap();
        let limits = SimLimits::new(1_000.0, 0.0, 1_000).unwrap();
        let sim = PathSimulator::new(&bet, Stake::Fraction(0.9), limits, false);
        let mut rng = TapeRng::new(vec![WIN]);

        let result = sim.run(0, &mut rng);

        assert_eq!(result.termination, PathTermination::Overflow);
        assert_eq!(result.final_wealth, f64::INFINITY);
        assert!(result.trial_count < 1_000);
        assert_eq!(rng.draws as u64, result.trial_count);
        assert!(!result.ruined());
        assert_eq!(
            result.growth,
            LogGrowth::Undefined {
                reason: GrowthUndefined::NonFiniteWealth
            }
        );
    }

    #[test]
    fn growth_is_estimated_without_history() {
        let limits = SimLimits::new(100.0, 0.0, 2).unwrap();
        let mut rng = TapeRng::new(vec![WIN]);

        let result = simulator(Stake::Fraction(0.5), limits, false).run(0, &mut rng);

        assert_eq!(result.wealth_history, None);
        assert!((result.growth.slope().unwrap() - 1.5_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn raising_the_threshold_never_delays_ruin() {
        let bet = coin_flip_with_push();
        let thresholds = [0.5, 5.0, 50.0, 250.0, 600.0];

        for path_index in 0..200 {
            let mut previous_ruin: Option<u64> = None;
            for &threshold in &thresholds {
                let limits = SimLimits::new(1_000.0, threshold, 500).unwrap();
                let sim = PathSimulator::new(&bet, Stake::Fraction(0.5), limits, false);
                let ruin = sim.run(path_index, &mut path_rng(11, path_index)).time_to_ruin();

                if let Some(earlier_ruin) = previous_ruin {
                    let ruin = ruin.expect("higher threshold must also ruin");
                    assert!(ruin <= earlier_ruin);
                }
                previous_ruin = ruin;
            }
        }
    }
}
