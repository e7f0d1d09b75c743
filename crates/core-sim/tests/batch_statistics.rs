use core_sim::{run_batch, BatchRequest, BetConfig, SimLimits, Stake};
use strategy::StakePolicy;

fn binomial_upper_tail(trials: u32, at_least: u32) -> f64 {
    let mut pmf = 0.5_f64.powi(trials as i32);
    let mut tail = 0.0;
    for k in 0..=trials {
        if k >= at_least {
            tail += pmf;
        }
        pmf *= f64::from(trials - k) / f64::from(k + 1);
    }
    tail
}

#[test]
fn half_stake_coin_flip_never_reaches_zero() {
    let bet = BetConfig::new(0.5, 0.5, 1.0, StakePolicy::FixedFraction { fraction: 0.5 }).unwrap();
    let limits = SimLimits::new(1_000.0, 0.0, 1_000).unwrap();
    let request = BatchRequest::new(bet, limits, 10_000, false, 2024).unwrap();

    let output = run_batch(&request).unwrap();
    let summary = &output.summary;

    // Multiplicative stakes shrink wealth geometrically; a zero threshold is
    // never breached, so the closed-form ruin probability is exactly zero.
    assert_eq!(output.plan.stake, Stake::Fraction(0.5));
    assert_eq!(summary.num_paths, 10_000);
    assert_eq!(summary.ruin_count, 0);
    assert_eq!(summary.ruin_probability, 0.0);
    assert!(summary.paths.iter().all(|row| row.trial_count == 1_000));
    assert!(summary.min_wealth.min > 0.0);
    assert_eq!(summary.growth.estimated_paths, 10_000);
}

#[test]
fn unit_stake_random_walk_matches_reflection_principle() {
    let bet = BetConfig::new(0.5, 0.5, 1.0, StakePolicy::FixedAmount { amount: 1.0 }).unwrap();
    let limits = SimLimits::new(10.0, 0.0, 100).unwrap();
    let request = BatchRequest::new(bet, limits, 10_000, false, 77).unwrap();

    let summary = run_batch(&request).unwrap().summary;

    // Hitting -10 within 100 steps: P(S_100 >= 10) + P(S_100 > 10).
    let theoretical = binomial_upper_tail(100, 55) + binomial_upper_tail(100, 56);
    let std_error = (theoretical * (1.0 - theoretical) / 10_000.0).sqrt();
    assert!(
        (summary.ruin_probability - theoretical).abs() < 4.0 * std_error,
        "ruin_probability={} theoretical={theoretical}",
        summary.ruin_probability
    );
    assert!(summary.ruin_count <= summary.num_paths);
    assert!(summary.paths.iter().all(|row| row.min_wealth >= 0.0));
}

#[test]
fn kelly_paths_grow_at_the_expected_log_rate() {
    let bet = BetConfig::binary(0.55, 1.0, StakePolicy::kelly()).unwrap();
    let limits = SimLimits::new(1_000.0, 1.0, 1_000).unwrap();
    let request = BatchRequest::new(bet, limits, 2_000, false, 8).unwrap();

    let summary = run_batch(&request).unwrap().summary;

    let expected = 0.55 * 1.1_f64.ln() + 0.45 * 0.9_f64.ln();
    let mean_slope = summary.growth.mean_slope.unwrap();
    assert!(
        (mean_slope - expected).abs() < 5e-4,
        "mean_slope={mean_slope} expected={expected}"
    );
    assert_eq!(summary.growth_rate_estimates().len(), 2_000);
}

#[test]
fn raising_the_threshold_never_lowers_the_ruin_count() {
    let bet = BetConfig::binary(0.5, 1.0, StakePolicy::FixedFraction { fraction: 0.25 }).unwrap();
    let mut previous = 0;

    for threshold in [1.0, 10.0, 100.0, 400.0] {
        let limits = SimLimits::new(1_000.0, threshold, 400).unwrap();
        let request = BatchRequest::new(bet, limits, 1_000, false, 31).unwrap();
        let summary = run_batch(&request).unwrap().summary;

        assert!(summary.ruin_count >= previous);
        assert!((0.0..=1.0).contains(&summary.ruin_probability));
        previous = summary.ruin_count;
    }
}
