use core_sim::{BatchRequest, BetConfig, SimError, SimLimits};
use strategy::{Perception, StakePolicy};

use crate::config::{Config, PerceptionKind, PolicyKind};

pub fn stake_policy(config: &Config) -> StakePolicy {
    match config.policy {
        PolicyKind::Kelly => StakePolicy::kelly(),
        PolicyKind::Crra => StakePolicy::CrraOptimal {
            gamma: config.gamma,
        },
        PolicyKind::RiskNeutral => StakePolicy::RiskNeutral,
        PolicyKind::FixedFraction => StakePolicy::FixedFraction {
            fraction: config.stake,
        },
        PolicyKind::FixedAmount => StakePolicy::FixedAmount {
            amount: config.stake,
        },
        PolicyKind::Utility => StakePolicy::UtilityOptimal {
            gamma: config.gamma,
            fun_weight: config.fun_weight,
            fun_scale: config.fun_scale,
        },
    }
}

pub fn perception(config: &Config) -> Perception {
    let alpha = config.perception_alpha;
    match config.perception {
        PerceptionKind::Identity => Perception::Identity,
        PerceptionKind::PowerLaw => Perception::PowerLaw { alpha },
        PerceptionKind::AnchoredPowerLaw => Perception::AnchoredPowerLaw { alpha },
    }
}

pub fn build_request(config: &Config) -> Result<BatchRequest, SimError> {
    let p_lose = config.p_lose.unwrap_or(1.0 - config.p_win);
    let bet = BetConfig::new(config.p_win, p_lose, config.net_odds, stake_policy(config))?
        .with_perception(perception(config))?
        .with_scale(config.kelly_scale)?;
    let limits = SimLimits::new(
        config.starting_wealth,
        config.lower_threshold,
        config.bet_limit,
    )?;

    BatchRequest::new(
        bet,
        limits,
        config.paths,
        config.retain_histories,
        config.seed,
    )
}
