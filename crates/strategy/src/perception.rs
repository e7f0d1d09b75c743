use serde::Serialize;

use crate::error::{check_probability, StrategyError};

/// How a bettor perceives the objective win probability when sizing a stake.
/// Outcomes are always drawn from the objective probability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perception {
    #[default]
    Identity,
    /// `p' = exp(-(-ln p)^alpha)`.
    PowerLaw { alpha: f64 },
    /// `p' = exp(-(ln 2)^(1 - alpha) * (-ln p)^alpha)`; leaves `p = 0.5` fixed.
    AnchoredPowerLaw { alpha: f64 },
}

impl Perception {
    pub fn validate(self) -> Result<Self, StrategyError> {
        match self {
            Self::Identity => Ok(self),
            Self::PowerLaw { alpha } | Self::AnchoredPowerLaw { alpha } => {
                if !alpha.is_finite() || alpha <= 0.0 {
                    return Err(StrategyError::InvalidPerceptionAlpha(alpha));
                }
                Ok(self)
            }
        }
    }

    pub fn is_identity(self) -> bool {
        matches!(self, Self::Identity)
    }
}

pub fn transform_probability(p: f64, perception: Perception) -> Result<f64, StrategyError> {
    let perception = perception.validate()?;
    let p = check_probability(p)?;

    match perception {
        Perception::Identity => Ok(p),
        Perception::PowerLaw { alpha } => {
            let surprisal = open_interval_surprisal(p)?;
            Ok((-surprisal.powf(alpha)).exp())
        }
        Perception::AnchoredPowerLaw { alpha } => {
            let surprisal = open_interval_surprisal(p)?;
            let anchor = std::f64::consts::LN_2.powf(1.0 - alpha);
            Ok((-anchor * surprisal.powf(alpha)).exp())
        }
    }
}

// -ln p, defined only away from the certain and impossible events.
fn open_interval_surprisal(p: f64) -> Result<f64, StrategyError> {
    if p <= 0.0 || p >= 1.0 {
        return Err(StrategyError::ProbabilityNotInOpenInterval(p));
    }

    Ok(-p.ln())
}

#[cfg(test)]
mod tests {
    use super::{transform_probability, Perception};
    use crate::StrategyError;

    const GRID: [f64; 9] = [1e-6, 0.01, 0.1, 0.25, 0.5, 0.6, 0.9, 0.99, 0.999_999];

    #[test]
    fn identity_returns_input_on_closed_interval() {
        for p in [0.0, 0.3, 1.0] {
            assert_eq!(transform_probability(p, Perception::Identity).unwrap(), p);
        }
    }

    #[test]
    fn power_law_with_unit_alpha_is_identity() {
        for p in GRID {
            let perceived = transform_probability(p, Perception::PowerLaw { alpha: 1.0 }).unwrap();
            assert!((perceived - p).abs() < 1e-12, "p={p} perceived={perceived}");
        }
    }

    #[test]
    fn sub_unit_alpha_overweights_long_shots() {
        let p = 1.0 / 34.0;
        let perceived = transform_probability(p, Perception::PowerLaw { alpha: 0.75 }).unwrap();

        assert!(perceived > p);
    }

    #[test]
    fn super_unit_alpha_underweights_long_shots() {
        let p = 0.05;
        let perceived = transform_probability(p, Perception::PowerLaw { alpha: 1.4 }).unwrap();

        assert!(perceived < p);
    }

    #[test]
    fn anchored_power_law_fixes_one_half() {
        for alpha in [0.5, 0.75, 1.3] {
            let perceived =
                transform_probability(0.5, Perception::AnchoredPowerLaw { alpha }).unwrap();
            assert!((perceived - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn distortion_is_monotone_in_p() {
        let perception = Perception::PowerLaw { alpha: 0.65 };
        let perceived: Vec<f64> = GRID
            .iter()
            .map(|&p| transform_probability(p, perception).unwrap())
            .collect();

        assert!(perceived.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn distortion_rejects_certain_and_impossible_events() {
        let perception = Perception::PowerLaw { alpha: 0.8 };

        assert_eq!(
            transform_probability(0.0, perception),
            Err(StrategyError::ProbabilityNotInOpenInterval(0.0))
        );
        assert_eq!(
            transform_probability(1.0, perception),
            Err(StrategyError::ProbabilityNotInOpenInterval(1.0))
        );
    }

    #[test]
    fn rejects_non_positive_alpha() {
        assert_eq!(
            transform_probability(0.4, Perception::AnchoredPowerLaw { alpha: 0.0 }),
            Err(StrategyError::InvalidPerceptionAlpha(0.0))
        );
    }
}
