use serde::Serialize;

/// Per-bet expectations for a proportional stake, measured as a share of
/// current wealth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetEdge {
    /// Expected profit per unit staked under the objective probabilities.
    pub actual_ev: f64,
    /// Expected profit per unit staked as the bettor perceives it.
    pub perceived_ev: f64,
    pub stake_fraction: f64,
    pub expected_return: f64,
    pub return_variance: f64,
    pub return_std_dev: f64,
}

pub fn bet_edge(
    p_win: f64,
    p_lose: f64,
    perceived_p_win: f64,
    net_odds: f64,
    stake_fraction: f64,
) -> BetEdge {
    let actual_ev = p_win * net_odds - p_lose;
    let perceived_ev = perceived_p_win * net_odds - (1.0 - perceived_p_win);
    let expected_return = stake_fraction * actual_ev;
    let return_variance =
        stake_fraction.powi(2) * (p_win * net_odds.powi(2) + p_lose);

    BetEdge {
        actual_ev,
        perceived_ev,
        stake_fraction,
        expected_return,
        return_variance,
        return_std_dev: return_variance.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::bet_edge;

    #[test]
    fn even_money_coin_flip_has_no_edge() {
        let edge = bet_edge(0.5, 0.5, 0.5, 1.0, 0.5);

        assert_eq!(edge.actual_ev, 0.0);
        assert_eq!(edge.expected_return, 0.0);
        assert_eq!(edge.return_variance, 0.25);
        assert_eq!(edge.return_std_dev, 0.5);
    }

    #[test]
    fn misperceived_long_shot_looks_profitable_but_is_not() {
        let p = 1.0 / 38.0;
        let edge = bet_edge(p, 1.0 - p, 0.05, 35.0, 0.01);

        assert!((edge.actual_ev - (-2.0 / 38.0)).abs() < 1e-12);
        assert!(edge.perceived_ev > 0.0);
        assert!(edge.expected_return < 0.0);
    }

    #[test]
    fn push_mass_reduces_variance() {
        let with_push = bet_edge(0.4, 0.4, 0.4, 1.0, 0.2);
        let without_push = bet_edge(0.5, 0.5, 0.5, 1.0, 0.2);

        assert!(with_push.return_variance < without_push.return_variance);
    }
}
