use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Lose,
    Push,
}

/// Maps one uniform draw `u` in `[0, 1)` onto the ternary outcome:
/// `[0, p_win)` wins, `[p_win, p_win + p_lose)` loses, the rest pushes.
pub fn classify_outcome(u: f64, p_win: f64, p_lose: f64) -> Outcome {
    if u < p_win {
        Outcome::Win
    } else if u < p_win + p_lose {
        Outcome::Lose
    } else {
        Outcome::Push
    }
}

/// Consumes exactly one draw from `rng`.
pub fn sample_outcome<R: Rng + ?Sized>(rng: &mut R, p_win: f64, p_lose: f64) -> Outcome {
    let u: f64 = rng.gen();
    classify_outcome(u, p_win, p_lose)
}

/// Independent stream for one path of a batch. The stream depends only on
/// `(seed, path_index)`, never on which worker runs the path.
pub fn path_rng(seed: u64, path_index: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(path_index);
    rng
}
