//! Shared utilities for game implementations
//!
//! Result conventions and small helpers used by the reference games and by
//! the search engine's default policies.

use crate::typed::PlayerId;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// Result value for an outright win.
pub const WIN: f64 = 1.0;
/// Result value for a loss.
pub const LOSS: f64 = 0.0;
/// Result value for a shared first place or a draw.
pub const DRAW: f64 = 0.5;

/// Calculate per-player results for a game decided by final scores.
///
/// The single highest score wins. When several players share the highest
/// score they all receive [`DRAW`]; everyone else receives [`LOSS`].
///
/// # Example
/// ```
/// use engine_core::game_utils::score_results;
///
/// assert_eq!(score_results(&[3, 1, 2]), vec![1.0, 0.0, 0.0]);
/// assert_eq!(score_results(&[2, 2, 0]), vec![0.5, 0.5, 0.0]);
/// ```
pub fn score_results(scores: &[i32]) -> Vec<f64> {
    let Some(&best) = scores.iter().max() else {
        return Vec::new();
    };
    let leaders = scores.iter().filter(|&&s| s == best).count();
    scores
        .iter()
        .map(|&s| match (s == best, leaders) {
            (true, 1) => WIN,
            (true, _) => DRAW,
            (false, _) => LOSS,
        })
        .collect()
}

/// Calculate the result for `player` in a two-player game.
///
/// # Arguments
/// * `winner` - `None` while ongoing or on a draw, `Some(seat)` otherwise
/// * `finished` - Whether the game is over
/// * `player` - Seat to report for
///
/// # Example
/// ```
/// use engine_core::game_utils::two_player_result;
///
/// assert_eq!(two_player_result(Some(0), true, 0), 1.0);
/// assert_eq!(two_player_result(Some(0), true, 1), 0.0);
/// assert_eq!(two_player_result(None, true, 1), 0.5);
/// ```
#[inline]
pub fn two_player_result(winner: Option<PlayerId>, finished: bool, player: PlayerId) -> f64 {
    match (winner, finished) {
        (Some(w), _) if w == player => WIN,
        (Some(_), _) => LOSS,
        (None, true) => DRAW,
        // ongoing games are scored as even
        (None, false) => DRAW,
    }
}

/// Pick one action uniformly at random.
///
/// Returns `None` for an empty slice.
pub fn sample_uniform<'a, A>(actions: &'a [A], rng: &mut ChaCha20Rng) -> Option<&'a A> {
    if actions.is_empty() {
        return None;
    }
    Some(&actions[rng.gen_range(0..actions.len())])
}
