//! Typed Game trait describing the environment a search engine plays against.
//!
//! A `Game` is a forward model: it never owns the state it operates on. The
//! search copies states itself and asks the game to advance, inspect or
//! redeterminize those copies.

use crate::metadata::GameMetadata;
use rand_chacha::ChaCha20Rng;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// Seat index of a player, `0..n_players`.
pub type PlayerId = usize;

/// How a game should present the actions available to the acting player.
///
/// Games that only have one natural representation may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionSpace {
    /// Whatever the game considers its native action list
    #[default]
    Default,
    /// Every complete action enumerated as one flat list
    Flat,
    /// Compound actions broken into a sequence of smaller decisions
    Deep,
}

/// Main trait for game implementations.
///
/// # Type Parameters
///
/// * `State` - Full game state, including any hidden information
/// * `Action` - Action identity; equal actions must compare and hash equal
///   regardless of the state they were generated from
///
/// # Example
///
/// ```rust
/// # use engine_core::typed::*;
/// # use engine_core::GameMetadata;
/// # use rand_chacha::ChaCha20Rng;
/// #[derive(Debug, Clone)]
/// struct CountState {
///     total: u32,
///     to_move: usize,
///     history: Vec<(PlayerId, u32)>,
/// }
///
/// #[derive(Debug)]
/// struct CountToTen;
///
/// impl Game for CountToTen {
///     type State = CountState;
///     type Action = u32;
///
///     fn metadata(&self) -> GameMetadata { GameMetadata::new("count", "Count to ten") }
///     fn n_players(&self, _state: &CountState) -> usize { 2 }
///     fn current_player(&self, state: &CountState) -> PlayerId { state.to_move }
///     fn legal_actions(&self, _state: &CountState, _space: ActionSpace) -> Vec<u32> { vec![1, 2] }
///     fn apply(&self, state: &mut CountState, action: &u32, _rng: &mut ChaCha20Rng) {
///         state.history.push((state.to_move, *action));
///         state.total += action;
///         state.to_move = 1 - state.to_move;
///     }
///     fn is_terminal(&self, state: &CountState) -> bool { state.total >= 10 }
///     fn result(&self, state: &CountState, player: PlayerId) -> f64 {
///         // whoever moved last reached ten
///         if state.to_move != player { 1.0 } else { 0.0 }
///     }
///     fn history<'a>(&self, state: &'a CountState) -> &'a [(PlayerId, u32)] { &state.history }
/// }
/// ```
pub trait Game: Debug {
    /// Game state type, cloned by the search whenever it needs its own snapshot
    type State: Clone + Debug;

    /// Action type, used as a map key by the search tables
    type Action: Clone + Eq + Hash + Debug;

    /// Get game metadata for logging and configuration
    fn metadata(&self) -> GameMetadata;

    /// Number of seats in the game.
    fn n_players(&self, state: &Self::State) -> usize;

    /// Player whose turn it is in `state`.
    fn current_player(&self, state: &Self::State) -> PlayerId;

    /// Actions available to the current player.
    fn legal_actions(&self, state: &Self::State, space: ActionSpace) -> Vec<Self::Action>;

    /// Advance `state` in place by `action`.
    ///
    /// Implementations append `(actor, action)` to the state's history.
    fn apply(&self, state: &mut Self::State, action: &Self::Action, rng: &mut ChaCha20Rng);

    /// Whether the game is over.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Final result for `player`; only meaningful on terminal states.
    ///
    /// The reference games use 1.0 for a win, 0.0 for a loss and a share for
    /// ties, but any numeric scale is accepted.
    fn result(&self, state: &Self::State, player: PlayerId) -> f64;

    /// Every `(actor, action)` pair applied since the game started.
    fn history<'a>(&self, state: &'a Self::State) -> &'a [(PlayerId, Self::Action)];

    /// Copy of `state` with everything `observer` cannot see resampled.
    ///
    /// Perfect-information games keep the default, which is a plain clone.
    fn redeterminize(
        &self,
        state: &Self::State,
        _observer: PlayerId,
        _rng: &mut ChaCha20Rng,
    ) -> Self::State {
        state.clone()
    }

    /// Heuristic estimate of how well `player` is doing in a non-terminal state.
    ///
    /// Defaults to the game result, which is exact on terminal states.
    fn heuristic_score(&self, state: &Self::State, player: PlayerId) -> f64 {
        self.result(state, player)
    }

    /// Signature used to merge transpositions in graph search.
    ///
    /// The default hashes the action history, which never merges two
    /// different move orders. Games with real transpositions should hash
    /// their position instead.
    fn state_key(&self, state: &Self::State) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.history(state).hash(&mut hasher);
        hasher.finish()
    }
}
