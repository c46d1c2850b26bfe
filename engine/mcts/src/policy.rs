//! Pluggable policies the search depends on.
//!
//! Three capabilities, each with one entry point:
//! - [`StateHeuristic`]: value of a non-terminal state for a player
//! - [`ActionHeuristic`]: prior value of an action in a state
//! - [`ActionPolicy`]: choose an action outside the tree
//!
//! Rollouts and opponent moves go through [`RolloutStrategy`], a small
//! closed set of choosers built by [`RolloutStrategy::from_kind`].

use crate::config::{ConfigError, MctsConfig, StrategyKind};
use crate::mast::MastTable;
use engine_core::game_utils::sample_uniform;
use engine_core::{Game, PlayerId};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::fmt;

/// Estimates how good a state is for a player.
pub trait StateHeuristic<G: Game> {
    fn evaluate_state(&self, game: &G, state: &G::State, player: PlayerId) -> f64;
}

/// Scores an action in a state; higher is more promising.
pub trait ActionHeuristic<G: Game> {
    fn evaluate_action(&self, game: &G, action: &G::Action, state: &G::State) -> f64;
}

/// Chooses one of `actions`. Returning None falls back to a uniform choice.
pub trait ActionPolicy<G: Game> {
    fn select_action(
        &self,
        game: &G,
        state: &G::State,
        actions: &[G::Action],
        rng: &mut ChaCha20Rng,
    ) -> Option<G::Action>;
}

/// Uses the game's own `heuristic_score` (its result on terminal states).
#[derive(Debug, Clone, Copy, Default)]
pub struct GameScoreHeuristic;

impl<G: Game> StateHeuristic<G> for GameScoreHeuristic {
    fn evaluate_state(&self, game: &G, state: &G::State, player: PlayerId) -> f64 {
        game.heuristic_score(state, player)
    }
}

/// Rates every action the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActionHeuristic;

impl<G: Game> ActionHeuristic<G> for NullActionHeuristic {
    fn evaluate_action(&self, _game: &G, _action: &G::Action, _state: &G::State) -> f64 {
        0.0
    }
}

/// Uniformly random choice.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl<G: Game> ActionPolicy<G> for RandomPolicy {
    fn select_action(
        &self,
        _game: &G,
        _state: &G::State,
        actions: &[G::Action],
        rng: &mut ChaCha20Rng,
    ) -> Option<G::Action> {
        sample_uniform(actions, rng).cloned()
    }
}

/// Out-of-tree action chooser for one role (rollout or opponent model).
pub enum RolloutStrategy<G: Game> {
    /// Uniformly random
    Random,
    /// Boltzmann over the acting player's MAST values, with `epsilon`
    /// probability of a uniform choice instead
    Mast { temperature: f64, epsilon: f64 },
    /// External policy
    Policy(Box<dyn ActionPolicy<G>>),
}

impl<G: Game> fmt::Debug for RolloutStrategy<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutStrategy::Random => f.write_str("Random"),
            RolloutStrategy::Mast {
                temperature,
                epsilon,
            } => f
                .debug_struct("Mast")
                .field("temperature", temperature)
                .field("epsilon", epsilon)
                .finish(),
            RolloutStrategy::Policy(_) => f.write_str("Policy(..)"),
        }
    }
}

impl<G: Game> RolloutStrategy<G> {
    /// Build the strategy for `kind`.
    ///
    /// `Policy` consumes `policy`; asking for it without one is a
    /// configuration error. `role` names the setting in errors.
    pub fn from_kind(
        kind: StrategyKind,
        config: &MctsConfig,
        policy: Option<Box<dyn ActionPolicy<G>>>,
        role: &'static str,
    ) -> Result<Self, ConfigError> {
        match kind {
            StrategyKind::Random => Ok(RolloutStrategy::Random),
            StrategyKind::Mast => {
                if !config.mast.is_enabled() {
                    return Err(ConfigError::MastNotCollected(role));
                }
                Ok(RolloutStrategy::Mast {
                    temperature: config.mast_boltzmann,
                    epsilon: config.explore_epsilon,
                })
            }
            StrategyKind::Policy => policy
                .map(RolloutStrategy::Policy)
                .ok_or(ConfigError::MissingPolicy(role)),
            StrategyKind::Default => Err(ConfigError::InvalidValue {
                field: role,
                reason: "default has no strategy of its own".into(),
            }),
        }
    }

    pub fn uses_mast(&self) -> bool {
        matches!(self, RolloutStrategy::Mast { .. })
    }

    /// Choose an action for `player` among `actions` (non-empty).
    pub fn select(
        &self,
        game: &G,
        state: &G::State,
        actions: &[G::Action],
        player: PlayerId,
        mast: Option<&MastTable<G::Action>>,
        rng: &mut ChaCha20Rng,
    ) -> Option<G::Action> {
        match self {
            RolloutStrategy::Random => sample_uniform(actions, rng).cloned(),
            RolloutStrategy::Mast {
                temperature,
                epsilon,
            } => match mast {
                Some(table) if rng.gen::<f64>() >= *epsilon => {
                    let values: Vec<f64> =
                        actions.iter().map(|a| table.value(player, a)).collect();
                    boltzmann_index(&values, *temperature, rng).map(|i| actions[i].clone())
                }
                _ => sample_uniform(actions, rng).cloned(),
            },
            RolloutStrategy::Policy(policy) => policy
                .select_action(game, state, actions, rng)
                .or_else(|| sample_uniform(actions, rng).cloned()),
        }
    }
}

/// Softmax weights of `values` at `temperature`; a non-positive temperature
/// puts all the mass on the maxima.
pub fn boltzmann_weights(values: &[f64], temperature: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if temperature <= 0.0 {
        let top = values.iter().filter(|&&v| v >= max).count() as f64;
        return values
            .iter()
            .map(|&v| if v >= max { 1.0 / top } else { 0.0 })
            .collect();
    }
    let exps: Vec<f64> = values
        .iter()
        .map(|&v| ((v - max) / temperature).exp())
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Sample an index with probability given by [`boltzmann_weights`].
pub fn boltzmann_index(values: &[f64], temperature: f64, rng: &mut ChaCha20Rng) -> Option<usize> {
    let weights = boltzmann_weights(values, temperature);
    let r: f64 = rng.gen();
    let mut cumsum = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return Some(i);
        }
    }
    // floating point slack: last action with any weight
    weights.iter().rposition(|&w| w > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MastType;
    use games_tictactoe::TicTacToe;
    use rand::SeedableRng;

    #[derive(Debug)]
    struct AlwaysFirst;

    impl ActionPolicy<TicTacToe> for AlwaysFirst {
        fn select_action(
            &self,
            _game: &TicTacToe,
            _state: &games_tictactoe::State,
            actions: &[u8],
            _rng: &mut ChaCha20Rng,
        ) -> Option<u8> {
            actions.first().copied()
        }
    }

    #[test]
    fn test_boltzmann_weights() {
        let w = boltzmann_weights(&[0.0, 0.0], 1.0);
        assert!((w[0] - 0.5).abs() < 1e-12);

        let w = boltzmann_weights(&[1.0, 0.0], 0.1);
        assert!(w[0] > 0.99);

        let w = boltzmann_weights(&[1.0, 0.5, 1.0], 0.0);
        assert_eq!(w, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_boltzmann_index_prefers_high_values() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut counts = [0u32; 3];
        for _ in 0..1000 {
            let i = boltzmann_index(&[0.0, 1.0, 0.2], 0.2, &mut rng).unwrap();
            counts[i] += 1;
        }
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[0]);
    }

    #[test]
    fn test_mast_strategy_follows_table() {
        let game = TicTacToe::new();
        let state = game.initial_state();
        let config = MctsConfig::default().with_mast(MastType::Both, 0.5);
        let mut strategy =
            RolloutStrategy::<TicTacToe>::from_kind(StrategyKind::Mast, &config, None, "rollout")
                .unwrap();
        if let RolloutStrategy::Mast { epsilon, .. } = &mut strategy {
            *epsilon = 0.0;
        }

        let mut mast = MastTable::new(2, 0.0);
        for _ in 0..10 {
            mast.update(0, &4, 1.0);
        }
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let picks = (0..50)
            .filter(|_| strategy.select(&game, &state, &[0, 4, 8], 0, Some(&mast), &mut rng) == Some(4))
            .count();
        assert!(picks > 45, "MAST rollout should favour the best action: {}", picks);
    }

    #[test]
    fn test_from_kind_errors() {
        let config = MctsConfig::default();
        assert_eq!(
            RolloutStrategy::<TicTacToe>::from_kind(StrategyKind::Mast, &config, None, "rollout_type")
                .unwrap_err(),
            ConfigError::MastNotCollected("rollout_type")
        );
        assert_eq!(
            RolloutStrategy::<TicTacToe>::from_kind(StrategyKind::Policy, &config, None, "rollout_type")
                .unwrap_err(),
            ConfigError::MissingPolicy("rollout_type")
        );
    }

    #[test]
    fn test_policy_strategy() {
        let game = TicTacToe::new();
        let state = game.initial_state();
        let strategy = RolloutStrategy::from_kind(
            StrategyKind::Policy,
            &MctsConfig::default(),
            Some(Box::new(AlwaysFirst)),
            "rollout_type",
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(
            strategy.select(&game, &state, &[6, 7], 0, None, &mut rng),
            Some(6)
        );
    }
}
