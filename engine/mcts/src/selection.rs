//! In-tree action selection.
//!
//! One scorer covers every tree policy: an exploitation term (the decision
//! player's mean, optionally normalised, blended with OMA statistics, or seen
//! from the root player in paranoid mode), an exploration term chosen by
//! [`TreePolicy`], first-play urgency for untried actions, progressive bias
//! and progressive widening. EXP3 and Hedge sample from a Boltzmann
//! distribution over the scores instead of taking the best one.

use crate::config::{MctsConfig, TreePolicy};
use crate::mast::MastTable;
use crate::node::MctsNode;
use crate::policy::{boltzmann_index, boltzmann_weights, ActionHeuristic};
use crate::stats::{ActionStats, ValueBounds};
use engine_core::{Game, PlayerId};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;

/// Noise added to every score so ties break uniformly.
const TIE_NOISE: f64 = 1e-6;

/// Scores actions at a node for one selection step.
pub struct Selector<'a, G: Game> {
    pub config: &'a MctsConfig,
    pub bounds: &'a ValueBounds,
    pub root_player: PlayerId,
    pub action_heuristic: &'a dyn ActionHeuristic<G>,
    /// Live MAST table, consulted when it stands in for the action heuristic
    pub mast: Option<&'a MastTable<G::Action>>,
}

impl<'a, G: Game> Selector<'a, G> {
    /// Whether [`Selector::select`] reads action heuristic values.
    pub fn needs_heuristic(&self) -> bool {
        let config = self.config;
        config.tree_policy == TreePolicy::Puct
            || config.progressive_widening_constant >= 1.0
            || config.progressive_bias != 0.0
    }

    /// Pick one of `actions` at `node`.
    ///
    /// `heuristic` holds the action heuristic value of each action when
    /// [`Selector::needs_heuristic`] says so, and may be empty otherwise.
    /// `oma` is the opponent-move-averaging table of the node's anchor, if
    /// the topology keeps one. Returns None only for an empty action list.
    pub fn select(
        &self,
        node: &MctsNode<G::State, G::Action>,
        oma: Option<&HashMap<G::Action, ActionStats>>,
        actions: &[G::Action],
        heuristic: &[f64],
        rng: &mut ChaCha20Rng,
    ) -> Option<G::Action> {
        if actions.is_empty() {
            return None;
        }
        let config = self.config;
        let stochastic = config.tree_policy.is_stochastic();
        let priors = if config.tree_policy == TreePolicy::Puct {
            puct_priors(heuristic, config.puct_temperature)
        } else {
            Vec::new()
        };

        let eligible = if config.progressive_widening_constant >= 1.0 && !heuristic.is_empty() {
            self.widened(node, heuristic)
        } else {
            (0..actions.len()).collect()
        };

        let mut scored: Vec<(usize, f64)> = Vec::with_capacity(eligible.len());
        for i in eligible {
            let action = &actions[i];
            let visits = node.action_visits(action);
            let mut score = match node.action_stats.get(action).filter(|s| s.visits > 0) {
                None => config.first_play_urgency,
                Some(stats) => {
                    let q = self.exploitation(node, action, stats, oma);
                    match config.tree_policy {
                        TreePolicy::Exp3 => q,
                        TreePolicy::Hedge => q * stats.visits as f64,
                        _ => q + self.exploration(node, stats, priors.get(i).copied()),
                    }
                }
            };
            if config.progressive_bias != 0.0 {
                if let Some(h) = heuristic.get(i) {
                    score += config.progressive_bias * h / (visits as f64 + 1.0);
                }
            }
            if !stochastic {
                score += rng.gen::<f64>() * TIE_NOISE;
            }
            scored.push((i, score));
        }

        let chosen = if stochastic {
            let scores: Vec<f64> = scored.iter().map(|&(_, s)| s).collect();
            self.sample(&scores, config.explore_epsilon, rng)
                .map(|k| scored[k].0)
        } else {
            scored
                .iter()
                .copied()
                .reduce(|best, next| if next.1 > best.1 { next } else { best })
                .map(|(i, _)| i)
        };
        chosen.map(|i| actions[i].clone())
    }

    /// Final decision of a stochastic tree policy at `node`: a draw from its
    /// distribution over the visited `legal` actions, without exploration.
    pub fn sample_decision(
        &self,
        node: &MctsNode<G::State, G::Action>,
        legal: &[G::Action],
        rng: &mut ChaCha20Rng,
    ) -> Option<G::Action> {
        let (visited, scores): (Vec<&G::Action>, Vec<f64>) = legal
            .iter()
            .filter_map(|a| {
                let stats = node.action_stats.get(a).filter(|s| s.visits > 0)?;
                let q = self.exploitation(node, a, stats, None);
                let score = match self.config.tree_policy {
                    TreePolicy::Hedge => q * stats.visits as f64,
                    _ => q,
                };
                Some((a, score))
            })
            .unzip();
        self.sample(&scores, 0.0, rng).map(|i| visited[i].clone())
    }

    /// Boltzmann draw over `scores` mixed with an `epsilon` share of uniform.
    fn sample(&self, scores: &[f64], epsilon: f64, rng: &mut ChaCha20Rng) -> Option<usize> {
        if scores.is_empty() {
            return None;
        }
        let temperature = match self.config.tree_policy {
            TreePolicy::Hedge => self.config.hedge_boltzmann,
            _ => self.config.exp3_boltzmann,
        };
        if epsilon > 0.0 && rng.gen::<f64>() < epsilon {
            return Some(rng.gen_range(0..scores.len()));
        }
        boltzmann_index(scores, temperature, rng)
    }

    /// Heuristic value of `action`: MAST when configured, otherwise the
    /// action heuristic.
    pub fn action_value(
        &self,
        game: &G,
        state: &G::State,
        node: &MctsNode<G::State, G::Action>,
        action: &G::Action,
    ) -> f64 {
        match self.mast {
            Some(mast) if self.config.mast_as_action_heuristic => {
                mast.value(node.turn_owner, action)
            }
            _ => self.action_heuristic.evaluate_action(game, action, state),
        }
    }

    /// Indices of the `⌈C · N^α⌉` best actions by heuristic value.
    fn widened(&self, node: &MctsNode<G::State, G::Action>, heuristic: &[f64]) -> Vec<usize> {
        let allowed = (self.config.progressive_widening_constant
            * (node.visit_count as f64).powf(self.config.progressive_widening_exponent))
        .ceil() as usize;
        let allowed = allowed.clamp(1, heuristic.len());
        let mut order: Vec<usize> = (0..heuristic.len()).collect();
        order.sort_by(|&a, &b| heuristic[b].total_cmp(&heuristic[a]));
        order.truncate(allowed);
        order
    }

    fn scale(&self, value: f64) -> f64 {
        if self.config.normalise_rewards {
            self.bounds.normalise(value)
        } else {
            value
        }
    }

    fn exploitation(
        &self,
        node: &MctsNode<G::State, G::Action>,
        action: &G::Action,
        stats: &ActionStats,
        oma: Option<&HashMap<G::Action, ActionStats>>,
    ) -> f64 {
        let paranoid = self.config.paranoid;
        let player = if paranoid {
            self.root_player
        } else {
            node.decision_player
        };
        let mut q = self.scale(stats.mean(player));

        if let Some(averaged) = oma.and_then(|m| m.get(action)).filter(|s| s.visits > 0) {
            let k = self.config.oma_visits as f64;
            let beta = (k / (3.0 * stats.visits as f64 + k)).sqrt();
            q = (1.0 - beta) * q + beta * self.scale(averaged.mean(player));
        }

        if paranoid && node.decision_player != self.root_player {
            q = if self.config.normalise_rewards {
                1.0 - q
            } else {
                -q
            };
        }
        q
    }

    fn exploration(
        &self,
        node: &MctsNode<G::State, G::Action>,
        stats: &ActionStats,
        prior: Option<f64>,
    ) -> f64 {
        let k = self.config.k;
        let n = stats.visits as f64;
        // availability count: under redeterminization an action is not
        // offered on every visit of its node
        let parent = stats.valid_visits.max(stats.visits).max(1) as f64;
        match self.config.tree_policy {
            TreePolicy::Ucb => k * (parent.ln() / n).sqrt(),
            TreePolicy::UcbTuned => {
                let player = node.decision_player;
                let range = self.bounds.range();
                let mut variance = stats.variance(player);
                if self.config.normalise_rewards && range > 0.0 {
                    variance /= range * range;
                }
                let log_ratio = parent.ln() / n;
                k * (log_ratio * (variance + (2.0 * log_ratio).sqrt()).min(0.25)).sqrt()
            }
            TreePolicy::Puct => k * prior.unwrap_or(0.0) * parent.sqrt() / (1.0 + n),
            TreePolicy::Exp3 | TreePolicy::Hedge => 0.0,
        }
    }
}

/// PUCT priors from action heuristic values.
///
/// A positive temperature gives a Boltzmann distribution; otherwise values
/// are used proportionally, falling back to uniform when they are not all
/// non-negative or sum to zero.
pub fn puct_priors(values: &[f64], temperature: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if temperature > 0.0 {
        return boltzmann_weights(values, temperature);
    }
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && values.iter().all(|&v| v >= 0.0) {
        values.iter().map(|v| v / sum).collect()
    } else {
        vec![1.0 / values.len() as f64; values.len()]
    }
}
