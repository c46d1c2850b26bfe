//! Configuration struct definitions.
//!
//! Every field is required at the serde level; missing keys are filled by
//! merging the user file over the embedded defaults before deserializing.

use crate::defaults;
use serde::{Deserialize, Serialize};

/// Root configuration structure matching config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralConfig {
    pub common: CommonConfig,
    pub search: SearchSettings,
    pub arena: ArenaConfig,
}

impl Default for CentralConfig {
    fn default() -> Self {
        defaults::config().clone()
    }
}

impl CentralConfig {
    /// Parse a (possibly partial) config.toml, filling gaps from the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let overlay: toml::Table = toml::from_str(content)?;
        let mut merged = defaults::table().clone();
        defaults::merge_tables(&mut merged, overlay);
        toml::Value::Table(merged).try_into()
    }
}

/// Common configuration shared by all components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    pub log_level: String,
    /// Seed for every random number generator the run creates
    pub seed: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        defaults::config().common.clone()
    }
}

/// Search parameters in their on-disk form.
///
/// Enumerated options are kept as strings here and validated when the
/// search engine converts them into its own configuration type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub budget_type: String,
    pub budget: u64,
    pub break_ms: u64,
    pub k: f64,
    pub tree_policy: String,
    pub selection_policy: String,
    pub topology: String,
    pub information: String,
    pub discard_state_after_each_iteration: bool,
    pub maintain_master_state: bool,
    pub rollout_length: usize,
    pub rollout_length_per_player: bool,
    pub rollout_termination: String,
    pub max_tree_depth: usize,
    pub rollout_type: String,
    pub opponent_model: String,
    pub mast: String,
    pub mast_gamma: f64,
    pub mast_boltzmann: f64,
    pub mast_default_value: f64,
    pub explore_epsilon: f64,
    pub mast_as_action_heuristic: bool,
    pub first_play_urgency: f64,
    pub normalise_rewards: bool,
    pub paranoid: bool,
    pub puct_temperature: f64,
    pub exp3_boltzmann: f64,
    pub hedge_boltzmann: f64,
    pub initialise_visits: u32,
    pub action_heuristic_recalculation_threshold: u32,
    pub progressive_widening_constant: f64,
    pub progressive_widening_exponent: f64,
    pub progressive_bias: f64,
    pub oma_visits: u32,
    pub mcgs_expand_after_clash: bool,
    pub reuse_tree: bool,
    pub max_backup_threshold: u32,
    pub action_space: String,
    /// Seed of the search's random number generator
    pub seed: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        defaults::config().search.clone()
    }
}

/// Match runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Game to play (tictactoe, highcard)
    pub game: String,
    /// Seats at the table; only used by games with a variable player count
    pub players: usize,
    /// Cards dealt to each player in card games
    pub hand_size: usize,
    pub matches: u32,
    /// Who fills the other seats (mcts, random)
    pub opponent: String,
    /// Iteration budget of MCTS opponents
    pub opponent_budget: u64,
    /// Log a summary every N matches
    pub log_interval: u32,
    /// Log root statistics after every decision of seat 0
    pub show_decision_stats: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        defaults::config().arena.clone()
    }
}
