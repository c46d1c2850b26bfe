//! Configuration for the arena binary
//!
//! Defaults come from config.toml (with MCTS_* environment overrides applied
//! by engine-config). CLI arguments take highest priority.

use anyhow::{anyhow, Result};
use clap::Parser;
use engine_config::{load_config, CentralConfig};
use mcts::{Budget, MctsConfig};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_game() -> String {
    CENTRAL_CONFIG.arena.game.clone()
}

fn default_players() -> usize {
    CENTRAL_CONFIG.arena.players
}

fn default_hand_size() -> usize {
    CENTRAL_CONFIG.arena.hand_size
}

fn default_matches() -> u32 {
    CENTRAL_CONFIG.arena.matches
}

fn default_opponent() -> String {
    CENTRAL_CONFIG.arena.opponent.clone()
}

fn default_opponent_budget() -> u64 {
    CENTRAL_CONFIG.arena.opponent_budget
}

fn default_log_interval() -> u32 {
    CENTRAL_CONFIG.arena.log_interval
}

fn default_show_decision_stats() -> bool {
    CENTRAL_CONFIG.arena.show_decision_stats
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.common.seed
}

fn default_budget_type() -> String {
    CENTRAL_CONFIG.search.budget_type.clone()
}

fn default_budget() -> u64 {
    CENTRAL_CONFIG.search.budget
}

fn default_topology() -> String {
    CENTRAL_CONFIG.search.topology.clone()
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "arena")]
#[command(about = "Play matches between MCTS players")]
#[command(
    long_about = "Plays a series of matches with the configured MCTS player in one seat
and opponents in the others, rotating seats between matches.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Game to play (tictactoe, highcard)
    #[arg(long, default_value_t = default_game())]
    pub game: String,

    /// Number of players (highcard only)
    #[arg(long, default_value_t = default_players())]
    pub players: usize,

    /// Cards dealt to each player (highcard only)
    #[arg(long, default_value_t = default_hand_size())]
    pub hand_size: usize,

    /// Number of matches to play
    #[arg(long, default_value_t = default_matches())]
    pub matches: u32,

    /// Who fills the other seats (mcts, random)
    #[arg(long, default_value_t = default_opponent())]
    pub opponent: String,

    /// Iteration budget of MCTS opponents
    #[arg(long, default_value_t = default_opponent_budget())]
    pub opponent_budget: u64,

    /// Log progress every N matches (0 to disable)
    #[arg(long, default_value_t = default_log_interval())]
    pub log_interval: u32,

    /// Log root statistics after each decision of the evaluated player
    #[arg(long, action = clap::ArgAction::Set, default_value_t = default_show_decision_stats())]
    pub show_decision_stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Seed for dealing and for every player
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Budget kind of the evaluated player (time, iterations, fm_calls, ...)
    #[arg(long, default_value_t = default_budget_type())]
    pub budget_type: String,

    /// Budget amount of the evaluated player
    #[arg(long, default_value_t = default_budget())]
    pub budget: u64,

    /// Search topology of the evaluated player
    #[arg(long, default_value_t = default_topology())]
    pub topology: String,

    /// Write a JSON summary here when the run finishes
    #[arg(long)]
    pub stats_path: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.game.as_str(), "tictactoe" | "highcard") {
            return Err(anyhow!(
                "unknown game '{}', expected tictactoe or highcard",
                self.game
            ));
        }

        if !matches!(self.opponent.as_str(), "mcts" | "random") {
            return Err(anyhow!(
                "unknown opponent '{}', expected mcts or random",
                self.opponent
            ));
        }

        if self.matches == 0 {
            return Err(anyhow!("matches must be greater than 0"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }

    /// Search configuration of the evaluated player: the central search
    /// settings with this command line's overrides.
    pub fn search_config(&self) -> Result<MctsConfig> {
        let mut settings = CENTRAL_CONFIG.search.clone();
        settings.budget_type = self.budget_type.clone();
        settings.budget = self.budget;
        settings.topology = self.topology.clone();
        let config = MctsConfig::try_from(&settings)?;
        Ok(config.with_seed(self.seed))
    }

    /// Search configuration of MCTS opponents in `seat`.
    pub fn opponent_config(&self, seat: usize) -> Result<MctsConfig> {
        let config = MctsConfig::try_from(&CENTRAL_CONFIG.search)?;
        Ok(config
            .with_budget(Budget::iterations(self.opponent_budget))
            .with_seed(self.seed.wrapping_add(seat as u64)))
    }
}
