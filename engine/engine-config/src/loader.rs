//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from subdirectory)
];

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MCTS_CONFIG";

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the MCTS_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_PATH_ENV, path.display());
            return load_from_path(&path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    // Search default locations
    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    // Fall back to defaults
    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match CentralConfig::from_toml_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u64, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = v,
            Ok(Err(_)) => warn!("Ignoring unparsable {}", $key),
            Err(_) => {}
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: MCTS_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "MCTS_COMMON_LOG_LEVEL");
    env_override!(config, common.seed, "MCTS_COMMON_SEED", parse);

    // Search
    env_override!(config, search.budget_type, "MCTS_SEARCH_BUDGET_TYPE");
    env_override!(config, search.budget, "MCTS_SEARCH_BUDGET", parse);
    env_override!(config, search.break_ms, "MCTS_SEARCH_BREAK_MS", parse);
    env_override!(config, search.k, "MCTS_SEARCH_K", parse);
    env_override!(config, search.tree_policy, "MCTS_SEARCH_TREE_POLICY");
    env_override!(
        config,
        search.selection_policy,
        "MCTS_SEARCH_SELECTION_POLICY"
    );
    env_override!(config, search.topology, "MCTS_SEARCH_TOPOLOGY");
    env_override!(config, search.information, "MCTS_SEARCH_INFORMATION");
    env_override!(
        config,
        search.rollout_length,
        "MCTS_SEARCH_ROLLOUT_LENGTH",
        parse
    );
    env_override!(
        config,
        search.max_tree_depth,
        "MCTS_SEARCH_MAX_TREE_DEPTH",
        parse
    );
    env_override!(config, search.rollout_type, "MCTS_SEARCH_ROLLOUT_TYPE");
    env_override!(config, search.opponent_model, "MCTS_SEARCH_OPPONENT_MODEL");
    env_override!(config, search.mast, "MCTS_SEARCH_MAST");
    env_override!(config, search.mast_gamma, "MCTS_SEARCH_MAST_GAMMA", parse);
    env_override!(
        config,
        search.first_play_urgency,
        "MCTS_SEARCH_FIRST_PLAY_URGENCY",
        parse
    );
    env_override!(config, search.paranoid, "MCTS_SEARCH_PARANOID", parse);
    env_override!(config, search.reuse_tree, "MCTS_SEARCH_REUSE_TREE", parse);
    env_override!(
        config,
        search.initialise_visits,
        "MCTS_SEARCH_INITIALISE_VISITS",
        parse
    );
    env_override!(config, search.seed, "MCTS_SEARCH_SEED", parse);

    // Arena
    env_override!(config, arena.game, "MCTS_ARENA_GAME");
    env_override!(config, arena.players, "MCTS_ARENA_PLAYERS", parse);
    env_override!(config, arena.matches, "MCTS_ARENA_MATCHES", parse);
    env_override!(config, arena.opponent, "MCTS_ARENA_OPPONENT");
    env_override!(
        config,
        arena.opponent_budget,
        "MCTS_ARENA_OPPONENT_BUDGET",
        parse
    );

    config
}
