//! Tests for the configuration module.

use super::*;

#[test]
fn test_default_config() {
    let config = CentralConfig::default();
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.common.seed, 42);
    assert_eq!(config.search.budget_type, "iterations");
    assert_eq!(config.search.topology, "one_tree");
    assert_eq!(config.arena.game, "tictactoe");
    assert_eq!(config.arena.players, 2);
}

#[test]
fn test_section_defaults_match_root() {
    let config = CentralConfig::default();
    assert_eq!(config.common, CommonConfig::default());
    assert_eq!(config.search, SearchSettings::default());
    assert_eq!(config.arena, ArenaConfig::default());
}

#[test]
fn test_parse_config_toml() {
    let toml_content = r#"
[common]
seed = 7

[search]
budget_type = "time"
budget = 250
topology = "mcgs"
k = 0.7

[arena]
game = "highcard"
players = 4
"#;
    let config = CentralConfig::from_toml_str(toml_content).unwrap();
    assert_eq!(config.common.seed, 7);
    assert_eq!(config.search.budget_type, "time");
    assert_eq!(config.search.budget, 250);
    assert_eq!(config.search.topology, "mcgs");
    assert!((config.search.k - 0.7).abs() < f64::EPSILON);
    assert_eq!(config.arena.game, "highcard");
    assert_eq!(config.arena.players, 4);
}

#[test]
fn test_partial_config() {
    let toml_content = r#"
[search]
reuse_tree = false
"#;
    let config = CentralConfig::from_toml_str(toml_content).unwrap();
    assert!(!config.search.reuse_tree);
    assert_eq!(config.search.budget, 1000); // Default
    assert_eq!(config.common.log_level, "info"); // Default
    assert_eq!(config.arena.matches, 10); // Default
}

#[test]
fn test_empty_config_is_defaults() {
    let config = CentralConfig::from_toml_str("").unwrap();
    assert_eq!(config, CentralConfig::default());
}

#[test]
fn test_wrong_type_is_an_error() {
    let toml_content = r#"
[search]
budget = "lots"
"#;
    assert!(CentralConfig::from_toml_str(toml_content).is_err());
}

#[test]
fn test_env_overrides() {
    std::env::set_var("MCTS_SEARCH_TOPOLOGY", "multi_tree");
    std::env::set_var("MCTS_SEARCH_BUDGET", "77");
    std::env::set_var("MCTS_ARENA_OPPONENT", "random");

    let config = load_config();
    assert_eq!(config.search.topology, "multi_tree");
    assert_eq!(config.search.budget, 77);
    assert_eq!(config.arena.opponent, "random");

    std::env::remove_var("MCTS_SEARCH_TOPOLOGY");
    std::env::remove_var("MCTS_SEARCH_BUDGET");
    std::env::remove_var("MCTS_ARENA_OPPONENT");
}

#[test]
fn test_unparsable_env_override_is_ignored() {
    std::env::set_var("MCTS_SEARCH_MAST_GAMMA", "not-a-number");
    let config = apply_env_overrides(CentralConfig::default());
    assert!((config.search.mast_gamma - 0.5).abs() < f64::EPSILON);
    std::env::remove_var("MCTS_SEARCH_MAST_GAMMA");
}

#[test]
fn test_load_from_missing_path_uses_defaults() {
    let config = load_from_path(std::path::Path::new("/definitely/not/here.toml"));
    assert_eq!(config.search.rollout_length, 10);
}

#[test]
fn test_config_clone() {
    let config = CentralConfig::default();
    let cloned = config.clone();
    assert_eq!(config.search.topology, cloned.search.topology);
    assert_eq!(config.arena.game, cloned.arena.game);
}

#[test]
fn test_search_seed_and_bandit_keys() {
    let toml_content = r#"
[search]
seed = 99
tree_policy = "exp3"
initialise_visits = 4
"#;
    let config = CentralConfig::from_toml_str(toml_content).unwrap();
    assert_eq!(config.search.seed, 99);
    assert_eq!(config.search.tree_policy, "exp3");
    assert_eq!(config.search.initialise_visits, 4);
    assert_eq!(config.search.action_heuristic_recalculation_threshold, 20);
    assert!((config.search.hedge_boltzmann - 100.0).abs() < f64::EPSILON);
}
