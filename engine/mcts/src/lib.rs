//! Budgeted Monte Carlo Tree Search for any game implementing the
//! `engine-core` [`Game`](engine_core::Game) trait.
//!
//! # Overview
//!
//! Each iteration of the search runs four phases:
//!
//! 1. **Selection**: descend the tree with UCB, UCB-tuned or PUCT
//! 2. **Expansion**: add one node for the first action leaving the tree
//! 3. **Rollout**: play on with a random, MAST or external policy, up to a
//!    horizon, then score the state with a heuristic
//! 4. **Backup**: add the result to every node on the path
//!
//! Hidden information is handled by redeterminizing the decision state on
//! every iteration (open loop) or once per search (closed loop).
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{Budget, MctsConfig, MctsPlayer};
//! use games_tictactoe::TicTacToe;
//!
//! let game = TicTacToe::new();
//! let state = game.initial_state();
//! let mut player = MctsPlayer::new(MctsConfig::default())?;
//! let action = player.decide(&game, &state, &state.legal_moves(), Budget::iterations(500))?;
//! for (action, stat) in player.decision_statistics(&game) {
//!     println!("{action}: {} visits, mean {:.3}", stat.visits, stat.mean_value);
//! }
//! ```
//!
//! # Topologies
//!
//! [`TreeTopology`] selects the search structure: one shared tree, a tree of
//! the deciding player's nodes only, one tree per player, a transposition
//! graph, or a shared tree with opponent-move averaging (OMA).
//!
//! # Architecture
//!
//! ```text
//! MctsPlayer ── owns ──> SearchTree (slab arena), MastTable, ChaCha20Rng
//!     │
//!     ├─ reuse::relocate      move the root to the new decision state
//!     ├─ SearchContext        select -> expand -> rollout -> backup
//!     │     ├─ Selector       tree policy
//!     │     └─ RolloutStrategy
//!     └─ decision_statistics  per-action summary of the root
//! ```

pub mod config;
pub mod mast;
pub mod node;
pub mod policy;
pub mod reuse;
pub mod search;
pub mod selection;
pub mod stats;
pub mod tree;

// Re-export main types
pub use config::{
    Budget, BudgetType, ConfigError, Information, MastType, MctsConfig, RolloutTermination,
    SelectionPolicy, StrategyKind, TreePolicy, TreeTopology,
};
pub use mast::{MastEntry, MastTable};
pub use node::{MctsNode, NodeId};
pub use policy::{
    ActionHeuristic, ActionPolicy, GameScoreHeuristic, NullActionHeuristic, RandomPolicy,
    RolloutStrategy, StateHeuristic,
};
pub use search::{DecisionStat, MctsPlayer, MctsPlayerBuilder, SearchError, SearchStats};
pub use stats::{ActionStats, ValueBounds};
pub use tree::{SearchTree, TreeStats};
