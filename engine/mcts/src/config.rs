//! MCTS configuration parameters.

use engine_config::SearchSettings;
use engine_core::ActionSpace;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors detected while setting up a search. A search never starts with
/// an invalid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Unknown budget type: {0}")]
    UnknownBudget(String),

    #[error("Unknown value {value:?} for {field}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{0} consults MAST statistics but MAST collection is disabled")]
    MastNotCollected(&'static str),

    #[error("Closed-loop search keeps node states; it cannot discard them after each iteration")]
    ClosedLoopDiscard,

    #[error("{0} is set to an external policy but none was supplied")]
    MissingPolicy(&'static str),
}

/// Generates `FromStr` and `Display` over the snake_case names used in config files.
macro_rules! config_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(ConfigError::UnknownVariant {
                        field: $field,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

/// What the search budget counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetType {
    /// Wall-clock milliseconds
    Time,
    /// Completed select-expand-rollout-backup cycles
    Iterations,
    /// Calls to `Game::apply`
    ForwardModelCalls,
    /// State copies, including redeterminizations
    CopyCalls,
    /// Forward-model calls plus state copies
    FmAndCopyCalls,
}

impl FromStr for BudgetType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(BudgetType::Time),
            "iterations" => Ok(BudgetType::Iterations),
            "fm_calls" => Ok(BudgetType::ForwardModelCalls),
            "copy_calls" => Ok(BudgetType::CopyCalls),
            "fm_and_copy_calls" => Ok(BudgetType::FmAndCopyCalls),
            _ => Err(ConfigError::UnknownBudget(s.to_string())),
        }
    }
}

/// Computation budget for a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub kind: BudgetType,
    pub amount: u64,
}

impl Budget {
    pub fn new(kind: BudgetType, amount: u64) -> Self {
        Self { kind, amount }
    }

    pub fn iterations(n: u64) -> Self {
        Self::new(BudgetType::Iterations, n)
    }

    pub fn time_ms(ms: u64) -> Self {
        Self::new(BudgetType::Time, ms)
    }

    pub fn forward_model_calls(n: u64) -> Self {
        Self::new(BudgetType::ForwardModelCalls, n)
    }

    pub fn copy_calls(n: u64) -> Self {
        Self::new(BudgetType::CopyCalls, n)
    }

    pub fn fm_and_copy_calls(n: u64) -> Self {
        Self::new(BudgetType::FmAndCopyCalls, n)
    }
}

/// Formula used to pick an action inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreePolicy {
    /// UCB1
    Ucb,
    /// UCB1 with the exploration term scaled by the observed variance
    UcbTuned,
    /// Exploration term weighted by a prior from the action heuristic
    Puct,
    /// Sample from a Boltzmann distribution over mean values
    Exp3,
    /// Sample from a Boltzmann distribution over cumulative values
    Hedge,
}

config_enum!(TreePolicy, "tree_policy", {
    Ucb => "ucb",
    UcbTuned => "ucb_tuned",
    Puct => "puct",
    Exp3 => "exp3",
    Hedge => "hedge",
});

impl TreePolicy {
    /// Policies that sample an action instead of maximising a score.
    pub fn is_stochastic(self) -> bool {
        matches!(self, TreePolicy::Exp3 | TreePolicy::Hedge)
    }
}

/// How the final decision is read off the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionPolicy {
    /// Most visited action
    Robust,
    /// Highest mean value
    Simple,
    /// Whatever the tree policy picks without exploration; the same as
    /// `Simple` for the deterministic policies
    Tree,
}

config_enum!(SelectionPolicy, "selection_policy", {
    Robust => "robust",
    Simple => "simple",
    Tree => "tree",
});

/// Shape of the search structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeTopology {
    /// One tree shared by every player
    OneTree,
    /// Only the deciding player's nodes; opponents move inside transitions
    SelfOnly,
    /// One self-only tree per player, advanced in lockstep
    MultiTree,
    /// Transposition graph keyed by `Game::state_key`
    Mcgs,
    /// Transposition graph over the deciding player's nodes only
    McgsSelfOnly,
    /// Shared tree with opponent actions averaged under the root player's nodes
    Oma,
    /// Shared tree with every player's actions averaged under their own nodes
    OmaAll,
}

config_enum!(TreeTopology, "topology", {
    OneTree => "one_tree",
    SelfOnly => "self_only",
    MultiTree => "multi_tree",
    Mcgs => "mcgs",
    McgsSelfOnly => "mcgs_self_only",
    Oma => "oma",
    OmaAll => "oma_all",
});

impl TreeTopology {
    /// Nodes are shared through the transposition table.
    pub fn is_graph(self) -> bool {
        matches!(self, TreeTopology::Mcgs | TreeTopology::McgsSelfOnly)
    }

    /// Opponent moves are collapsed into the deciding player's transitions.
    pub fn is_self_only(self) -> bool {
        matches!(self, TreeTopology::SelfOnly | TreeTopology::McgsSelfOnly)
    }

    pub fn uses_oma(self) -> bool {
        matches!(self, TreeTopology::Oma | TreeTopology::OmaAll)
    }

    /// One shared tree in which every visit of a node either ends there or
    /// passes into exactly one child.
    pub fn has_exact_child_visits(self) -> bool {
        matches!(
            self,
            TreeTopology::OneTree | TreeTopology::Oma | TreeTopology::OmaAll
        )
    }
}

/// Handling of hidden information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Information {
    /// Open loop: a fresh determinization every iteration
    InformationSet,
    /// One determinization for the whole search; node states are kept
    ClosedLoop,
}

config_enum!(Information, "information", {
    InformationSet => "information_set",
    ClosedLoop => "closed_loop",
});

/// When a rollout that has reached its length stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RolloutTermination {
    /// As soon as the length is reached
    Default,
    /// Once it is no longer the root player's turn
    EndTurn,
    /// Once it is the root player's turn again
    StartTurn,
}

config_enum!(RolloutTermination, "rollout_termination", {
    Default => "default",
    EndTurn => "end_turn",
    StartTurn => "start_turn",
});

/// Kind of action chooser used outside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Random,
    /// Boltzmann over MAST values
    Mast,
    /// An externally supplied `ActionPolicy`
    Policy,
    /// Opponent model only: reuse the rollout strategy
    Default,
}

config_enum!(StrategyKind, "strategy", {
    Random => "random",
    Mast => "mast",
    Policy => "policy",
    Default => "default",
});

/// Which part of each simulated trajectory feeds the MAST table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MastType {
    None,
    Tree,
    Rollout,
    Both,
}

config_enum!(MastType, "mast", {
    None => "none",
    Tree => "tree",
    Rollout => "rollout",
    Both => "both",
});

impl MastType {
    pub fn is_enabled(self) -> bool {
        self != MastType::None
    }

    /// Whether an action taken in (`in_tree`) or out of the tree is recorded.
    pub fn records(self, in_tree: bool) -> bool {
        match self {
            MastType::None => false,
            MastType::Tree => in_tree,
            MastType::Rollout => !in_tree,
            MastType::Both => true,
        }
    }
}

fn parse_action_space(s: &str) -> Result<ActionSpace, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(ActionSpace::Default),
        "flat" => Ok(ActionSpace::Flat),
        "deep" => Ok(ActionSpace::Deep),
        _ => Err(ConfigError::UnknownVariant {
            field: "action_space",
            value: s.to_string(),
        }),
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Budget used by callers that do not pass one explicitly
    pub budget: Budget,

    /// Milliseconds of a time budget kept in reserve
    pub break_ms: u64,

    /// Exploration constant. With normalised rewards √2 is scale free.
    pub k: f64,

    pub tree_policy: TreePolicy,
    pub selection_policy: SelectionPolicy,
    pub topology: TreeTopology,
    pub information: Information,

    /// Drop node states once an iteration has been backed up (open loop only)
    pub discard_state_after_each_iteration: bool,

    /// Keep the undeterminized state on the root node
    pub maintain_master_state: bool,

    /// Rollout horizon in actions
    pub rollout_length: usize,

    /// Multiply the horizon by the number of players
    pub rollout_length_per_player: bool,

    pub rollout_termination: RolloutTermination,

    /// Nodes this deep are not expanded further
    pub max_tree_depth: usize,

    pub rollout_type: StrategyKind,

    /// Used for non-root players; `Default` falls back to `rollout_type`
    pub opponent_model: StrategyKind,

    pub mast: MastType,

    /// Decay applied to MAST values between decisions (0 starts afresh)
    pub mast_gamma: f64,

    /// Boltzmann temperature of MAST rollouts
    pub mast_boltzmann: f64,

    /// MAST value of an action never seen before
    pub mast_default_value: f64,

    /// Probability a MAST rollout step picks uniformly at random
    pub explore_epsilon: f64,

    /// Use MAST values as the action heuristic (priors, widening, bias)
    pub mast_as_action_heuristic: bool,

    /// Selection score of an action that has never been tried
    pub first_play_urgency: f64,

    /// Rescale values into [0, 1] before selection
    pub normalise_rewards: bool,

    /// Opponents minimise the root player's value
    pub paranoid: bool,

    /// Boltzmann temperature for PUCT priors (0 = proportional)
    pub puct_temperature: f64,

    /// Boltzmann temperature of the EXP3 tree policy
    pub exp3_boltzmann: f64,

    /// Boltzmann temperature of the Hedge tree policy
    pub hedge_boltzmann: f64,

    /// Visits credited to every new action, valued by the action heuristic
    pub initialise_visits: u32,

    /// Node visits after which cached action heuristic values are recomputed
    pub action_heuristic_recalculation_threshold: u32,

    /// Progressive widening is active when this is at least 1
    pub progressive_widening_constant: f64,
    pub progressive_widening_exponent: f64,

    pub progressive_bias: f64,

    /// Weight of OMA statistics; they fade after about this many visits
    pub oma_visits: u32,

    /// On a graph cycle, expand a fresh node instead of stopping
    pub mcgs_expand_after_clash: bool,

    /// Keep the tree between consecutive decisions
    pub reuse_tree: bool,

    /// Node statistics stop changing after this many visits
    pub max_backup_threshold: u32,

    pub action_space: ActionSpace,

    /// Seed for the player's random number generator
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            budget: Budget::iterations(1000),
            break_ms: 10,
            k: std::f64::consts::SQRT_2,
            tree_policy: TreePolicy::Ucb,
            selection_policy: SelectionPolicy::Robust,
            topology: TreeTopology::OneTree,
            information: Information::InformationSet,
            discard_state_after_each_iteration: true,
            maintain_master_state: false,
            rollout_length: 10,
            rollout_length_per_player: false,
            rollout_termination: RolloutTermination::Default,
            max_tree_depth: 1000,
            rollout_type: StrategyKind::Random,
            opponent_model: StrategyKind::Default,
            mast: MastType::None,
            mast_gamma: 0.5,
            mast_boltzmann: 0.1,
            mast_default_value: 0.0,
            explore_epsilon: 0.1,
            mast_as_action_heuristic: false,
            first_play_urgency: 1e9,
            normalise_rewards: true,
            paranoid: false,
            puct_temperature: 0.0,
            exp3_boltzmann: 1.0,
            hedge_boltzmann: 100.0,
            initialise_visits: 0,
            action_heuristic_recalculation_threshold: 20,
            progressive_widening_constant: 0.0,
            progressive_widening_exponent: 0.0,
            progressive_bias: 0.0,
            oma_visits: 30,
            mcgs_expand_after_clash: true,
            reuse_tree: true,
            max_backup_threshold: 1_000_000,
            action_space: ActionSpace::Default,
            seed: 42,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing: 200 iterations, rollouts to the end
    /// of short games, no tree reuse.
    pub fn for_testing() -> Self {
        Self {
            budget: Budget::iterations(200),
            rollout_length: 100,
            reuse_tree: false,
            ..Self::default()
        }
    }

    /// Builder pattern: set the default budget.
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    /// Builder pattern: set the topology.
    pub fn with_topology(mut self, topology: TreeTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Builder pattern: set the tree policy.
    pub fn with_tree_policy(mut self, policy: TreePolicy) -> Self {
        self.tree_policy = policy;
        self
    }

    /// Builder pattern: set the final selection policy.
    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }

    /// Builder pattern: set information handling.
    pub fn with_information(mut self, information: Information) -> Self {
        self.information = information;
        if information == Information::ClosedLoop {
            self.discard_state_after_each_iteration = false;
        }
        self
    }

    /// Builder pattern: set the rollout horizon.
    pub fn with_rollout_length(mut self, length: usize) -> Self {
        self.rollout_length = length;
        self
    }

    /// Builder pattern: set the rollout strategy.
    pub fn with_rollout_type(mut self, kind: StrategyKind) -> Self {
        self.rollout_type = kind;
        self
    }

    /// Builder pattern: set the opponent model.
    pub fn with_opponent_model(mut self, kind: StrategyKind) -> Self {
        self.opponent_model = kind;
        self
    }

    /// Builder pattern: enable MAST collection with decay `gamma`.
    pub fn with_mast(mut self, mast: MastType, gamma: f64) -> Self {
        self.mast = mast;
        self.mast_gamma = gamma;
        self
    }

    /// Builder pattern: enable or disable tree reuse.
    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse_tree = reuse;
        self
    }

    /// Builder pattern: set the maximum tree depth.
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth;
        self
    }

    /// Builder pattern: enable progressive widening.
    pub fn with_progressive_widening(mut self, constant: f64, exponent: f64) -> Self {
        self.progressive_widening_constant = constant;
        self.progressive_widening_exponent = exponent;
        self
    }

    /// Builder pattern: set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Final selection policy with `Tree` resolved for deterministic tree
    /// policies.
    pub fn effective_selection_policy(&self) -> SelectionPolicy {
        match self.selection_policy {
            SelectionPolicy::Tree if !self.tree_policy.is_stochastic() => SelectionPolicy::Simple,
            policy => policy,
        }
    }

    /// Horizon of a rollout for a game with `n_players` seats.
    pub fn effective_rollout_length(&self, n_players: usize) -> usize {
        if self.rollout_length_per_player {
            self.rollout_length * n_players.max(1)
        } else {
            self.rollout_length
        }
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.k.is_finite() || self.k < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "k",
                reason: format!("must be a non-negative number, got {}", self.k),
            });
        }
        if !(0.0..=1.0).contains(&self.mast_gamma) {
            return Err(ConfigError::InvalidValue {
                field: "mast_gamma",
                reason: format!("must be within [0, 1], got {}", self.mast_gamma),
            });
        }
        for (field, value) in [
            ("exp3_boltzmann", self.exp3_boltzmann),
            ("hedge_boltzmann", self.hedge_boltzmann),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be a positive temperature, got {}", value),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.explore_epsilon) {
            return Err(ConfigError::InvalidValue {
                field: "explore_epsilon",
                reason: format!("must be within [0, 1], got {}", self.explore_epsilon),
            });
        }
        if self.max_tree_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tree_depth",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_backup_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_backup_threshold",
                reason: "must be at least 1".into(),
            });
        }
        if self.rollout_type == StrategyKind::Default {
            return Err(ConfigError::InvalidValue {
                field: "rollout_type",
                reason: "default is only meaningful for the opponent model".into(),
            });
        }
        if !self.mast.is_enabled() {
            if self.rollout_type == StrategyKind::Mast {
                return Err(ConfigError::MastNotCollected("rollout_type"));
            }
            if self.opponent_model == StrategyKind::Mast {
                return Err(ConfigError::MastNotCollected("opponent_model"));
            }
            if self.mast_as_action_heuristic {
                return Err(ConfigError::MastNotCollected("mast_as_action_heuristic"));
            }
        }
        if self.information == Information::ClosedLoop && self.discard_state_after_each_iteration
        {
            return Err(ConfigError::ClosedLoopDiscard);
        }
        Ok(())
    }
}

impl TryFrom<&SearchSettings> for MctsConfig {
    type Error = ConfigError;

    fn try_from(s: &SearchSettings) -> Result<Self, Self::Error> {
        let config = Self {
            budget: Budget::new(s.budget_type.parse()?, s.budget),
            break_ms: s.break_ms,
            k: s.k,
            tree_policy: s.tree_policy.parse()?,
            selection_policy: s.selection_policy.parse()?,
            topology: s.topology.parse()?,
            information: s.information.parse()?,
            discard_state_after_each_iteration: s.discard_state_after_each_iteration,
            maintain_master_state: s.maintain_master_state,
            rollout_length: s.rollout_length,
            rollout_length_per_player: s.rollout_length_per_player,
            rollout_termination: s.rollout_termination.parse()?,
            max_tree_depth: s.max_tree_depth,
            rollout_type: s.rollout_type.parse()?,
            opponent_model: s.opponent_model.parse()?,
            mast: s.mast.parse()?,
            mast_gamma: s.mast_gamma,
            mast_boltzmann: s.mast_boltzmann,
            mast_default_value: s.mast_default_value,
            explore_epsilon: s.explore_epsilon,
            mast_as_action_heuristic: s.mast_as_action_heuristic,
            first_play_urgency: s.first_play_urgency,
            normalise_rewards: s.normalise_rewards,
            paranoid: s.paranoid,
            puct_temperature: s.puct_temperature,
            exp3_boltzmann: s.exp3_boltzmann,
            hedge_boltzmann: s.hedge_boltzmann,
            initialise_visits: s.initialise_visits,
            action_heuristic_recalculation_threshold: s.action_heuristic_recalculation_threshold,
            progressive_widening_constant: s.progressive_widening_constant,
            progressive_widening_exponent: s.progressive_widening_exponent,
            progressive_bias: s.progressive_bias,
            oma_visits: s.oma_visits,
            mcgs_expand_after_clash: s.mcgs_expand_after_clash,
            reuse_tree: s.reuse_tree,
            max_backup_threshold: s.max_backup_threshold,
            action_space: parse_action_space(&s.action_space)?,
            seed: s.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.budget, Budget::iterations(1000));
        assert!((config.k - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(config.rollout_length, 10);
        assert_eq!(config.max_tree_depth, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::default()
            .with_budget(Budget::time_ms(50))
            .with_topology(TreeTopology::MultiTree)
            .with_k(0.5);

        assert_eq!(config.budget.kind, BudgetType::Time);
        assert_eq!(config.topology, TreeTopology::MultiTree);
        assert!((config.k - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mast_rollout_requires_collection() {
        let config = MctsConfig::default().with_rollout_type(StrategyKind::Mast);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MastNotCollected("rollout_type"))
        );

        let config = config.with_mast(MastType::Rollout, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mast_action_heuristic_requires_collection() {
        let config = MctsConfig {
            mast_as_action_heuristic: true,
            ..MctsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MastNotCollected(_))
        ));
    }

    #[test]
    fn test_closed_loop_with_discard_is_rejected() {
        let config = MctsConfig {
            information: Information::ClosedLoop,
            discard_state_after_each_iteration: true,
            ..MctsConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ClosedLoopDiscard));

        // the builder switches discarding off
        let config = MctsConfig::default().with_information(Information::ClosedLoop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_budget_kind() {
        assert_eq!(
            "fortnights".parse::<BudgetType>(),
            Err(ConfigError::UnknownBudget("fortnights".into()))
        );
        assert_eq!(
            "FM_AND_COPY_CALLS".parse::<BudgetType>(),
            Ok(BudgetType::FmAndCopyCalls)
        );
    }

    #[test]
    fn test_enum_names_roundtrip() {
        for topology in [
            TreeTopology::OneTree,
            TreeTopology::SelfOnly,
            TreeTopology::MultiTree,
            TreeTopology::Mcgs,
            TreeTopology::McgsSelfOnly,
            TreeTopology::Oma,
            TreeTopology::OmaAll,
        ] {
            assert_eq!(topology.to_string().parse::<TreeTopology>(), Ok(topology));
        }
        assert!(matches!(
            "two_trees".parse::<TreeTopology>(),
            Err(ConfigError::UnknownVariant {
                field: "topology",
                ..
            })
        ));
    }

    #[test]
    fn test_try_from_settings() {
        let settings = SearchSettings {
            topology: "mcgs".into(),
            budget_type: "fm_calls".into(),
            budget: 5000,
            ..SearchSettings::default()
        };
        let config = MctsConfig::try_from(&settings).unwrap();
        assert_eq!(config.topology, TreeTopology::Mcgs);
        assert_eq!(config.budget, Budget::forward_model_calls(5000));
    }

    #[test]
    fn test_try_from_settings_carries_seed_and_bandit_options() {
        let settings = SearchSettings {
            seed: 1234,
            tree_policy: "hedge".into(),
            selection_policy: "tree".into(),
            hedge_boltzmann: 20.0,
            initialise_visits: 3,
            action_heuristic_recalculation_threshold: 5,
            ..SearchSettings::default()
        };
        let config = MctsConfig::try_from(&settings).unwrap();
        assert_eq!(config.seed, 1234);
        assert_eq!(config.tree_policy, TreePolicy::Hedge);
        assert_eq!(config.selection_policy, SelectionPolicy::Tree);
        assert_eq!(config.hedge_boltzmann, 20.0);
        assert_eq!(config.initialise_visits, 3);
        assert_eq!(config.action_heuristic_recalculation_threshold, 5);
    }

    #[test]
    fn test_tree_selection_resolves_for_deterministic_policies() {
        let config = MctsConfig::default().with_selection_policy(SelectionPolicy::Tree);
        assert_eq!(config.effective_selection_policy(), SelectionPolicy::Simple);
        let config = config.with_tree_policy(TreePolicy::Exp3);
        assert_eq!(config.effective_selection_policy(), SelectionPolicy::Tree);
        let config = config.with_selection_policy(SelectionPolicy::Robust);
        assert_eq!(config.effective_selection_policy(), SelectionPolicy::Robust);
    }

    #[test]
    fn test_bandit_temperatures_must_be_positive() {
        let config = MctsConfig {
            exp3_boltzmann: 0.0,
            ..MctsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "exp3_boltzmann",
                ..
            })
        ));
    }

    #[test]
    fn test_try_from_settings_rejects_unknown_budget() {
        let settings = SearchSettings {
            budget_type: "heartbeats".into(),
            ..SearchSettings::default()
        };
        assert_eq!(
            MctsConfig::try_from(&settings),
            Err(ConfigError::UnknownBudget("heartbeats".into()))
        );
    }

    #[test]
    fn test_effective_rollout_length() {
        let mut config = MctsConfig::default().with_rollout_length(4);
        assert_eq!(config.effective_rollout_length(3), 4);
        config.rollout_length_per_player = true;
        assert_eq!(config.effective_rollout_length(3), 12);
    }
}
