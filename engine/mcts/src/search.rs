//! MCTS search implementation.
//!
//! [`MctsPlayer`] owns everything that survives between decisions: the tree,
//! the MAST table and the random number generator. Each call to
//! [`MctsPlayer::decide`] borrows them into a `SearchContext` and runs
//! iterations until the budget is spent:
//!
//! 1. Selection: descend the tree with the configured tree policy
//! 2. Expansion: add a node for the first action leaving the tree
//! 3. Rollout: play on with the rollout policy and opponent model
//! 4. Backup: add the result to every node on the path, OMA and MAST

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use engine_core::game_utils::sample_uniform;
use engine_core::{Game, PlayerId};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{
    Budget, BudgetType, ConfigError, Information, MctsConfig, RolloutTermination,
    SelectionPolicy, StrategyKind, TreeTopology,
};
use crate::mast::MastTable;
use crate::node::{MctsNode, NodeId};
use crate::policy::{
    ActionHeuristic, ActionPolicy, GameScoreHeuristic, NullActionHeuristic, RolloutStrategy,
    StateHeuristic,
};
use crate::reuse;
use crate::selection::Selector;
use crate::stats::{ActionStats, ValueBounds};
use crate::tree::SearchTree;

/// Errors that can occur during MCTS search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tree is corrupted; the player drops it before reporting this
    #[error("Search invariant violated: {0}")]
    InvariantViolation(String),

    #[error("No legal actions available")]
    NoLegalActions,
}

/// Statistics from one search, for logging and tuning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Completed select-expand-rollout-backup cycles
    pub iterations: u64,
    /// Calls to `Game::apply`
    pub fm_calls: u64,
    /// State copies and redeterminizations
    pub copy_calls: u64,
    pub elapsed: Duration,
    /// Nodes in the arena when the search finished
    pub tree_size: usize,
    pub max_depth: u32,
    /// Whether the search started from the previous decision's tree
    pub reused: bool,
}

/// What the search learned about one root action.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionStat {
    pub visits: u32,
    /// Share of all root action visits
    pub visit_proportion: f64,
    /// Mean backed-up value for the deciding player
    pub mean_value: f64,
    /// State heuristic of the decision state for the deciding player; the
    /// same for every action
    pub heuristic_value: f64,
    /// Action heuristic (or MAST) value in the decision state
    pub action_prior_value: f64,
}

/// Builder wiring external policies into an [`MctsPlayer`].
pub struct MctsPlayerBuilder<G: Game> {
    config: MctsConfig,
    rollout_policy: Option<Box<dyn ActionPolicy<G>>>,
    opponent_policy: Option<Box<dyn ActionPolicy<G>>>,
    heuristic: Option<Box<dyn StateHeuristic<G>>>,
    action_heuristic: Option<Box<dyn ActionHeuristic<G>>>,
}

impl<G: Game> MctsPlayerBuilder<G> {
    /// Policy used when `rollout_type` is `policy`.
    pub fn rollout_policy(mut self, policy: impl ActionPolicy<G> + 'static) -> Self {
        self.rollout_policy = Some(Box::new(policy));
        self
    }

    /// Policy used when `opponent_model` is `policy`.
    pub fn opponent_policy(mut self, policy: impl ActionPolicy<G> + 'static) -> Self {
        self.opponent_policy = Some(Box::new(policy));
        self
    }

    /// State heuristic for cut-off rollouts (default: `Game::heuristic_score`).
    pub fn heuristic(mut self, heuristic: impl StateHeuristic<G> + 'static) -> Self {
        self.heuristic = Some(Box::new(heuristic));
        self
    }

    /// Action heuristic for priors, widening and bias (default: all zero).
    pub fn action_heuristic(mut self, heuristic: impl ActionHeuristic<G> + 'static) -> Self {
        self.action_heuristic = Some(Box::new(heuristic));
        self
    }

    /// Validate the configuration and build the player.
    pub fn build(self) -> Result<MctsPlayer<G>, ConfigError> {
        let config = self.config;
        config.validate()?;
        let rollout = RolloutStrategy::from_kind(
            config.rollout_type,
            &config,
            self.rollout_policy,
            "rollout_type",
        )?;
        let opponent_model = match config.opponent_model {
            StrategyKind::Default => None,
            kind => Some(RolloutStrategy::from_kind(
                kind,
                &config,
                self.opponent_policy,
                "opponent_model",
            )?),
        };
        let rng = ChaCha20Rng::seed_from_u64(config.seed);
        Ok(MctsPlayer {
            rollout,
            opponent_model,
            heuristic: self
                .heuristic
                .unwrap_or_else(|| Box::new(GameScoreHeuristic)),
            action_heuristic: self
                .action_heuristic
                .unwrap_or_else(|| Box::new(NullActionHeuristic)),
            rng,
            tree: None,
            mast: None,
            last_action: None,
            last_state: None,
            graph_visits: HashMap::new(),
            last_stats: None,
            config,
        })
    }
}

/// A budgeted MCTS decision maker for one seat of a game.
pub struct MctsPlayer<G: Game> {
    config: MctsConfig,
    rollout: RolloutStrategy<G>,
    opponent_model: Option<RolloutStrategy<G>>,
    heuristic: Box<dyn StateHeuristic<G>>,
    action_heuristic: Box<dyn ActionHeuristic<G>>,
    rng: ChaCha20Rng,
    tree: Option<SearchTree<G::State, G::Action>>,
    mast: Option<MastTable<G::Action>>,
    /// Action chosen by the previous decision
    last_action: Option<G::Action>,
    /// State of the previous decision
    last_state: Option<G::State>,
    /// Transposition visit counts when the previous search started
    graph_visits: HashMap<u64, u32>,
    last_stats: Option<SearchStats>,
}

impl<G: Game> MctsPlayer<G> {
    /// Player with the default policies.
    pub fn new(config: MctsConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: MctsConfig) -> MctsPlayerBuilder<G> {
        MctsPlayerBuilder {
            config,
            rollout_policy: None,
            opponent_policy: None,
            heuristic: None,
            action_heuristic: None,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Tree left by the last decision, if any.
    pub fn tree(&self) -> Option<&SearchTree<G::State, G::Action>> {
        self.tree.as_ref()
    }

    pub fn mast(&self) -> Option<&MastTable<G::Action>> {
        self.mast.as_ref()
    }

    pub fn last_stats(&self) -> Option<&SearchStats> {
        self.last_stats.as_ref()
    }

    /// Forget everything learned so far, e.g. before a new game.
    pub fn reset(&mut self) {
        self.tree = None;
        self.mast = None;
        self.last_action = None;
        self.last_state = None;
        self.graph_visits.clear();
        self.last_stats = None;
    }

    /// Choose an action among `legal_actions` in `state` within `budget`.
    ///
    /// Invariant violations discard the tree before being returned, so the
    /// next decision starts from scratch.
    pub fn decide(
        &mut self,
        game: &G,
        state: &G::State,
        legal_actions: &[G::Action],
        budget: Budget,
    ) -> Result<G::Action, SearchError> {
        if legal_actions.is_empty() {
            return Err(SearchError::NoLegalActions);
        }
        self.search(game, state, legal_actions, budget)
            .map_err(|e| {
                if let SearchError::InvariantViolation(reason) = &e {
                    warn!(%reason, "discarding corrupted search tree");
                    self.tree = None;
                    self.last_action = None;
                    self.graph_visits.clear();
                }
                e
            })
    }

    fn search(
        &mut self,
        game: &G,
        state: &G::State,
        legal: &[G::Action],
        budget: Budget,
    ) -> Result<G::Action, SearchError> {
        let start = Instant::now();
        let root_player = game.current_player(state);
        let n_players = game.n_players(state);

        let reused = self.prepare_tree(game, state, root_player, n_players)?;
        self.prepare_mast(n_players);
        let config = &self.config;

        let determinization = match config.information {
            Information::ClosedLoop => {
                Some(game.redeterminize(state, root_player, &mut self.rng))
            }
            Information::InformationSet => None,
        };
        let Some(tree) = self.tree.as_mut() else {
            return Err(SearchError::InvariantViolation("no search tree".into()));
        };
        if config.information == Information::ClosedLoop && reused {
            // states stored under the old determinization no longer apply
            tree.clear_states();
        }
        let root = tree.root();
        let root_state = if config.maintain_master_state {
            Some(state.clone())
        } else {
            determinization.clone()
        };
        let snapshot = match &self.mast {
            Some(mast) if self.rollout.uses_mast()
                || self.opponent_model.as_ref().is_some_and(|m| m.uses_mast()) =>
            {
                Some(mast.clone())
            }
            _ => None,
        };
        {
            let node = tree.get_mut(root);
            node.state = root_state;
            node.mast_snapshot = snapshot;
        }
        if config.topology.is_graph() {
            self.graph_visits = tree.transposition_visits();
        }

        let mut ctx = SearchContext {
            game,
            config,
            rollout: &self.rollout,
            opponent_model: self.opponent_model.as_ref(),
            heuristic: self.heuristic.as_ref(),
            action_heuristic: self.action_heuristic.as_ref(),
            tree,
            mast: self.mast.as_mut(),
            rng: &mut self.rng,
            root_state: state,
            determinization,
            legal,
            root_player,
            n_players,
            bounds: ValueBounds::default(),
            fm_calls: 0,
            copy_calls: 0,
        };

        let mut iterations = 0u64;
        if budget.amount > 0 {
            loop {
                ctx.iterate();
                iterations += 1;
                trace!(
                    iteration = iterations,
                    fm_calls = ctx.fm_calls,
                    copy_calls = ctx.copy_calls,
                    "MCTS iteration complete"
                );
                if !has_budget(&budget, iterations, &ctx, start.elapsed(), config.break_ms) {
                    break;
                }
            }
        }

        let (fm_calls, copy_calls, bounds) = (ctx.fm_calls, ctx.copy_calls, ctx.bounds);
        let Some(tree) = self.tree.as_ref() else {
            return Err(SearchError::InvariantViolation("no search tree".into()));
        };
        let root_node = tree.get(root);
        if !reused && root_node.action_stats.len() > legal.len() {
            return Err(SearchError::InvariantViolation(format!(
                "root holds statistics for {} actions but only {} are legal",
                root_node.action_stats.len(),
                legal.len()
            )));
        }
        if config.topology.has_exact_child_visits() {
            if let Err(node) = tree.check_visit_invariant(root, config.max_backup_threshold) {
                return Err(SearchError::InvariantViolation(format!(
                    "node {} does not have one more visit than its children",
                    node.0
                )));
            }
        }

        let chosen = match config.effective_selection_policy() {
            SelectionPolicy::Tree => {
                let selector = Selector {
                    config,
                    bounds: &bounds,
                    root_player,
                    action_heuristic: self.action_heuristic.as_ref(),
                    mast: self.mast.as_ref(),
                };
                selector.sample_decision(root_node, legal, &mut self.rng)
            }
            policy => tree.best_action(root, legal, policy, &mut self.rng),
        };
        let action = chosen
            .or_else(|| sample_uniform(legal, &mut self.rng).cloned())
            .ok_or(SearchError::NoLegalActions)?;

        let tree_stats = tree.stats();
        let stats = SearchStats {
            iterations,
            fm_calls,
            copy_calls,
            elapsed: start.elapsed(),
            tree_size: tree_stats.total_nodes,
            max_depth: tree_stats.max_depth,
            reused,
        };
        debug!(
            iterations = stats.iterations,
            fm_calls = stats.fm_calls,
            copy_calls = stats.copy_calls,
            tree_size = stats.tree_size,
            max_depth = stats.max_depth,
            root_visits = tree_stats.root_visits,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search complete"
        );

        self.last_stats = Some(stats);
        self.last_action = Some(action.clone());
        self.last_state = Some(state.clone());
        Ok(action)
    }

    /// Relocate the previous tree or start a new one. Returns whether the
    /// old tree was reused.
    fn prepare_tree(
        &mut self,
        game: &G,
        state: &G::State,
        root_player: PlayerId,
        n_players: usize,
    ) -> Result<bool, SearchError> {
        let topology = self.config.topology;
        if self.config.reuse_tree {
            if let (Some(tree), Some(last)) = (self.tree.as_mut(), self.last_action.as_ref()) {
                match reuse::relocate(tree, game, state, topology, last, &self.graph_visits)? {
                    Some(freed) => {
                        debug!(
                            freed,
                            kept = tree.len(),
                            root_visits = tree.get(tree.root()).visit_count,
                            "reusing search tree"
                        );
                        return Ok(true);
                    }
                    None => debug!("previous tree does not contain this state"),
                }
            }
        }

        let mut tree = SearchTree::new(root_player, n_players);
        let root = tree.allocate(MctsNode::new_root(root_player, root_player, n_players));
        tree.set_player_root(root_player, root);
        if topology.is_graph() {
            let key = game.state_key(state);
            tree.get_mut(root).key = Some(key);
            tree.insert_transposition(key, root);
        }
        self.tree = Some(tree);
        self.graph_visits.clear();
        Ok(false)
    }

    /// Decay the MAST table carried over from the last decision, or start one.
    fn prepare_mast(&mut self, n_players: usize) {
        if !self.config.mast.is_enabled() {
            self.mast = None;
            return;
        }
        let gamma = self.config.mast_gamma;
        let default_value = self.config.mast_default_value;
        self.mast = Some(match self.mast.take() {
            Some(mut mast) if gamma > 0.0 => {
                mast.decay(gamma);
                mast
            }
            _ => MastTable::new(n_players, default_value),
        });
    }

    /// Per-action statistics at the root of the last search.
    ///
    /// Empty until a search has visited the root more than once.
    pub fn decision_statistics(&self, game: &G) -> Vec<(G::Action, DecisionStat)> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let Some(root) = tree.try_get(tree.root()) else {
            return Vec::new();
        };
        if root.visit_count <= 1 {
            return Vec::new();
        }
        let state = root.state.as_ref().or(self.last_state.as_ref());
        let legal = state
            .map(|s| game.legal_actions(s, self.config.action_space))
            .unwrap_or_default();
        let player = root.decision_player;
        let total: u32 = root.action_stats.values().map(|s| s.visits).sum();
        let heuristic_value =
            state.map_or(0.0, |s| self.heuristic.evaluate_state(game, s, player));

        let mut out: Vec<(G::Action, DecisionStat)> = root
            .action_stats
            .iter()
            .filter(|(_, stats)| stats.visits > 0)
            .map(|(action, stats)| {
                let action_prior_value = match state {
                    Some(state) if legal.contains(action) => {
                        self.action_value(game, state, root.turn_owner, action)
                    }
                    _ => 0.0,
                };
                let stat = DecisionStat {
                    visits: stats.visits,
                    visit_proportion: stats.visits as f64 / total.max(1) as f64,
                    mean_value: stats.mean(player),
                    heuristic_value,
                    action_prior_value,
                };
                (action.clone(), stat)
            })
            .collect();
        out.sort_by(|a, b| b.1.visits.cmp(&a.1.visits));
        out
    }

    fn action_value(&self, game: &G, state: &G::State, player: PlayerId, action: &G::Action) -> f64 {
        match &self.mast {
            Some(mast) if self.config.mast_as_action_heuristic => mast.value(player, action),
            _ => self.action_heuristic.evaluate_action(game, action, state),
        }
    }
}

/// Whether another iteration fits in `budget`.
fn has_budget<G: Game>(
    budget: &Budget,
    iterations: u64,
    ctx: &SearchContext<'_, G>,
    elapsed: Duration,
    break_ms: u64,
) -> bool {
    let amount = budget.amount;
    match budget.kind {
        BudgetType::Time => (elapsed.as_millis() as u64).saturating_add(break_ms) < amount,
        BudgetType::Iterations => iterations < amount,
        BudgetType::ForwardModelCalls => ctx.fm_calls < amount,
        // games that never copy would otherwise run forever
        BudgetType::CopyCalls => ctx.copy_calls < amount && iterations < amount,
        BudgetType::FmAndCopyCalls => ctx.fm_calls + ctx.copy_calls < amount,
    }
}

/// One step of a simulated path: the node and the action taken there.
#[derive(Debug, Clone)]
struct PathStep<A> {
    node: NodeId,
    /// None for the node the path ended on
    action: Option<A>,
    /// Node holding the OMA statistics for `action`
    anchor: NodeId,
}

impl<A> PathStep<A> {
    fn last(node: NodeId) -> Self {
        Self {
            node,
            action: None,
            anchor: NodeId::NONE,
        }
    }
}

/// An `(actor, action, chosen in the tree)` triple of a simulation.
type Trajectory<A> = Vec<(PlayerId, A, bool)>;

/// Everything one search borrows from the player, plus per-search tables.
struct SearchContext<'a, G: Game> {
    game: &'a G,
    config: &'a MctsConfig,
    rollout: &'a RolloutStrategy<G>,
    opponent_model: Option<&'a RolloutStrategy<G>>,
    heuristic: &'a dyn StateHeuristic<G>,
    action_heuristic: &'a dyn ActionHeuristic<G>,
    tree: &'a mut SearchTree<G::State, G::Action>,
    mast: Option<&'a mut MastTable<G::Action>>,
    rng: &'a mut ChaCha20Rng,
    /// Undeterminized decision state
    root_state: &'a G::State,
    /// The one determinization of a closed-loop search
    determinization: Option<G::State>,
    /// Legal actions at the root, as given by the caller
    legal: &'a [G::Action],
    root_player: PlayerId,
    n_players: usize,
    bounds: ValueBounds,
    fm_calls: u64,
    copy_calls: u64,
}

impl<'a, G: Game> SearchContext<'a, G> {
    fn iterate(&mut self) {
        if self.config.topology == TreeTopology::MultiTree {
            self.iterate_multi_tree();
        } else {
            self.iterate_single_tree();
        }
    }

    /// Starting state of an iteration.
    fn start_state(&mut self) -> G::State {
        self.copy_calls += 1;
        match &self.determinization {
            Some(state) => state.clone(),
            None => self
                .game
                .redeterminize(self.root_state, self.root_player, self.rng),
        }
    }

    /// Node states outlive the iteration that created them.
    fn keeps_states(&self) -> bool {
        self.config.information == Information::ClosedLoop
            || !self.config.discard_state_after_each_iteration
    }

    fn legal_actions(&self, node: NodeId, state: &G::State, root_step: bool) -> Vec<G::Action> {
        if root_step && node == self.tree.root() {
            self.legal.to_vec()
        } else {
            self.game.legal_actions(state, self.config.action_space)
        }
    }

    fn apply(&mut self, state: &mut G::State, action: &G::Action) {
        self.game.apply(state, action, self.rng);
        self.fm_calls += 1;
    }

    fn selector(&self) -> Selector<'_, G> {
        Selector {
            config: self.config,
            bounds: &self.bounds,
            root_player: self.root_player,
            action_heuristic: self.action_heuristic,
            mast: self.mast.as_deref(),
        }
    }

    /// Note that `actions` are available at `node`. Actions seen there for
    /// the first time are credited `initialise_visits` heuristic visits.
    fn offer_actions(&mut self, node: NodeId, state: &G::State, actions: &[G::Action]) {
        let seeds = self.config.initialise_visits;
        let fresh: Vec<(G::Action, f64)> = if seeds > 0 {
            let selector = self.selector();
            let n = self.tree.get(node);
            actions
                .iter()
                .filter(|a| !n.action_stats.contains_key(*a))
                .map(|a| (a.clone(), selector.action_value(self.game, state, n, a)))
                .collect()
        } else {
            Vec::new()
        };
        let n_players = self.n_players;
        let node = self.tree.get_mut(node);
        node.offer_actions(actions, n_players);
        for (action, value) in &fresh {
            node.seed_action(action, *value, seeds, n_players);
        }
    }

    /// Action heuristic values of `actions` at `node`, refreshed once the
    /// node has gained enough visits since they were last computed.
    fn heuristic_values(
        &mut self,
        node: NodeId,
        state: &G::State,
        actions: &[G::Action],
    ) -> Vec<f64> {
        if !self.selector().needs_heuristic() {
            return Vec::new();
        }
        let threshold = self.config.action_heuristic_recalculation_threshold;
        if let Some(values) = self.tree.get(node).cached_heuristic(actions, threshold) {
            return values;
        }
        let values: Vec<f64> = {
            let selector = self.selector();
            let n = self.tree.get(node);
            actions
                .iter()
                .map(|a| selector.action_value(self.game, state, n, a))
                .collect()
        };
        self.tree.get_mut(node).cache_heuristic(actions, &values);
        values
    }

    fn select(
        &mut self,
        node: NodeId,
        anchor: NodeId,
        state: &G::State,
        actions: &[G::Action],
    ) -> Option<G::Action> {
        let heuristic = self.heuristic_values(node, state, actions);
        let selector = Selector {
            config: self.config,
            bounds: &self.bounds,
            root_player: self.root_player,
            action_heuristic: self.action_heuristic,
            mast: self.mast.as_deref(),
        };
        let oma = self.tree.try_get(anchor).map(|n| &n.oma);
        selector.select(self.tree.get(node), oma, actions, &heuristic, self.rng)
    }

    /// Out-of-tree choice for `player`: the opponent model for everyone but
    /// the root player when one is configured, the rollout policy otherwise.
    ///
    /// MAST strategies read the root's snapshot, so values learned during
    /// this search do not steer its own rollouts.
    fn rollout_action(
        &mut self,
        state: &G::State,
        actions: &[G::Action],
        player: PlayerId,
    ) -> Option<G::Action> {
        let strategy = match self.opponent_model {
            Some(model) if player != self.root_player => model,
            _ => self.rollout,
        };
        let snapshot = self
            .tree
            .try_get(self.tree.root())
            .and_then(|root| root.mast_snapshot.as_ref());
        strategy.select(self.game, state, actions, player, snapshot, self.rng)
    }

    /// Node whose OMA table holds the statistics for actions at `node`.
    fn oma_anchor(&self, path: &[PathStep<G::Action>], node: NodeId) -> NodeId {
        let player = self.tree.get(node).decision_player;
        let wanted = match self.config.topology {
            TreeTopology::Oma if player != self.root_player => self.root_player,
            TreeTopology::OmaAll => player,
            _ => return NodeId::NONE,
        };
        path.iter()
            .rev()
            .find(|step| self.tree.get(step.node).decision_player == wanted)
            .map_or(NodeId::NONE, |step| step.node)
    }

    /// Closed-loop successor stored under `action`, if any.
    fn stored_successor(&mut self, node: NodeId, action: &G::Action) -> Option<G::State> {
        // self-only transitions include sampled opponent moves
        if self.determinization.is_none() || self.config.topology.is_self_only() {
            return None;
        }
        let slots = self.tree.get(node).children.get(action)?;
        let state = slots
            .iter()
            .filter_map(|&id| self.tree.try_get(id))
            .find_map(|child| child.state.as_ref())?
            .clone();
        self.copy_calls += 1;
        Some(state)
    }

    /// Let opponents move until it is the root player's turn again.
    fn play_opponents(&mut self, state: &mut G::State, trajectory: &mut Trajectory<G::Action>) {
        while !self.game.is_terminal(state) {
            let player = self.game.current_player(state);
            if player == self.root_player {
                break;
            }
            let actions = self.game.legal_actions(state, self.config.action_space);
            let Some(action) = self.rollout_action(state, &actions, player) else {
                break;
            };
            self.apply(state, &action);
            trajectory.push((player, action, false));
        }
    }

    /// Create the node reached from `parent` by `action`.
    fn expand(
        &mut self,
        parent: NodeId,
        action: G::Action,
        next_player: PlayerId,
        state: &G::State,
        key: Option<u64>,
    ) -> NodeId {
        let topology = self.config.topology;
        let turn_owner = self.game.current_player(state);
        let decision_player = if topology.is_self_only() {
            self.root_player
        } else {
            turn_owner
        };
        // graph nodes can have many parents
        let parent_link = if topology.is_graph() {
            NodeId::NONE
        } else {
            parent
        };
        let mut node = MctsNode::new_child(
            parent_link,
            action.clone(),
            decision_player,
            turn_owner,
            self.n_players,
        );
        node.key = key;
        if self.keeps_states() {
            node.state = Some(state.clone());
            self.copy_calls += 1;
        }
        let id = self.tree.add_child(parent, action, next_player, node);
        if let Some(key) = key {
            self.tree.insert_transposition(key, id);
        }
        id
    }

    /// One iteration over a single tree or graph.
    fn iterate_single_tree(&mut self) {
        let game = self.game;
        let config = self.config;
        let topology = config.topology;
        let root = self.tree.root();

        let mut state = self.start_state();
        let mut path: Vec<PathStep<G::Action>> = Vec::new();
        let mut trajectory: Trajectory<G::Action> = Vec::new();
        let mut on_path = HashSet::new();
        let mut node_id = root;
        let mut depth = 0;
        let mut clashed = false;

        loop {
            on_path.insert(node_id);
            if game.is_terminal(&state) {
                self.tree.get_mut(node_id).is_terminal = true;
                break;
            }
            if self.tree.get(node_id).is_leaf() || depth >= config.max_tree_depth {
                break;
            }
            let actions = self.legal_actions(node_id, &state, depth == 0);
            if actions.is_empty() {
                break;
            }
            self.offer_actions(node_id, &state, &actions);
            let anchor = self.oma_anchor(&path, node_id);
            let Some(action) = self.select(node_id, anchor, &state, &actions) else {
                break;
            };

            trajectory.push((game.current_player(&state), action.clone(), true));
            path.push(PathStep {
                node: node_id,
                action: Some(action.clone()),
                anchor,
            });
            depth += 1;

            match self.stored_successor(node_id, &action) {
                Some(next) => state = next,
                None => {
                    self.apply(&mut state, &action);
                    if topology.is_self_only() {
                        self.play_opponents(&mut state, &mut trajectory);
                    }
                }
            }
            let next_player = if topology.is_self_only() {
                self.root_player
            } else {
                game.current_player(&state)
            };

            if topology.is_graph() {
                let key = game.state_key(&state);
                match self.tree.transposition(key).filter(|&id| self.tree.contains(id)) {
                    Some(existing) if on_path.contains(&existing) => {
                        if !config.mcgs_expand_after_clash {
                            clashed = true;
                            break;
                        }
                        // the cycle gets a node of its own, outside the table
                        node_id = self.expand(node_id, action, next_player, &state, None);
                    }
                    Some(existing) => {
                        self.tree
                            .get_mut(node_id)
                            .set_child(action, next_player, existing);
                        node_id = existing;
                    }
                    None => {
                        node_id = self.expand(node_id, action, next_player, &state, Some(key));
                    }
                }
            } else {
                let child = self.tree.get(node_id).child(&action, next_player);
                node_id = if self.tree.contains(child) {
                    child
                } else {
                    self.expand(node_id, action, next_player, &state, None)
                };
            }
        }

        if !clashed {
            path.push(PathStep::last(node_id));
            self.rollout(&mut state, &mut trajectory);
        }
        let values = self.evaluate(&state);
        self.backup(&path, &values);
        self.update_mast(&trajectory, &values);
    }

    /// One iteration advancing every player's tree in lockstep.
    fn iterate_multi_tree(&mut self) {
        let game = self.game;
        let config = self.config;
        let n = self.n_players;
        let rollout_length = config.effective_rollout_length(n);

        let mut state = self.start_state();
        let mut cursors: Vec<NodeId> = (0..n).map(|p| self.tree.player_root(p)).collect();
        let mut in_tree = vec![true; n];
        let mut depth = vec![0usize; n];
        let mut paths: Vec<Vec<PathStep<G::Action>>> = vec![Vec::new(); n];
        // action each player last chose in their tree, child not yet known
        let mut pending: Vec<Option<(NodeId, G::Action)>> = vec![None; n];
        let mut trajectory: Trajectory<G::Action> = Vec::new();
        let mut rollout_steps = 0;
        let mut first_step = true;

        while !game.is_terminal(&state) {
            let player = game.current_player(&state);
            if player >= n {
                break;
            }
            if let Some((parent, action)) = pending[player].take() {
                cursors[player] = self.multi_tree_child(parent, action, player);
            }
            if in_tree[player] {
                if !self.tree.contains(cursors[player]) {
                    let root = self.tree.allocate(MctsNode::new_root(player, player, n));
                    self.tree.set_player_root(player, root);
                    cursors[player] = root;
                }
                let node = cursors[player];
                if self.tree.get(node).is_leaf() || depth[player] >= config.max_tree_depth {
                    in_tree[player] = false;
                    paths[player].push(PathStep::last(node));
                }
            }

            let action = if in_tree[player] {
                let node = cursors[player];
                let actions = self.legal_actions(node, &state, first_step);
                if actions.is_empty() {
                    paths[player].push(PathStep::last(node));
                    break;
                }
                self.offer_actions(node, &state, &actions);
                let Some(action) = self.select(node, NodeId::NONE, &state, &actions) else {
                    break;
                };
                paths[player].push(PathStep {
                    node,
                    action: Some(action.clone()),
                    anchor: NodeId::NONE,
                });
                pending[player] = Some((node, action.clone()));
                depth[player] += 1;
                trajectory.push((player, action.clone(), true));
                action
            } else {
                if !in_tree[self.root_player] {
                    if rollout_steps >= rollout_length && self.rollout_finished(player) {
                        break;
                    }
                    rollout_steps += 1;
                }
                let actions = game.legal_actions(&state, config.action_space);
                let Some(action) = self.rollout_action(&state, &actions, player) else {
                    break;
                };
                trajectory.push((player, action.clone(), false));
                action
            };
            first_step = false;
            self.apply(&mut state, &action);
        }

        // actions whose outcome the player never got to see still count
        for player in 0..n {
            if let Some((parent, action)) = pending[player].take() {
                let child = self.multi_tree_child(parent, action, player);
                paths[player].push(PathStep::last(child));
            }
        }

        let values = self.evaluate(&state);
        for path in &paths {
            self.backup(path, &values);
        }
        self.update_mast(&trajectory, &values);
    }

    /// Child of `parent` for `player`'s next decision after `action`.
    fn multi_tree_child(&mut self, parent: NodeId, action: G::Action, player: PlayerId) -> NodeId {
        let child = self.tree.get(parent).child(&action, player);
        if self.tree.contains(child) {
            return child;
        }
        let node = MctsNode::new_child(parent, action.clone(), player, player, self.n_players);
        self.tree.add_child(parent, action, player, node)
    }

    fn rollout_finished(&self, player: PlayerId) -> bool {
        match self.config.rollout_termination {
            RolloutTermination::Default => true,
            RolloutTermination::EndTurn => player != self.root_player,
            RolloutTermination::StartTurn => player == self.root_player,
        }
    }

    fn rollout(&mut self, state: &mut G::State, trajectory: &mut Trajectory<G::Action>) {
        let length = self.config.effective_rollout_length(self.n_players);
        let mut steps = 0;
        while !self.game.is_terminal(state) {
            let player = self.game.current_player(state);
            if steps >= length && self.rollout_finished(player) {
                break;
            }
            let actions = self.game.legal_actions(state, self.config.action_space);
            let Some(action) = self.rollout_action(state, &actions, player) else {
                break;
            };
            self.apply(state, &action);
            trajectory.push((player, action, false));
            steps += 1;
        }
    }

    /// Value of `state` for every player.
    fn evaluate(&mut self, state: &G::State) -> Vec<f64> {
        let terminal = self.game.is_terminal(state);
        let values: Vec<f64> = (0..self.n_players)
            .map(|p| {
                if terminal {
                    self.game.result(state, p)
                } else {
                    self.heuristic.evaluate_state(self.game, state, p)
                }
            })
            .collect();
        for &v in &values {
            self.bounds.observe(v);
        }
        values
    }

    fn backup(&mut self, path: &[PathStep<G::Action>], values: &[f64]) {
        let threshold = self.config.max_backup_threshold;
        for step in path.iter().rev() {
            self.tree
                .get_mut(step.node)
                .record_visit(values, step.action.as_ref(), threshold);
            if let Some(action) = &step.action {
                if self.tree.contains(step.anchor) {
                    self.tree
                        .get_mut(step.anchor)
                        .oma
                        .entry(action.clone())
                        .or_insert_with(|| ActionStats::new(values.len()))
                        .update(values);
                }
            }
        }
    }

    fn update_mast(&mut self, trajectory: &Trajectory<G::Action>, values: &[f64]) {
        let mode = self.config.mast;
        let Some(mast) = self.mast.as_deref_mut() else {
            return;
        };
        for (actor, action, in_tree) in trajectory {
            if mode.records(*in_tree) {
                mast.update(*actor, action, values.get(*actor).copied().unwrap_or(0.0));
            }
        }
    }
}
