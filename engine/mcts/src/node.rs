//! MCTS tree node representation.
//!
//! Each node is one decision point reached during search. All topologies
//! share this node type; they differ only in how children are looked up and
//! whether nodes are keyed in the transposition table.

use crate::mast::MastTable;
use crate::stats::ActionStats;
use engine_core::PlayerId;
use std::collections::HashMap;
use std::hash::Hash;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the search tree or graph.
#[derive(Debug, Clone)]
pub struct MctsNode<S, A> {
    /// Parent node index (NONE for roots and for graph nodes)
    pub parent: NodeId,

    /// Action taken at the parent to get here
    pub action_to_reach: Option<A>,

    /// Player whose choices these statistics summarize
    pub decision_player: PlayerId,

    /// Player to act in the node's state
    pub turn_owner: PlayerId,

    /// Snapshot of the state; may be dropped between iterations
    pub state: Option<S>,

    /// Number of simulations that passed through this node
    pub visit_count: u32,

    /// Sum of backed-up values, per player
    pub total_value: Vec<f64>,

    /// Statistics per action tried (or offered) here
    pub action_stats: HashMap<A, ActionStats>,

    /// Children per action, indexed by the player who acts next
    pub children: HashMap<A, Vec<NodeId>>,

    /// Opponent-move-averaging statistics anchored at this node
    pub oma: HashMap<A, ActionStats>,

    /// Whether the game was over when this node was last reached
    pub is_terminal: bool,

    /// Transposition key (graph topologies only)
    pub key: Option<u64>,

    /// MAST values when the node became a search root; rollouts read these
    pub mast_snapshot: Option<MastTable<A>>,

    /// Action heuristic values, valid for a while after `heuristic_visits`
    pub heuristic_cache: HashMap<A, f64>,

    /// Visit count when `heuristic_cache` was filled
    pub heuristic_visits: Option<u32>,
}

impl<S, A: Clone + Eq + Hash> MctsNode<S, A> {
    /// Create a new root node.
    pub fn new_root(decision_player: PlayerId, turn_owner: PlayerId, n_players: usize) -> Self {
        Self {
            parent: NodeId::NONE,
            action_to_reach: None,
            decision_player,
            turn_owner,
            state: None,
            visit_count: 0,
            total_value: vec![0.0; n_players],
            action_stats: HashMap::new(),
            children: HashMap::new(),
            oma: HashMap::new(),
            is_terminal: false,
            key: None,
            mast_snapshot: None,
            heuristic_cache: HashMap::new(),
            heuristic_visits: None,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        action: A,
        decision_player: PlayerId,
        turn_owner: PlayerId,
        n_players: usize,
    ) -> Self {
        Self {
            parent,
            action_to_reach: Some(action),
            ..Self::new_root(decision_player, turn_owner, n_players)
        }
    }

    /// Mean value for `player`. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self, player: PlayerId) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.total_value.get(player).copied().unwrap_or(0.0) / self.visit_count as f64
        }
    }

    /// A node that has never been visited is a leaf, whatever it links to.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.visit_count == 0
    }

    /// Child reached by `action` when `next_player` acts next.
    pub fn child(&self, action: &A, next_player: PlayerId) -> NodeId {
        self.children
            .get(action)
            .and_then(|slots| slots.get(next_player))
            .copied()
            .unwrap_or(NodeId::NONE)
    }

    /// Link `child` under `action` for `next_player`.
    pub fn set_child(&mut self, action: A, next_player: PlayerId, child: NodeId) {
        let slots = self.children.entry(action).or_default();
        if slots.len() <= next_player {
            slots.resize(next_player + 1, NodeId::NONE);
        }
        slots[next_player] = child;
    }

    /// Every linked child, in no particular order.
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .values()
            .flat_map(|slots| slots.iter().copied())
            .filter(|id| id.is_some())
    }

    /// Add one visit worth `values`, crediting `action` if one was taken here.
    ///
    /// Nodes at `threshold` visits are left unchanged.
    pub fn record_visit(&mut self, values: &[f64], action: Option<&A>, threshold: u32) {
        if self.visit_count >= threshold {
            return;
        }
        self.visit_count += 1;
        if self.total_value.len() < values.len() {
            self.total_value.resize(values.len(), 0.0);
        }
        for (total, v) in self.total_value.iter_mut().zip(values) {
            *total += v;
        }
        if let Some(action) = action {
            let n = values.len();
            self.action_stats
                .entry(action.clone())
                .or_insert_with(|| ActionStats::new(n))
                .update(values);
        }
    }

    /// Note that each of `actions` was available on this visit.
    pub fn offer_actions(&mut self, actions: &[A], n_players: usize) {
        for action in actions {
            self.action_stats
                .entry(action.clone())
                .or_insert_with(|| ActionStats::new(n_players))
                .valid_visits += 1;
        }
    }

    /// Credit `visits` visits worth `value` to the decision player for
    /// `action`, as if it had been played that often already.
    pub fn seed_action(&mut self, action: &A, value: f64, visits: u32, n_players: usize) {
        let player = self.decision_player;
        let stats = self
            .action_stats
            .entry(action.clone())
            .or_insert_with(|| ActionStats::new(n_players));
        if stats.total_value.len() <= player {
            stats.total_value.resize(player + 1, 0.0);
            stats.square_value.resize(player + 1, 0.0);
        }
        let n = visits as f64;
        stats.visits += visits;
        stats.valid_visits += visits;
        stats.total_value[player] += value * n;
        stats.square_value[player] += value * value * n;
    }

    /// Cached heuristic values of `actions`, unless the node has gained
    /// `threshold` visits since they were computed or one is missing.
    pub fn cached_heuristic(&self, actions: &[A], threshold: u32) -> Option<Vec<f64>> {
        let at = self.heuristic_visits?;
        if self.visit_count >= at.saturating_add(threshold) {
            return None;
        }
        actions
            .iter()
            .map(|a| self.heuristic_cache.get(a).copied())
            .collect()
    }

    /// Remember heuristic `values` of `actions` at the current visit count.
    pub fn cache_heuristic(&mut self, actions: &[A], values: &[f64]) {
        self.heuristic_visits = Some(self.visit_count);
        for (action, &value) in actions.iter().zip(values) {
            self.heuristic_cache.insert(action.clone(), value);
        }
    }

    /// Visits recorded for `action`, 0 if never taken.
    pub fn action_visits(&self, action: &A) -> u32 {
        self.action_stats.get(action).map_or(0, |s| s.visits)
    }
}
