//! Search tree with slab allocation.
//!
//! Nodes live in a slab and are referenced by `NodeId` indices, so parent
//! links never own anything and pruning is an explicit removal. A tree has
//! one root per player (only multi-tree search uses more than one) and, for
//! graph search, a transposition table from state key to node.

use crate::config::SelectionPolicy;
use crate::node::{MctsNode, NodeId};
use engine_core::PlayerId;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use slab::Slab;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Arena-backed search tree (or graph).
#[derive(Debug, Clone)]
pub struct SearchTree<S, A> {
    /// Arena storing all nodes
    nodes: Slab<MctsNode<S, A>>,

    /// Root per player; NONE where a player has no tree
    roots: Vec<NodeId>,

    /// Player the search decides for
    root_player: PlayerId,

    /// State key to node (graph topologies)
    transpositions: HashMap<u64, NodeId>,
}

impl<S, A: Clone + Eq + Hash> SearchTree<S, A> {
    /// Create an empty tree deciding for `root_player`.
    pub fn new(root_player: PlayerId, n_players: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(1024),
            roots: vec![NodeId::NONE; n_players.max(root_player + 1)],
            root_player,
            transpositions: HashMap::new(),
        }
    }

    /// Get the deciding player's root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.player_root(self.root_player)
    }

    /// Root of `player`'s tree, NONE if absent.
    #[inline]
    pub fn player_root(&self, player: PlayerId) -> NodeId {
        self.roots.get(player).copied().unwrap_or(NodeId::NONE)
    }

    pub fn root_player(&self) -> PlayerId {
        self.root_player
    }

    /// Make `id` the root of `player`'s tree.
    pub fn set_player_root(&mut self, player: PlayerId, id: NodeId) {
        if self.roots.len() <= player {
            self.roots.resize(player + 1, NodeId::NONE);
        }
        self.roots[player] = id;
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S, A> {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S, A> {
        &mut self.nodes[id.index()]
    }

    /// Look up a node that may have been freed.
    pub fn try_get(&self, id: NodeId) -> Option<&MctsNode<S, A>> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.try_get(id).is_some()
    }

    /// Allocate a new node and return its ID.
    pub fn allocate(&mut self, node: MctsNode<S, A>) -> NodeId {
        NodeId(self.nodes.insert(node) as u32)
    }

    /// Allocate `node` as a child of `parent` under `action`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        action: A,
        next_player: PlayerId,
        node: MctsNode<S, A>,
    ) -> NodeId {
        let child = self.allocate(node);
        self.get_mut(parent).set_child(action, next_player, child);
        child
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node IDs currently allocated.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|(i, _)| NodeId(i as u32))
    }

    pub fn transposition(&self, key: u64) -> Option<NodeId> {
        self.transpositions.get(&key).copied()
    }

    pub fn insert_transposition(&mut self, key: u64, id: NodeId) {
        self.transpositions.insert(key, id);
    }

    pub fn remove_transposition(&mut self, key: u64) -> Option<NodeId> {
        self.transpositions.remove(&key)
    }

    pub fn transpositions(&self) -> &HashMap<u64, NodeId> {
        &self.transpositions
    }

    /// Current visit count of every transposition entry.
    pub fn transposition_visits(&self) -> HashMap<u64, u32> {
        self.transpositions
            .iter()
            .filter_map(|(&key, &id)| self.try_get(id).map(|n| (key, n.visit_count)))
            .collect()
    }

    /// Drop every stored state except the deciding player's root.
    pub fn clear_states(&mut self) {
        let root = self.root();
        for (i, node) in self.nodes.iter_mut() {
            if NodeId(i as u32) != root {
                node.state = None;
            }
        }
    }

    /// Nodes reachable from any root through child links.
    pub fn reachable(&self) -> HashSet<NodeId> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut queue: VecDeque<NodeId> = self
            .roots
            .iter()
            .copied()
            .filter(|&id| self.contains(id))
            .collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for child in self.get(id).child_ids() {
                if self.contains(child) && !seen.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
        seen
    }

    /// Free every node no root can reach, returning how many were freed.
    ///
    /// Transposition entries pointing at freed nodes are removed as well.
    pub fn sweep_unreachable(&mut self) -> usize {
        let keep = self.reachable();
        let before = self.nodes.len();
        self.nodes.retain(|i, _| keep.contains(&NodeId(i as u32)));
        self.transpositions.retain(|_, id| keep.contains(id));
        before - self.nodes.len()
    }

    /// Pick the decision at `node` among `legal` actions.
    ///
    /// Robust picks the most visited action, Simple the best mean value for
    /// the node's decision player; Tree is read as Simple here. Ties break
    /// at random. Returns None when no legal action has been visited.
    pub fn best_action(
        &self,
        node: NodeId,
        legal: &[A],
        policy: SelectionPolicy,
        rng: &mut ChaCha20Rng,
    ) -> Option<A> {
        let n = self.get(node);
        let player = n.decision_player;
        let mut best: Option<(&A, f64)> = None;
        for action in legal {
            let Some(stats) = n.action_stats.get(action) else {
                continue;
            };
            if stats.visits == 0 {
                continue;
            }
            let score = match policy {
                SelectionPolicy::Robust => stats.visits as f64,
                SelectionPolicy::Simple | SelectionPolicy::Tree => stats.mean(player),
            } + rng.gen::<f64>() * 1e-9;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((action, score));
            }
        }
        best.map(|(a, _)| a.clone())
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.root();
        let (root_visits, root_value) = match self.try_get(root) {
            Some(n) => (n.visit_count, n.mean_value(n.decision_player)),
            None => (0, 0.0),
        };
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits,
            root_value,
            max_depth: self.max_depth(root),
        }
    }

    /// Longest shortest-path from `from`; graphs may contain cycles.
    fn max_depth(&self, from: NodeId) -> u32 {
        if !self.contains(from) {
            return 0;
        }
        let mut depth = 0;
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(from, 0u32)]);
        while let Some((id, d)) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            depth = depth.max(d);
            for child in self.get(id).child_ids() {
                if self.contains(child) {
                    queue.push_back((child, d + 1));
                }
            }
        }
        depth
    }

    /// Check `visit_count == 1 + Σ children visits` below `from`.
    ///
    /// Holds where every visit of a node either stops there or passes to a
    /// child, i.e. in a shared tree without self-only transitions. Nodes
    /// with `threshold` visits, or with a child that has them, stopped
    /// counting and are skipped, as are nodes where a simulation once
    /// ended. Returns the first offending node.
    pub fn check_visit_invariant(&self, from: NodeId, threshold: u32) -> Result<(), NodeId> {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let node = self.get(id);
            let children: Vec<NodeId> = node.child_ids().collect();
            if children.is_empty() {
                continue;
            }
            let frozen = node.is_terminal
                || node.visit_count >= threshold
                || children
                    .iter()
                    .any(|&c| self.get(c).visit_count >= threshold);
            let sum: u32 = children.iter().map(|&c| self.get(c).visit_count).sum();
            if !frozen && node.visit_count != sum + 1 {
                return Err(id);
            }
            stack.extend(children);
        }
        Ok(())
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f64,
    pub max_depth: u32,
}
