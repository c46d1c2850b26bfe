//! Carrying a search tree over to the next decision.
//!
//! After the player acts, the game moves on through other players' actions.
//! Relocation replays the recorded history from the player's own last action
//! through the old tree and promotes the node it lands on to the new root.
//! Anything the new root cannot reach is freed.

use crate::config::TreeTopology;
use crate::node::NodeId;
use crate::search::SearchError;
use crate::tree::SearchTree;
use engine_core::{Game, PlayerId};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

/// Move `tree` onto the node matching `state`.
///
/// `last_action` is the action this player chose at the previous root and
/// `graph_visits` the transposition visit counts recorded when that search
/// started. Returns the number of nodes freed, or None when nothing usable
/// is left and a fresh tree should be built.
pub fn relocate<G: Game>(
    tree: &mut SearchTree<G::State, G::Action>,
    game: &G,
    state: &G::State,
    topology: TreeTopology,
    last_action: &G::Action,
    graph_visits: &HashMap<u64, u32>,
) -> Result<Option<usize>, SearchError> {
    let root_player = tree.root_player();
    let current = game.current_player(state);
    if current != root_player {
        return Ok(None);
    }

    let history = game.history(state);
    let Some(start) = history
        .iter()
        .rposition(|(p, a)| *p == root_player && a == last_action)
    else {
        debug!("last action not found in history, building a fresh tree");
        return Ok(None);
    };
    let since = &history[start..];

    match topology {
        TreeTopology::Mcgs | TreeTopology::McgsSelfOnly => {
            collect_stale_transpositions(tree, graph_visits)?;
            match tree.transposition(game.state_key(state)) {
                Some(id) if tree.contains(id) => tree.set_player_root(root_player, id),
                _ => return Ok(None),
            }
        }
        TreeTopology::MultiTree => {
            for player in 0..game.n_players(state) {
                let old = tree.player_root(player);
                if !tree.contains(old) {
                    continue;
                }
                let steps = own_steps(since, player);
                match follow(tree, old, &steps) {
                    Some(id) => tree.set_player_root(player, id),
                    None if player == root_player => return Ok(None),
                    None => {
                        debug!(player, "opponent tree lost track of the game, dropping it");
                        tree.set_player_root(player, NodeId::NONE);
                    }
                }
            }
        }
        TreeTopology::SelfOnly => {
            let steps = own_steps(since, root_player);
            match follow(tree, tree.root(), &steps) {
                Some(id) => tree.set_player_root(root_player, id),
                None => return Ok(None),
            }
        }
        TreeTopology::OneTree | TreeTopology::Oma | TreeTopology::OmaAll => {
            let steps: Vec<(&G::Action, PlayerId)> = since
                .iter()
                .enumerate()
                .map(|(i, (_, action))| {
                    let next = since.get(i + 1).map_or(current, |(p, _)| *p);
                    (action, next)
                })
                .collect();
            match follow(tree, tree.root(), &steps) {
                Some(id) => tree.set_player_root(root_player, id),
                None => return Ok(None),
            }
        }
    }

    let Some(node) = tree.try_get(tree.root()) else {
        return Ok(None);
    };
    if node.turn_owner != current || node.decision_player != current {
        return Err(SearchError::InvariantViolation(format!(
            "relocated root belongs to player {} (decides for {}), but player {} is to act",
            node.turn_owner, node.decision_player, current
        )));
    }

    for player in 0..game.n_players(state) {
        let id = tree.player_root(player);
        if tree.contains(id) {
            let node = tree.get_mut(id);
            node.parent = NodeId::NONE;
            node.action_to_reach = None;
        }
    }
    Ok(Some(tree.sweep_unreachable()))
}

/// `player`'s own actions in `history`, each followed to `player`'s next node.
fn own_steps<A>(history: &[(PlayerId, A)], player: PlayerId) -> Vec<(&A, PlayerId)> {
    history
        .iter()
        .filter(|(p, _)| *p == player)
        .map(|(_, a)| (a, player))
        .collect()
}

/// Walk `steps` of `(action, next player)` from `from`.
fn follow<S, A: Clone + Eq + Hash>(
    tree: &SearchTree<S, A>,
    from: NodeId,
    steps: &[(&A, PlayerId)],
) -> Option<NodeId> {
    if !tree.contains(from) {
        return None;
    }
    let mut node = from;
    for (action, next) in steps {
        let child = tree.get(node).child(action, *next);
        if !tree.contains(child) {
            return None;
        }
        node = child;
    }
    Some(node)
}

/// Drop transposition entries nobody visited since `previous` was recorded.
///
/// A count that went down means the graph was corrupted.
fn collect_stale_transpositions<S, A: Clone + Eq + Hash>(
    tree: &mut SearchTree<S, A>,
    previous: &HashMap<u64, u32>,
) -> Result<(), SearchError> {
    let mut stale = Vec::new();
    for (key, visits) in tree.transposition_visits() {
        let Some(&before) = previous.get(&key) else {
            continue;
        };
        if visits < before {
            return Err(SearchError::InvariantViolation(format!(
                "transposition {:#018x} went from {} to {} visits",
                key, before, visits
            )));
        }
        if visits == before {
            stale.push(key);
        }
    }
    for key in &stale {
        tree.remove_transposition(*key);
    }
    if !stale.is_empty() {
        debug!(removed = stale.len(), "removed stale transpositions");
    }
    Ok(())
}
