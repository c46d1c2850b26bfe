//! Match loop.
//!
//! One player is evaluated; the other seats are filled with opponents.
//! Seats rotate every match so the evaluated player plays every position.
//! Each MCTS player keeps its tree between its own decisions within a match
//! and forgets it between matches.

use anyhow::{anyhow, Result};
use engine_core::game_utils::sample_uniform;
use engine_core::{ActionSpace, Game, PlayerId};
use mcts::{Budget, MctsPlayer};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use crate::stats::{ArenaStats, Outcome};

/// Whoever sits in one seat.
pub enum Contestant<G: Game> {
    Mcts {
        player: MctsPlayer<G>,
        budget: Budget,
    },
    Random,
}

impl<G: Game> Contestant<G> {
    pub fn mcts(player: MctsPlayer<G>) -> Self {
        let budget = player.config().budget;
        Contestant::Mcts { player, budget }
    }
}

/// Result of one match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub moves: u32,
    /// Result of every game seat
    pub results: Vec<f64>,
    /// Game seat the evaluated player sat in
    pub evaluated_seat: PlayerId,
}

/// Plays matches of `G` between a fixed set of contestants.
///
/// Contestant 0 is the evaluated player.
pub struct Arena<G: Game> {
    game: G,
    contestants: Vec<Contestant<G>>,
    rng: ChaCha20Rng,
    show_decision_stats: bool,
}

impl<G: Game> Arena<G> {
    pub fn new(game: G, contestants: Vec<Contestant<G>>, seed: u64) -> Self {
        Self {
            game,
            contestants,
            rng: ChaCha20Rng::seed_from_u64(seed),
            show_decision_stats: false,
        }
    }

    pub fn with_decision_stats(mut self, show: bool) -> Self {
        self.show_decision_stats = show;
        self
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Contestant playing `seat` in match number `round`.
    pub fn contestant_for(&self, seat: PlayerId, round: u32) -> usize {
        (seat + round as usize) % self.contestants.len()
    }

    /// Play one match from `state` to the end.
    pub fn play_match(
        &mut self,
        mut state: G::State,
        round: u32,
        stats: &mut ArenaStats,
    ) -> Result<MatchReport> {
        let n_players = self.game.n_players(&state);
        if n_players != self.contestants.len() {
            return Err(anyhow!(
                "game has {} seats but {} contestants were given",
                n_players,
                self.contestants.len()
            ));
        }
        for contestant in &mut self.contestants {
            if let Contestant::Mcts { player, .. } = contestant {
                player.reset();
            }
        }

        let mut moves = 0u32;
        while !self.game.is_terminal(&state) {
            let seat = self.game.current_player(&state);
            let legal = self.game.legal_actions(&state, ActionSpace::Default);
            if legal.is_empty() {
                return Err(anyhow!("seat {} has no legal action", seat));
            }
            let index = self.contestant_for(seat, round);
            let action = match &mut self.contestants[index] {
                Contestant::Mcts { player, budget } => {
                    let action = player.decide(&self.game, &state, &legal, *budget)?;
                    if index == 0 {
                        if let Some(search) = player.last_stats() {
                            stats.record_search(search);
                        }
                        if self.show_decision_stats {
                            log_decision(&self.game, player, &action);
                        }
                    }
                    action
                }
                Contestant::Random => sample_uniform(&legal, &mut self.rng)
                    .cloned()
                    .ok_or_else(|| anyhow!("seat {} has no legal action", seat))?,
            };
            debug!(round, seat, action = ?action, "move");
            self.game.apply(&mut state, &action, &mut self.rng);
            moves += 1;
        }

        let results: Vec<f64> = (0..n_players)
            .map(|seat| self.game.result(&state, seat))
            .collect();
        let evaluated_seat = (0..n_players)
            .find(|&seat| self.contestant_for(seat, round) == 0)
            .unwrap_or(0);
        stats.record_match(
            moves,
            results[evaluated_seat],
            Outcome::classify(&results, evaluated_seat),
        );
        Ok(MatchReport {
            moves,
            results,
            evaluated_seat,
        })
    }
}

fn log_decision<G: Game>(game: &G, player: &MctsPlayer<G>, chosen: &G::Action) {
    info!(action = ?chosen, "decision");
    for (action, stat) in player.decision_statistics(game).iter().take(5) {
        info!(
            action = ?action,
            visits = stat.visits,
            share = stat.visit_proportion,
            mean = stat.mean_value,
            heuristic = stat.heuristic_value,
            prior = stat.action_prior_value,
            "  candidate"
        );
    }
}

/// Play `matches` matches, dealing each start state with `deal`.
pub fn run_matches<G, F>(
    arena: &mut Arena<G>,
    matches: u32,
    log_interval: u32,
    seed: u64,
    mut deal: F,
    stats: &mut ArenaStats,
) -> Result<()>
where
    G: Game,
    F: FnMut(&G, &mut ChaCha20Rng) -> G::State,
{
    let mut deal_rng = ChaCha20Rng::seed_from_u64(seed);
    for round in 0..matches {
        let state = deal(arena.game(), &mut deal_rng);
        let report = arena.play_match(state, round, stats)?;
        debug!(
            round,
            moves = report.moves,
            seat = report.evaluated_seat,
            results = ?report.results,
            "match finished"
        );
        if log_interval > 0 && (round + 1) % log_interval == 0 {
            let snapshot = stats.snapshot();
            info!(
                matches = snapshot.matches,
                wins = snapshot.wins,
                draws = snapshot.draws,
                losses = snapshot.losses,
                mean_result = snapshot.mean_result,
                avg_iterations = snapshot.avg_iterations,
                reuse_rate = snapshot.reuse_rate,
                "progress"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_highcard::HighCard;
    use games_tictactoe::TicTacToe;
    use mcts::MctsConfig;

    fn mcts_player(iterations: u64, reuse: bool) -> Contestant<TicTacToe> {
        let config = MctsConfig::for_testing()
            .with_budget(Budget::iterations(iterations))
            .with_reuse(reuse);
        Contestant::mcts(MctsPlayer::new(config).unwrap())
    }

    #[test]
    fn test_seats_rotate() {
        let arena = Arena::new(
            TicTacToe::new(),
            vec![Contestant::Random, Contestant::Random],
            0,
        );
        assert_eq!(arena.contestant_for(0, 0), 0);
        assert_eq!(arena.contestant_for(1, 0), 1);
        assert_eq!(arena.contestant_for(0, 1), 1);
        assert_eq!(arena.contestant_for(1, 1), 0);
    }

    #[test]
    fn test_random_match_finishes() {
        let mut arena = Arena::new(
            TicTacToe::new(),
            vec![Contestant::Random, Contestant::Random],
            3,
        );
        let mut stats = ArenaStats::new("tictactoe");
        let report = arena
            .play_match(TicTacToe::new().initial_state(), 0, &mut stats)
            .unwrap();

        assert!((5..=9).contains(&report.moves));
        assert_eq!(report.results.len(), 2);
        assert_eq!(stats.matches(), 1);
        // random seats make no searches
        assert_eq!(stats.snapshot().decisions, 0);
    }

    #[test]
    fn test_mcts_reuses_tree_within_a_match() {
        let mut arena = Arena::new(
            TicTacToe::new(),
            vec![mcts_player(500, true), Contestant::Random],
            5,
        );
        let mut stats = ArenaStats::new("tictactoe");
        run_matches(
            &mut arena,
            4,
            0,
            5,
            |game, _| game.initial_state(),
            &mut stats,
        )
        .unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.matches, 4);
        assert!(snapshot.decisions >= 8);
        assert!(snapshot.reuse_rate > 0.0);
        assert!((snapshot.avg_iterations - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_seat_count_must_match() {
        let mut arena = Arena::new(
            TicTacToe::new(),
            vec![Contestant::Random, Contestant::Random, Contestant::Random],
            0,
        );
        let mut stats = ArenaStats::new("tictactoe");
        let err = arena
            .play_match(TicTacToe::new().initial_state(), 0, &mut stats)
            .unwrap_err();
        assert!(err.to_string().contains("seats"));
    }

    #[test]
    fn test_highcard_match() {
        let game = HighCard::new(3, 4).unwrap();
        let config = MctsConfig::for_testing().with_budget(Budget::iterations(100));
        let contestants = vec![
            Contestant::mcts(MctsPlayer::new(config).unwrap()),
            Contestant::Random,
            Contestant::Random,
        ];
        let mut arena = Arena::new(game, contestants, 9);
        let mut stats = ArenaStats::new("highcard");
        run_matches(&mut arena, 3, 1, 9, |game, rng| game.deal(rng), &mut stats).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.matches, 3);
        // four tricks of three cards
        assert!((snapshot.avg_match_length - 12.0).abs() < 1e-9);
        assert_eq!(snapshot.decisions, 12);
    }
}
