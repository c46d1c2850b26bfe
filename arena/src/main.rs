//! Arena - match runner for the MCTS engine
//!
//! Plays a series of matches of a reference game:
//! 1. Seat the configured MCTS player against MCTS or random opponents
//! 2. Rotate seats between matches
//! 3. Log decisions, progress and a final summary
//! 4. Optionally write the summary as JSON

use anyhow::Result;
use clap::Parser;
use games_highcard::HighCard;
use games_tictactoe::TicTacToe;
use mcts::MctsPlayer;
use tracing::{error, info};

mod arena;
mod config;
mod stats;

use crate::arena::{run_matches, Arena, Contestant};
use crate::config::Config;
use crate::stats::{ArenaStats, ArenaStatsSnapshot};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Seat the evaluated player and `seats - 1` opponents.
fn contestants<G: engine_core::Game>(config: &Config, seats: usize) -> Result<Vec<Contestant<G>>> {
    let mut contestants = Vec::with_capacity(seats);
    contestants.push(Contestant::mcts(MctsPlayer::new(config.search_config()?)?));
    for seat in 1..seats {
        let opponent = match config.opponent.as_str() {
            "mcts" => Contestant::mcts(MctsPlayer::new(config.opponent_config(seat)?)?),
            _ => Contestant::Random,
        };
        contestants.push(opponent);
    }
    Ok(contestants)
}

fn run(config: &Config) -> Result<ArenaStatsSnapshot> {
    let mut stats = ArenaStats::new(&config.game);
    match config.game.as_str() {
        "highcard" => {
            let game = HighCard::new(config.players, config.hand_size)?;
            let seats = contestants(config, config.players)?;
            let mut arena = Arena::new(game, seats, config.seed)
                .with_decision_stats(config.show_decision_stats);
            run_matches(
                &mut arena,
                config.matches,
                config.log_interval,
                config.seed,
                |game, rng| game.deal(rng),
                &mut stats,
            )?;
        }
        _ => {
            let seats = contestants(config, 2)?;
            let mut arena = Arena::new(TicTacToe::new(), seats, config.seed)
                .with_decision_stats(config.show_decision_stats);
            run_matches(
                &mut arena,
                config.matches,
                config.log_interval,
                config.seed,
                |game, _| game.initial_state(),
                &mut stats,
            )?;
        }
    }

    if let Some(path) = &config.stats_path {
        stats.write_stats(path);
    }
    Ok(stats.snapshot())
}

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");
    info!(
        game = %config.game,
        matches = config.matches,
        opponent = %config.opponent,
        topology = %config.topology,
        budget_type = %config.budget_type,
        budget = config.budget,
        "Starting arena"
    );

    match run(&config) {
        Ok(snapshot) => {
            info!(
                wins = snapshot.wins,
                draws = snapshot.draws,
                losses = snapshot.losses,
                mean_result = snapshot.mean_result,
                avg_iterations = snapshot.avg_iterations,
                avg_search_us = snapshot.avg_search_us,
                reuse_rate = snapshot.reuse_rate,
                "Arena finished"
            );
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Err(e) => {
            error!("Arena failed: {}", e);
            Err(e)
        }
    }
}
