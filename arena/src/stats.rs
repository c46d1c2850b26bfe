//! Arena statistics tracking and persistence.
//!
//! Tracks results of the evaluated player and how its searches behaved:
//! - Wins, draws, losses and mean result
//! - Iterations, tree size and search time per decision
//! - How often the previous tree could be reused
//!
//! A snapshot can be written to a JSON file when the run finishes.

use mcts::SearchStats;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, warn};

/// How a match ended for the evaluated player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Compare `seat`'s result against the best of the other seats.
    pub fn classify(results: &[f64], seat: usize) -> Self {
        let own = results.get(seat).copied().unwrap_or(0.0);
        let best_other = results
            .iter()
            .enumerate()
            .filter(|&(s, _)| s != seat)
            .map(|(_, &r)| r)
            .fold(f64::NEG_INFINITY, f64::max);
        if own > best_other {
            Outcome::Win
        } else if own == best_other {
            Outcome::Draw
        } else {
            Outcome::Loss
        }
    }
}

/// Aggregated arena statistics for the evaluated player.
#[derive(Debug)]
pub struct ArenaStats {
    game: String,
    matches: u32,
    wins: u32,
    draws: u32,
    losses: u32,
    /// Sum of the evaluated player's results
    total_result: f64,
    total_moves: u64,
    decisions: u64,
    reused_decisions: u64,
    total_iterations: u64,
    total_fm_calls: u64,
    total_tree_nodes: u64,
    total_search_us: u64,
    start_time: Instant,
}

/// Serializable stats for JSON output.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArenaStatsSnapshot {
    pub game: String,
    pub matches: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub mean_result: f64,
    pub avg_match_length: f64,
    pub decisions: u64,
    pub reuse_rate: f64,
    pub avg_iterations: f64,
    pub avg_fm_calls: f64,
    pub avg_tree_nodes: f64,
    pub avg_search_us: f64,
    pub runtime_seconds: f64,
    pub timestamp: u64,
}

fn average(total: f64, count: u64) -> f64 {
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

impl ArenaStats {
    pub fn new(game: &str) -> Self {
        Self {
            game: game.to_string(),
            matches: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            total_result: 0.0,
            total_moves: 0,
            decisions: 0,
            reused_decisions: 0,
            total_iterations: 0,
            total_fm_calls: 0,
            total_tree_nodes: 0,
            total_search_us: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a finished match: its length and the evaluated player's result.
    pub fn record_match(&mut self, moves: u32, result: f64, outcome: Outcome) {
        self.matches += 1;
        self.total_moves += moves as u64;
        self.total_result += result;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Loss => self.losses += 1,
        }
    }

    /// Record one search of the evaluated player.
    pub fn record_search(&mut self, search: &SearchStats) {
        self.decisions += 1;
        if search.reused {
            self.reused_decisions += 1;
        }
        self.total_iterations += search.iterations;
        self.total_fm_calls += search.fm_calls;
        self.total_tree_nodes += search.tree_size as u64;
        self.total_search_us += search.elapsed.as_micros() as u64;
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn snapshot(&self) -> ArenaStatsSnapshot {
        ArenaStatsSnapshot {
            game: self.game.clone(),
            matches: self.matches,
            wins: self.wins,
            draws: self.draws,
            losses: self.losses,
            mean_result: average(self.total_result, self.matches as u64),
            avg_match_length: average(self.total_moves as f64, self.matches as u64),
            decisions: self.decisions,
            reuse_rate: average(self.reused_decisions as f64, self.decisions),
            avg_iterations: average(self.total_iterations as f64, self.decisions),
            avg_fm_calls: average(self.total_fm_calls as f64, self.decisions),
            avg_tree_nodes: average(self.total_tree_nodes as f64, self.decisions),
            avg_search_us: average(self.total_search_us as f64, self.decisions),
            runtime_seconds: self.start_time.elapsed().as_secs_f64(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to a JSON file (atomic write-then-rename).
    pub fn write_stats(&self, path: &str) {
        let snapshot = self.snapshot();

        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize arena stats: {}", e);
                return;
            }
        };

        // Write to temp file then rename (atomic on most filesystems)
        let temp_path = format!("{}.tmp", path);
        match fs::File::create(&temp_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(json.as_bytes()) {
                    warn!("Failed to write arena stats: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to create temp stats file: {}", e);
                return;
            }
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote arena stats to {}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn search(iterations: u64, reused: bool) -> SearchStats {
        SearchStats {
            iterations,
            fm_calls: iterations * 4,
            tree_size: iterations as usize,
            elapsed: Duration::from_micros(500),
            reused,
            ..SearchStats::default()
        }
    }

    #[test]
    fn test_classify_outcomes() {
        assert_eq!(Outcome::classify(&[1.0, 0.0], 0), Outcome::Win);
        assert_eq!(Outcome::classify(&[1.0, 0.0], 1), Outcome::Loss);
        assert_eq!(Outcome::classify(&[0.5, 0.5], 1), Outcome::Draw);
        // shared lead in a three player game
        assert_eq!(Outcome::classify(&[0.5, 0.5, 0.0], 0), Outcome::Draw);
        assert_eq!(Outcome::classify(&[0.0, 0.5, 0.5], 0), Outcome::Loss);
    }

    #[test]
    fn test_record_match() {
        let mut stats = ArenaStats::new("tictactoe");
        stats.record_match(9, 1.0, Outcome::Win);
        stats.record_match(8, 0.0, Outcome::Loss);
        stats.record_match(9, 0.5, Outcome::Draw);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.matches, 3);
        assert_eq!(snapshot.wins, 1);
        assert_eq!(snapshot.losses, 1);
        assert_eq!(snapshot.draws, 1);
        assert!((snapshot.mean_result - 0.5).abs() < 1e-12);
        assert!((snapshot.avg_match_length - 26.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_search() {
        let mut stats = ArenaStats::new("tictactoe");
        stats.record_search(&search(100, false));
        stats.record_search(&search(300, true));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.decisions, 2);
        assert!((snapshot.reuse_rate - 0.5).abs() < 1e-12);
        assert!((snapshot.avg_iterations - 200.0).abs() < 1e-12);
        assert!((snapshot.avg_fm_calls - 800.0).abs() < 1e-12);
        assert!((snapshot.avg_search_us - 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_averages_with_nothing_recorded() {
        let stats = ArenaStats::new("highcard");
        let snapshot = stats.snapshot();

        // Averages should be 0.0, not NaN
        assert_eq!(snapshot.mean_result, 0.0);
        assert_eq!(snapshot.avg_iterations, 0.0);
        assert_eq!(snapshot.reuse_rate, 0.0);
        assert_eq!(snapshot.game, "highcard");
    }

    #[test]
    fn test_write_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena_stats.json");
        let path = path.to_str().unwrap();
        let mut stats = ArenaStats::new("tictactoe");

        stats.record_match(9, 1.0, Outcome::Win);
        stats.write_stats(path);

        let content = fs::read_to_string(Path::new(path)).unwrap();
        let parsed: ArenaStatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.matches, 1);

        // a second write replaces the first
        stats.record_match(7, 0.0, Outcome::Loss);
        stats.write_stats(path);
        let content = fs::read_to_string(Path::new(path)).unwrap();
        let parsed: ArenaStatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.matches, 2);
        assert!(!Path::new(&format!("{}.tmp", path)).exists());
    }
}
