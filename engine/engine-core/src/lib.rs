//! Core traits and types for the search engine's game environments
//!
//! This crate provides the contract every game must satisfy to be searched:
//! - `Game`: Typed forward model (legal actions, transitions, results,
//!   redeterminization of hidden information)
//! - `GameMetadata`: Display-oriented facts about a game
//! - `game_utils`: Result conventions shared by the reference games
//! - `GameError`: Failures of checked game operations

pub mod error;
pub mod game_utils;
pub mod metadata;
pub mod typed;

// Re-export main types for convenience
pub use error::GameError;
pub use metadata::GameMetadata;
pub use typed::{ActionSpace, Game, PlayerId};
