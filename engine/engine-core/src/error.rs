//! Errors raised by game implementations outside the forward-model hot path

use crate::typed::PlayerId;

/// Error for checked game operations and game construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal action {action} for player {player}")]
    IllegalAction { player: PlayerId, action: String },
    #[error("Game is already over")]
    GameOver,
    #[error("Invalid game configuration: {0}")]
    InvalidConfig(String),
}
