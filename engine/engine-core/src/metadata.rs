//! Game metadata for logging and configuration
//!
//! Display-oriented facts about a game that runners use to configure
//! themselves without knowing the concrete game type.

use serde::{Deserialize, Serialize};

/// Metadata about a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    /// Environment identifier (e.g., "tictactoe", "highcard")
    pub env_id: String,

    /// Human-readable display name
    pub display_name: String,

    /// Number of seats
    pub player_count: usize,

    /// Display names for each seat
    pub player_names: Vec<String>,

    /// Whether some state components are hidden from some players.
    /// Searches on such games should redeterminize every iteration.
    pub hidden_information: bool,

    /// Brief description of the rules
    pub description: String,
}

impl GameMetadata {
    /// Create a new GameMetadata with required fields
    pub fn new(env_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            display_name: display_name.into(),
            player_count: 2,
            player_names: vec!["Player 1".to_string(), "Player 2".to_string()],
            hidden_information: false,
            description: String::new(),
        }
    }

    /// Builder method for seat count; names default to "Player N"
    pub fn with_players(mut self, count: usize) -> Self {
        self.player_count = count;
        self.player_names = (1..=count).map(|i| format!("Player {}", i)).collect();
        self
    }

    /// Builder method for explicit seat names
    pub fn with_player_names(mut self, names: Vec<String>) -> Self {
        self.player_count = names.len();
        self.player_names = names;
        self
    }

    /// Builder method marking the game as imperfect information
    pub fn with_hidden_information(mut self) -> Self {
        self.hidden_information = true;
        self
    }

    /// Builder method for description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Display name for a seat, falling back to its index
    pub fn player_name(&self, player: usize) -> String {
        self.player_names
            .get(player)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", player + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = GameMetadata::new("highcard", "High Card")
            .with_players(3)
            .with_hidden_information()
            .with_description("Play your highest card");

        assert_eq!(meta.player_count, 3);
        assert_eq!(meta.player_names.len(), 3);
        assert_eq!(meta.player_names[2], "Player 3");
        assert!(meta.hidden_information);
    }

    #[test]
    fn test_player_name_fallback() {
        let meta = GameMetadata::new("tictactoe", "Tic-Tac-Toe")
            .with_player_names(vec!["X".into(), "O".into()]);
        assert_eq!(meta.player_name(1), "O");
        assert_eq!(meta.player_name(5), "Player 6");
    }

    #[test]
    fn test_serde_roundtrip() {
        let meta = GameMetadata::new("tictactoe", "Tic-Tac-Toe");
        let json = serde_json::to_string(&meta).unwrap();
        let back: GameMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
