//! TicTacToe game implementation for the search engine
//!
//! A small perfect-information reference game. Different move orders reach
//! the same board, so it is also the canonical test bed for graph search:
//! [`Game::state_key`] hashes the position rather than the history.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{ActionSpace, Game};
//! use games_tictactoe::TicTacToe;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let game = TicTacToe::new();
//! let mut state = game.initial_state();
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! game.apply(&mut state, &4, &mut rng);
//! assert_eq!(game.legal_actions(&state, ActionSpace::Default).len(), 8);
//! ```

use engine_core::game_utils::two_player_result;
use engine_core::{ActionSpace, Game, GameError, GameMetadata, PlayerId};
use rand_chacha::ChaCha20Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A board position, 0..9 in row-major order
pub type Action = u8;

/// TicTacToe game state
///
/// Represents the complete state of a TicTacToe game including the board,
/// current player, winner information and the move history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Current player: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
    /// Seat (0=X, 1=O) and position of every move so far
    history: Vec<(PlayerId, Action)>,
}

impl State {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; 9],
            current_player: 1, // X goes first
            winner: 0,
            history: Vec::new(),
        }
    }

    /// Build a state from a board, deriving the player to move and winner.
    ///
    /// The history is left empty; intended for tests and puzzles.
    pub fn from_board(board: [u8; 9]) -> Self {
        let xs = board.iter().filter(|&&c| c == 1).count();
        let os = board.iter().filter(|&&c| c == 2).count();
        Self {
            board,
            current_player: if xs > os { 2 } else { 1 },
            winner: Self::check_winner(&board),
            history: Vec::new(),
        }
    }

    /// Board cells: 0=empty, 1=X, 2=O
    pub fn board(&self) -> &[u8; 9] {
        &self.board
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != 0
    }

    /// Winning seat, if any (draws and ongoing games return `None`)
    pub fn winner_seat(&self) -> Option<PlayerId> {
        match self.winner {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }

    /// Seat to move: 0 for X, 1 for O
    pub fn seat_to_move(&self) -> PlayerId {
        (self.current_player - 1) as PlayerId
    }

    /// Get legal moves (empty positions)
    pub fn legal_moves(&self) -> Vec<u8> {
        if self.is_done() {
            return Vec::new();
        }

        (0..9u8)
            .filter(|&pos| self.board[pos as usize] == 0)
            .collect()
    }

    /// Place a mark for the current player.
    ///
    /// Illegal moves leave the state unchanged.
    pub fn play(&mut self, position: u8) {
        if self.is_done() || position >= 9 || self.board[position as usize] != 0 {
            return;
        }

        self.history.push((self.seat_to_move(), position));
        self.board[position as usize] = self.current_player;
        self.winner = Self::check_winner(&self.board);

        // Switch player if game not over
        if self.winner == 0 {
            self.current_player = if self.current_player == 1 { 2 } else { 1 };
        }
    }

    /// Checked variant of [`State::play`] for moves coming from outside the engine
    pub fn try_play(&mut self, position: u8) -> Result<(), GameError> {
        if self.is_done() {
            return Err(GameError::GameOver);
        }
        if position >= 9 || self.board[position as usize] != 0 {
            return Err(GameError::IllegalAction {
                player: self.seat_to_move(),
                action: position.to_string(),
            });
        }
        self.play(position);
        Ok(())
    }

    /// Check for winner on the board
    pub(crate) fn check_winner(board: &[u8; 9]) -> u8 {
        // Winning positions (rows, columns, diagonals)
        const LINES: [[usize; 3]; 8] = [
            [0, 1, 2],
            [3, 4, 5],
            [6, 7, 8], // rows
            [0, 3, 6],
            [1, 4, 7],
            [2, 5, 8], // columns
            [0, 4, 8],
            [2, 4, 6], // diagonals
        ];

        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a]; // Return the winning player
            }
        }

        // Check for draw (board full but no winner)
        if board.iter().all(|&cell| cell != 0) {
            return 3; // Draw
        }

        0 // Game ongoing
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// TicTacToe forward model
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl TicTacToe {
    pub fn new() -> Self {
        Self
    }

    /// Empty board with X to move
    pub fn initial_state(&self) -> State {
        State::new()
    }
}

impl Game for TicTacToe {
    type State = State;
    type Action = Action;

    fn metadata(&self) -> GameMetadata {
        GameMetadata::new("tictactoe", "Tic-Tac-Toe")
            .with_player_names(vec!["X".to_string(), "O".to_string()])
            .with_description("Get three in a row to win")
    }

    fn n_players(&self, _state: &State) -> usize {
        2
    }

    fn current_player(&self, state: &State) -> PlayerId {
        state.seat_to_move()
    }

    fn legal_actions(&self, state: &State, _space: ActionSpace) -> Vec<Action> {
        state.legal_moves()
    }

    fn apply(&self, state: &mut State, action: &Action, _rng: &mut ChaCha20Rng) {
        state.play(*action);
    }

    fn is_terminal(&self, state: &State) -> bool {
        state.is_done()
    }

    fn result(&self, state: &State, player: PlayerId) -> f64 {
        two_player_result(state.winner_seat(), state.is_done(), player)
    }

    fn history<'a>(&self, state: &'a State) -> &'a [(PlayerId, Action)] {
        &state.history
    }

    fn state_key(&self, state: &State) -> u64 {
        let mut hasher = DefaultHasher::new();
        state.board.hash(&mut hasher);
        state.current_player.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests;
