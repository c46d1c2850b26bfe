//! High Card: a small N-player trick-taking game with hidden hands
//!
//! Every player is dealt the same number of cards from a shuffled deck; the
//! rest of the deck stays face down. The trick leader plays any card, the
//! others must follow the led suit when they can, and the highest card of
//! the led suit takes the trick and leads the next one. Whoever takes the
//! most tricks wins.
//!
//! Opponents' hands and the undealt cards are hidden, so searches on this
//! game redeterminize: [`Game::redeterminize`] reshuffles every card the
//! observer cannot see while respecting the suits a player has shown to be
//! void in.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{ActionSpace, Game};
//! use games_highcard::HighCard;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let game = HighCard::new(3, 4).unwrap();
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let state = game.deal(&mut rng);
//! assert_eq!(game.legal_actions(&state, ActionSpace::Default).len(), 4);
//! ```

use engine_core::game_utils::score_results;
use engine_core::{ActionSpace, Game, GameError, GameMetadata, PlayerId};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use std::fmt;

/// Number of suits in the deck
pub const SUITS: u8 = 4;

/// Number of ranks per suit
pub const RANKS: u8 = 13;

/// Attempts at a void-respecting redeal before falling back to the true deal
const REDEAL_ATTEMPTS: usize = 64;

/// A playing card; ranks run from 0 (lowest) to `RANKS - 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub suit: u8,
    pub rank: u8,
}

impl Card {
    pub fn new(suit: u8, rank: u8) -> Self {
        Self { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RANK_NAMES: &[u8; 13] = b"23456789TJQKA";
        const SUIT_NAMES: &[u8; 4] = b"cdhs";
        let rank = RANK_NAMES.get(self.rank as usize).copied().unwrap_or(b'?');
        let suit = SUIT_NAMES.get(self.suit as usize).copied().unwrap_or(b'?');
        write!(f, "{}{}", rank as char, suit as char)
    }
}

/// High Card game state, including every hidden card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    hands: Vec<Vec<Card>>,
    /// Undealt cards, face down
    deck: Vec<Card>,
    /// Cards played to the current trick, in play order
    table: Vec<(PlayerId, Card)>,
    tricks_won: Vec<i32>,
    /// `voids[p][s]` once player `p` failed to follow suit `s`
    voids: Vec<[bool; SUITS as usize]>,
    to_move: PlayerId,
    tricks_played: usize,
    history: Vec<(PlayerId, Card)>,
}

impl State {
    /// Cards held by `player`
    pub fn hand(&self, player: PlayerId) -> &[Card] {
        &self.hands[player]
    }

    /// Cards played to the current trick
    pub fn table(&self) -> &[(PlayerId, Card)] {
        &self.table
    }

    /// Undealt cards
    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    /// Tricks taken so far, per player
    pub fn tricks_won(&self) -> &[i32] {
        &self.tricks_won
    }

    /// Whether `player` has revealed they hold no card of `suit`
    pub fn is_void(&self, player: PlayerId, suit: u8) -> bool {
        self.voids[player][suit as usize]
    }

    fn led_suit(&self) -> Option<u8> {
        self.table.first().map(|(_, card)| card.suit)
    }

    fn can_hold(&self, player: PlayerId, card: &Card) -> bool {
        !self.voids[player][card.suit as usize]
    }
}

/// High Card forward model
#[derive(Debug, Clone, Copy)]
pub struct HighCard {
    players: usize,
    hand_size: usize,
}

impl HighCard {
    /// Create a game for `players` seats with `hand_size` cards each.
    pub fn new(players: usize, hand_size: usize) -> Result<Self, GameError> {
        let deck_size = (SUITS as usize) * (RANKS as usize);
        if players < 2 {
            return Err(GameError::InvalidConfig(format!(
                "high card needs at least 2 players, got {}",
                players
            )));
        }
        if hand_size == 0 || players * hand_size > deck_size {
            return Err(GameError::InvalidConfig(format!(
                "cannot deal {} cards to {} players from a {} card deck",
                hand_size, players, deck_size
            )));
        }
        Ok(Self { players, hand_size })
    }

    /// Shuffle a full deck and deal a fresh game; seat 0 leads.
    pub fn deal(&self, rng: &mut ChaCha20Rng) -> State {
        let mut deck: Vec<Card> = (0..SUITS)
            .flat_map(|suit| (0..RANKS).map(move |rank| Card::new(suit, rank)))
            .collect();
        deck.shuffle(rng);

        let hands = (0..self.players)
            .map(|_| {
                let mut hand = deck.split_off(deck.len() - self.hand_size);
                hand.sort();
                hand
            })
            .collect();

        State {
            hands,
            deck,
            table: Vec::with_capacity(self.players),
            tricks_won: vec![0; self.players],
            voids: vec![[false; SUITS as usize]; self.players],
            to_move: 0,
            tricks_played: 0,
            history: Vec::new(),
        }
    }

    /// Checked play for cards coming from outside the engine
    pub fn try_play(&self, state: &mut State, card: Card) -> Result<(), GameError> {
        if self.is_terminal(state) {
            return Err(GameError::GameOver);
        }
        if !self.legal_actions(state, ActionSpace::Default).contains(&card) {
            return Err(GameError::IllegalAction {
                player: state.to_move,
                action: card.to_string(),
            });
        }
        self.play(state, card);
        Ok(())
    }

    fn play(&self, state: &mut State, card: Card) {
        let player = state.to_move;
        let Some(pos) = state.hands[player].iter().position(|c| *c == card) else {
            return;
        };
        state.hands[player].remove(pos);

        if let Some(led) = state.led_suit() {
            if card.suit != led {
                state.voids[player][led as usize] = true;
            }
        }
        state.table.push((player, card));
        state.history.push((player, card));

        if state.table.len() < self.players {
            state.to_move = (player + 1) % self.players;
            return;
        }

        // trick complete: highest card of the led suit takes it
        let led = state.table[0].1.suit;
        let winner = state
            .table
            .iter()
            .filter(|(_, c)| c.suit == led)
            .max_by_key(|(_, c)| c.rank)
            .map(|(p, _)| *p)
            .unwrap_or(state.table[0].0);
        state.tricks_won[winner] += 1;
        state.tricks_played += 1;
        state.table.clear();
        state.to_move = winner;
    }

    /// Deal the unseen cards again, keeping every hand size and void.
    fn redeal(&self, state: &State, observer: PlayerId, rng: &mut ChaCha20Rng) -> Option<State> {
        let mut pool: Vec<Card> = state.deck.clone();
        for (p, hand) in state.hands.iter().enumerate() {
            if p != observer {
                pool.extend_from_slice(hand);
            }
        }
        pool.shuffle(rng);

        // most constrained players pick first
        let mut order: Vec<PlayerId> = (0..self.players).filter(|&p| p != observer).collect();
        order.sort_by_key(|&p| std::cmp::Reverse(state.voids[p].iter().filter(|&&v| v).count()));

        let mut next = state.clone();
        for &p in &order {
            let need = state.hands[p].len();
            let mut hand = Vec::with_capacity(need);
            let mut i = 0;
            while hand.len() < need && i < pool.len() {
                if state.can_hold(p, &pool[i]) {
                    hand.push(pool.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            if hand.len() < need {
                return None;
            }
            hand.sort();
            next.hands[p] = hand;
        }
        next.deck = pool;
        Some(next)
    }
}

impl Game for HighCard {
    type State = State;
    type Action = Card;

    fn metadata(&self) -> GameMetadata {
        GameMetadata::new("highcard", "High Card")
            .with_players(self.players)
            .with_hidden_information()
            .with_description("Follow suit; the highest card of the led suit takes the trick")
    }

    fn n_players(&self, _state: &State) -> usize {
        self.players
    }

    fn current_player(&self, state: &State) -> PlayerId {
        state.to_move
    }

    fn legal_actions(&self, state: &State, _space: ActionSpace) -> Vec<Card> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        let hand = &state.hands[state.to_move];
        match state.led_suit() {
            Some(led) if hand.iter().any(|c| c.suit == led) => {
                hand.iter().copied().filter(|c| c.suit == led).collect()
            }
            _ => hand.clone(),
        }
    }

    fn apply(&self, state: &mut State, action: &Card, _rng: &mut ChaCha20Rng) {
        self.play(state, *action);
    }

    fn is_terminal(&self, state: &State) -> bool {
        state.tricks_played >= self.hand_size
    }

    fn result(&self, state: &State, player: PlayerId) -> f64 {
        score_results(&state.tricks_won)[player]
    }

    fn history<'a>(&self, state: &'a State) -> &'a [(PlayerId, Card)] {
        &state.history
    }

    fn redeterminize(&self, state: &State, observer: PlayerId, rng: &mut ChaCha20Rng) -> State {
        (0..REDEAL_ATTEMPTS)
            .find_map(|_| self.redeal(state, observer, rng))
            // the true deal is always consistent with what the observer saw
            .unwrap_or_else(|| state.clone())
    }

    fn heuristic_score(&self, state: &State, player: PlayerId) -> f64 {
        if self.is_terminal(state) {
            return self.result(state, player);
        }
        // tricks in hand plus an even share of the rest
        let remaining = (self.hand_size - state.tricks_played) as f64;
        let expected = state.tricks_won[player] as f64 + remaining / self.players as f64;
        expected / self.hand_size as f64
    }
}

#[cfg(test)]
mod tests;
