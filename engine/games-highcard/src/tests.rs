use super::*;
use rand::{Rng, SeedableRng};

fn setup(players: usize, hand_size: usize, seed: u64) -> (HighCard, State, ChaCha20Rng) {
    let game = HighCard::new(players, hand_size).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let state = game.deal(&mut rng);
    (game, state, rng)
}

fn unseen_cards(state: &State, observer: PlayerId) -> Vec<Card> {
    let mut cards: Vec<Card> = state.deck.clone();
    for (p, hand) in state.hands.iter().enumerate() {
        if p != observer {
            cards.extend_from_slice(hand);
        }
    }
    cards.sort();
    cards
}

#[test]
fn test_new_validates_configuration() {
    assert!(HighCard::new(1, 5).is_err());
    assert!(HighCard::new(4, 0).is_err());
    assert!(HighCard::new(5, 11).is_err());
    assert!(HighCard::new(4, 13).is_ok());
}

#[test]
fn test_deal() {
    let (game, state, _) = setup(3, 5, 1);

    assert_eq!(game.n_players(&state), 3);
    assert_eq!(game.current_player(&state), 0);
    for p in 0..3 {
        assert_eq!(state.hand(p).len(), 5);
    }
    assert_eq!(state.deck().len(), 52 - 15);
    assert!(!game.is_terminal(&state));
    assert!(game.history(&state).is_empty());
}

#[test]
fn test_must_follow_suit() {
    let game = HighCard::new(2, 2).unwrap();
    let mut state = State {
        hands: vec![
            vec![Card::new(0, 5), Card::new(1, 3)],
            vec![Card::new(0, 9), Card::new(2, 12)],
        ],
        deck: Vec::new(),
        table: Vec::new(),
        tricks_won: vec![0, 0],
        voids: vec![[false; 4]; 2],
        to_move: 0,
        tricks_played: 0,
        history: Vec::new(),
    };
    let mut rng = ChaCha20Rng::seed_from_u64(0);

    game.apply(&mut state, &Card::new(0, 5), &mut rng);
    assert_eq!(
        game.legal_actions(&state, ActionSpace::Default),
        vec![Card::new(0, 9)]
    );
    assert!(matches!(
        game.try_play(&mut state, Card::new(2, 12)),
        Err(GameError::IllegalAction { player: 1, .. })
    ));

    game.apply(&mut state, &Card::new(0, 9), &mut rng);
    // seat 1 took the trick and leads next
    assert_eq!(state.tricks_won(), &[0, 1]);
    assert_eq!(game.current_player(&state), 1);
    assert!(state.table().is_empty());
}

#[test]
fn test_void_is_recorded() {
    let game = HighCard::new(2, 1).unwrap();
    let mut state = State {
        hands: vec![vec![Card::new(3, 0)], vec![Card::new(1, 0)]],
        deck: Vec::new(),
        table: Vec::new(),
        tricks_won: vec![0, 0],
        voids: vec![[false; 4]; 2],
        to_move: 0,
        tricks_played: 0,
        history: Vec::new(),
    };
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    game.apply(&mut state, &Card::new(3, 0), &mut rng);
    game.apply(&mut state, &Card::new(1, 0), &mut rng);

    assert!(state.is_void(1, 3));
    assert!(!state.is_void(0, 3));
    // off-suit card never wins, even when higher
    assert_eq!(state.tricks_won(), &[1, 0]);
    assert!(game.is_terminal(&state));
    assert_eq!(game.result(&state, 0), 1.0);
    assert_eq!(game.result(&state, 1), 0.0);
}

#[test]
fn test_redeterminize_preserves_observable_state() {
    let (game, mut state, mut rng) = setup(3, 6, 11);

    // play a few cards so the table and history are non-trivial
    for _ in 0..4 {
        let legal = game.legal_actions(&state, ActionSpace::Default);
        let card = legal[rng.gen_range(0..legal.len())];
        game.apply(&mut state, &card, &mut rng);
    }

    let observer = game.current_player(&state);
    let mut saw_difference = false;
    for _ in 0..20 {
        let copy = game.redeterminize(&state, observer, &mut rng);

        assert_eq!(copy.hand(observer), state.hand(observer));
        assert_eq!(copy.table(), state.table());
        assert_eq!(copy.tricks_won(), state.tricks_won());
        assert_eq!(copy.voids, state.voids);
        assert_eq!(copy.to_move, state.to_move);
        assert_eq!(game.history(&copy), game.history(&state));
        assert_eq!(copy.deck().len(), state.deck().len());
        for p in 0..3 {
            assert_eq!(copy.hand(p).len(), state.hand(p).len());
            for card in copy.hand(p) {
                assert!(!copy.is_void(p, card.suit));
            }
        }
        assert_eq!(unseen_cards(&copy, observer), unseen_cards(&state, observer));

        if copy.hands != state.hands {
            saw_difference = true;
        }
    }
    assert!(saw_difference, "hidden hands should be resampled");
}

#[test]
fn test_heuristic_score() {
    let (game, state, _) = setup(4, 4, 3);
    // nothing won yet: everyone expects an even share
    for p in 0..4 {
        assert!((game.heuristic_score(&state, p) - 0.25).abs() < 1e-9);
    }
}

/// Play many random games and verify invariants hold
#[test]
fn test_random_games_invariants() {
    for seed in 0..30 {
        let players = 2 + (seed as usize % 3);
        let (game, mut state, mut rng) = setup(players, 5, seed);
        let mut moves = 0;

        while !game.is_terminal(&state) {
            let legal = game.legal_actions(&state, ActionSpace::Default);
            assert!(!legal.is_empty(), "seed={} moves={}", seed, moves);
            let card = legal[rng.gen_range(0..legal.len())];
            game.apply(&mut state, &card, &mut rng);
            moves += 1;
        }

        assert_eq!(moves, players * 5);
        assert_eq!(state.tricks_won().iter().sum::<i32>(), 5);
        assert!(state.hands.iter().all(|h| h.is_empty()));
        let best = (0..players).map(|p| game.result(&state, p)).fold(0.0, f64::max);
        assert!(best > 0.0, "someone must share the lead");
    }
}
