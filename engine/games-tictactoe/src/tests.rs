use super::*;
use rand::{Rng, SeedableRng};

fn rng() -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(42)
}

#[test]
fn test_initial_state() {
    let state = State::new();
    assert_eq!(state.board, [0; 9]);
    assert_eq!(state.current_player, 1);
    assert_eq!(state.winner, 0);
    assert!(!state.is_done());
    assert!(state.history.is_empty());
}

#[test]
fn test_legal_moves() {
    let game = TicTacToe::new();
    let mut state = game.initial_state();
    assert_eq!(
        game.legal_actions(&state, ActionSpace::Default),
        (0..9).collect::<Vec<_>>()
    );

    // After one move
    game.apply(&mut state, &4, &mut rng()); // Center
    let legal = game.legal_actions(&state, ActionSpace::Default);
    assert_eq!(legal.len(), 8);
    assert!(!legal.contains(&4));
}

#[test]
fn test_apply_records_history_and_switches_player() {
    let game = TicTacToe::new();
    let mut state = game.initial_state();
    let mut rng = rng();

    game.apply(&mut state, &4, &mut rng);
    game.apply(&mut state, &0, &mut rng);

    assert_eq!(state.board[4], 1);
    assert_eq!(state.board[0], 2);
    assert_eq!(game.current_player(&state), 0);
    assert_eq!(game.history(&state), &[(0, 4), (1, 0)]);
}

#[test]
fn test_invalid_move() {
    let mut state = State::new();
    state.play(4);
    let before = state.clone();

    // Try to place in same position
    state.play(4);
    assert_eq!(state, before);
}

#[test]
fn test_try_play_reports_errors() {
    let mut state = State::new();
    assert!(state.try_play(4).is_ok());
    assert_eq!(
        state.try_play(4),
        Err(GameError::IllegalAction {
            player: 1,
            action: "4".into()
        })
    );
    assert!(matches!(state.try_play(9), Err(GameError::IllegalAction { .. })));

    let mut done = State::from_board([1, 1, 1, 2, 2, 0, 0, 0, 0]);
    assert_eq!(done.try_play(5), Err(GameError::GameOver));
}

#[test]
fn test_winning_game() {
    let game = TicTacToe::new();
    let mut state = State::new();

    // X wins with top row
    for m in [0, 3, 1, 4, 2] {
        state.play(m);
    }

    assert_eq!(state.winner, 1);
    assert!(game.is_terminal(&state));
    assert!(state.legal_moves().is_empty());
    assert_eq!(game.result(&state, 0), 1.0);
    assert_eq!(game.result(&state, 1), 0.0);
}

#[test]
fn test_draw_game() {
    // Board: X O X / O X O / O X O
    let state = State::from_board([1, 2, 1, 2, 1, 2, 2, 1, 2]);
    let game = TicTacToe::new();

    assert_eq!(State::check_winner(&state.board), 3);
    assert!(state.is_done());
    assert_eq!(game.result(&state, 0), 0.5);
    assert_eq!(game.result(&state, 1), 0.5);
}

#[test]
fn test_from_board_derives_player_to_move() {
    let state = State::from_board([1, 1, 0, 2, 2, 0, 0, 0, 0]);
    assert_eq!(state.seat_to_move(), 0);

    let state = State::from_board([1, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(state.seat_to_move(), 1);
}

#[test]
fn test_state_key_merges_transpositions() {
    let game = TicTacToe::new();
    let mut rng = rng();

    let mut a = game.initial_state();
    for m in [0, 4, 8] {
        game.apply(&mut a, &m, &mut rng);
    }
    let mut b = game.initial_state();
    for m in [8, 4, 0] {
        game.apply(&mut b, &m, &mut rng);
    }

    assert_ne!(game.history(&a), game.history(&b));
    assert_eq!(game.state_key(&a), game.state_key(&b));

    let mut c = game.initial_state();
    for m in [0, 4, 7] {
        game.apply(&mut c, &m, &mut rng);
    }
    assert_ne!(game.state_key(&a), game.state_key(&c));
}

#[test]
fn test_redeterminize_is_identity() {
    let game = TicTacToe::new();
    let mut state = game.initial_state();
    state.play(2);
    let copy = game.redeterminize(&state, 1, &mut rng());
    assert_eq!(copy, state);
}

/// Play many random games and verify invariants hold
#[test]
fn test_random_games_invariants() {
    let game = TicTacToe::new();

    for seed in 0..50 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut state = game.initial_state();
        let mut move_count = 0;

        while !game.is_terminal(&state) {
            let legal = game.legal_actions(&state, ActionSpace::Default);
            assert!(
                !legal.is_empty(),
                "Non-done game must have legal moves (seed={}, moves={})",
                seed,
                move_count
            );

            let action = legal[rng.gen_range(0..legal.len())];
            let prev = game.current_player(&state);
            game.apply(&mut state, &action, &mut rng);
            move_count += 1;

            if !game.is_terminal(&state) {
                assert_ne!(game.current_player(&state), prev);
            }
        }

        assert!(move_count <= 9);
        assert_eq!(game.history(&state).len(), move_count);
        let total: f64 = (0..2).map(|p| game.result(&state, p)).sum();
        assert!((total - 1.0).abs() < 1e-9, "results must sum to one");
    }
}
