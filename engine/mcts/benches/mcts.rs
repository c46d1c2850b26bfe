//! MCTS benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! These benchmarks measure:
//! - Full decisions with varying iteration budgets
//! - Decisions from different game states (opening, midgame, near-terminal)
//! - Topology comparison
//! - Tree operations (selection, backup, reuse)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use engine_core::{ActionSpace, Game};
use games_highcard::HighCard;
use games_tictactoe::{State, TicTacToe};
use mcts::selection::Selector;
use mcts::{
    Budget, MctsConfig, MctsNode, MctsPlayer, NullActionHeuristic, SearchTree, TreeTopology,
    ValueBounds,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// State after playing `moves` from the empty board.
fn play_moves(moves: &[u8]) -> State {
    let mut state = TicTacToe::new().initial_state();
    for &m in moves {
        state.play(m);
    }
    state
}

fn decide(config: &MctsConfig, state: &State, iterations: u64) -> u8 {
    let game = TicTacToe::new();
    let mut player = MctsPlayer::new(config.clone()).unwrap();
    player
        .decide(&game, state, &state.legal_moves(), Budget::iterations(iterations))
        .unwrap()
}

// =============================================================================
// Full Search Benchmarks
// =============================================================================

fn bench_mcts_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_iterations");
    let state = play_moves(&[]);
    let config = MctsConfig::for_testing();

    for iterations in [50u64, 100, 200, 400, 800, 1600] {
        group.throughput(Throughput::Elements(iterations));
        group.bench_with_input(
            BenchmarkId::new("tictactoe", iterations),
            &iterations,
            |b, &iterations| b.iter(|| black_box(decide(&config, &state, iterations))),
        );
    }

    group.finish();
}

fn bench_mcts_game_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_game_phases");
    let config = MctsConfig::for_testing();

    // Board: X at 4, O at 0, X at 2, O at 6
    for (name, moves) in [
        ("opening", &[][..]),
        ("midgame", &[4, 0, 2, 6][..]),
        ("near_terminal", &[0, 3, 1, 4][..]),
    ] {
        let state = play_moves(moves);
        group.bench_function(name, |b| b.iter(|| black_box(decide(&config, &state, 200))));
    }

    group.finish();
}

fn bench_topologies(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_topologies");
    let state = play_moves(&[4]);

    for topology in [
        TreeTopology::OneTree,
        TreeTopology::SelfOnly,
        TreeTopology::MultiTree,
        TreeTopology::Mcgs,
        TreeTopology::Oma,
    ] {
        let config = MctsConfig::for_testing().with_topology(topology);
        group.bench_with_input(
            BenchmarkId::new("tictactoe", topology),
            &config,
            |b, config| b.iter(|| black_box(decide(config, &state, 200))),
        );
    }

    // hidden information: a fresh determinization every iteration
    group.bench_function("highcard_redeterminize", |b| {
        let game = HighCard::new(3, 5).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let state = game.deal(&mut rng);
        let legal = game.legal_actions(&state, ActionSpace::Default);
        let config = MctsConfig::for_testing();

        b.iter(|| {
            let mut player = MctsPlayer::new(config.clone()).unwrap();
            black_box(
                player
                    .decide(&game, &state, &legal, Budget::iterations(200))
                    .unwrap(),
            )
        });
    });

    group.finish();
}

// =============================================================================
// Tree Operation Benchmarks
// =============================================================================

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_tree_ops");
    let game = TicTacToe::new();
    let state = game.initial_state();
    let actions = state.legal_moves();

    group.bench_function("allocate_node", |b| {
        b.iter(|| {
            let mut tree: SearchTree<State, u8> = SearchTree::new(0, 2);
            let root = tree.allocate(MctsNode::new_root(0, 0, 2));
            for i in 0..100u8 {
                tree.add_child(root, i % 9, 1, MctsNode::new_child(root, i % 9, 1, 1, 2));
            }
            black_box(tree.len())
        });
    });

    group.bench_function("select_action", |b| {
        let mut node: MctsNode<State, u8> = MctsNode::new_root(0, 0, 2);
        for i in 0..450u32 {
            let action = (i % 9) as u8;
            let value = action as f64 / 8.0;
            node.offer_actions(&actions, 2);
            node.record_visit(&[value, 1.0 - value], Some(&action), u32::MAX);
        }
        let config = MctsConfig::default();
        let mut bounds = ValueBounds::default();
        bounds.observe(0.0);
        bounds.observe(1.0);
        let selector: Selector<'_, TicTacToe> = Selector {
            config: &config,
            bounds: &bounds,
            root_player: 0,
            action_heuristic: &NullActionHeuristic,
            mast: None,
        };
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        b.iter(|| black_box(selector.select(&node, None, &actions, &[], &mut rng)));
    });

    group.bench_function("reuse_tree", |b| {
        let config = MctsConfig::default();
        b.iter_batched(
            || {
                let mut player = MctsPlayer::new(config.clone()).unwrap();
                let first = player
                    .decide(&game, &state, &actions, Budget::iterations(400))
                    .unwrap();
                let mut next = state.clone();
                next.play(first);
                let reply = next.legal_moves()[0];
                next.play(reply);
                (player, next)
            },
            |(mut player, next)| {
                black_box(
                    player
                        .decide(&game, &next, &next.legal_moves(), Budget::iterations(1))
                        .unwrap(),
                )
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mcts_iterations,
    bench_mcts_game_phases,
    bench_topologies,
    bench_tree_operations,
);

criterion_main!(benches);
