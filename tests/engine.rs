//! End-to-end scenarios against the synchronous engine.

mod common;

use common::{TerminalRootGame, ThreeActionGame};
use mcts_engine::{Config, EngineError, Mcts, RandomOracle};

#[tokio::test]
async fn terminal_root_inserts_nothing_and_policy_requires_explore_first() {
    let game = TerminalRootGame::new(0.7);
    let engine = Mcts::new(RandomOracle, Config::synchronous());

    engine.explore(&game, 10).await.unwrap();

    assert_eq!(engine.node_count(), 0);
    let err = engine.policy(&game, 1.0).unwrap_err();
    assert!(matches!(err, EngineError::ExploreFirst));
}

#[tokio::test]
async fn one_ply_tree_favors_the_winning_action() {
    let game = ThreeActionGame::new();
    let engine = Mcts::new(RandomOracle, Config::synchronous());

    engine.explore(&game, 300).await.unwrap();

    let (actions, probs) = engine.policy(&game, 0.0).unwrap();
    let best = probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(actions[best], 0, "action 0 carries the +1 terminal reward");
    assert_eq!(probs[best], 1.0);
}

#[tokio::test]
async fn policy_sums_to_one_for_nonzero_tau() {
    let game = ThreeActionGame::new();
    let engine = Mcts::new(RandomOracle, Config::synchronous());
    engine.explore(&game, 64).await.unwrap();

    for tau in [0.25f32, 1.0, 4.0] {
        let (_, probs) = engine.policy(&game, tau).unwrap();
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "tau={tau} probs={probs:?}");
    }
}

#[tokio::test]
async fn reset_is_idempotent() {
    let game = ThreeActionGame::new();
    let engine = Mcts::new(RandomOracle, Config::synchronous());
    engine.explore(&game, 20).await.unwrap();
    assert!(engine.node_count() > 0);

    engine.reset();
    assert_eq!(engine.node_count(), 0);
    assert!(matches!(
        engine.policy(&game, 1.0).unwrap_err(),
        EngineError::ExploreFirst
    ));

    // A second reset on an already-empty engine must not panic or error.
    engine.reset();
    assert_eq!(engine.node_count(), 0);
}

#[tokio::test]
async fn deterministic_without_noise() {
    let game = ThreeActionGame::new();

    let a = Mcts::new(RandomOracle, Config::synchronous());
    a.explore(&game, 50).await.unwrap();
    let (_, probs_a) = a.policy(&game, 1.0).unwrap();

    let b = Mcts::new(RandomOracle, Config::synchronous());
    b.explore(&game, 50).await.unwrap();
    let (_, probs_b) = b.policy(&game, 1.0).unwrap();

    assert_eq!(probs_a, probs_b);
}

#[tokio::test]
async fn explore_calls_compose_like_a_single_larger_call() {
    let game = ThreeActionGame::new();

    let split = Mcts::new(RandomOracle, Config::synchronous());
    split.explore(&game, 10).await.unwrap();
    split.explore(&game, 20).await.unwrap();
    let (_, probs_split) = split.policy(&game, 1.0).unwrap();

    let combined = Mcts::new(RandomOracle, Config::synchronous());
    combined.explore(&game, 30).await.unwrap();
    let (_, probs_combined) = combined.policy(&game, 1.0).unwrap();

    assert_eq!(probs_split, probs_combined);
}
