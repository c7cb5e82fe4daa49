//! Deterministic reference games and oracles shared by the integration
//! tests: none of these are part of the crate's public API, they exist
//! purely to drive [`mcts_engine::Mcts`] against known-shape trees.

use mcts_engine::{Game, Oracle, OracleError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A root that is itself terminal: `explore!` must never create a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitBoard;

#[derive(Clone, Debug)]
pub struct TerminalRootGame {
    reward: f64,
}

impl TerminalRootGame {
    pub fn new(reward: f64) -> Self {
        TerminalRootGame { reward }
    }
}

impl Game for TerminalRootGame {
    type Action = u8;
    type Board = UnitBoard;

    fn white_reward(&self) -> Option<f64> {
        Some(self.reward)
    }
    fn white_playing(&self) -> bool {
        true
    }
    fn canonical_board(&self) -> Self::Board {
        UnitBoard
    }
    fn available_actions(&self) -> Vec<Self::Action> {
        Vec::new()
    }
    fn play(&mut self, _action: &Self::Action) {
        unreachable!("terminal root has no action to play")
    }
    fn num_actions() -> usize {
        0
    }
}

/// A single non-terminal root with three actions leading directly to
/// fixed terminal payouts `[+1, 0, -1]` for white (scenario 2).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ThreeActionBoard {
    Root,
    Leaf(u8),
}

#[derive(Clone, Debug)]
pub struct ThreeActionGame {
    state: ThreeActionBoard,
}

impl ThreeActionGame {
    pub fn new() -> Self {
        ThreeActionGame {
            state: ThreeActionBoard::Root,
        }
    }
}

impl Game for ThreeActionGame {
    type Action = u8;
    type Board = ThreeActionBoard;

    fn white_reward(&self) -> Option<f64> {
        match self.state {
            ThreeActionBoard::Root => None,
            ThreeActionBoard::Leaf(0) => Some(1.0),
            ThreeActionBoard::Leaf(1) => Some(0.0),
            ThreeActionBoard::Leaf(2) => Some(-1.0),
            ThreeActionBoard::Leaf(_) => unreachable!(),
        }
    }
    fn white_playing(&self) -> bool {
        true
    }
    fn canonical_board(&self) -> Self::Board {
        self.state.clone()
    }
    fn available_actions(&self) -> Vec<Self::Action> {
        match self.state {
            ThreeActionBoard::Root => vec![0, 1, 2],
            ThreeActionBoard::Leaf(_) => Vec::new(),
        }
    }
    fn play(&mut self, action: &Self::Action) {
        self.state = ThreeActionBoard::Leaf(*action);
    }
    fn num_actions() -> usize {
        3
    }
}

/// A root with four equally-good actions, each leading to a distinct
/// non-terminal child (scenarios 3-4: virtual-loss spread and batch
/// padding both need the oracle to actually be consulted for the child,
/// which a terminal child would skip entirely).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpreadBoard {
    Root,
    Child(u8),
}

#[derive(Clone, Debug)]
pub struct SpreadGame {
    state: SpreadBoard,
}

impl SpreadGame {
    pub fn new() -> Self {
        SpreadGame {
            state: SpreadBoard::Root,
        }
    }
}

impl Game for SpreadGame {
    type Action = u8;
    type Board = SpreadBoard;

    fn white_reward(&self) -> Option<f64> {
        None
    }
    fn white_playing(&self) -> bool {
        true
    }
    fn canonical_board(&self) -> Self::Board {
        self.state.clone()
    }
    fn available_actions(&self) -> Vec<Self::Action> {
        match self.state {
            SpreadBoard::Root => vec![0, 1, 2, 3],
            SpreadBoard::Child(_) => vec![0],
        }
    }
    fn play(&mut self, action: &Self::Action) {
        self.state = match self.state {
            SpreadBoard::Root => SpreadBoard::Child(*action),
            SpreadBoard::Child(c) => SpreadBoard::Child(c),
        };
    }
    fn num_actions() -> usize {
        4
    }
}

fn uniform_prior(n: usize) -> Vec<f32> {
    if n == 0 {
        Vec::new()
    } else {
        vec![1.0 / n as f32; n]
    }
}

/// Uniform-prior, constant-value oracle that blocks the calling thread
/// for `delay` on every evaluation — long enough to make the window
/// during which several workers have concurrently in-flight requests
/// observable and deterministic in a test, without relying on real
/// scheduling luck — and records the size of every batch it is asked to
/// evaluate, so a test can assert on the inference server's actual
/// batching behavior.
#[derive(Debug, Clone)]
pub struct RecordingOracle {
    pub delay: Duration,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
}

impl RecordingOracle {
    pub fn new(delay: Duration) -> Self {
        RecordingOracle {
            delay,
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of every batch size `evaluate_batch` was called with, in
    /// call order. Cheap to call from a test after `explore` returns
    /// thanks to `clone`-ing this oracle before handing a copy to the
    /// engine: both copies share the same underlying recorder.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

impl<G: Game> Oracle<G> for RecordingOracle {
    fn evaluate(&self, _state: &G, actions: &[G::Action]) -> Result<(Vec<f32>, f64), OracleError> {
        std::thread::sleep(self.delay);
        Ok((uniform_prior(actions.len()), 0.0))
    }

    fn evaluate_batch(
        &self,
        batch: &[(G, Vec<G::Action>)],
    ) -> Result<Vec<(Vec<f32>, f64)>, OracleError> {
        self.batch_sizes.lock().unwrap().push(batch.len());
        std::thread::sleep(self.delay);
        Ok(batch
            .iter()
            .map(|(_, actions)| (uniform_prior(actions.len()), 0.0))
            .collect())
    }
}
