//! The game contract the engine searches over.
//!
//! This module defines only the capability set the core depends on: board
//! copying, legal-action enumeration, terminal detection, reward reporting
//! and perspective switching. Concrete games (a real Breakthrough, Tak,
//! whatever) live outside this crate; the test suite ships trivial
//! fixtures of its own (see `tests/common`).

use std::fmt::Debug;
use std::hash::Hash;

/// An action applicable to a game state.
pub trait Action: Copy + Eq + Hash + Debug + Send + Sync + 'static {}
impl<T> Action for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// A canonical, hashable board representation used as the tree key.
///
/// Stable under whatever symmetries/perspective changes the game considers
/// irrelevant; two states that are the same node for search purposes must
/// produce equal keys.
pub trait Board: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
impl<T> Board for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Two-player, zero-sum, perfect-information game state.
///
/// Implementations are expected to be cheap to clone (the engine clones the
/// root once per simulation) and are treated as infallible: a game that
/// cannot apply a move it itself reported as legal is a programming error,
/// not a recoverable failure.
pub trait Game: Clone + Send + Sync + 'static {
    /// Action type for this game.
    type Action: Action;
    /// Canonical board key type for this game.
    type Board: Board;

    /// Reward from white's perspective if the state is terminal, `None`
    /// otherwise.
    fn white_reward(&self) -> Option<f64>;

    /// Whether white is the side to move. Meaningless on a terminal state.
    fn white_playing(&self) -> bool;

    /// Canonical board encoding used as the tree key.
    fn canonical_board(&self) -> Self::Board;

    /// Legal actions from this state, in a stable order for a given
    /// canonical board (the tree store indexes edges by position in this
    /// list).
    fn available_actions(&self) -> Vec<Self::Action>;

    /// Applies `action` in place.
    fn play(&mut self, action: &Self::Action);

    /// Upper bound on the number of legal actions in any position of this
    /// game, used only for the analytical memory estimate in diagnostics.
    fn num_actions() -> usize;

    /// Approximate size in bytes of a canonical board key, used only for
    /// the analytical memory estimate in diagnostics.
    fn board_memsize() -> usize {
        std::mem::size_of::<Self::Board>()
    }
}
