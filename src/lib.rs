//! Asynchronous PUCT / Monte Carlo Tree Search core for AlphaZero-style
//! agents.
//!
//! The engine is generic over a [`Game`] and an [`Oracle`]; it knows
//! nothing about any concrete board game or neural network. A single
//! [`Mcts`] instance owns one search tree and drives it through repeated
//! [`Mcts::explore`] calls, either in synchronous mode (one worker, the
//! oracle called in-line) or asynchronous mode (several workers plus a
//! batching inference server), selected purely by `Config::nworkers`.

mod config;
mod engine;
mod error;
mod game;
mod oracle;
mod puct;
mod server;
mod tree;
mod worker;

pub use config::Config;
pub use engine::Mcts;
pub use error::{EngineError, OracleError, Result};
pub use game::{Action, Board, Game};
pub use oracle::{Oracle, RandomOracle, RolloutOracle};
pub use tree::ActionStats;
