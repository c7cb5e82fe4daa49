//! The oracle contract, plus the two reference oracles the engine ships
//! for callers without a trained network and for its own test suite.

use crate::error::OracleError;
use crate::game::Game;

use rand::seq::SliceRandom;

/// Maps a game state and its legal actions to a prior over those actions
/// and a white-perspective value estimate.
///
/// `evaluate_batch` defaults to a sequential fallback over `evaluate`,
/// short-circuiting on the first failure — exactly what a caller with no
/// real batching hardware wants, and what [`RandomOracle`] and
/// [`RolloutOracle`] rely on.
pub trait Oracle<G: Game>: Send + Sync + 'static {
    /// Evaluates a single position. `prior.len() == actions.len()`.
    fn evaluate(
        &self,
        state: &G,
        actions: &[G::Action],
    ) -> Result<(Vec<f32>, f64), OracleError>;

    /// Evaluates a batch of positions. Default: sequential calls to
    /// [`Oracle::evaluate`].
    fn evaluate_batch(
        &self,
        batch: &[(G, Vec<G::Action>)],
    ) -> Result<Vec<(Vec<f32>, f64)>, OracleError> {
        batch
            .iter()
            .map(|(state, actions)| self.evaluate(state, actions))
            .collect()
    }
}

fn uniform_prior(n: usize) -> Vec<f32> {
    if n == 0 {
        Vec::new()
    } else {
        vec![1.0 / n as f32; n]
    }
}

/// Uniform prior, constant zero value. Cheapest possible oracle; mostly
/// useful to exercise the search mechanics (virtual loss, batching,
/// policy extraction) independently of any notion of position quality.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOracle;

impl<G: Game> Oracle<G> for RandomOracle {
    fn evaluate(&self, _state: &G, actions: &[G::Action]) -> Result<(Vec<f32>, f64), OracleError> {
        Ok((uniform_prior(actions.len()), 0.0))
    }
}

/// Uniform prior; value is obtained by playing uniformly random actions
/// from the evaluated state until termination, reporting the resulting
/// white-perspective reward. Slower than [`RandomOracle`] but gives the
/// tree an actual (if noisy) signal, which is what the classical "flat
/// Monte Carlo" baseline relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolloutOracle;

impl<G: Game> Oracle<G> for RolloutOracle {
    fn evaluate(&self, state: &G, actions: &[G::Action]) -> Result<(Vec<f32>, f64), OracleError> {
        let mut rollout = state.clone();
        let mut rng = rand::thread_rng();
        loop {
            if let Some(reward) = rollout.white_reward() {
                return Ok((uniform_prior(actions.len()), reward));
            }
            let moves = rollout.available_actions();
            let chosen = moves
                .choose(&mut rng)
                .expect("non-terminal state must report at least one action");
            rollout.play(chosen);
        }
    }
}
