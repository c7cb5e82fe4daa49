//! Worker descent/backup logic, generalized over how an unseen node gets
//! its oracle evaluation: a direct in-line call in synchronous mode, or a
//! mailbox round-trip to the inference server in asynchronous mode. The
//! descent code itself does not know which.

use crate::error::{EngineError, Result};
use crate::game::Game;
use crate::oracle::Oracle;
use crate::tree::TreeStore;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// One pending evaluation request, carried across a worker's `send`
/// mailbox to the inference server. Carries the full playable game state
/// (not just the canonical key) since the oracle needs it to featurize
/// or, for [`crate::oracle::RolloutOracle`], to keep playing.
#[derive(Clone)]
pub struct Request<G: Game> {
    pub state: G,
    pub actions: Vec<G::Action>,
}

/// The oracle's response to one [`Request`], or the terminal failure that
/// ends the containing `explore!` call (routed to every still-live
/// worker on an oracle failure).
pub type Response = std::result::Result<(Vec<f32>, f64), EngineError>;

/// A worker's view of its own path stack: `(board, white_playing,
/// action_index)` triples recorded on the way down, walked backward by
/// [`backup`].
pub type Stack<G> = Vec<(<G as Game>::Board, bool, usize)>;

/// Abstracts "how do I get an oracle evaluation for this unseen node"
/// over the synchronous/asynchronous mode split. `descend` is generic
/// over this so the same traversal code drives both modes.
#[async_trait]
pub trait Requester<G: Game>: Send {
    async fn request(&mut self, state: G, actions: Vec<G::Action>) -> Result<(Vec<f32>, f64)>;

    /// Called once, after this requester's owning worker has exhausted
    /// the remaining-simulations counter. A no-op in synchronous mode;
    /// posts the `None` termination sentinel in asynchronous mode.
    async fn finished(&mut self) {}
}

/// Synchronous-mode requester: calls the oracle in-line, no channel, no
/// suspension point at all. Times its own calls into
/// `inference_time_nanos` the same way the inference server times
/// `evaluate_batch` in asynchronous mode, so `Mcts::inference_time_ratio`
/// stays meaningful regardless of which mode drove the search.
pub struct SyncRequester<'a, G: Game, O: Oracle<G>> {
    oracle: &'a O,
    inference_time_nanos: &'a AtomicU64,
    _g: std::marker::PhantomData<fn() -> G>,
}

impl<'a, G: Game, O: Oracle<G>> SyncRequester<'a, G, O> {
    pub fn new(oracle: &'a O, inference_time_nanos: &'a AtomicU64) -> Self {
        SyncRequester {
            oracle,
            inference_time_nanos,
            _g: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<'a, G: Game, O: Oracle<G>> Requester<G> for SyncRequester<'a, G, O> {
    async fn request(&mut self, state: G, actions: Vec<G::Action>) -> Result<(Vec<f32>, f64)> {
        let start = Instant::now();
        let result = self.oracle.evaluate(&state, &actions);
        self.inference_time_nanos
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        result.map_err(EngineError::Oracle)
    }
}

/// Asynchronous-mode requester: places the request in the worker's
/// single-slot `send` mailbox (releasing no lock of its own — the tree
/// was never locked across this await, see [`descend`]) and blocks on
/// `recv`. `id` is a diagnostic-only worker index (§4.5), used in log
/// output; it plays no role in selection, backup or mailbox routing.
pub struct MailboxRequester<G: Game> {
    pub id: usize,
    pub to_server: mpsc::Sender<Option<Request<G>>>,
    pub from_server: mpsc::Receiver<Response>,
}

#[async_trait]
impl<G: Game> Requester<G> for MailboxRequester<G> {
    async fn request(&mut self, state: G, actions: Vec<G::Action>) -> Result<(Vec<f32>, f64)> {
        self.to_server
            .send(Some(Request { state, actions }))
            .await
            .map_err(|_| EngineError::Worker("inference server mailbox closed".into()))?;
        match self.from_server.recv().await {
            Some(Ok(result)) => Ok(result),
            Some(Err(e)) => Err(e),
            None => Err(EngineError::Worker(
                "inference server dropped this worker's reply mailbox".into(),
            )),
        }
    }

    async fn finished(&mut self) {
        log::debug!("worker {} finished its share of the simulations", self.id);
        // A `None` message is the termination sentinel the server is
        // watching for.
        let _ = self.to_server.send(None).await;
    }
}

/// Descends from `root`, consulting the tree and the requester, until it
/// reaches a terminal state or a freshly created leaf, pushing visited
/// `(board, white_playing, action_index)` triples onto `stack` as it
/// goes. Returns the white-perspective return to back up.
pub async fn descend<G, R>(
    tree: &TreeStore<G>,
    requester: &mut R,
    mut board: G,
    cpuct: f32,
    noise_eps: f32,
    root_noise: Option<&[f32]>,
    stack: &mut Stack<G>,
    total_nodes_traversed: &AtomicU64,
) -> Result<f64>
where
    G: Game,
    R: Requester<G>,
{
    let mut is_root = true;
    loop {
        if let Some(reward) = board.white_reward() {
            return Ok(reward);
        }

        let key = board.canonical_board();
        let actions = board.available_actions();

        if !tree.contains(&key) {
            let (prior, value) = requester.request(board.clone(), actions.clone()).await?;
            let (is_new, vest) = tree.insert_if_absent(&key, &actions, prior, value);
            if is_new {
                return Ok(vest);
            }
            // Someone else created the node while we awaited the oracle;
            // discard our own result and fall through to select against
            // the now-existing node.
        }

        total_nodes_traversed.fetch_add(1, Ordering::Relaxed);

        let noise = if is_root { root_noise } else { None };
        let (action_index, action) = tree.select_and_visit(&key, cpuct, noise_eps, noise);
        stack.push((key, board.white_playing(), action_index));
        board.play(&action);
        is_root = false;
    }
}

/// Walks `stack` backward, crediting each visited edge with `reward` from
/// that side's perspective. Empties `stack` on success; a non-empty stack
/// afterward would violate the invariant that a worker's stack is empty
/// between simulations.
pub fn backup<G: Game>(tree: &TreeStore<G>, stack: &mut Stack<G>, reward: f64) {
    while let Some((board, was_white, action_index)) = stack.pop() {
        let signed_reward = if was_white { reward } else { -reward };
        tree.apply_backup(&board, action_index, signed_reward);
    }
    debug_assert!(stack.is_empty());
}

/// Runs one descent+backup per claimed simulation until the shared
/// remaining-simulations counter is drained, using `requester` for
/// unseen-node evaluation. Shared by both modes: in synchronous mode
/// `run_simulations` is simply called once on the calling task with a
/// [`SyncRequester`]; in asynchronous mode it is spawned once per worker
/// with a [`MailboxRequester`].
pub async fn run_simulations<G, R>(
    tree: &TreeStore<G>,
    requester: &mut R,
    root: &G,
    cpuct: f32,
    noise_eps: f32,
    root_noise: Option<&[f32]>,
    total_iterations: &AtomicU64,
    total_nodes_traversed: &AtomicU64,
) -> Result<()>
where
    G: Game,
    R: Requester<G>,
{
    let mut stack = Vec::new();
    while tree.claim_simulation() {
        total_iterations.fetch_add(1, Ordering::Relaxed);
        let reward = descend(
            tree,
            requester,
            root.clone(),
            cpuct,
            noise_eps,
            root_noise,
            &mut stack,
            total_nodes_traversed,
        )
        .await?;
        backup(tree, &mut stack, reward);
    }
    requester.finished().await;
    Ok(())
}
