//! The public search engine: `explore`, `policy`, `reset`, and the
//! diagnostic accessors.

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::game::Game;
use crate::oracle::Oracle;
use crate::puct;
use crate::server;
use crate::tree::TreeStore;
use crate::worker::{self, SyncRequester};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A PUCT search engine bound to one oracle and one configuration.
///
/// `Mcts` owns the tree across calls to [`Mcts::explore`], so repeated
/// calls against descendants of a previously explored root reuse whatever
/// subtree is still reachable — callers wanting a fresh tree call
/// [`Mcts::reset`] first. The oracle, tree and counters are `Arc`-wrapped so
/// that asynchronous mode can hand each worker and the inference server its
/// own owned handle and spawn them as independent tasks.
pub struct Mcts<G: Game, O: Oracle<G>> {
    oracle: Arc<O>,
    config: Config,
    tree: Arc<TreeStore<G>>,
    total_iterations: Arc<AtomicU64>,
    total_nodes_traversed: Arc<AtomicU64>,
    inference_time_nanos: Arc<AtomicU64>,
    total_time_nanos: AtomicU64,
}

impl<G: Game, O: Oracle<G>> Mcts<G, O> {
    pub fn new(oracle: O, config: Config) -> Self {
        log::info!(
            "mcts engine constructed: nworkers={} cpuct={} noise_eps={}",
            config.nworkers,
            config.cpuct,
            config.noise_eps
        );
        Mcts {
            oracle: Arc::new(oracle),
            config,
            tree: Arc::new(TreeStore::new()),
            total_iterations: Arc::new(AtomicU64::new(0)),
            total_nodes_traversed: Arc::new(AtomicU64::new(0)),
            inference_time_nanos: Arc::new(AtomicU64::new(0)),
            total_time_nanos: AtomicU64::new(0),
        }
    }

    /// Runs `nsims` simulations from `root`. Dispatches to synchronous
    /// or asynchronous mode depending on `config.nworkers`; both modes
    /// share the same `descend`/`backup` core.
    pub async fn explore(&self, root: &G, nsims: usize) -> Result<()> {
        let start = Instant::now();
        self.tree.arm(nsims);

        log::info!(
            "explore: {} simulations requested, {} worker(s)",
            nsims,
            self.config.nworkers
        );

        let result = self.run_explore(root).await;

        self.total_time_nanos
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        debug_assert_eq!(self.tree.total_in_flight(), 0);
        if let Err(ref e) = result {
            log::error!("explore failed: {}", e);
        }
        result
    }

    async fn run_explore(&self, root: &G) -> Result<()> {
        self.ensure_root_expanded(root)?;

        let root_actions = root.available_actions();
        let root_noise: Option<Arc<[f32]>> = if self.config.noise_eps > 0.0 {
            Some(Arc::from(puct::sample_dirichlet(
                self.config.noise_alpha,
                root_actions.len(),
            )))
        } else {
            None
        };

        if self.config.is_async() {
            self.explore_async(root, root_noise).await
        } else {
            self.explore_sync(root, root_noise.as_deref()).await
        }
    }

    /// Expands the root once, up front, outside the counted-simulation
    /// loop — so that, unlike an interior node discovered mid-descent, the
    /// root's first-ever expansion never "spends" one of the caller's
    /// `nsims` without selecting an action, and never races `nworkers`
    /// identical oracle requests against each other on the very first
    /// batch. A no-op if the root is terminal or already in the tree (a
    /// second `explore!` against the same or a transposing state).
    fn ensure_root_expanded(&self, root: &G) -> Result<()> {
        if root.white_reward().is_some() {
            return Ok(());
        }
        let key = root.canonical_board();
        if self.tree.contains(&key) {
            return Ok(());
        }
        let actions = root.available_actions();
        let start = Instant::now();
        let result = self.oracle.evaluate(root, &actions);
        self.inference_time_nanos
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        let (prior, value) = result.map_err(EngineError::Oracle)?;
        self.tree.insert_if_absent(&key, &actions, prior, value);
        Ok(())
    }

    async fn explore_sync(&self, root: &G, root_noise: Option<&[f32]>) -> Result<()> {
        let mut requester = SyncRequester::new(&self.oracle, &self.inference_time_nanos);
        worker::run_simulations(
            &self.tree,
            &mut requester,
            root,
            self.config.cpuct,
            self.config.noise_eps,
            root_noise,
            &self.total_iterations,
            &self.total_nodes_traversed,
        )
        .await
    }

    async fn explore_async(&self, root: &G, root_noise: Option<Arc<[f32]>>) -> Result<()> {
        let nworkers = self.config.nworkers;
        let (worker_halves, server_halves) = server::make_channels::<G>(nworkers);

        let server_oracle = Arc::clone(&self.oracle);
        let server_inference_time = Arc::clone(&self.inference_time_nanos);
        let fill_batches = self.config.fill_batches;
        let server_handle = tokio::spawn(async move {
            server::run(
                &server_oracle,
                server_halves,
                fill_batches,
                &server_inference_time,
            )
            .await;
        });

        let mut worker_handles = Vec::with_capacity(nworkers);
        for (id, (to_server, from_server)) in worker_halves.into_iter().enumerate() {
            let tree = Arc::clone(&self.tree);
            let root = root.clone();
            let cpuct = self.config.cpuct;
            let noise_eps = self.config.noise_eps;
            let root_noise = root_noise.clone();
            let total_iterations = Arc::clone(&self.total_iterations);
            let total_nodes_traversed = Arc::clone(&self.total_nodes_traversed);

            worker_handles.push(tokio::spawn(async move {
                let mut requester = worker::MailboxRequester {
                    id,
                    to_server,
                    from_server,
                };
                worker::run_simulations(
                    &tree,
                    &mut requester,
                    &root,
                    cpuct,
                    noise_eps,
                    root_noise.as_deref(),
                    &total_iterations,
                    &total_nodes_traversed,
                )
                .await
            }));
        }

        let (server_result, worker_results) =
            tokio::join!(server_handle, futures::future::join_all(worker_handles));

        server_result
            .map_err(|e| EngineError::Worker(format!("inference server task panicked: {}", e)))?;

        for result in worker_results {
            match result {
                Ok(inner) => inner?,
                Err(e) => {
                    return Err(EngineError::Worker(format!("worker task panicked: {}", e)))
                }
            }
        }
        Ok(())
    }

    /// Extracts a move distribution over `root`'s actions from visit
    /// counts. `tau == 0.0` selects the most-visited action(s) one-hot,
    /// tiebreaking to the lowest index; otherwise each action's weight is
    /// proportional to `N^(1/tau)`.
    ///
    /// Requires `root` to already be in the tree — i.e. at least one
    /// [`Mcts::explore`] call against it (or an ancestor whose subtree
    /// still contains it) must have happened first.
    pub fn policy(&self, root: &G, tau: f32) -> Result<(Vec<G::Action>, Vec<f64>)> {
        let key = root.canonical_board();
        let (actions, counts) = self.tree.visit_counts(&key).ok_or(EngineError::ExploreFirst)?;

        if tau == 0.0 {
            let mut best_idx = 0;
            let mut best_n = 0u64;
            for (i, &n) in counts.iter().enumerate() {
                if n > best_n {
                    best_n = n;
                    best_idx = i;
                }
            }
            let probs = (0..counts.len())
                .map(|i| if i == best_idx { 1.0 } else { 0.0 })
                .collect();
            return Ok((actions, probs));
        }

        let weights: Vec<f64> = counts
            .iter()
            .map(|&n| (n as f64).powf(1.0 / tau as f64))
            .collect();
        let total: f64 = weights.iter().sum();
        let probs = if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / counts.len() as f64; counts.len()]
        };
        Ok((actions, probs))
    }

    /// Clears the tree and every diagnostic counter.
    pub fn reset(&self) {
        self.tree.reset();
        self.total_iterations.store(0, Ordering::Relaxed);
        self.total_nodes_traversed.store(0, Ordering::Relaxed);
        self.inference_time_nanos.store(0, Ordering::Relaxed);
        self.total_time_nanos.store(0, Ordering::Relaxed);
    }

    /// Number of nodes currently held in the tree.
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Analytical (not measured) memory footprint of one tree node, in
    /// bytes: the board key plus one [`crate::tree::ActionStats`] per
    /// action `G` admits at most.
    pub fn memory_footprint_per_node(&self) -> usize {
        G::board_memsize() + G::num_actions() * std::mem::size_of::<crate::tree::ActionStats>()
    }

    /// Fraction of total `explore!` wall-clock time spent inside
    /// `evaluate_batch`/`evaluate`. `0.0` if no `explore!` call has run
    /// yet.
    pub fn inference_time_ratio(&self) -> f64 {
        let total = self.total_time_nanos.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.inference_time_nanos.load(Ordering::Relaxed) as f64 / total as f64
    }

    /// Average number of nodes traversed per simulation across every
    /// `explore!` call since the last [`Mcts::reset`]. `0.0` if no
    /// simulation has run yet.
    pub fn average_exploration_depth(&self) -> f64 {
        let iterations = self.total_iterations.load(Ordering::Relaxed);
        if iterations == 0 {
            return 0.0;
        }
        self.total_nodes_traversed.load(Ordering::Relaxed) as f64 / iterations as f64
    }
}
