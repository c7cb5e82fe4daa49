//! The tree store: the single serialization point for all mutating
//! operations on the search tree. Workers never touch a node's statistics
//! except through the methods here, so concurrency correctness reduces
//! entirely to this module's locking policy.

use crate::game::Game;
use crate::puct;

use float_ord::FloatOrd;
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-edge statistics.
#[derive(Debug, Clone, Copy)]
pub struct ActionStats {
    /// Prior probability from the oracle.
    pub p: f32,
    /// Accumulated reward from the perspective of the side to move at the
    /// parent node.
    pub w: f64,
    /// Visit count.
    pub n: u64,
    /// Virtual-loss counter: workers currently descending through this
    /// edge.
    pub nworkers: u32,
}

impl ActionStats {
    fn new(p: f32) -> Self {
        ActionStats {
            p,
            w: 0.0,
            n: 0,
            nworkers: 0,
        }
    }
}

/// Per-node record: one [`ActionStats`] per legal action, in the order
/// reported by the game the first time the node was visited, plus the
/// bootstrapped value estimate recorded at creation.
#[derive(Debug)]
pub struct BoardInfo<A> {
    /// Legal actions at this node, fixing the index space of `stats`.
    pub actions: Vec<A>,
    /// Per-edge statistics, aligned index-for-index with `actions`.
    pub stats: Vec<ActionStats>,
    /// Oracle value estimate recorded when this node was created.
    pub vest: f64,
}

impl<A> BoardInfo<A> {
    fn total_visits(&self) -> u64 {
        self.stats.iter().map(|s| s.n).sum()
    }
}

struct Inner<G: Game> {
    nodes: HashMap<G::Board, BoardInfo<G::Action>>,
    remaining: i64,
}

/// The shared, lock-protected search tree.
///
/// Synchronous mode (one worker) and asynchronous mode (several workers
/// plus an inference server) share this exact type: the lock is simply
/// uncontended in the former case.
pub struct TreeStore<G: Game> {
    inner: Mutex<Inner<G>>,
}

impl<G: Game> Default for TreeStore<G> {
    fn default() -> Self {
        TreeStore {
            inner: Mutex::new(Inner {
                nodes: HashMap::new(),
                remaining: 0,
            }),
        }
    }
}

impl<G: Game> TreeStore<G> {
    /// Fresh, empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the remaining-simulations counter for a new `explore!` call.
    pub fn arm(&self, nsims: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.remaining = nsims as i64;
    }

    /// Decrements `remaining` under the lock and returns whether a
    /// simulation was claimed (`remaining` was `> 0` before the call).
    pub fn claim_simulation(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.remaining > 0 {
            inner.remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Whether `board` is already present in the tree (fast path that
    /// avoids an oracle round-trip).
    pub fn contains(&self, board: &G::Board) -> bool {
        self.inner.lock().unwrap().nodes.contains_key(board)
    }

    /// `Vest` of an existing node, if present.
    pub fn vest(&self, board: &G::Board) -> Option<f64> {
        self.inner.lock().unwrap().nodes.get(board).map(|n| n.vest)
    }

    /// Inserts a freshly oracle-evaluated node if `board` is still absent
    /// (another worker may have created it while this caller's oracle
    /// round-trip was in flight). Returns `(is_new, vest)`: when
    /// `is_new` is `false`, `prior`/`value` were discarded in favor of the
    /// existing record.
    pub fn insert_if_absent(
        &self,
        board: &G::Board,
        actions: &[G::Action],
        prior: Vec<f32>,
        value: f64,
    ) -> (bool, f64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.nodes.get(board) {
            return (false, existing.vest);
        }
        debug_assert_eq!(prior.len(), actions.len());
        let stats = prior.into_iter().map(ActionStats::new).collect();
        inner.nodes.insert(
            board.clone(),
            BoardInfo {
                actions: actions.to_vec(),
                stats,
                vest: value,
            },
        );
        (true, value)
    }

    /// Runs `f` against the node's current statistics under the lock,
    /// returning `None` if the node doesn't exist. Used by selection,
    /// which needs a read of the whole stats vector and the node's total
    /// visit count to compute PUCT scores.
    fn with_node<R>(&self, board: &G::Board, f: impl FnOnce(&BoardInfo<G::Action>) -> R) -> Option<R> {
        let inner = self.inner.lock().unwrap();
        inner.nodes.get(board).map(f)
    }

    /// Selects the PUCT-argmax action at `board` and immediately applies
    /// virtual loss to it (increments `N` and `nworkers`) in the same
    /// locked critical section, so no other worker can select against
    /// stale stats in between. `noise` carries the root Dirichlet sample,
    /// or `None` for non-root nodes.
    pub fn select_and_visit(
        &self,
        board: &G::Board,
        cpuct: f32,
        noise_eps: f32,
        noise: Option<&[f32]>,
    ) -> (usize, G::Action) {
        let mut inner = self.inner.lock().unwrap();
        let node = inner
            .nodes
            .get_mut(board)
            .expect("select_and_visit called on a board absent from the tree");

        let ntot = node.total_visits() as f64;
        let mut best_idx = 0;
        let mut best_score = FloatOrd(f64::NEG_INFINITY);
        for (i, stats) in node.stats.iter().enumerate() {
            let p_tilde = match noise {
                Some(eta) if i < eta.len() => puct::mix_prior(stats.p, eta[i], noise_eps),
                _ => stats.p,
            };
            let edge_score = FloatOrd(puct::score(
                stats.w, stats.n, stats.nworkers, p_tilde, ntot, cpuct,
            ));
            // Strict `>` so ties keep the earliest (lowest-index) action.
            if edge_score > best_score {
                best_score = edge_score;
                best_idx = i;
            }
        }

        let chosen = &mut node.stats[best_idx];
        chosen.n += 1;
        chosen.nworkers += 1;
        (best_idx, node.actions[best_idx])
    }

    /// Applies a backup to edge `action_index` of `board`: adds `reward`
    /// to `W` and releases one unit of virtual loss.
    pub fn apply_backup(&self, board: &G::Board, action_index: usize, reward: f64) {
        let mut inner = self.inner.lock().unwrap();
        let node = inner
            .nodes
            .get_mut(board)
            .expect("apply_backup called on a board absent from the tree");
        let stats = node
            .stats
            .get_mut(action_index)
            .expect("action index out of range during backup");
        stats.w += reward;
        assert!(
            stats.nworkers > 0,
            "virtual loss counter underflowed during backup"
        );
        stats.nworkers -= 1;
    }

    /// Number of nodes currently in the tree.
    pub fn node_count(&self) -> usize {
        self.inner.lock().unwrap().nodes.len()
    }

    /// Snapshot of a node's legal actions and visit counts, used by
    /// policy extraction. `None` if the board isn't in the tree.
    pub fn visit_counts(&self, board: &G::Board) -> Option<(Vec<G::Action>, Vec<u64>)> {
        self.with_node(board, |node| {
            (
                node.actions.clone(),
                node.stats.iter().map(|s| s.n).collect(),
            )
        })
    }

    /// Sum of `nworkers` across every edge of every node — must be zero
    /// once an `explore!` call has fully drained.
    pub fn total_in_flight(&self) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .nodes
            .values()
            .flat_map(|n| n.stats.iter())
            .map(|s| s.nworkers)
            .sum()
    }

    /// Empties the tree and the remaining-simulations counter.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.clear();
        inner.remaining = 0;
    }
}
