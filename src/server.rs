//! The batching inference server: a single task that collects one
//! pending request from each live worker, submits a batch to the oracle,
//! and routes results back to their owners.

use crate::error::EngineError;
use crate::game::Game;
use crate::oracle::Oracle;
use crate::worker::{Request, Response};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// One worker's half of the duplex mailbox pair, from the server's point
/// of view.
pub(crate) struct WorkerChannel<G: Game> {
    from_worker: mpsc::Receiver<Option<Request<G>>>,
    to_worker: mpsc::Sender<Response>,
}

/// Runs the inference server loop until every worker has signaled
/// termination or the oracle fails. `fill_batches`, when set, pads the
/// request vector to `worker_count` (the original number of live
/// workers) by duplicating the first request; padded slots' results are
/// discarded. Accumulates time spent in `evaluate_batch` into
/// `inference_time_nanos`.
pub async fn run<G, O>(
    oracle: &O,
    mut channels: Vec<WorkerChannel<G>>,
    fill_batches: bool,
    inference_time_nanos: &AtomicU64,
) where
    G: Game,
    O: Oracle<G>,
{
    let worker_count = channels.len();
    // Indices into `channels` that are still live (haven't sent `None`).
    let mut live: Vec<usize> = (0..worker_count).collect();
    log::info!(
        "inference server starting: {} worker(s), fill_batches={}",
        worker_count,
        fill_batches
    );
    // Tracks real (unpadded) occupancy across recent batches, to warn once
    // if padding is masking chronic under-occupancy rather than the rare
    // tail batch.
    let mut low_occupancy_streak: u32 = 0;
    const LOW_OCCUPANCY_WARN_THRESHOLD: u32 = 8;

    loop {
        if live.is_empty() {
            log::info!("inference server: no live workers left, exiting");
            return;
        }

        let received = futures::future::join_all(
            live.iter()
                .map(|&i| channels[i].from_worker.recv()),
        )
        .await;

        let mut requests: Vec<(usize, Request<G>)> = Vec::new();
        let mut still_live = Vec::new();
        for (&i, msg) in live.iter().zip(received.into_iter()) {
            match msg {
                Some(Some(req)) => {
                    requests.push((i, req));
                    still_live.push(i);
                }
                Some(None) => {
                    log::debug!("inference server: worker {} signaled completion", i);
                }
                None => {
                    // The worker's sender half was dropped without an
                    // explicit `None`; treat it the same as completion.
                    log::debug!("inference server: worker {} mailbox dropped", i);
                }
            }
        }
        live = still_live;
        if requests.is_empty() {
            continue;
        }

        let mut batch: Vec<(G, Vec<G::Action>)> = requests
            .iter()
            .map(|(_, req)| (req.state.clone(), req.actions.clone()))
            .collect();
        let real_count = batch.len();
        if fill_batches && real_count < worker_count {
            let first = batch[0].clone();
            batch.resize(worker_count, first);

            if real_count * 2 < worker_count {
                low_occupancy_streak += 1;
                if low_occupancy_streak == LOW_OCCUPANCY_WARN_THRESHOLD {
                    log::warn!(
                        "inference server: real batch occupancy has stayed below half of \
                         nworkers ({real_count}/{worker_count}) for {LOW_OCCUPANCY_WARN_THRESHOLD} \
                         consecutive padded batches; workers may be under-provisioned relative \
                         to the oracle's preferred batch size"
                    );
                }
            } else {
                low_occupancy_streak = 0;
            }
        } else {
            low_occupancy_streak = 0;
        }

        log::debug!(
            "inference server: submitting batch of {} ({} real, {} live workers)",
            batch.len(),
            real_count,
            live.len()
        );

        let start = Instant::now();
        let outcome = oracle.evaluate_batch(&batch);
        inference_time_nanos.fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        match outcome {
            Ok(results) => {
                for (i, (worker_idx, _)) in requests.into_iter().enumerate() {
                    let result = results[i].clone();
                    let _ = channels[worker_idx].to_worker.send(Ok(result)).await;
                }
            }
            Err(e) => {
                log::error!("inference server: oracle evaluation failed: {}", e);
                // Unblock every still-live worker rather than letting any
                // of them hang forever on `recv`.
                let err = EngineError::Oracle(e);
                for &i in &live {
                    let _ = channels[i].to_worker.send(Err(err.clone())).await;
                }
                return;
            }
        }
    }
}

/// Constructs `n` duplex mailbox pairs: one `(to_server, from_server)`
/// half for each worker, and the matching `WorkerChannel` halves for the
/// server, each with capacity 1 (single-slot mailboxes).
pub fn make_channels<G: Game>(
    n: usize,
) -> (
    Vec<(mpsc::Sender<Option<Request<G>>>, mpsc::Receiver<Response>)>,
    Vec<WorkerChannel<G>>,
) {
    let mut worker_halves = Vec::with_capacity(n);
    let mut server_halves = Vec::with_capacity(n);
    for _ in 0..n {
        let (to_server_tx, to_server_rx) = mpsc::channel(1);
        let (to_worker_tx, to_worker_rx) = mpsc::channel(1);
        worker_halves.push((to_server_tx, to_worker_rx));
        server_halves.push(WorkerChannel {
            from_worker: to_server_rx,
            to_worker: to_worker_tx,
        });
    }
    (worker_halves, server_halves)
}
