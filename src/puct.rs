//! The PUCT selection rule and root Dirichlet noise sampling.
//!
//! Kept separate from [`crate::tree`] so the scoring arithmetic and the
//! noise construction can be unit tested without a tree at all, the way
//! the pure numeric pieces of a search engine usually are.

use rand_distr::{Distribution, Gamma};

/// `U(i) + Q(i)` for one edge, given the node's total visit count and the
/// (possibly noise-mixed) prior `p_tilde` to use for this edge.
///
/// `q = (w - nworkers) / max(n, 1)`; `u = cpuct * p_tilde * sqrt(ntot) / (n + 1)`.
pub fn score(w: f64, n: u64, nworkers: u32, p_tilde: f32, ntot: f64, cpuct: f32) -> f64 {
    let q = (w - nworkers as f64) / (n.max(1) as f64);
    let u = cpuct as f64 * p_tilde as f64 * ntot.sqrt() / (n as f64 + 1.0);
    q + u
}

/// Mixes a raw prior with root Dirichlet noise: `(1-eps)*p + eps*eta`.
/// `noise_eps == 0.0` is the identity (the tree never samples `eta` in
/// that case — see [`sample_dirichlet`]).
pub fn mix_prior(p: f32, eta: f32, noise_eps: f32) -> f32 {
    (1.0 - noise_eps) * p + noise_eps * eta
}

/// Draws one sample from `Dirichlet(alpha, .., alpha)` over `n` actions,
/// constructed as `n` i.i.d. `Gamma(alpha, 1)` draws normalized to sum to
/// one. Returns an empty vector for `n == 0`.
///
/// Sampled once per `explore!` call and reused across every simulation in
/// that call — never call this per-simulation.
pub fn sample_dirichlet(alpha: f32, n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let gamma = Gamma::new(alpha as f64, 1.0).expect("dirichlet alpha must be positive");
    let mut rng = rand::thread_rng();
    let draws: Vec<f64> = (0..n).map(|_| gamma.sample(&mut rng)).collect();
    let sum: f64 = draws.iter().sum();
    if sum <= 0.0 {
        // Numerically degenerate (all draws underflowed to zero): fall
        // back to a uniform distribution rather than dividing by zero.
        return vec![1.0 / n as f32; n];
    }
    draws.iter().map(|d| (d / sum) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_prefers_higher_prior_when_unvisited() {
        let a = score(0.0, 0, 0, 0.9, 4.0, 1.0);
        let b = score(0.0, 0, 0, 0.1, 4.0, 1.0);
        assert!(a > b);
    }

    #[test]
    fn score_subtracts_virtual_loss() {
        let quiet = score(0.0, 4, 0, 0.5, 16.0, 1.0);
        let contended = score(0.0, 4, 3, 0.5, 16.0, 1.0);
        assert!(contended < quiet);
    }

    #[test]
    fn dirichlet_sums_to_one() {
        let sample = sample_dirichlet(0.3, 7);
        let total: f32 = sample.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(sample.len(), 7);
    }

    #[test]
    fn dirichlet_empty_for_zero_actions() {
        assert!(sample_dirichlet(0.3, 0).is_empty());
    }

    #[test]
    fn mix_prior_is_identity_at_zero_eps() {
        assert_eq!(mix_prior(0.42, 0.99, 0.0), 0.42);
    }
}
