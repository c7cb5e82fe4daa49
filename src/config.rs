//! Search configuration, loadable from a config file the same way the
//! rest of an AlphaZero-style training pipeline loads its settings
//! (mirrors the plain `serde`-derived settings structs this lineage of
//! code otherwise uses), while remaining fully constructible by hand for
//! unit tests and embedding.

use serde::Deserialize;

fn default_cpuct() -> f32 {
    1.0
}

fn default_noise_alpha() -> f32 {
    1.0
}

/// PUCT search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Config {
    /// Number of concurrent workers. `1` selects synchronous mode: no
    /// lock, no inference server, the oracle is called in-line.
    pub nworkers: usize,
    /// Whether to pad inference batches to `nworkers` by duplicating the
    /// first request (discarding the padded results). Useful for oracles
    /// that prefer constant-size batches.
    #[serde(default)]
    pub fill_batches: bool,
    /// Exploration coefficient in the PUCT formula.
    #[serde(default = "default_cpuct")]
    pub cpuct: f32,
    /// Mixing coefficient for root Dirichlet noise. `0.0` disables noise
    /// sampling entirely.
    #[serde(default)]
    pub noise_eps: f32,
    /// Dirichlet concentration parameter for root noise.
    #[serde(default = "default_noise_alpha")]
    pub noise_alpha: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nworkers: 1,
            fill_batches: false,
            cpuct: default_cpuct(),
            noise_eps: 0.0,
            noise_alpha: default_noise_alpha(),
        }
    }
}

impl Config {
    /// A single-worker, noise-free configuration: deterministic given a
    /// deterministic oracle, and the cheapest way to drive the engine in
    /// tests.
    pub fn synchronous() -> Self {
        Self::default()
    }

    /// Whether this configuration selects the asynchronous (multi-worker
    /// + inference server) mode.
    pub fn is_async(&self) -> bool {
        self.nworkers > 1
    }
}
