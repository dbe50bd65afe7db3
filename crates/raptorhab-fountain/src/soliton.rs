//! Robust Soliton degree distribution for LT codes.
//!
//! The degree of an encoded symbol — how many source symbols it XORs — is
//! drawn from this distribution. The ideal Soliton component alone decodes
//! with exactly `K` symbols in expectation but collapses in practice; the
//! robust component adds probability mass at low degrees and one spike at
//! `K/R` that keeps the decoder's ripple alive under loss.

use rand::Rng;

/// Default robust-component constant.
const DEFAULT_C: f64 = 0.1;

/// Default decoder failure probability bound.
const DEFAULT_DELTA: f64 = 0.5;

/// Precomputed Robust Soliton distribution over degrees `1..=k`.
///
/// Sampling is inverse-CDF with binary search on a single uniform draw, so
/// one `f64` from the PRNG maps to one degree. Encoder and decoder build the
/// identical table from `k` alone; any mismatch would silently desynchronize
/// the neighbor derivation, which is why the parameters are fixed constants
/// rather than configuration.
#[derive(Debug, Clone)]
pub struct RobustSoliton {
    k: usize,
    cumulative: Vec<f64>,
}

impl RobustSoliton {
    /// Build the distribution for `k` source symbols with the protocol's
    /// fixed parameters (`c = 0.1`, `δ = 0.5`).
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self::with_params(k, DEFAULT_C, DEFAULT_DELTA)
    }

    /// Build with explicit parameters.
    ///
    /// `ρ(1) = 1/k`, `ρ(d) = 1/(d(d-1))` for `d ≥ 2`;
    /// `R = c·ln(k/δ)·√k`, `threshold = min(⌊k/R⌋, k)`;
    /// `τ(d) = R/(dk)` below the threshold, `τ(threshold) = R·ln(R/δ)/k`,
    /// zero above. `μ = (ρ + τ)` normalized.
    #[must_use]
    pub fn with_params(k: usize, c: f64, delta: f64) -> Self {
        let k = k.max(1);
        let kf = k as f64;
        let r = c * (kf / delta).ln() * kf.sqrt();

        let mut mu = vec![0.0f64; k + 1];
        mu[1] = 1.0 / kf;
        for d in 2..=k {
            mu[d] = 1.0 / (d as f64 * (d as f64 - 1.0));
        }

        let threshold = if r > 0.0 { ((kf / r) as usize).min(k) } else { k };
        for d in 1..threshold {
            mu[d] += r / (d as f64 * kf);
        }
        if threshold >= 1 {
            mu[threshold] += r * (r / delta).ln() / kf;
        }

        let total: f64 = mu.iter().sum();
        let mut cumulative = Vec::with_capacity(k + 1);
        let mut cum = 0.0;
        for p in &mu {
            cum += p / total;
            cumulative.push(cum);
        }

        Self { k, cumulative }
    }

    /// Number of source symbols this distribution was built for.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Draw a degree in `1..=k` using one uniform sample from `rng`.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let r: f64 = rng.r#gen();

        let mut low = 1usize;
        let mut high = self.cumulative.len() - 1;
        while low < high {
            let mid = (low + high) / 2;
            if self.cumulative[mid] < r {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low.min(self.k)
    }
}
