//! Seeded random streams for the coverage search.
//!
//! The optimizer takes its seed from the caller and never from the clock or
//! the OS, so a re-render of the same program shows the same coverage. Each
//! restart draws from its own stream, derived as seed XOR (restart * golden
//! ratio constant). Raising the restart budget leaves the earlier restarts'
//! draws untouched, and any restart can be replayed on its own.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// One restart's random stream.
pub struct SearchRng {
    inner: Pcg64Mcg,
}

impl SearchRng {
    /// Create a stream RNG from the caller's seed and a stable stream index.
    pub fn new(seed: u64, stream: u64) -> Self {
        let derived_seed = seed ^ (stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll an index in [0, n). Returns 0 when n is 0 or 1.
    pub fn index_below(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.inner.next_u64() % n as u64) as usize
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.index_below(items.len());
        items.get(i)
    }
}

/// All search streams for a single optimization call.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn for_restart(&self, restart: u32) -> SearchRng {
        SearchRng::new(self.seed, restart as u64)
    }
}
