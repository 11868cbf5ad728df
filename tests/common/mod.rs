//! Shared ground truth for integration tests.

/// Primality flags for `0..=limit` by sieve of Eratosthenes, indexed by value.
pub fn prime_flags(limit: u64) -> Vec<bool> {
    let limit = limit as usize;
    let mut flags = vec![true; limit + 1];
    flags[0] = false;
    if limit >= 1 {
        flags[1] = false;
    }
    let mut p = 2;
    while p * p <= limit {
        if flags[p] {
            for multiple in (p * p..=limit).step_by(p) {
                flags[multiple] = false;
            }
        }
        p += 1;
    }
    flags
}
