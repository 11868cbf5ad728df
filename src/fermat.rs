//! # Fermat — Randomized Probable-Prime Test
//!
//! Runs up to `k` rounds of Fermat's little theorem: for a random base `a`
//! coprime to `n`, a prime `n` satisfies `a^(n-1) ≡ 1 (mod n)`. The first base
//! that breaks the congruence proves `n` composite and is returned as the
//! counter-witness; no further rounds run. Surviving all rounds makes `n` a
//! probable prime.
//!
//! The error is one-sided. A composite verdict is always correct, while a
//! probable-prime verdict can be wrong for Carmichael numbers (every coprime
//! base is a liar) and, with probability shrinking in `k`, for other
//! composites. [`crate::oracle`] closes the gap for the known Carmichael list.
//!
//! Exponentiation is GMP's square-and-multiply `mpz_powm`, so `a^2` never
//! overflows no matter how close `n` is to `2^64`.

use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::witness::{Modulus, WitnessSampler};

/// Outcome of a k-round Fermat test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FermatVerdict {
    pub probably_prime: bool,
    /// Base that proved `n` composite.
    pub counter_witness: Option<u64>,
}

impl FermatVerdict {
    pub fn probable_prime() -> Self {
        FermatVerdict {
            probably_prime: true,
            counter_witness: None,
        }
    }

    pub fn composite(witness: u64) -> Self {
        FermatVerdict {
            probably_prime: false,
            counter_witness: Some(witness),
        }
    }

    /// 0 and 1: not prime by definition, no base to exhibit.
    pub fn not_prime() -> Self {
        FermatVerdict {
            probably_prime: false,
            counter_witness: None,
        }
    }
}

/// Fixed verdict for `n < 4`, where the base range `[2, n-2]` is empty.
///
/// 2 and 3 are prime; 0 and 1 are not.
pub fn small_verdict(n: u64) -> FermatVerdict {
    match n {
        2 | 3 => FermatVerdict::probable_prime(),
        _ => FermatVerdict::not_prime(),
    }
}

/// Test `n` with up to `rounds` random bases.
pub fn fermat_test<S: WitnessSampler>(n: u64, rounds: u32, sampler: &mut S) -> FermatVerdict {
    match Modulus::new(n) {
        Some(modulus) => fermat_test_modulus(&modulus, rounds, sampler),
        None => small_verdict(n),
    }
}

/// Fermat rounds on a modulus the sampler can work with.
pub fn fermat_test_modulus<S: WitnessSampler>(
    modulus: &Modulus,
    rounds: u32,
    sampler: &mut S,
) -> FermatVerdict {
    let n = modulus.as_integer();
    let exponent = Integer::from(n - 1u32);
    for _ in 0..rounds {
        let a = sampler.sample_coprime_base(modulus);
        if !passes_round(&a, &exponent, n) {
            return FermatVerdict::composite(a.to_u64_wrapping());
        }
    }
    FermatVerdict::probable_prime()
}

/// `a^(n-1) ≡ 1 (mod n)`.
fn passes_round(a: &Integer, exponent: &Integer, n: &Integer) -> bool {
    // The exponent is non-negative, so the power always exists.
    a.pow_mod_ref(exponent, n)
        .map(Integer::from)
        .is_some_and(|residue| residue == 1u32)
}
