//! # Witness — Coprime Base Sampling
//!
//! Produces the random bases `a` used by each Fermat round. A base is drawn
//! uniformly from `[0, n)`, draws below 2 are shifted up by 2, draws that land
//! on or above `n` are reduced modulo `n`, and the draw is rejected unless
//! `gcd(a, n) = 1`. The effective range is `[2, n - 1]`; the shift makes 2 and
//! 3 slightly more likely than other bases, which does not affect soundness.
//!
//! ## Degenerate Moduli
//!
//! For `n < 4` the admissible base range is empty or degenerate and the
//! rejection loop need not terminate. The sampler therefore only accepts a
//! [`Modulus`], which cannot be constructed for `n < 4`; callers decide those
//! candidates directly (see [`crate::fermat::small_verdict`]).
//!
//! ## Bounded Rejection
//!
//! The loop gives up after [`MAX_SAMPLING_ATTEMPTS`] draws and returns the
//! smallest base `>= 2` coprime to `n`. Since `n - 1` is always coprime to
//! `n`, that fallback always exists for a valid modulus.

use rug::rand::RandState;
use rug::Integer;

use crate::arith;

/// Smallest modulus the sampler accepts.
pub const MIN_SAMPLING_MODULUS: u64 = 4;

/// Draws before falling back to the deterministic coprime scan.
pub const MAX_SAMPLING_ATTEMPTS: u32 = 1024;

/// A Fermat modulus `n >= 4`, the only values the witness sampler works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modulus {
    value: u64,
    big: Integer,
}

impl Modulus {
    /// `None` for `n < 4`.
    pub fn new(n: u64) -> Option<Self> {
        if n < MIN_SAMPLING_MODULUS {
            return None;
        }
        Some(Modulus {
            value: n,
            big: Integer::from(n),
        })
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    pub fn as_integer(&self) -> &Integer {
        &self.big
    }
}

/// Source of Fermat bases coprime to a modulus.
///
/// The production implementation is [`GmpSampler`]; tests substitute fixed
/// sequences to make classification fully deterministic.
pub trait WitnessSampler {
    /// Return `a` with `2 <= a <= n - 1` and `gcd(a, n) = 1`.
    fn sample_coprime_base(&mut self, modulus: &Modulus) -> Integer;
}

impl<S: WitnessSampler + ?Sized> WitnessSampler for &mut S {
    fn sample_coprime_base(&mut self, modulus: &Modulus) -> Integer {
        (**self).sample_coprime_base(modulus)
    }
}

/// Rejection sampler over a GMP Mersenne-Twister random state.
pub struct GmpSampler {
    state: RandState<'static>,
}

impl GmpSampler {
    pub fn from_seed(seed: u64) -> Self {
        let mut state = RandState::new();
        state.seed(&Integer::from(seed));
        GmpSampler { state }
    }
}

impl WitnessSampler for GmpSampler {
    fn sample_coprime_base(&mut self, modulus: &Modulus) -> Integer {
        let n = modulus.as_integer();
        for _ in 0..MAX_SAMPLING_ATTEMPTS {
            let mut a = Integer::from(n.random_below_ref(&mut self.state));
            if a < 2u32 {
                a += 2u32;
            }
            if a >= *n {
                a %= n;
            }
            if Integer::from(a.gcd_ref(n)) == 1u32 {
                return a;
            }
        }
        Integer::from(smallest_coprime_base(modulus))
    }
}

/// Smallest `a >= 2` with `gcd(a, n) = 1`.
pub fn smallest_coprime_base(modulus: &Modulus) -> u64 {
    let n = modulus.get();
    (2..n)
        .find(|&a| arith::gcd(a, n) == 1)
        .unwrap_or(n - 1)
}
