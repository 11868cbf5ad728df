//! # Arith — Word-Sized Modular Arithmetic
//!
//! Exact u64 number theory used next to the GMP-based Fermat rounds:
//!
//! - `pow_mod` with u128 intermediates, valid for every u64 modulus since
//!   `(m - 1)^2 < 2^128`. Tests use it as an independent check of GMP residues.
//! - `gcd`, used by the witness sampler's deterministic fallback.

/// Modular exponentiation: base^exp mod modulus.
/// Uses u128 intermediates so any u64 modulus is safe from overflow.
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result: u64 = 1;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result as u128 * base as u128 % modulus as u128) as u64;
        }
        exp >>= 1;
        base = (base as u128 * base as u128 % modulus as u128) as u64;
    }
    result
}

/// Greatest common divisor.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow_mod() {
        assert_eq!(pow_mod(2, 10, 1000), 24); // 1024 mod 1000
        assert_eq!(pow_mod(3, 4, 100), 81);
        assert_eq!(pow_mod(5, 0, 7), 1);
        assert_eq!(pow_mod(3, 3, 4), 3); // 27 mod 4
        assert_eq!(pow_mod(7, 5, 1), 0);
    }

    /// Near-2^64 modulus: squaring the base needs the full u128 width.
    #[test]
    fn test_pow_mod_full_width_modulus() {
        let m = u64::MAX - 58; // 2^64 - 59, the largest 64-bit prime
        assert_eq!(pow_mod(2, m - 1, m), 1);
        assert_eq!(pow_mod(m - 1, 2, m), 1);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(0, 9), 9);
        assert_eq!(gcd(9, 0), 9);
        assert_eq!(gcd(561, 3), 3);
        assert_eq!(gcd(u64::MAX, u64::MAX - 1), 1);
    }
}
