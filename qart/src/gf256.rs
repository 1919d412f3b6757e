//! GF(2^8) arithmetic and the Reed-Solomon encoder used by QR codes.
//!
//! ## Galois Field GF(2^8)
//!
//! Elements are polynomials over GF(2) modulo the irreducible polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11D), with alpha = 0x02 as generator.
//!
//! - Addition: XOR
//! - Multiplication: exp(log(a) + log(b) mod 255)
//!
//! Because addition is XOR, every Reed-Solomon codeword map is also linear
//! over GF(2). The bit block solver in [`crate::block`] relies on that: the
//! check bytes of `a ^ b` are the XOR of the check bytes of `a` and `b`.

/// GF(2^8) arithmetic with log/antilog tables.
pub(crate) struct GF256;

impl GF256 {
    /// Logarithm table (index 1-255 -> exponent)
    const LOG: [u8; 256] = Self::generate_log_table();

    /// Antilogarithm table (exponent 0-254 -> value)
    const EXP: [u8; 256] = Self::generate_exp_table();

    const fn generate_exp_table() -> [u8; 256] {
        let mut table = [0u8; 256];
        let mut x = 1u16;

        let mut i = 0;
        while i < 255 {
            table[i] = x as u8;
            x <<= 1;
            if x >= 256 {
                x ^= 0x11D;
            }
            i += 1;
        }

        table[255] = table[0];
        table
    }

    const fn generate_log_table() -> [u8; 256] {
        let exp = Self::generate_exp_table();
        let mut table = [0u8; 256];

        let mut i = 0;
        while i < 255 {
            table[exp[i] as usize] = i as u8;
            i += 1;
        }

        table
    }

    /// Multiply two elements in GF(2^8).
    pub(crate) fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            let log_sum = (Self::LOG[a as usize] as u16 + Self::LOG[b as usize] as u16) % 255;
            Self::EXP[log_sum as usize]
        }
    }

    /// alpha^n
    pub(crate) fn exp(n: u8) -> u8 {
        Self::EXP[n as usize]
    }

    #[cfg(test)]
    fn inv(a: u8) -> u8 {
        assert!(a != 0, "Cannot invert zero in GF(2^8)");
        let log_a = Self::LOG[a as usize];
        Self::EXP[(255 - log_a as u16) as usize % 255]
    }
}

/// Reed-Solomon encoder for a fixed number of check bytes.
///
/// The generator is g(x) = (x - a^0)(x - a^1)...(x - a^(n-1)), stored with
/// the highest-degree coefficient first (always 1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReedSolomon {
    generator: Vec<u8>,
}

impl ReedSolomon {
    pub fn new(degree: usize) -> Self {
        let mut generator = vec![1u8];

        for i in 0..degree {
            let root = GF256::exp(i as u8);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &coef) in generator.iter().enumerate() {
                next[j] ^= coef;
                next[j + 1] ^= GF256::mul(coef, root);
            }
            generator = next;
        }

        Self { generator }
    }

    /// Number of check bytes produced per block.
    pub fn degree(&self) -> usize {
        self.generator.len() - 1
    }

    /// Compute the check bytes for `data`.
    pub fn ecc(&self, data: &[u8]) -> Vec<u8> {
        let mut check = vec![0u8; self.degree()];
        self.ecc_into(data, &mut check);
        check
    }

    /// Compute the check bytes for `data` into `check`, which must hold
    /// exactly [`degree`](Self::degree) bytes.
    ///
    /// This is polynomial division: data(x) * x^n mod g(x).
    pub fn ecc_into(&self, data: &[u8], check: &mut [u8]) {
        debug_assert_eq!(check.len(), self.degree());
        check.fill(0);
        if check.is_empty() {
            return;
        }

        let last = check.len() - 1;
        for &byte in data {
            let factor = byte ^ check[0];
            check.rotate_left(1);
            check[last] = 0;

            for (slot, &coef) in check.iter_mut().zip(&self.generator[1..]) {
                *slot ^= GF256::mul(coef, factor);
            }
        }
    }

    /// True if the trailing [`degree`](Self::degree) bytes of `codeword` are
    /// the check bytes of the leading ones.
    pub fn is_codeword(&self, codeword: &[u8]) -> bool {
        let n = self.degree();
        if codeword.len() < n {
            return false;
        }
        let (data, check) = codeword.split_at(codeword.len() - n);
        self.ecc(data) == check
    }
}


/// GF(2^8) field axioms, checked exhaustively.
#[cfg(test)]
mod gf256_tests {
    use super::*;

    #[test]
    fn multiplicative_identity() {
        for a in 0u8..=255 {
            assert_eq!(GF256::mul(a, 1), a, "a * 1 != a for a = {}", a);
        }
    }

    #[test]
    fn zero_absorbs() {
        for a in 0u8..=255 {
            assert_eq!(GF256::mul(a, 0), 0);
            assert_eq!(GF256::mul(0, a), 0);
        }
    }

    #[test]
    fn commutativity() {
        for a in 0u8..=255 {
            for b in 0u8..=255 {
                assert_eq!(GF256::mul(a, b), GF256::mul(b, a));
            }
        }
    }

    #[test]
    fn distributivity() {
        for a in (0u8..=255).step_by(7) {
            for b in (0u8..=255).step_by(5) {
                for c in (0u8..=255).step_by(3) {
                    assert_eq!(
                        GF256::mul(a, b ^ c),
                        GF256::mul(a, b) ^ GF256::mul(a, c),
                        "distributivity failed for a={}, b={}, c={}",
                        a,
                        b,
                        c
                    );
                }
            }
        }
    }

    #[test]
    fn multiplicative_inverse() {
        for a in 1u8..=255 {
            assert_eq!(GF256::mul(a, GF256::inv(a)), 1, "no inverse for {}", a);
        }
    }

    /// alpha = 2 generates all 255 non-zero elements.
    #[test]
    fn primitive_element() {
        let mut seen = [false; 256];
        for n in 0u8..255 {
            let v = GF256::exp(n);
            assert!(!seen[v as usize], "alpha^{} repeats {}", n, v);
            seen[v as usize] = true;
        }
        assert!(!seen[0]);
    }

    /// Table multiplication agrees with carry-less multiply mod 0x11D.
    #[test]
    fn mul_matches_polynomial_multiplication() {
        fn poly_mul(a: u8, b: u8) -> u8 {
            let mut product = 0u16;
            for i in 0..8 {
                if (b >> i) & 1 == 1 {
                    product ^= (a as u16) << i;
                }
            }
            for i in (8..16).rev() {
                if (product >> i) & 1 == 1 {
                    product ^= 0x11D << (i - 8);
                }
            }
            product as u8
        }

        for a in 0u8..=255 {
            for b in 0u8..=255 {
                assert_eq!(GF256::mul(a, b), poly_mul(a, b));
            }
        }
    }
}
