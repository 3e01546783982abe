//! Heuristic password strength.
//!
//! The estimate counts which character classes appear and assumes every
//! character is drawn uniformly from their union. It ignores distribution,
//! dictionary words and keyboard patterns, so it is illustrative only: it is
//! monotonic in length and in charset coverage, and nothing more.
use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use serde::Serialize;

const LOWER_SIZE: u32 = 26;
const UPPER_SIZE: u32 = 26;
const DIGIT_SIZE: u32 = 10;
const SYMBOL_SIZE: u32 = 32;
const FALLBACK_SIZE: u32 = 26;

/// Alphabet used by [`generate_password`].
pub const GENERATOR_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-=_+[]{}|;:,.<>?";

/// Size of the charset implied by the classes present in `password`.
pub fn charset_size(password: &str) -> u32 {
    let mut size = 0;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        size += LOWER_SIZE;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        size += UPPER_SIZE;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        size += DIGIT_SIZE;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        size += SYMBOL_SIZE;
    }
    if size == 0 { FALLBACK_SIZE } else { size }
}

/// Estimated entropy in bits: `round(len * log2(charset))`, 0 for "".
pub fn estimate(password: &str) -> u32 {
    let len = password.chars().count();
    if len == 0 {
        return 0;
    }
    let bits = (charset_size(password) as f64).log2() * len as f64;
    bits.round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Strength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    pub fn from_bits(bits: u32) -> Self {
        if bits > 80 {
            Strength::Strong
        } else if bits > 50 {
            Strength::Moderate
        } else if bits > 30 {
            Strength::Weak
        } else {
            Strength::VeryWeak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strength::VeryWeak => "Very weak",
            Strength::Weak => "Weak",
            Strength::Moderate => "Moderate",
            Strength::Strong => "Strong",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Random password of `len` characters from [`GENERATOR_CHARSET`].
pub fn generate_password(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| GENERATOR_CHARSET[rng.gen_range(0..GENERATOR_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_has_zero_bits() {
        assert_eq!(estimate(""), 0);
    }

    #[test]
    fn charset_sums_present_classes() {
        assert_eq!(charset_size("abc"), 26);
        assert_eq!(charset_size("aB"), 52);
        assert_eq!(charset_size("aB3"), 62);
        assert_eq!(charset_size("aB3!"), 94);
        assert_eq!(charset_size("é"), 32);
    }

    #[test]
    fn known_estimates() {
        // 8 * log2(26) = 37.6
        assert_eq!(estimate("password"), 38);
        // 6 * log2(10) = 19.93
        assert_eq!(estimate("123456"), 20);
        // 12 * log2(94) = 78.66
        assert_eq!(estimate("Tr0ub4dor&3x"), 79);
    }

    #[test]
    fn appending_never_decreases_bits() {
        let base = "Abc1";
        let mut p = String::from(base);
        let mut last = estimate(&p);
        for c in ['d', 'E', '7', '#', 'z', 'Q'] {
            p.push(c);
            let next = estimate(&p);
            assert!(next >= last, "{p}: {next} < {last}");
            last = next;
        }
    }

    #[test]
    fn label_boundaries_are_strict() {
        assert_eq!(Strength::from_bits(0), Strength::VeryWeak);
        assert_eq!(Strength::from_bits(30), Strength::VeryWeak);
        assert_eq!(Strength::from_bits(31), Strength::Weak);
        assert_eq!(Strength::from_bits(50), Strength::Weak);
        assert_eq!(Strength::from_bits(51), Strength::Moderate);
        assert_eq!(Strength::from_bits(80), Strength::Moderate);
        assert_eq!(Strength::from_bits(81), Strength::Strong);
        assert_eq!(Strength::Strong.to_string(), "Strong");
        assert_eq!(Strength::VeryWeak.to_string(), "Very weak");
    }

    #[test]
    fn generated_passwords_use_generator_charset() {
        let p = generate_password(16);
        assert_eq!(p.chars().count(), 16);
        assert!(p.bytes().all(|b| GENERATOR_CHARSET.contains(&b)));
        assert_ne!(p, generate_password(16));
    }
}
