//! Crack-time projection: `2^bits` guesses times a per-guess cost.
//!
//! The projector never measures anything itself. The per-guess cost is either
//! `1 / attacker_rate` for a plain hash or a wall-clock KDF measurement.
//!
//! The projection models a uniform random-guessing attacker over the full
//! charset; dictionary and rule-based attacks on human-chosen passwords are
//! usually far faster than these figures suggest.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::SimError;

/// Illustrative attacker rate for a fast unsalted hash (guesses/second).
pub const DEFAULT_GUESSES_PER_SECOND: f64 = 1e9;

/// Projected brute-force duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrackTime {
    Seconds(f64),
    /// Beyond what an `f64` can represent.
    Unbounded,
}

impl CrackTime {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            CrackTime::Seconds(s) => Some(*s),
            CrackTime::Unbounded => None,
        }
    }
}

impl PartialOrd for CrackTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        match (self, other) {
            (CrackTime::Seconds(a), CrackTime::Seconds(b)) => a.partial_cmp(b),
            (CrackTime::Seconds(_), CrackTime::Unbounded) => Some(Ordering::Less),
            (CrackTime::Unbounded, CrackTime::Seconds(_)) => Some(Ordering::Greater),
            (CrackTime::Unbounded, CrackTime::Unbounded) => Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for CrackTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(*self))
    }
}

impl Serialize for CrackTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CrackTime::Seconds(s) => serializer.serialize_f64(*s),
            CrackTime::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// `(entropy bits, per-guess seconds, projected duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrackEstimate {
    pub entropy_bits: u32,
    pub per_guess_seconds: f64,
    pub estimated: CrackTime,
}

/// `2^bits * per_guess_seconds`; overflow yields [`CrackTime::Unbounded`].
pub fn project(entropy_bits: u32, per_guess_seconds: f64) -> Result<CrackTime, SimError> {
    if !per_guess_seconds.is_finite() || per_guess_seconds < 0.0 {
        return Err(SimError::InvalidParameters(format!(
            "per-guess cost must be a finite, non-negative number of seconds (got {per_guess_seconds})"
        )));
    }
    let exp = i32::try_from(entropy_bits).unwrap_or(i32::MAX);
    let guesses = 2f64.powi(exp);
    let seconds = guesses * per_guess_seconds;
    if guesses.is_finite() && seconds.is_finite() {
        Ok(CrackTime::Seconds(seconds))
    } else {
        Ok(CrackTime::Unbounded)
    }
}

/// Projector bound to an attacker rate for the plain-hash scenario.
#[derive(Debug, Clone, Copy)]
pub struct CrackTimeProjector {
    guesses_per_second: f64,
}

impl Default for CrackTimeProjector {
    fn default() -> Self {
        Self {
            guesses_per_second: DEFAULT_GUESSES_PER_SECOND,
        }
    }
}

impl CrackTimeProjector {
    pub fn new(guesses_per_second: f64) -> Result<Self, SimError> {
        if !guesses_per_second.is_finite() || guesses_per_second <= 0.0 {
            return Err(SimError::InvalidParameters(format!(
                "attacker rate must be positive (got {guesses_per_second})"
            )));
        }
        Ok(Self { guesses_per_second })
    }

    pub fn guesses_per_second(&self) -> f64 {
        self.guesses_per_second
    }

    pub fn plain_per_guess_seconds(&self) -> f64 {
        1.0 / self.guesses_per_second
    }

    /// Estimate at the plain-hash attacker rate.
    pub fn plain(&self, entropy_bits: u32) -> CrackEstimate {
        let per_guess_seconds = self.plain_per_guess_seconds();
        // the rate is validated at construction, so the cost is finite and positive
        let estimated = project(entropy_bits, per_guess_seconds).unwrap_or(CrackTime::Unbounded);
        CrackEstimate {
            entropy_bits,
            per_guess_seconds,
            estimated,
        }
    }

    /// Estimate from a supplied (typically measured) per-guess cost.
    pub fn with_cost(
        &self,
        entropy_bits: u32,
        per_guess_seconds: f64,
    ) -> Result<CrackEstimate, SimError> {
        Ok(CrackEstimate {
            entropy_bits,
            per_guess_seconds,
            estimated: project(entropy_bits, per_guess_seconds)?,
        })
    }
}

const UNITS: [&str; 5] = ["s", "m", "h", "d", "y"];
const FACTORS: [f64; 4] = [60.0, 60.0, 24.0, 365.0];

/// Human units: ms below a second, then s, m, h, d, y.
pub fn format_duration(time: CrackTime) -> String {
    let sec = match time {
        CrackTime::Seconds(s) => s,
        CrackTime::Unbounded => return "effectively infinite".to_string(),
    };
    if sec < 1.0 {
        return format!("{:.2} ms", sec * 1000.0);
    }
    let mut i = 0;
    let mut val = sec;
    while i < FACTORS.len() && val >= FACTORS[i] {
        val /= FACTORS[i];
        i += 1;
    }
    if val >= 1e6 {
        format!("{:.2e} {}", val, UNITS[i])
    } else {
        format!("{:.2} {}", val, UNITS[i])
    }
}

/// `B`, `KB`, `MB`, `GB`, `TB` with two decimals.
pub fn humanize_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut i = 0;
    let mut v = bytes as f64;
    while v >= 1024.0 && i < UNITS.len() - 1 {
        v /= 1024.0;
        i += 1;
    }
    format!("{:.2} {}", v, UNITS[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bits_costs_one_guess() {
        assert_eq!(project(0, 1e-9).unwrap(), CrackTime::Seconds(1e-9));
    }

    #[test]
    fn twenty_bits_at_one_ns() {
        let s = project(20, 1e-9).unwrap().seconds().unwrap();
        assert!((s - 1.048576e-3).abs() < 1e-15);
    }

    #[test]
    fn huge_entropy_is_unbounded_not_nan() {
        assert_eq!(project(1024, 1e-9).unwrap(), CrackTime::Unbounded);
        assert_eq!(project(u32::MAX, 1.0).unwrap(), CrackTime::Unbounded);
        // 2^1023 fits, but multiplied by a large cost it does not
        assert_eq!(project(1023, 1e10).unwrap(), CrackTime::Unbounded);
        assert!(matches!(project(1000, 1e-9).unwrap(), CrackTime::Seconds(_)));
    }

    #[test]
    fn invalid_costs_are_rejected() {
        assert!(project(10, f64::NAN).is_err());
        assert!(project(10, -1.0).is_err());
        assert!(project(10, f64::INFINITY).is_err());
        assert!(CrackTimeProjector::new(0.0).is_err());
    }

    #[test]
    fn plain_estimate_uses_attacker_rate() {
        let p = CrackTimeProjector::new(1e6).unwrap();
        let e = p.plain(10);
        assert_eq!(e.per_guess_seconds, 1e-6);
        assert_eq!(e.estimated, CrackTime::Seconds(1024.0 * 1e-6));
        assert_eq!(CrackTimeProjector::default().guesses_per_second(), 1e9);
    }

    #[test]
    fn projection_is_monotonic_in_bits() {
        let mut last = CrackTime::Seconds(0.0);
        for bits in (0..1100).step_by(7) {
            let t = project(bits, 1e-9).unwrap();
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(CrackTime::Seconds(0.0015)), "1.50 ms");
        assert_eq!(format_duration(CrackTime::Seconds(30.0)), "30.00 s");
        assert_eq!(format_duration(CrackTime::Seconds(90.0)), "1.50 m");
        assert_eq!(format_duration(CrackTime::Seconds(7200.0)), "2.00 h");
        assert_eq!(format_duration(CrackTime::Seconds(172_800.0)), "2.00 d");
        assert_eq!(
            format_duration(CrackTime::Seconds(2.0 * 365.0 * 86_400.0)),
            "2.00 y"
        );
        assert_eq!(format_duration(CrackTime::Unbounded), "effectively infinite");
    }

    #[test]
    fn humanizes_bytes() {
        assert_eq!(humanize_bytes(512), "512.00 B");
        assert_eq!(humanize_bytes(262_144 * 1024), "256.00 MB");
    }
}
