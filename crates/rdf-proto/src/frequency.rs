use serde::{Deserialize, Serialize};
use std::fmt;

/// Two frequencies closer than this (in kHz) are the same channel.  The backend
/// reports Hz as integers while the simulation stores MHz as floats, so exact
/// comparison would miss on rounding.
pub const FREQUENCY_TOLERANCE: i32 = 10;

/// A radio frequency in the canonical comparison unit (integer kHz).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Frequency(i32);

impl Frequency {
    /// "Unspecified".  Never matches any frequency, itself included.
    pub const REDUNDANT: Frequency = Frequency(i32::MAX);

    pub fn from_khz(khz: i32) -> Self {
        Frequency(khz)
    }

    pub fn from_mhz(mhz: f64) -> Self {
        Self::from_scaled(mhz * 1000.0)
    }

    pub fn from_hz(hz: f64) -> Self {
        Self::from_scaled(hz / 1000.0)
    }

    fn from_scaled(khz: f64) -> Self {
        if !khz.is_finite() || khz.abs() >= i32::MAX as f64 {
            return Self::REDUNDANT;
        }
        Frequency(khz.round() as i32)
    }

    pub fn khz(self) -> i32 {
        self.0
    }

    pub fn mhz(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn is_redundant(self) -> bool {
        self == Self::REDUNDANT
    }

    /// Tolerant equality.  Use this, not `==`, when matching channels.
    pub fn is_same(self, other: Frequency) -> bool {
        if self.is_redundant() || other.is_redundant() {
            return false;
        }
        (self.0 as i64 - other.0 as i64).abs() < FREQUENCY_TOLERANCE as i64
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_redundant() {
            write!(f, "---.---")
        } else {
            write!(f, "{:.3}", self.mhz())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mhz_and_hz_agree() {
        assert_eq!(Frequency::from_mhz(118.005), Frequency::from_hz(118_005_000.0));
        assert_eq!(Frequency::from_mhz(121.5).khz(), 121_500);
    }

    #[test]
    fn test_tolerance() {
        let a = Frequency::from_khz(132_600);
        assert!(a.is_same(Frequency::from_khz(132_600)));
        assert!(a.is_same(Frequency::from_khz(132_609)));
        assert!(a.is_same(Frequency::from_khz(132_591)));
        assert!(!a.is_same(Frequency::from_khz(132_611)));
        assert!(!a.is_same(Frequency::from_khz(132_580)));
    }

    #[test]
    fn test_float_noise_is_absorbed() {
        // 8.33 kHz channel as the simulation stores it vs. what the backend sends
        let sim = Frequency::from_mhz(132.605_000_000_1);
        let backend = Frequency::from_hz(132_605_000.0);
        assert!(sim.is_same(backend));
    }

    #[test]
    fn test_redundant_never_matches() {
        assert!(!Frequency::REDUNDANT.is_same(Frequency::REDUNDANT));
        assert!(!Frequency::REDUNDANT.is_same(Frequency::from_khz(i32::MAX - 1)));
        assert!(Frequency::from_hz(f64::NAN).is_redundant());
    }

    #[test]
    fn test_display() {
        assert_eq!(Frequency::from_mhz(118.1).to_string(), "118.100");
        assert_eq!(Frequency::REDUNDANT.to_string(), "---.---");
    }
}
