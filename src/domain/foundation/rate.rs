//! Rate value object stored in basis points.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A non-negative dimensionless multiplier with four decimal places.
///
/// Used for refund percentages (0.1 - 1.0), credit multipliers (1.0 - 1.5)
/// and fee rates (e.g. 0.029).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    /// Basis points per whole unit.
    pub const SCALE: u32 = 10_000;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Exactly 1.0.
    pub const ONE: Self = Self(Self::SCALE);

    /// Creates a rate from basis points (10 000 = 1.0).
    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    /// Creates a rate from a fraction, rounding to the nearest basis point.
    pub fn from_fraction(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid_format("rate", "must be a finite number"));
        }
        if value < 0.0 {
            return Err(ValidationError::fraction_out_of_range(
                "rate",
                0.0,
                f64::from(u32::MAX) / f64::from(Self::SCALE),
                value,
            ));
        }
        let bps = (value * f64::from(Self::SCALE)).round();
        if bps > f64::from(u32::MAX) {
            return Err(ValidationError::fraction_out_of_range(
                "rate",
                0.0,
                f64::from(u32::MAX) / f64::from(Self::SCALE),
                value,
            ));
        }
        Ok(Self(bps as u32))
    }

    /// Returns the rate in basis points.
    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (1.0 = 100%).
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / f64::from(Self::SCALE)
    }

    /// Returns true if the rate is within `[min, max]` inclusive.
    pub fn is_within(&self, min: Rate, max: Rate) -> bool {
        *self >= min && *self <= max
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Rate {
    /// Formats as a percentage, e.g. `2.9%` or `110%`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fraction_rounds_to_basis_points() {
        assert_eq!(Rate::from_fraction(0.5).unwrap().basis_points(), 5_000);
        assert_eq!(Rate::from_fraction(1.1).unwrap().basis_points(), 11_000);
        assert_eq!(Rate::from_fraction(0.029).unwrap().basis_points(), 290);
    }

    #[test]
    fn from_fraction_rejects_negative_and_nan() {
        assert!(Rate::from_fraction(-0.1).is_err());
        assert!(Rate::from_fraction(f64::NAN).is_err());
        assert!(Rate::from_fraction(f64::INFINITY).is_err());
    }

    #[test]
    fn as_fraction_converts_back() {
        assert!((Rate::from_basis_points(2_500).as_fraction() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn is_within_is_inclusive() {
        let min = Rate::from_basis_points(1_000);
        let max = Rate::ONE;
        assert!(min.is_within(min, max));
        assert!(max.is_within(min, max));
        assert!(!Rate::from_basis_points(999).is_within(min, max));
    }

    #[test]
    fn displays_as_percentage() {
        assert_eq!(Rate::from_basis_points(290).to_string(), "2.9%");
        assert_eq!(Rate::from_basis_points(11_000).to_string(), "110%");
        assert_eq!(Rate::from_basis_points(1_234).to_string(), "12.34%");
        assert_eq!(Rate::ZERO.to_string(), "0%");
    }

    #[test]
    fn ordering_follows_basis_points() {
        assert!(Rate::from_basis_points(1) < Rate::ONE);
    }
}
