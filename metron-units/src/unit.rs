//! Resolved unit values: dimension vector, cumulative scale and offset

use serde::{Serialize, Deserialize};
use num_traits::One;
use crate::dimension::{Dimension, Exponent};

/// Significant digits that distinguish two scales or offsets. The
/// canonical formatter writes the same number of digits, so equal units
/// always format identically.
pub const SIGNIFICANT_DIGITS: usize = 12;

/// The result of resolving a unit expression.
///
/// `value_base = value * scale + offset` relates a magnitude in this unit to
/// the coherent base units of its dimension. The offset is non-zero only for
/// a lone affine unit (e.g. `degC`); any product, quotient or power other
/// than 1 collapses it to a pure difference unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedUnit {
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
}

impl ResolvedUnit {
    pub fn new(dimension: Dimension, scale: f64) -> Self {
        ResolvedUnit { dimension, scale, offset: 0.0 }
    }

    pub fn with_offset(dimension: Dimension, scale: f64, offset: f64) -> Self {
        ResolvedUnit { dimension, scale, offset }
    }

    /// Dimensionless with unit scale
    pub fn dimensionless() -> Self {
        Self::new(Dimension::DIMENSIONLESS, 1.0)
    }

    /// A pure numeral, e.g. the `2.5` in `g / 2.5 cm`
    pub fn scalar(value: f64) -> Self {
        Self::new(Dimension::DIMENSIONLESS, value)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn is_zero_scale(&self) -> bool {
        self.scale == 0.0
    }

    pub fn has_offset(&self) -> bool {
        self.offset != 0.0
    }

    pub fn is_compatible(&self, other: &ResolvedUnit) -> bool {
        self.dimension == other.dimension
    }

    /// Same dimension, unit scale and no offset
    pub fn base(&self) -> ResolvedUnit {
        Self::new(self.dimension, 1.0)
    }

    /// Convert a value in this unit to base units
    pub fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Convert a value in base units to this unit
    pub fn from_base(&self, value_base: f64) -> f64 {
        (value_base - self.offset) / self.scale
    }

    /// Multiply two units. `None` on exponent overflow.
    pub fn multiply(&self, other: &ResolvedUnit) -> Option<ResolvedUnit> {
        Some(Self::new(
            self.dimension.multiply(&other.dimension)?,
            self.scale * other.scale,
        ))
    }

    /// Divide two units. The caller rejects a zero divisor scale first.
    pub fn divide(&self, other: &ResolvedUnit) -> Option<ResolvedUnit> {
        Some(Self::new(
            self.dimension.divide(&other.dimension)?,
            self.scale / other.scale,
        ))
    }

    /// Raise to a rational power; an exponent of exactly 1 keeps the offset
    pub fn power(&self, exp: &Exponent) -> Option<ResolvedUnit> {
        if exp.is_one() {
            return Some(self.clone());
        }
        let scale = if exp.is_integer() {
            let n = exp.to_integer();
            i32::try_from(n).map(|n| self.scale.powi(n)).unwrap_or_else(|_| self.scale.powf(n as f64))
        } else {
            self.scale.powf(*exp.numer() as f64 / *exp.denom() as f64)
        };
        Some(Self::new(self.dimension.power(exp)?, scale))
    }

    /// Drop the offset, turning an affine unit into its difference unit
    pub fn delta(&self) -> ResolvedUnit {
        Self::new(self.dimension, self.scale)
    }
}

/// True when both values round to the same `SIGNIFICANT_DIGITS` digits
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    a == b || rounded(a) == rounded(b)
}

fn rounded(value: f64) -> String {
    format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
}

impl PartialEq for ResolvedUnit {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && approx_eq(self.scale, other.scale)
            && approx_eq(self.offset, other.offset)
    }
}

impl Default for ResolvedUnit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

/// How a unit relates to its base-dimension representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseUnits {
    /// Coherent base unit of the same dimension (unit scale, no offset)
    pub unit: ResolvedUnit,
    pub scale: f64,
    pub offset: f64,
}

impl BaseUnits {
    pub fn of(unit: &ResolvedUnit) -> Self {
        BaseUnits {
            unit: unit.base(),
            scale: unit.scale,
            offset: unit.offset,
        }
    }

    pub fn into_tuple(self) -> (ResolvedUnit, f64, f64) {
        (self.unit, self.scale, self.offset)
    }
}

impl PartialEq for BaseUnits {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit
            && approx_eq(self.scale, other.scale)
            && approx_eq(self.offset, other.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::BaseDimension;

    fn meter() -> ResolvedUnit {
        ResolvedUnit::new(Dimension::base(BaseDimension::Length), 1.0)
    }

    fn kilometer() -> ResolvedUnit {
        ResolvedUnit::new(Dimension::base(BaseDimension::Length), 1000.0)
    }

    fn second() -> ResolvedUnit {
        ResolvedUnit::new(Dimension::base(BaseDimension::Time), 1.0)
    }

    fn celsius() -> ResolvedUnit {
        ResolvedUnit::with_offset(Dimension::base(BaseDimension::Temperature), 1.0, 273.15)
    }

    #[test]
    fn test_compatible_units() {
        assert!(meter().is_compatible(&kilometer()));
        assert!(!meter().is_compatible(&second()));
    }

    #[test]
    fn test_to_and_from_base() {
        let km = kilometer();
        assert_eq!(km.to_base(5.0), 5000.0);
        assert_eq!(km.from_base(5000.0), 5.0);

        let c = celsius();
        assert!((c.to_base(25.0) - 298.15).abs() < 1e-9);
        assert!((c.from_base(273.15)).abs() < 1e-9);
    }

    #[test]
    fn test_multiply_collapses_offset() {
        let per_hour = celsius().divide(&second()).unwrap();
        assert!(!per_hour.has_offset());
        let squared = celsius().power(&Exponent::from_integer(2)).unwrap();
        assert!(!squared.has_offset());
        let same = celsius().power(&Exponent::from_integer(1)).unwrap();
        assert!(same.has_offset());
    }

    #[test]
    fn test_fractional_power_scale() {
        let mpa = ResolvedUnit::new(Dimension::DIMENSIONLESS, 1e6);
        let root = mpa.power(&Exponent::new(1, 2)).unwrap();
        assert!(approx_eq(root.scale, 1e3));
    }

    #[test]
    fn test_equality_is_tolerant() {
        let a = ResolvedUnit::new(Dimension::DIMENSIONLESS, 0.1 + 0.2);
        let b = ResolvedUnit::new(Dimension::DIMENSIONLESS, 0.3);
        assert_eq!(a, b);
        assert_ne!(meter(), kilometer());
    }

    #[test]
    fn test_equality_stops_at_twelve_digits() {
        let length = Dimension::base(BaseDimension::Length);
        assert_ne!(ResolvedUnit::new(length, 1.0000000001), meter());
        assert_eq!(ResolvedUnit::new(length, 1.0 + 1e-14), meter());
        assert_ne!(ResolvedUnit::new(length, 1e-15), ResolvedUnit::new(length, 2e-15));
        assert_eq!(ResolvedUnit::new(length, 0.0), ResolvedUnit::new(length, -0.0));
    }

    #[test]
    fn test_base_units_of_celsius() {
        let base = BaseUnits::of(&celsius());
        assert_eq!(base.unit, ResolvedUnit::new(Dimension::base(BaseDimension::Temperature), 1.0));
        assert_eq!(base.scale, 1.0);
        assert_eq!(base.offset, 273.15);
    }
}
