//! Dimensional analysis types
//!
//! Each resolved unit has dimensions represented as a 7-element vector of
//! rational exponents, in canonical order:
//! [mass, length, time, temperature, current, substance, luminosity]

use std::fmt;
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub, Zero};
use serde::{Serialize, Deserialize};

/// Rational exponent of a base dimension (e.g. 1/2 for `MPa^0.5`)
pub type Exponent = Ratio<i64>;

/// The fixed set of base dimensions, declared in canonical formatting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseDimension {
    Mass,
    Length,
    Time,
    Temperature,
    Current,
    Substance,
    Luminosity,
}

impl BaseDimension {
    /// All base dimensions in canonical order
    pub const ALL: [BaseDimension; 7] = [
        BaseDimension::Mass,
        BaseDimension::Length,
        BaseDimension::Time,
        BaseDimension::Temperature,
        BaseDimension::Current,
        BaseDimension::Substance,
        BaseDimension::Luminosity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in definitions sources, e.g. `[length]`
    pub fn name(self) -> &'static str {
        match self {
            BaseDimension::Mass => "mass",
            BaseDimension::Length => "length",
            BaseDimension::Time => "time",
            BaseDimension::Temperature => "temperature",
            BaseDimension::Current => "current",
            BaseDimension::Substance => "substance",
            BaseDimension::Luminosity => "luminosity",
        }
    }

    pub fn from_name(name: &str) -> Option<BaseDimension> {
        BaseDimension::ALL.iter().copied().find(|d| d.name() == name)
    }

    fn symbol(self) -> &'static str {
        match self {
            BaseDimension::Mass => "M",
            BaseDimension::Length => "L",
            BaseDimension::Time => "T",
            BaseDimension::Temperature => "Θ",
            BaseDimension::Current => "I",
            BaseDimension::Substance => "N",
            BaseDimension::Luminosity => "J",
        }
    }
}

/// Exponents of the 7 base dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub exponents: [Exponent; 7],
}

impl Dimension {
    /// Dimensionless (all exponents zero)
    pub const DIMENSIONLESS: Dimension = Dimension { exponents: [Ratio::new_raw(0, 1); 7] };

    /// A single base dimension raised to the first power
    pub fn base(dim: BaseDimension) -> Self {
        let mut exponents = [Exponent::zero(); 7];
        exponents[dim.index()] = Exponent::from_integer(1);
        Dimension { exponents }
    }

    pub fn exponent(&self, dim: BaseDimension) -> Exponent {
        self.exponents[dim.index()]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| e.is_zero())
    }

    /// Multiply dimensions (add exponents). `None` on exponent overflow.
    pub fn multiply(&self, other: &Dimension) -> Option<Dimension> {
        self.zip_with(other, |a, b| a.checked_add(b))
    }

    /// Divide dimensions (subtract exponents). `None` on exponent overflow.
    pub fn divide(&self, other: &Dimension) -> Option<Dimension> {
        self.zip_with(other, |a, b| a.checked_sub(b))
    }

    /// Raise to a rational power (multiply exponents)
    pub fn power(&self, exp: &Exponent) -> Option<Dimension> {
        let mut result = [Exponent::zero(); 7];
        for (slot, e) in result.iter_mut().zip(self.exponents.iter()) {
            *slot = e.checked_mul(exp).and_then(in_range)?;
        }
        Some(Dimension { exponents: result })
    }

    fn zip_with(
        &self,
        other: &Dimension,
        op: impl Fn(&Exponent, &Exponent) -> Option<Exponent>,
    ) -> Option<Dimension> {
        let mut result = [Exponent::zero(); 7];
        for i in 0..7 {
            result[i] = op(&self.exponents[i], &other.exponents[i]).and_then(in_range)?;
        }
        Some(Dimension { exponents: result })
    }

    /// Non-zero exponents in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (BaseDimension, Exponent)> + '_ {
        BaseDimension::ALL
            .iter()
            .map(move |&d| (d, self.exponents[d.index()]))
            .filter(|(_, e)| !e.is_zero())
    }
}

/// Exponents must stay negatable, so `i64::MIN` counts as overflow
fn in_range(exp: Exponent) -> Option<Exponent> {
    (*exp.numer() != i64::MIN && *exp.denom() != i64::MIN).then_some(exp)
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(dim, exp)| {
                if exp == Exponent::from_integer(1) {
                    dim.symbol().to_string()
                } else {
                    format!("{}^{}", dim.symbol(), exp)
                }
            })
            .collect();

        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::DIMENSIONLESS
    }
}
