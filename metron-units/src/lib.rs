//! Metron Units - unit expression parsing, canonical formatting and conversion
//!
//! Free-form unit text such as `g / 2.5 cm`, `MPa^0.5` or `F * 10 ** 2 kg`
//! resolves to a dimension vector over the seven base dimensions, a scale and
//! an offset. Resolved units format to a deterministic canonical string and
//! convert values between compatible units, affine temperature scales
//! included.
//!
//! The core functions take a [`Registry`] explicitly ([`resolve`],
//! [`format_units`], [`convert_value`]). The functions at the crate root use
//! the process-wide active registry, which defaults to the embedded
//! definitions and can be swapped with [`change_definitions_source`] or, for
//! a scope, [`use_definitions`].
//!
//! ```
//! let canonical = metron_units::parse_units("g / 2.5 cm")?;
//! assert_eq!(canonical.as_deref(), Some("4e-2 kilogram / meter"));
//!
//! let boiling = metron_units::convert_units(100.0, "degC", "degF")?;
//! assert!((boiling - 212.0).abs() < 1e-9);
//! # Ok::<(), metron_units::UnitError>(())
//! ```

mod active;
mod ast;
mod convert;
mod definitions;
mod dimension;
mod error;
mod eval;
mod format;
mod lexer;
mod parser;
mod preprocess;
mod registry;
mod unit;

pub use active::{
    active_registry, change_definitions_source, default_registry, use_definitions, use_registry,
    DefinitionsGuard,
};
pub use convert::{base_units, convert_value};
pub use definitions::{DefinitionsSource, DEFAULT_DEFINITIONS, DEFINITIONS_ENV};
pub use dimension::{BaseDimension, Dimension, Exponent};
pub use error::{ErrorKind, UnitError};
pub use eval::resolve;
pub use format::{format_exponent, format_scale, format_units};
pub use registry::Registry;
pub use unit::{BaseUnits, ResolvedUnit, SIGNIFICANT_DIGITS};

/// A unit argument: expression text, an already resolved unit, or nothing
#[derive(Debug, Clone, Copy)]
pub enum UnitSpec<'a> {
    Missing,
    Text(&'a str),
    Resolved(&'a ResolvedUnit),
}

impl<'a> From<&'a str> for UnitSpec<'a> {
    fn from(text: &'a str) -> Self {
        UnitSpec::Text(text)
    }
}

impl<'a> From<&'a String> for UnitSpec<'a> {
    fn from(text: &'a String) -> Self {
        UnitSpec::Text(text.as_str())
    }
}

impl<'a> From<&'a ResolvedUnit> for UnitSpec<'a> {
    fn from(unit: &'a ResolvedUnit) -> Self {
        UnitSpec::Resolved(unit)
    }
}

impl<'a> From<Option<&'a str>> for UnitSpec<'a> {
    fn from(text: Option<&'a str>) -> Self {
        text.map_or(UnitSpec::Missing, UnitSpec::Text)
    }
}

fn resolve_spec(spec: UnitSpec<'_>, registry: &Registry) -> Result<Option<ResolvedUnit>, UnitError> {
    match spec {
        UnitSpec::Missing => Ok(None),
        UnitSpec::Text(text) => registry.parse(text).map(Some),
        UnitSpec::Resolved(unit) => Ok(Some(unit.clone())),
    }
}

/// Canonical form of a unit under the active registry.
///
/// A missing unit gives `None`; empty text gives `dimensionless`.
pub fn parse_units<'a>(spec: impl Into<UnitSpec<'a>>) -> Result<Option<String>, UnitError> {
    let registry = active_registry()?;
    match resolve_spec(spec.into(), &registry)? {
        Some(unit) => format_units(&unit, &registry).map(Some),
        None => Ok(None),
    }
}

/// Like [`parse_units`], returning the resolved value instead of text
pub fn parse_units_resolved<'a>(spec: impl Into<UnitSpec<'a>>) -> Result<Option<ResolvedUnit>, UnitError> {
    let registry = active_registry()?;
    resolve_spec(spec.into(), &registry)
}

/// Convert `value` between two unit expressions under the active registry
pub fn convert_units(value: f64, from: &str, to: &str) -> Result<f64, UnitError> {
    let registry = active_registry()?;
    let from_unit = registry.parse(from)?;
    let to_unit = registry.parse(to)?;
    convert_value(value, &from_unit, &to_unit).map_err(|e| match e {
        UnitError::Incompatible { .. } => UnitError::Incompatible {
            from: from.to_string(),
            to: to.to_string(),
        },
        other => other,
    })
}

/// Base unit, scale and offset of a unit under the active registry
pub fn get_base_units<'a>(spec: impl Into<UnitSpec<'a>>) -> Result<BaseUnits, UnitError> {
    let registry = active_registry()?;
    match resolve_spec(spec.into(), &registry)? {
        Some(unit) => Ok(base_units(&unit)),
        None => Err(UnitError::Definition("no unit given".to_string())),
    }
}

/// The token stream the parser sees, rendered as text: `N.m` gives `N * m`,
/// `-3.07 * 10 ** 2` gives `-3.07e2`
pub fn preprocess(text: &str) -> Result<String, UnitError> {
    preprocess::clean(text).map(|lexemes| preprocess::render(&lexemes))
}
