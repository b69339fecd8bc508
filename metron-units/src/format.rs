//! Canonical text form of a resolved unit
//!
//! The output is deterministic and re-parses to an equal value:
//! `1e3 kilogram * meter / second ** 2`, `meter ** 0.5`, `dimensionless`.
//! Base units are written with the names the registry defines for them
//! (`kilogram = [mass]`), in [`BaseDimension::ALL`] order, numerator before
//! denominator.

use num_traits::{Signed, Zero};
use crate::dimension::{BaseDimension, Exponent};
use crate::error::UnitError;
use crate::registry::Registry;
use crate::unit::{ResolvedUnit, SIGNIFICANT_DIGITS};

/// Format a resolved unit in canonical form.
///
/// Affine values are written as the registry name that defines them
/// (e.g. `degree_Celsius`); there is no expression form for an offset.
/// Fails with [`UnitError::UndefinedUnit`] when the registry has no name
/// for a base dimension the unit needs.
pub fn format_units(unit: &ResolvedUnit, registry: &Registry) -> Result<String, UnitError> {
    if unit.has_offset() {
        return registry.find_affine(unit).map(str::to_string).ok_or_else(|| {
            UnitError::UndefinedUnit(format!(
                "no unit in {} has dimension {}, scale {} and offset {}",
                registry.source(),
                unit.dimension,
                unit.scale,
                unit.offset
            ))
        });
    }
    format_linear(unit, registry)
}

fn format_linear(unit: &ResolvedUnit, registry: &Registry) -> Result<String, UnitError> {
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for (dim, exp) in unit.dimension.iter() {
        if exp.is_negative() {
            let positive = exp
                .numer()
                .checked_neg()
                .map(|n| Exponent::new_raw(n, *exp.denom()))
                .ok_or_else(|| UnitError::Definition(format!("exponent {} of [{}] overflows", exp, dim.name())))?;
            denominator.push(power(registry, dim, &positive)?);
        } else {
            numerator.push(power(registry, dim, &exp)?);
        }
    }

    let scale = format_scale(unit.scale);
    let scale = (scale != "1").then_some(scale);

    let mut out = match (scale, numerator.is_empty()) {
        (Some(s), false) => format!("{} {}", s, numerator.join(" * ")),
        (None, false) => numerator.join(" * "),
        (Some(s), true) if denominator.is_empty() => format!("{} {}", s, dimensionless(registry)?),
        (Some(s), true) => s,
        (None, true) if denominator.is_empty() => dimensionless(registry)?.to_string(),
        (None, true) => "1".to_string(),
    };
    for part in denominator {
        out.push_str(" / ");
        out.push_str(&part);
    }
    Ok(out)
}

fn power(registry: &Registry, dim: BaseDimension, exp: &Exponent) -> Result<String, UnitError> {
    let name = registry.base_name(dim).ok_or_else(|| {
        UnitError::UndefinedUnit(format!("no base unit for [{}] in {}", dim.name(), registry.source()))
    })?;
    if *exp == Exponent::from_integer(1) {
        Ok(name.to_string())
    } else {
        Ok(format!("{} ** {}", name, format_exponent(exp)))
    }
}

fn dimensionless(registry: &Registry) -> Result<&str, UnitError> {
    registry
        .dimensionless_name()
        .ok_or_else(|| UnitError::UndefinedUnit(format!("no dimensionless unit in {}", registry.source())))
}

/// Write an exponent the parser reads back exactly: `2`, `0.5`, `-1.25`,
/// or `(1/3)` when no finite decimal exists.
pub fn format_exponent(exp: &Exponent) -> String {
    if exp.is_integer() {
        return exp.to_integer().to_string();
    }

    let (numer, denom) = (*exp.numer(), *exp.denom());
    let mut rest = denom;
    let (mut twos, mut fives) = (0u32, 0u32);
    while rest % 2 == 0 {
        rest /= 2;
        twos += 1;
    }
    while rest % 5 == 0 {
        rest /= 5;
        fives += 1;
    }

    let digits = twos.max(fives);
    let decimal = (rest == 1)
        .then(|| 10i64.checked_pow(digits))
        .flatten()
        .and_then(|pow| numer.checked_mul(pow / denom).map(|scaled| (scaled, pow)));

    match decimal {
        Some((scaled, pow)) => {
            let sign = if scaled.is_negative() { "-" } else { "" };
            let abs = scaled.unsigned_abs();
            let pow = pow.unsigned_abs();
            format!("{}{}.{:0>width$}", sign, abs / pow, abs % pow, width = digits as usize)
        }
        None => format!("({}/{})", numer, denom),
    }
}

/// Shortest scientific form of a scale: `1e2`, `-3.07e2`, `4e-2`, `2.5`
pub fn format_scale(value: f64) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let raw = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    match exponent {
        "0" => mantissa.to_string(),
        _ => format!("{}e{}", mantissa, exponent),
    }
}
