//! Value conversion between resolved units

use crate::error::UnitError;
use crate::unit::{BaseUnits, ResolvedUnit};

/// Convert `value` from one unit to another through base units:
/// `base = value * scale_from + offset_from`, `result = (base - offset_to) / scale_to`.
pub fn convert_value(value: f64, from: &ResolvedUnit, to: &ResolvedUnit) -> Result<f64, UnitError> {
    if !from.is_compatible(to) {
        return Err(UnitError::Incompatible {
            from: from.dimension.to_string(),
            to: to.dimension.to_string(),
        });
    }
    Ok(to.from_base(from.to_base(value)))
}

/// How `unit` relates to the coherent base unit of its dimension
pub fn base_units(unit: &ResolvedUnit) -> BaseUnits {
    BaseUnits::of(unit)
}
