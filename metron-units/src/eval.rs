//! Expression evaluation against a registry
//!
//! Failures are classified in a fixed order so each input maps to exactly
//! one error kind: structure (preprocess/parse), then symbol resolution,
//! then scaling-literal legality, then zero divisors.

use num_traits::Signed;
use crate::ast::{BinOp, Expr, Node, Numeral};
use crate::error::UnitError;
use crate::parser;
use crate::preprocess;
use crate::registry::Registry;
use crate::unit::ResolvedUnit;

/// Resolve unit expression text to a [`ResolvedUnit`]
pub fn resolve(text: &str, registry: &Registry) -> Result<ResolvedUnit, UnitError> {
    let lexemes = preprocess::clean(text)?;
    if lexemes.is_empty() {
        return Ok(ResolvedUnit::dimensionless());
    }
    let expr = parser::parse(&lexemes)?;
    check_symbols(&expr, registry)?;
    check_scaling(&expr)?;
    let unit = evaluate(&expr, registry)?;
    if unit.is_zero_scale() {
        return Err(UnitError::Scaling(format!("scale of '{}' underflows to zero", expr)));
    }
    Ok(unit)
}

fn check_symbols(expr: &Expr, registry: &Registry) -> Result<(), UnitError> {
    std::iter::once(&expr.head)
        .chain(expr.tail.iter().map(|(_, node)| node))
        .try_for_each(|node| check_node_symbols(node, registry))
}

fn check_node_symbols(node: &Node, registry: &Registry) -> Result<(), UnitError> {
    match node {
        Node::Symbol(name) => match registry.lookup(name) {
            Some(_) => Ok(()),
            None => Err(UnitError::UndefinedUnit(name.clone())),
        },
        Node::Number(_) => Ok(()),
        Node::Group(inner) => check_symbols(inner, registry),
        Node::Power(base, _) => check_node_symbols(base, registry),
        Node::Scaled(_, atom) => check_node_symbols(atom, registry),
    }
}

fn check_scaling(expr: &Expr) -> Result<(), UnitError> {
    if !expr.contains_symbol() {
        return Err(UnitError::Scaling(format!("'{}' has no unit", expr)));
    }
    check_expr_scaling(expr, false)
}

/// `inverted` is true while walking a divisor
fn check_expr_scaling(expr: &Expr, inverted: bool) -> Result<(), UnitError> {
    check_node_scaling(&expr.head, inverted)?;

    let mut prev = &expr.head;
    for (op, node) in &expr.tail {
        if *op == BinOp::Juxtapose {
            if let Node::Number(n) = prev {
                return Err(UnitError::Scaling(format!("adjacent numerals '{} {}'", n.text, node)));
            }
            if let Node::Number(n) = node {
                return Err(UnitError::Scaling(format!(
                    "'{}' follows a unit instead of preceding it",
                    n.text
                )));
            }
        }
        check_node_scaling(node, inverted ^ (*op == BinOp::Div))?;
        prev = node;
    }
    Ok(())
}

fn check_node_scaling(node: &Node, inverted: bool) -> Result<(), UnitError> {
    match node {
        Node::Symbol(_) => Ok(()),
        Node::Number(n) => check_numeral(n, inverted),
        Node::Scaled(n, atom) => {
            check_numeral(n, inverted)?;
            check_node_scaling(atom, inverted)
        }
        Node::Group(inner) => check_expr_scaling(inner, inverted),
        Node::Power(base, exp) => match base.as_ref() {
            Node::Number(n) => Err(UnitError::Scaling(format!(
                "scaling factor '{}' cannot be raised to a power",
                n.text
            ))),
            other => check_node_scaling(other, inverted ^ exp.is_negative()),
        },
    }
}

fn check_numeral(n: &Numeral, inverted: bool) -> Result<(), UnitError> {
    if !n.value.is_finite() {
        return Err(UnitError::Scaling(format!("'{}' is out of range", n.text)));
    }
    if n.value == 0.0 && !inverted {
        return Err(UnitError::Scaling(format!("zero scaling factor '{}'", n.text)));
    }
    Ok(())
}

fn overflow(node: &dyn std::fmt::Display) -> UnitError {
    UnitError::Definition(format!("exponent overflow in '{}'", node))
}

fn evaluate(expr: &Expr, registry: &Registry) -> Result<ResolvedUnit, UnitError> {
    let mut acc = evaluate_node(&expr.head, registry)?;

    for (op, node) in &expr.tail {
        let rhs = evaluate_node(node, registry)?;
        acc = match op {
            BinOp::Mul | BinOp::Juxtapose => acc.multiply(&rhs),
            BinOp::Div => {
                if rhs.is_zero_scale() {
                    return Err(UnitError::ZeroScale(node.to_string()));
                }
                acc.divide(&rhs)
            }
        }
        .ok_or_else(|| overflow(expr))?;
    }

    if !acc.scale.is_finite() {
        return Err(UnitError::Scaling(format!("scale of '{}' is out of range", expr)));
    }
    Ok(acc)
}

fn evaluate_node(node: &Node, registry: &Registry) -> Result<ResolvedUnit, UnitError> {
    match node {
        Node::Symbol(name) => registry
            .lookup(name)
            .ok_or_else(|| UnitError::UndefinedUnit(name.clone())),
        Node::Number(n) => Ok(ResolvedUnit::scalar(n.value)),
        Node::Group(inner) => evaluate(inner, registry),
        Node::Power(base, exp) => {
            let value = evaluate_node(base, registry)?;
            if value.is_zero_scale() && exp.is_negative() {
                return Err(UnitError::ZeroScale(node.to_string()));
            }
            let result = value.power(exp).ok_or_else(|| overflow(node))?;
            if !result.scale.is_finite() {
                return Err(UnitError::Scaling(format!("scale of '{}' is out of range", node)));
            }
            Ok(result)
        }
        Node::Scaled(n, atom) => {
            let value = evaluate_node(atom, registry)?;
            ResolvedUnit::scalar(n.value)
                .multiply(&value)
                .ok_or_else(|| overflow(node))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{BaseDimension, Dimension};
    use crate::error::ErrorKind;
    use crate::unit::approx_eq;

    fn registry() -> Registry {
        Registry::load(&crate::DefinitionsSource::Default).unwrap()
    }

    fn kind_of(input: &str) -> ErrorKind {
        resolve(input, &registry()).unwrap_err().kind()
    }

    #[test]
    fn test_empty_is_dimensionless() {
        let reg = registry();
        assert_eq!(resolve("", &reg).unwrap(), ResolvedUnit::dimensionless());
        assert_eq!(resolve("   ", &reg).unwrap(), ResolvedUnit::dimensionless());
    }

    #[test]
    fn test_scaling_factor_binding() {
        let reg = registry();
        let a = resolve("g / 2.5 cm", &reg).unwrap();
        assert_eq!(a, resolve("g / (2.5 cm)", &reg).unwrap());
        assert_eq!(a, resolve("g / 2.5cm", &reg).unwrap());
        assert_eq!(a, resolve("g / 25.mm", &reg).unwrap());
        assert!(approx_eq(a.scale, 0.04));
    }

    #[test]
    fn test_distribution() {
        let reg = registry();
        assert_eq!(
            resolve("g / 2.5 * cm", &reg).unwrap(),
            resolve("g cm / 2.5", &reg).unwrap()
        );
    }

    #[test]
    fn test_newton_per_meter() {
        let reg = registry();
        assert_eq!(
            resolve("m^-1 * newton / meter", &reg).unwrap(),
            resolve("N / m^2", &reg).unwrap()
        );
    }

    #[test]
    fn test_offset_survives_only_alone() {
        let reg = registry();
        let c = resolve("degC", &reg).unwrap();
        assert!(approx_eq(c.offset, 273.15));
        assert!(resolve("(degC)", &reg).unwrap().has_offset());
        assert!(!resolve("degC / hour", &reg).unwrap().has_offset());
        assert!(!resolve("degC^2", &reg).unwrap().has_offset());
        assert!(!resolve("2 degC", &reg).unwrap().has_offset());
    }

    #[test]
    fn test_signs_fold_into_scale() {
        let reg = registry();
        let weird = resolve("g / -+-25e-1 m", &reg).unwrap();
        assert_eq!(weird, resolve("g / 2.5 m", &reg).unwrap());
        let spaced = resolve("ug / - -250 mL", &reg).unwrap();
        assert_eq!(spaced, resolve("ug / 250 mL", &reg).unwrap());
    }

    #[test]
    fn test_fractional_exponents() {
        let reg = registry();
        let root = resolve("MPa^0.5", &reg).unwrap();
        assert!(approx_eq(root.scale, 1e3));
        assert_eq!(
            root.dimension.exponent(BaseDimension::Mass),
            crate::dimension::Exponent::new(1, 2)
        );
    }

    #[test]
    fn test_undefined_symbols() {
        assert_eq!(kind_of("gibberish"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("SECONDS"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("cp"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("chain"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("lb : in^3"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("mol : mol"), ErrorKind::UndefinedUnit);
        assert_eq!(kind_of("m..s"), ErrorKind::UndefinedUnit);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(kind_of("/gram"), ErrorKind::Definition);
        assert_eq!(kind_of("m ** - 1"), ErrorKind::Definition);
    }

    #[test]
    fn test_exponent_overflow_is_definition_error() {
        assert_eq!(kind_of("m ** -9223372036854775807 / m"), ErrorKind::Definition);
        assert_eq!(kind_of("m ** 9223372036854775807 * m"), ErrorKind::Definition);
        assert!(resolve("m ** -9223372036854775807", &registry()).is_ok());
    }

    #[test]
    fn test_leading_factor_binds_to_next_unit() {
        let reg = registry();
        let rpm = resolve("rpm", &reg).unwrap();
        let three = resolve("3 rpm", &reg).unwrap();
        assert_eq!(three.dimension, rpm.dimension);
        assert!(approx_eq(three.scale, 3.0 * rpm.scale));
        assert_eq!(resolve("3 rpm * s", &reg).unwrap(), resolve("(3 rpm) * s", &reg).unwrap());
    }

    #[test]
    fn test_scaling_errors() {
        for input in ["16", "16.2", "g * 0/ m", "F * 1.1 3.5", "F m 1.1", "F * 1.1 ** 2", "1.1 3.5 m"] {
            assert_eq!(kind_of(input), ErrorKind::Scaling, "input {:?}", input);
        }
    }

    #[test]
    fn test_zero_divisor() {
        assert_eq!(kind_of("g / 0 m"), ErrorKind::ZeroScale);
        assert_eq!(kind_of("g / (0 m)^2"), ErrorKind::ZeroScale);
    }

    #[test]
    fn test_error_priority() {
        // structural beats undefined
        assert_eq!(kind_of("/gibberish"), ErrorKind::Definition);
        // undefined beats scaling
        assert_eq!(kind_of("gibberish 1.1"), ErrorKind::UndefinedUnit);
        // scaling beats zero divisor
        assert_eq!(kind_of("g * 0 / 0 m"), ErrorKind::Scaling);
    }

    #[test]
    fn test_scientific_numerals() {
        let reg = registry();
        let f = resolve("F", &reg).unwrap();
        let scaled = resolve("F * -3.07 * 10 ** 2", &reg).unwrap();
        assert!(approx_eq(scaled.scale, f.scale * -307.0));
        let per = resolve("1 / 10**5 degC", &reg).unwrap();
        assert!(approx_eq(per.scale, 1e-5));
        assert_eq!(per.dimension, Dimension::DIMENSIONLESS.divide(&Dimension::base(BaseDimension::Temperature)).unwrap());
    }
}
