//! Recursive descent parser for preprocessed unit expressions
//!
//! ```text
//! expr     := term (('*' | '/')? term)*
//! term     := NUMBER exponent?
//!           | NUMBER atom
//!           | atom
//! atom     := (SYMBOL | '(' expr ')') exponent?
//! exponent := ('^' | '**') (NUMBER | '(' NUMBER ('/' NUMBER)? ')')
//! ```
//!
//! Only structural problems are reported here. Numerals in places where a
//! scaling factor is not allowed still parse; the evaluator rejects them.

use num_traits::{CheckedDiv, CheckedMul, Zero};
use crate::ast::{BinOp, Expr, Node, Numeral};
use crate::dimension::Exponent;
use crate::error::UnitError;
use crate::lexer::{Lexeme, Token};

const MAX_DEPTH: usize = 64;

/// Parse a preprocessed, non-empty token stream
pub fn parse(lexemes: &[Lexeme]) -> Result<Expr, UnitError> {
    let mut parser = Parser { lexemes, pos: 0, depth: 0 };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(UnitError::Definition(format!(
            "unbalanced '{}' at position {}",
            extra.token, extra.offset
        )));
    }
    Ok(expr)
}

struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.lexemes.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn parse_expr(&mut self) -> Result<Expr, UnitError> {
        let head = self.parse_term()?;
        let mut tail = Vec::new();

        while let Some(lexeme) = self.peek() {
            let op = match lexeme.token {
                Token::RParen => break,
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Symbol(_) | Token::Number(_) | Token::LParen | Token::Unknown(_) => {
                    BinOp::Juxtapose
                }
                Token::Pow => {
                    return Err(UnitError::Definition(format!(
                        "exponent at position {} has no base",
                        lexeme.offset
                    )))
                }
                _ => {
                    return Err(UnitError::Definition(format!(
                        "unexpected '{}' at position {}",
                        lexeme.token, lexeme.offset
                    )))
                }
            };
            if op != BinOp::Juxtapose {
                self.pos += 1;
            }
            tail.push((op, self.parse_term()?));
        }

        Ok(Expr { head, tail })
    }

    fn parse_term(&mut self) -> Result<Node, UnitError> {
        let lexeme = match self.peek() {
            Some(l) => l,
            None => {
                return Err(UnitError::Definition(
                    "expression ends where a unit was expected".to_string(),
                ))
            }
        };

        match &lexeme.token {
            Token::Number(text) => {
                self.pos += 1;
                let numeral = parse_numeral(text, lexeme.offset)?;
                match self.peek().map(|l| &l.token) {
                    Some(Token::Pow) => {
                        let exp = self.parse_exponent()?;
                        Ok(Node::Power(Box::new(Node::Number(numeral)), exp))
                    }
                    Some(Token::Symbol(_)) | Some(Token::Unknown(_)) | Some(Token::LParen) => {
                        let atom = self.parse_atom()?;
                        Ok(Node::Scaled(numeral, Box::new(atom)))
                    }
                    _ => Ok(Node::Number(numeral)),
                }
            }
            Token::Symbol(_) | Token::Unknown(_) | Token::LParen => self.parse_atom(),
            Token::Star | Token::Slash => Err(UnitError::Definition(format!(
                "operator '{}' at position {} has no left operand",
                lexeme.token, lexeme.offset
            ))),
            other => Err(UnitError::Definition(format!(
                "unexpected '{}' at position {}",
                other, lexeme.offset
            ))),
        }
    }

    fn parse_atom(&mut self) -> Result<Node, UnitError> {
        let lexeme = match self.next() {
            Some(l) => l,
            None => return Err(UnitError::Definition("missing unit".to_string())),
        };

        let atom = match &lexeme.token {
            Token::Symbol(name) | Token::Unknown(name) => Node::Symbol(name.clone()),
            Token::LParen => {
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(UnitError::Definition("parentheses nested too deeply".to_string()));
                }
                let inner = self.parse_expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Lexeme { token: Token::RParen, .. }) => Node::Group(Box::new(inner)),
                    _ => {
                        return Err(UnitError::Definition(format!(
                            "unclosed '(' at position {}",
                            lexeme.offset
                        )))
                    }
                }
            }
            other => {
                return Err(UnitError::Definition(format!(
                    "expected a unit at position {}, found '{}'",
                    lexeme.offset, other
                )))
            }
        };

        if matches!(self.peek().map(|l| &l.token), Some(Token::Pow)) {
            let exp = self.parse_exponent()?;
            if let Some(l) = self.peek().filter(|l| l.token == Token::Pow) {
                return Err(UnitError::Definition(format!(
                    "chained exponent at position {}",
                    l.offset
                )));
            }
            return Ok(Node::Power(Box::new(atom), exp));
        }
        Ok(atom)
    }

    /// Consumes the `^`/`**` and the exponent that follows it
    fn parse_exponent(&mut self) -> Result<Exponent, UnitError> {
        let pow = self.next().map_or(0, |l| l.offset);
        match self.next() {
            Some(Lexeme { token: Token::Number(text), offset, .. }) => exponent_from_decimal(text)
                .ok_or_else(|| UnitError::Definition(format!("invalid exponent '{}' at position {}", text, offset))),
            Some(Lexeme { token: Token::LParen, .. }) => {
                let numer = self.exponent_part()?;
                let exp = if matches!(self.peek().map(|l| &l.token), Some(Token::Slash)) {
                    self.pos += 1;
                    let denom = self.exponent_part()?;
                    if denom.is_zero() {
                        return Err(UnitError::Definition(format!(
                            "zero denominator in exponent at position {}",
                            pow
                        )));
                    }
                    numer.checked_div(&denom).ok_or_else(|| {
                        UnitError::Definition(format!("exponent out of range at position {}", pow))
                    })?
                } else {
                    numer
                };
                match self.next() {
                    Some(Lexeme { token: Token::RParen, .. }) => Ok(exp),
                    _ => Err(UnitError::Definition(format!(
                        "unclosed exponent at position {}",
                        pow
                    ))),
                }
            }
            _ => Err(UnitError::Definition(format!(
                "exponent at position {} must be a number",
                pow
            ))),
        }
    }

    fn exponent_part(&mut self) -> Result<Exponent, UnitError> {
        match self.next() {
            Some(Lexeme { token: Token::Number(text), offset, .. }) => exponent_from_decimal(text)
                .ok_or_else(|| UnitError::Definition(format!("invalid exponent '{}' at position {}", text, offset))),
            Some(l) => Err(UnitError::Definition(format!(
                "expected a number in exponent at position {}",
                l.offset
            ))),
            None => Err(UnitError::Definition("unclosed exponent".to_string())),
        }
    }
}

fn parse_numeral(text: &str, offset: usize) -> Result<Numeral, UnitError> {
    let value: f64 = text
        .parse()
        .map_err(|_| UnitError::Definition(format!("invalid numeral '{}' at position {}", text, offset)))?;
    Ok(Numeral { value, text: text.to_string() })
}

/// Exact rational value of a decimal numeral such as `-2.0`, `1.5` or `-1e0`
pub fn exponent_from_decimal(text: &str) -> Option<Exponent> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (mantissa, exp10) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (&body[..i], body[i + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits: String = format!("{}{}", int_part, frac_part);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    let numer: i64 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    let numer = if negative { -numer } else { numer };

    let shift = exp10.checked_sub(i32::try_from(frac_part.len()).ok()?)?;
    let power = 10i64.checked_pow(shift.unsigned_abs())?;
    if shift >= 0 {
        Some(Exponent::from_integer(numer).checked_mul(&Exponent::from_integer(power))?)
    } else {
        Some(Exponent::new(numer, power))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::clean;

    fn parse_text(input: &str) -> Result<Expr, UnitError> {
        parse(&clean(input)?)
    }

    fn symbol(name: &str) -> Node {
        Node::Symbol(name.to_string())
    }

    fn numeral(value: f64, text: &str) -> Numeral {
        Numeral { value, text: text.to_string() }
    }

    #[test]
    fn test_scaling_factor_binds_to_next_atom() {
        let expr = parse_text("g / 2.5 cm").unwrap();
        assert_eq!(expr.head, symbol("g"));
        assert_eq!(
            expr.tail,
            vec![(BinOp::Div, Node::Scaled(numeral(2.5, "2.5"), Box::new(symbol("cm"))))]
        );
    }

    #[test]
    fn test_numeral_before_operator_stands_alone() {
        let expr = parse_text("g / 2.5 * cm").unwrap();
        assert_eq!(expr.tail[0], (BinOp::Div, Node::Number(numeral(2.5, "2.5"))));
        assert_eq!(expr.tail[1], (BinOp::Mul, symbol("cm")));
    }

    #[test]
    fn test_exponent_binds_to_atom_not_factor() {
        let expr = parse_text("2.5 cm^2").unwrap();
        let expected = Node::Scaled(
            numeral(2.5, "2.5"),
            Box::new(Node::Power(Box::new(symbol("cm")), Exponent::from_integer(2))),
        );
        assert_eq!(expr.head, expected);
    }

    #[test]
    fn test_implicit_multiplication() {
        let expr = parse_text("kg m / s").unwrap();
        assert_eq!(expr.tail[0], (BinOp::Juxtapose, symbol("m")));
        assert_eq!(expr.tail[1], (BinOp::Div, symbol("s")));
    }

    #[test]
    fn test_groups_and_rational_exponents() {
        let expr = parse_text("(m / s) ** (1/3)").unwrap();
        match expr.head {
            Node::Power(base, exp) => {
                assert!(matches!(*base, Node::Group(_)));
                assert_eq!(exp, Exponent::new(1, 3));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors() {
        for input in ["/gram", "* m", "g /", "(m", "m)", "()", "m ^", "m ^ s", "m^2^3", "^2"] {
            assert!(
                matches!(parse_text(input), Err(UnitError::Definition(_))),
                "expected structural error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_exponentiated_numeral_still_parses() {
        let expr = parse_text("F * 1.1 ** 2").unwrap();
        assert!(matches!(expr.tail[0].1, Node::Power(_, _)));
    }

    #[test]
    fn test_exponent_from_decimal() {
        assert_eq!(exponent_from_decimal("2"), Some(Exponent::from_integer(2)));
        assert_eq!(exponent_from_decimal("-2.0"), Some(Exponent::from_integer(-2)));
        assert_eq!(exponent_from_decimal("-1e0"), Some(Exponent::from_integer(-1)));
        assert_eq!(exponent_from_decimal("0.5"), Some(Exponent::new(1, 2)));
        assert_eq!(exponent_from_decimal("1.5"), Some(Exponent::new(3, 2)));
        assert_eq!(exponent_from_decimal("25e-1"), Some(Exponent::new(5, 2)));
        assert_eq!(exponent_from_decimal("0"), Some(Exponent::from_integer(0)));
        assert_eq!(exponent_from_decimal("1e40"), None);
    }
}
