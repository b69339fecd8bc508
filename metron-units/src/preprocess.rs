//! Token-stream rewriting ahead of the parser
//!
//! Three passes, in order:
//! 1. punctuation: a `.` glued between two unit atoms multiplies, a trailing
//!    `.` after a word is dropped (`mol.` reads as `mol`)
//! 2. unary signs fold into the numeral they precede (`- -250` is `250`)
//! 3. scientific notation: `c * 10 ** n` and `10 ** n` fuse into one numeral
//!    (`-3.07 * 10 ** 2` becomes `-3.07e2`)

use crate::error::UnitError;
use crate::lexer::{tokenize, Lexeme, Token};

/// Rewrite raw text into the token stream the parser accepts
pub fn clean(input: &str) -> Result<Vec<Lexeme>, UnitError> {
    let lexemes = normalize_punctuation(tokenize(input));
    let lexemes = fold_signs(lexemes)?;
    Ok(fuse_scientific(lexemes))
}

/// Render a token stream back to text, one space between tokens
pub fn render(lexemes: &[Lexeme]) -> String {
    lexemes
        .iter()
        .map(|l| l.token.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_atom_end(token: &Token) -> bool {
    matches!(token, Token::Symbol(_) | Token::RParen)
}

fn normalize_punctuation(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut out: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    let mut iter = lexemes.into_iter().peekable();
    // a dropped terminator leaves no trace in `out`
    let mut after_dot = false;

    while let Some(lexeme) = iter.next() {
        if lexeme.token != Token::Dot {
            after_dot = false;
            out.push(lexeme);
            continue;
        }

        let follows_word =
            !after_dot && !lexeme.spaced && out.last().map_or(false, |prev| is_atom_end(&prev.token));
        after_dot = true;
        if !follows_word {
            out.push(Lexeme::new(Token::Unknown(".".to_string()), lexeme.offset, lexeme.spaced));
            continue;
        }

        let joins_next = iter.peek().map_or(false, |next| {
            !next.spaced && matches!(next.token, Token::Symbol(_) | Token::LParen)
        });
        if joins_next {
            out.push(Lexeme::new(Token::Star, lexeme.offset, false));
        }
        // otherwise a word terminator: dropped
    }

    out
}

fn is_unary_position(prev: Option<&Lexeme>) -> bool {
    match prev {
        None => true,
        Some(l) => matches!(l.token, Token::Star | Token::Slash | Token::Pow | Token::LParen),
    }
}

fn fold_signs(lexemes: Vec<Lexeme>) -> Result<Vec<Lexeme>, UnitError> {
    let mut out: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    let mut i = 0;

    while i < lexemes.len() {
        let lexeme = &lexemes[i];
        if !matches!(lexeme.token, Token::Plus | Token::Minus) {
            out.push(lexeme.clone());
            i += 1;
            continue;
        }

        if !is_unary_position(out.last()) {
            return Err(UnitError::Definition(format!(
                "'{}' at position {} is not a unit operator",
                lexeme.token, lexeme.offset
            )));
        }

        let in_exponent = matches!(out.last().map(|l| &l.token), Some(Token::Pow));
        let start = i;
        let mut negative = false;
        while i < lexemes.len() && matches!(lexemes[i].token, Token::Plus | Token::Minus) {
            if lexemes[i].token == Token::Minus {
                negative = !negative;
            }
            i += 1;
        }

        let text = match lexemes.get(i).map(|l| &l.token) {
            Some(Token::Number(text)) => text,
            _ => {
                return Err(UnitError::Definition(format!(
                    "sign at position {} must precede a numeral",
                    lexemes[start].offset
                )))
            }
        };

        if in_exponent && lexemes[start + 1..=i].iter().any(|l| l.spaced) {
            return Err(UnitError::Definition(format!(
                "whitespace between sign and exponent at position {}",
                lexemes[start].offset
            )));
        }

        let folded = if negative { format!("-{}", text) } else { text.clone() };
        out.push(Lexeme::new(Token::Number(folded), lexemes[start].offset, lexemes[start].spaced));
        i += 1;
    }

    Ok(out)
}

fn number_text(lexeme: Option<&Lexeme>) -> Option<&str> {
    match lexeme.map(|l| &l.token) {
        Some(Token::Number(text)) => Some(text.as_str()),
        _ => None,
    }
}

fn integer_exponent(text: &str) -> Option<i32> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn fuse_scientific(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut out: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    let mut i = 0;

    while i < lexemes.len() {
        let is_ten = number_text(lexemes.get(i)) == Some("10");
        let base_is_exponent = matches!(out.last().map(|l| &l.token), Some(Token::Pow));
        let pow_follows = matches!(lexemes.get(i + 1).map(|l| &l.token), Some(Token::Pow));
        let exponent = number_text(lexemes.get(i + 2)).and_then(integer_exponent);

        let exponent = match exponent {
            Some(e) if is_ten && pow_follows && !base_is_exponent => e,
            _ => {
                out.push(lexemes[i].clone());
                i += 1;
                continue;
            }
        };

        // `coefficient * 10 ** n`: the coefficient must not itself be an exponent
        let n = out.len();
        let coefficient = if n >= 2
            && out[n - 1].token == Token::Star
            && !matches!(n.checked_sub(3).map(|k| &out[k].token), Some(Token::Pow))
        {
            number_text(out.get(n - 2)).map(|text| (text.to_string(), out[n - 2].offset, out[n - 2].spaced))
        } else {
            None
        };

        let fused = match coefficient {
            Some((coef, offset, spaced)) => {
                out.truncate(n - 2);
                let text = if coef.contains(|c: char| c == 'e' || c == 'E') {
                    let value = coef.parse::<f64>().unwrap_or(f64::NAN) * 10f64.powi(exponent);
                    crate::format::format_scale(value)
                } else {
                    format!("{}e{}", coef, exponent)
                };
                Lexeme::new(Token::Number(text), offset, spaced)
            }
            None => Lexeme::new(
                Token::Number(format!("1e{}", exponent)),
                lexemes[i].offset,
                lexemes[i].spaced,
            ),
        };
        out.push(fused);
        i += 3;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(input: &str) -> String {
        render(&clean(input).unwrap())
    }

    #[test]
    fn test_trailing_dot_is_terminator() {
        assert_eq!(cleaned("mol."), "mol");
        assert_eq!(cleaned("mol. / s"), "mol / s");
    }

    #[test]
    fn test_infix_dot_multiplies() {
        assert_eq!(cleaned("N.m"), "N * m");
        assert_eq!(cleaned("N.m"), cleaned("N * m"));
    }

    #[test]
    fn test_stray_dot_is_unknown() {
        let lexemes = clean("g / . m").unwrap();
        assert_eq!(lexemes[2].token, Token::Unknown(".".into()));
    }

    #[test]
    fn test_repeated_dot_is_unknown() {
        let lexemes = clean("m..s").unwrap();
        assert_eq!(lexemes.len(), 3);
        assert_eq!(lexemes[1].token, Token::Unknown(".".into()));
        assert_eq!(cleaned("m.s"), "m * s");
        assert_eq!(cleaned("mol."), "mol");
    }

    #[test]
    fn test_scientific_fusion() {
        assert_eq!(cleaned("10 ** 2"), "1e2");
        assert_eq!(cleaned("10**-5"), "1e-5");
        assert_eq!(cleaned("-3.07 * 10 ** 2"), "-3.07e2");
        assert_eq!(cleaned("11*10^2"), "11e2");
        assert_eq!(cleaned("F* 10 ** 2 kg"), "F * 1e2 kg");
    }

    #[test]
    fn test_fusion_needs_integer_exponent_and_numeral_base() {
        assert_eq!(cleaned("10 ** 2.5"), "10 ** 2.5");
        assert_eq!(cleaned("m ** 2"), "m ** 2");
        assert_eq!(cleaned("m ** 10 ** 2"), "m ** 10 ** 2");
    }

    #[test]
    fn test_exponent_is_not_a_coefficient() {
        assert_eq!(cleaned("m ** 2 * 10 ** 3"), "m ** 2 * 1e3");
    }

    #[test]
    fn test_sign_folding() {
        assert_eq!(cleaned("g / -+-25e-1 m"), "g / 25e-1 m");
        assert_eq!(cleaned("ug / - -250 mL"), "ug / 250 mL");
        assert_eq!(cleaned("m^-1"), "m ** -1");
    }

    #[test]
    fn test_spaced_exponent_sign_is_structural() {
        let err = clean("m ** - 1").unwrap_err();
        assert!(matches!(err, UnitError::Definition(_)));
    }

    #[test]
    fn test_binary_minus_is_structural() {
        assert!(matches!(clean("g - m"), Err(UnitError::Definition(_))));
        assert!(matches!(clean("-m"), Err(UnitError::Definition(_))));
    }
}
