//! Tokenizer for unit expressions
//!
//! Never fails: characters that cannot start a token become
//! [`Token::Unknown`] and are reported later as undefined symbols.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unit name, alias or prefixed/plural form
    Symbol(String),
    /// Numeral as written; a leading `-` only appears after sign folding
    Number(String),
    Star,
    Slash,
    /// `^` or `**`
    Pow,
    Plus,
    Minus,
    LParen,
    RParen,
    Dot,
    Unknown(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(s) | Token::Number(s) | Token::Unknown(s) => write!(f, "{}", s),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Pow => write!(f, "**"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Dot => write!(f, "."),
        }
    }
}

/// A token with its byte offset and whether whitespace precedes it
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub offset: usize,
    pub spaced: bool,
}

impl Lexeme {
    pub fn new(token: Token, offset: usize, spaced: bool) -> Self {
        Lexeme { token, offset, spaced }
    }
}

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

fn superscript_digit(c: char) -> Option<char> {
    SUPERSCRIPT_DIGITS
        .iter()
        .position(|&s| s == c)
        .and_then(|d| char::from_digit(d as u32, 10))
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '°'
}

fn is_symbol_continue(c: char) -> bool {
    is_symbol_start(c) || c.is_ascii_digit()
}

/// Split a unit expression into lexemes
pub fn tokenize(input: &str) -> Vec<Lexeme> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let mut spaced = false;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            spaced = true;
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).map(|&(_, n)| n);

        // Numerals: 12, 2.5, 25., .5, 1e-5
        if c.is_ascii_digit() || (c == '.' && next.map_or(false, |n| n.is_ascii_digit())) {
            let start = i;
            let mut seen_dot = false;
            while i < chars.len() {
                let ch = chars[i].1;
                if ch.is_ascii_digit() {
                    i += 1;
                } else if ch == '.' && !seen_dot {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                let after = chars.get(i + 1).map(|&(_, n)| n);
                let after_sign = chars.get(i + 2).map(|&(_, n)| n);
                let digits_follow = match after {
                    Some(d) if d.is_ascii_digit() => true,
                    Some('+') | Some('-') => after_sign.map_or(false, |d| d.is_ascii_digit()),
                    _ => false,
                };
                if digits_follow {
                    i += 2;
                    while i < chars.len() && chars[i].1.is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
            out.push(Lexeme::new(Token::Number(text), offset, spaced));
            spaced = false;
            continue;
        }

        if is_symbol_start(c) {
            let start = i;
            while i < chars.len() && is_symbol_continue(chars[i].1) {
                i += 1;
            }
            let text: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
            out.push(Lexeme::new(Token::Symbol(text), offset, spaced));
            spaced = false;
            continue;
        }

        // Superscript exponents: m², s⁻¹
        if c == '⁻' || c == '⁺' || superscript_digit(c).is_some() {
            out.push(Lexeme::new(Token::Pow, offset, spaced));
            let mut text = String::new();
            if c == '⁻' || c == '⁺' {
                let sign = if c == '⁻' { Token::Minus } else { Token::Plus };
                out.push(Lexeme::new(sign, offset, false));
                i += 1;
            }
            let digits_offset = chars.get(i).map_or(input.len(), |&(o, _)| o);
            while let Some(d) = chars.get(i).and_then(|&(_, ch)| superscript_digit(ch)) {
                text.push(d);
                i += 1;
            }
            if !text.is_empty() {
                out.push(Lexeme::new(Token::Number(text), digits_offset, false));
            }
            spaced = false;
            continue;
        }

        let (token, width) = match c {
            '*' if next == Some('*') => (Token::Pow, 2),
            '*' | '·' | '×' => (Token::Star, 1),
            '^' => (Token::Pow, 1),
            '/' => (Token::Slash, 1),
            '+' => (Token::Plus, 1),
            '-' | '−' => (Token::Minus, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '.' => (Token::Dot, 1),
            other => (Token::Unknown(other.to_string()), 1),
        };
        out.push(Lexeme::new(token, offset, spaced));
        spaced = false;
        i += width;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|l| l.token).collect()
    }

    fn sym(s: &str) -> Token {
        Token::Symbol(s.to_string())
    }

    fn num(s: &str) -> Token {
        Token::Number(s.to_string())
    }

    #[test]
    fn test_simple_quotient() {
        assert_eq!(tokens("g/cm^3"), vec![sym("g"), Token::Slash, sym("cm"), Token::Pow, num("3")]);
    }

    #[test]
    fn test_double_star_is_power() {
        assert_eq!(tokens("10**-5"), vec![num("10"), Token::Pow, Token::Minus, num("5")]);
        assert_eq!(tokens("N * m"), vec![sym("N"), Token::Star, sym("m")]);
    }

    #[test]
    fn test_numerals() {
        assert_eq!(tokens("2.5cm"), vec![num("2.5"), sym("cm")]);
        assert_eq!(tokens("25.mm"), vec![num("25."), sym("mm")]);
        assert_eq!(tokens("25e-1 m"), vec![num("25e-1"), sym("m")]);
        assert_eq!(tokens(".5"), vec![num(".5")]);
        // An 'e' not followed by digits starts a symbol
        assert_eq!(tokens("2em"), vec![num("2"), sym("em")]);
    }

    #[test]
    fn test_dots() {
        assert_eq!(tokens("mol."), vec![sym("mol"), Token::Dot]);
        assert_eq!(tokens("N.m"), vec![sym("N"), Token::Dot, sym("m")]);
    }

    #[test]
    fn test_unknown_characters() {
        assert_eq!(
            tokens("lb : in^3"),
            vec![sym("lb"), Token::Unknown(":".into()), sym("in"), Token::Pow, num("3")]
        );
    }

    #[test]
    fn test_superscripts() {
        assert_eq!(tokens("m²"), vec![sym("m"), Token::Pow, num("2")]);
        assert_eq!(tokens("s⁻¹"), vec![sym("s"), Token::Pow, Token::Minus, num("1")]);
    }

    #[test]
    fn test_unicode_symbols() {
        assert_eq!(tokens("°C·µm"), vec![sym("°C"), Token::Star, sym("µm")]);
    }

    #[test]
    fn test_spacing_is_recorded() {
        let lexemes = tokenize("m ** - 1");
        let spaced: Vec<bool> = lexemes.iter().map(|l| l.spaced).collect();
        assert_eq!(spaced, vec![false, true, true, true]);
        assert_eq!(lexemes[3].offset, 7);
    }
}
