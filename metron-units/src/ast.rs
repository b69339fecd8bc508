//! Abstract Syntax Tree for unit expressions

use std::fmt;
use crate::dimension::Exponent;

/// A numeral as written, with its parsed value
#[derive(Debug, Clone, PartialEq)]
pub struct Numeral {
    pub value: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    /// Implicit multiplication by adjacency, e.g. `kg m`
    Juxtapose,
}

/// `head (op node)*`, evaluated left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub head: Node,
    pub tail: Vec<(BinOp, Node)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Symbol(String),
    Number(Numeral),
    Group(Box<Expr>),
    Power(Box<Node>, Exponent),
    /// A numeral bound to the atom right after it: `2.5 cm`
    Scaled(Numeral, Box<Node>),
}

impl Expr {
    /// True if any unit symbol appears anywhere in the tree
    pub fn contains_symbol(&self) -> bool {
        self.head.contains_symbol() || self.tail.iter().any(|(_, n)| n.contains_symbol())
    }
}

impl Node {
    pub fn contains_symbol(&self) -> bool {
        match self {
            Node::Symbol(_) => true,
            Node::Number(_) => false,
            Node::Group(expr) => expr.contains_symbol(),
            Node::Power(base, _) => base.contains_symbol(),
            Node::Scaled(_, atom) => atom.contains_symbol(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (op, node) in &self.tail {
            match op {
                BinOp::Mul => write!(f, " * {}", node)?,
                BinOp::Div => write!(f, " / {}", node)?,
                BinOp::Juxtapose => write!(f, " {}", node)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Symbol(name) => write!(f, "{}", name),
            Node::Number(n) => write!(f, "{}", n.text),
            Node::Group(expr) => write!(f, "({})", expr),
            Node::Power(base, exp) => write!(f, "{} ** {}", base, exp),
            Node::Scaled(n, atom) => write!(f, "{} {}", n.text, atom),
        }
    }
}
