//! Error types for unit parsing, conversion and registry loading
//!
//! Every failure maps to exactly one [`ErrorKind`]. Messages name the
//! offending token where there is one, but only the kind is stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of a [`UnitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A token is not a known unit symbol or alias
    UndefinedUnit,
    /// The expression is structurally malformed
    Definition,
    /// A numeral is used where a scaling factor is not allowed
    Scaling,
    /// A zero numeral ends up in a divisor
    ZeroScale,
    /// Two units have different dimensions
    Incompatible,
    /// A definitions source could not be read or understood
    Load,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("undefined unit: '{0}'")]
    UndefinedUnit(String),

    #[error("invalid unit expression: {0}")]
    Definition(String),

    #[error("invalid scaling factor: {0}")]
    Scaling(String),

    #[error("zero scaling factor in divisor: '{0}'")]
    ZeroScale(String),

    #[error("cannot convert '{from}' to '{to}': incompatible dimensions")]
    Incompatible { from: String, to: String },

    #[error("cannot load unit definitions from {source_name}{}: {message}", line_suffix(.line))]
    Load {
        source_name: String,
        line: Option<usize>,
        message: String,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {})", n),
        None => String::new(),
    }
}

impl UnitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnitError::UndefinedUnit(_) => ErrorKind::UndefinedUnit,
            UnitError::Definition(_) => ErrorKind::Definition,
            UnitError::Scaling(_) => ErrorKind::Scaling,
            UnitError::ZeroScale(_) => ErrorKind::ZeroScale,
            UnitError::Incompatible { .. } => ErrorKind::Incompatible,
            UnitError::Load { .. } => ErrorKind::Load,
        }
    }

    pub(crate) fn load(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        UnitError::Load {
            source_name: source_name.into(),
            line: None,
            message: message.into(),
        }
    }

    pub(crate) fn load_at(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        UnitError::Load {
            source_name: source_name.into(),
            line: Some(line),
            message: message.into(),
        }
    }
}
