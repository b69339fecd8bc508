//! Line-oriented unit definitions loader
//!
//! ```text
//! # comment
//! kilo- = 1e3 = k-
//! meter = [length] = m = metre
//! dimensionless = []
//! newton = kilogram * meter / second ** 2 = N
//! degree_Celsius = kelvin; offset: 273.15 = degC = Celsius
//! ```
//!
//! Derived definitions are unit expressions resolved against the lines above
//! them. Each affine unit also defines `delta_<name>` for its name and every
//! alias, with the same scale and no offset.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::dimension::{BaseDimension, Dimension};
use crate::error::UnitError;
use crate::eval;
use crate::lexer::{tokenize, Token};
use crate::registry::Registry;
use crate::unit::ResolvedUnit;

/// Definitions compiled into the crate
pub const DEFAULT_DEFINITIONS: &str = include_str!("../definitions/default_en.txt");

/// Environment variable naming a definitions file
pub const DEFINITIONS_ENV: &str = "METRON_DEFINITIONS";

/// Where a registry's definitions come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefinitionsSource {
    /// The embedded [`DEFAULT_DEFINITIONS`]
    #[default]
    Default,
    Path(PathBuf),
}

impl DefinitionsSource {
    pub fn path(path: impl AsRef<Path>) -> Self {
        DefinitionsSource::Path(path.as_ref().to_path_buf())
    }

    /// `METRON_DEFINITIONS` if set and non-empty, otherwise the default
    pub fn from_env() -> Self {
        match std::env::var_os(DEFINITIONS_ENV) {
            Some(path) if !path.is_empty() => DefinitionsSource::Path(PathBuf::from(path)),
            _ => DefinitionsSource::Default,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, DefinitionsSource::Default)
    }
}

impl fmt::Display for DefinitionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionsSource::Default => write!(f, "default definitions"),
            DefinitionsSource::Path(path) => write!(f, "'{}'", path.display()),
        }
    }
}

/// Read and parse a definitions source
pub fn load(source: &DefinitionsSource) -> Result<Registry, UnitError> {
    let text = match source {
        DefinitionsSource::Default => Cow::Borrowed(DEFAULT_DEFINITIONS),
        DefinitionsSource::Path(path) => Cow::Owned(
            std::fs::read_to_string(path).map_err(|e| UnitError::load(source.to_string(), e.to_string()))?,
        ),
    };
    parse_definitions(&text, source.clone())
}

/// Parse definitions text into a registry tagged with `source`
pub fn parse_definitions(text: &str, source: DefinitionsSource) -> Result<Registry, UnitError> {
    let source_name = source.to_string();
    let mut registry = Registry::empty(source);

    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        parse_line(line, &mut registry).map_err(|msg| UnitError::load_at(source_name.clone(), i + 1, msg))?;
    }

    if registry.is_empty() {
        return Err(UnitError::load(source_name, "no units defined"));
    }

    debug!(
        source = %source_name,
        units = registry.len(),
        prefixes = registry.prefix_count(),
        "unit definitions loaded"
    );
    Ok(registry)
}

fn parse_line(line: &str, registry: &mut Registry) -> Result<(), String> {
    let mut fields = line.split('=').map(str::trim);
    let name = fields.next().unwrap_or_default();
    let value = fields.next().ok_or_else(|| format!("expected '=' in '{}'", line))?;
    // `_` stands for "no symbol"
    let aliases: Vec<&str> = fields.filter(|a| *a != "_").collect();

    if let Some(prefix) = name.strip_suffix('-') {
        return define_prefix(prefix, value, &aliases, registry);
    }

    let base = if value.starts_with('[') { Some(base_dimension(value)?) } else { None };
    let unit = match base {
        Some(Some(dim)) => ResolvedUnit::new(Dimension::base(dim), 1.0),
        Some(None) => ResolvedUnit::dimensionless(),
        None => derived_unit(value, registry)?,
    };

    let names: Vec<&str> = std::iter::once(name).chain(aliases.iter().copied()).collect();
    for n in &names {
        check_symbol(n)?;
    }
    for n in &names {
        registry.define(n, unit.clone());
    }
    if let Some(dim) = base {
        registry.define_base(dim, name);
    }
    if unit.has_offset() {
        for n in &names {
            registry.define(&format!("delta_{}", n), unit.delta());
        }
    }
    Ok(())
}

fn define_prefix(name: &str, value: &str, aliases: &[&str], registry: &mut Registry) -> Result<(), String> {
    let factor: f64 = value
        .parse()
        .map_err(|_| format!("prefix '{}' needs a numeric value, found '{}'", name, value))?;
    if !factor.is_finite() || factor == 0.0 {
        return Err(format!("prefix '{}' has unusable value {}", name, value));
    }

    let mut names = vec![name];
    for alias in aliases {
        let alias = alias
            .strip_suffix('-')
            .ok_or_else(|| format!("prefix alias '{}' must end with '-'", alias))?;
        names.push(alias);
    }
    for n in names {
        check_symbol(n)?;
        registry.define_prefix(n, factor);
    }
    Ok(())
}

/// `[]` is the dimensionless slot
fn base_dimension(value: &str) -> Result<Option<BaseDimension>, String> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| format!("malformed dimension '{}'", value))?
        .trim();

    if inner.is_empty() {
        return Ok(None);
    }
    BaseDimension::from_name(inner)
        .map(Some)
        .ok_or_else(|| format!("unknown base dimension '{}'", inner))
}

fn derived_unit(value: &str, registry: &Registry) -> Result<ResolvedUnit, String> {
    let (expr, offset) = match value.split_once(';') {
        Some((expr, modifier)) => {
            let offset = modifier
                .trim()
                .strip_prefix("offset:")
                .ok_or_else(|| format!("unknown modifier '{}'", modifier.trim()))?
                .trim();
            let offset: f64 = offset.parse().map_err(|_| format!("invalid offset '{}'", offset))?;
            (expr, offset)
        }
        None => (value, 0.0),
    };

    let unit = eval::resolve(expr, registry).map_err(|e| e.to_string())?;
    if offset == 0.0 {
        return Ok(unit);
    }
    if unit.has_offset() {
        return Err(format!("'{}' already has an offset", expr.trim()));
    }
    Ok(ResolvedUnit::with_offset(unit.dimension, unit.scale, offset))
}

/// Names must read back as a single symbol token
fn check_symbol(name: &str) -> Result<(), String> {
    let lexemes = tokenize(name);
    match lexemes.as_slice() {
        [single] if matches!(single.token, Token::Symbol(_) | Token::Unknown(_)) => Ok(()),
        _ => Err(format!("'{}' is not a valid unit name", name)),
    }
}
