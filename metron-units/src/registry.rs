//! Unit registry: named units, SI prefixes and a parse cache

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{trace, warn};
use crate::definitions::{self, DefinitionsSource};
use crate::dimension::BaseDimension;
use crate::error::UnitError;
use crate::eval;
use crate::unit::ResolvedUnit;

/// Parsed expressions kept per registry before the cache is reset
const CACHE_CAPACITY: usize = 4096;

/// A named entry, in definition order
#[derive(Debug, Clone)]
struct UnitDef {
    name: String,
    unit: ResolvedUnit,
}

/// Immutable-per-use set of unit definitions.
///
/// Every name and alias maps to a [`ResolvedUnit`]. Lookup is case-sensitive;
/// Title-Case spellings are accepted only where the definitions list them as
/// aliases.
#[derive(Debug)]
pub struct Registry {
    source: DefinitionsSource,
    units: Vec<UnitDef>,
    index: HashMap<String, usize>,
    /// Sorted longest first so `da` wins over `d`
    prefixes: Vec<(String, f64)>,
    /// Canonical name per base dimension, `None` for the dimensionless slot
    base_names: HashMap<Option<BaseDimension>, String>,
    cache: RwLock<HashMap<String, Result<ResolvedUnit, UnitError>>>,
}

impl Registry {
    pub(crate) fn empty(source: DefinitionsSource) -> Self {
        Registry {
            source,
            units: Vec::new(),
            index: HashMap::new(),
            prefixes: Vec::new(),
            base_names: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry from a definitions source
    pub fn load(source: &DefinitionsSource) -> Result<Registry, UnitError> {
        definitions::load(source)
    }

    /// Build a registry from definitions text held in memory
    pub fn from_definitions(text: &str) -> Result<Registry, UnitError> {
        definitions::parse_definitions(text, DefinitionsSource::Default)
    }

    pub fn source(&self) -> &DefinitionsSource {
        &self.source
    }

    /// Number of names and aliases, including generated `delta_` names
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    /// Exact name or alias, no prefix or plural handling
    pub fn get(&self, name: &str) -> Option<&ResolvedUnit> {
        self.index.get(name).map(|&i| &self.units[i].unit)
    }

    /// Name of the base unit defined for `dim`, the first `name = [dim]` line
    pub fn base_name(&self, dim: BaseDimension) -> Option<&str> {
        self.base_names.get(&Some(dim)).map(String::as_str)
    }

    /// Name defined as `name = []`, if any
    pub fn dimensionless_name(&self) -> Option<&str> {
        self.base_names.get(&None).map(String::as_str)
    }

    /// Resolve a single symbol.
    ///
    /// Tries, in order: the exact name, an SI prefix plus a name, the name
    /// with a plural `s` removed, and a prefix plus a plural name. Offset
    /// units never take a prefix.
    pub fn lookup(&self, symbol: &str) -> Option<ResolvedUnit> {
        self.lookup_singular(symbol).or_else(|| {
            symbol
                .strip_suffix('s')
                .filter(|stem| !stem.is_empty())
                .and_then(|stem| self.lookup_singular(stem))
        })
    }

    fn lookup_singular(&self, symbol: &str) -> Option<ResolvedUnit> {
        self.get(symbol).cloned().or_else(|| self.prefixed(symbol))
    }

    fn prefixed(&self, symbol: &str) -> Option<ResolvedUnit> {
        self.prefixes.iter().find_map(|(prefix, factor)| {
            let rest = symbol.strip_prefix(prefix.as_str()).filter(|r| !r.is_empty())?;
            let unit = self.get(rest).filter(|u| !u.has_offset())?;
            Some(ResolvedUnit::new(unit.dimension, unit.scale * factor))
        })
    }

    /// First name defined with exactly this dimension, scale and offset
    pub fn find_affine(&self, unit: &ResolvedUnit) -> Option<&str> {
        self.units
            .iter()
            .find(|def| def.unit.has_offset() && def.unit == *unit)
            .map(|def| def.name.as_str())
    }

    /// Resolve a unit expression, memoizing the result
    pub fn parse(&self, text: &str) -> Result<ResolvedUnit, UnitError> {
        // Try read lock first
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(result) = cache.get(text) {
                return result.clone();
            }
        }

        trace!(text = text, "unit expression cache miss");
        let result = eval::resolve(text, self);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert(text.to_string(), result.clone());
        result
    }

    pub(crate) fn define(&mut self, name: &str, unit: ResolvedUnit) {
        match self.index.get(name) {
            Some(&i) => {
                warn!(name = name, source = %self.source, "unit redefined");
                self.units[i].unit = unit;
            }
            None => {
                self.index.insert(name.to_string(), self.units.len());
                self.units.push(UnitDef { name: name.to_string(), unit });
            }
        }
        self.clear_cache();
    }

    pub(crate) fn define_base(&mut self, dim: Option<BaseDimension>, name: &str) {
        self.base_names.entry(dim).or_insert_with(|| name.to_string());
    }

    pub(crate) fn define_prefix(&mut self, name: &str, factor: f64) {
        match self.prefixes.iter_mut().find(|(p, _)| p == name) {
            Some(entry) => {
                warn!(prefix = name, source = %self.source, "prefix redefined");
                entry.1 = factor;
            }
            None => {
                self.prefixes.push((name.to_string(), factor));
                self.prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            }
        }
        self.clear_cache();
    }

    fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
