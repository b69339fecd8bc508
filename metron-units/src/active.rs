//! The process-wide active registry
//!
//! Parsing and conversion at the crate root consult a single active
//! [`Registry`]. It starts out as the embedded default, built lazily on first
//! use. Swapping it is global: callers that swap from several threads must
//! serialize the swaps themselves.

use std::path::Path;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::info;
use crate::definitions::DefinitionsSource;
use crate::error::UnitError;
use crate::registry::Registry;

static DEFAULT: LazyLock<Result<Arc<Registry>, UnitError>> =
    LazyLock::new(|| Registry::load(&DefinitionsSource::Default).map(Arc::new));

/// `None` means the default registry is active
static ACTIVE: RwLock<Option<Arc<Registry>>> = RwLock::new(None);

/// The registry built from the embedded definitions
pub fn default_registry() -> Result<Arc<Registry>, UnitError> {
    (*DEFAULT).clone()
}

/// The registry parse and convert calls currently use
pub fn active_registry() -> Result<Arc<Registry>, UnitError> {
    let active = ACTIVE.read().unwrap_or_else(PoisonError::into_inner).clone();
    match active {
        Some(registry) => Ok(registry),
        None => default_registry(),
    }
}

fn swap(registry: Option<Arc<Registry>>) -> Option<Arc<Registry>> {
    let mut active = ACTIVE.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *active, registry)
}

/// Replace the active registry with one loaded from `path`, or restore the
/// default when `path` is `None`.
///
/// The new definitions are loaded before the swap, so on error the previous
/// registry stays active.
pub fn change_definitions_source(path: Option<&Path>) -> Result<(), UnitError> {
    let source = path.map_or(DefinitionsSource::Default, DefinitionsSource::path);
    let registry = match source {
        DefinitionsSource::Default => None,
        _ => Some(Arc::new(Registry::load(&source)?)),
    };
    swap(registry);
    info!(source = %source, "active unit definitions changed");
    Ok(())
}

/// Restores the previously active registry when dropped
#[must_use = "the previous registry is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct DefinitionsGuard {
    previous: Option<Arc<Registry>>,
}

impl Drop for DefinitionsGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let restored = previous
            .as_ref()
            .map_or_else(|| DefinitionsSource::Default.to_string(), |r| r.source().to_string());
        swap(previous);
        info!(source = %restored, "active unit definitions restored");
    }
}

/// Make `source` active until the returned guard is dropped
pub fn use_definitions(source: &DefinitionsSource) -> Result<DefinitionsGuard, UnitError> {
    let registry = match source {
        DefinitionsSource::Default => default_registry()?,
        _ => Arc::new(Registry::load(source)?),
    };
    Ok(use_registry(registry))
}

/// Make `registry` active until the returned guard is dropped
pub fn use_registry(registry: Arc<Registry>) -> DefinitionsGuard {
    info!(source = %registry.source(), "active unit definitions changed");
    let previous = swap(Some(registry));
    DefinitionsGuard { previous }
}
