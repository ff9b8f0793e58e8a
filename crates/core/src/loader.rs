//! Loader trait — the abstraction over value resolution.
//!
//! The engine never touches the filesystem itself. A loader takes a place
//! and scanning controls and returns the matching values in a deterministic
//! order (lexical by path), so manifest execution is reproducible.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::LoadError;
use crate::rule::PathFilter;

/// One value resolved for a place.
#[derive(Debug, Clone)]
pub struct LoadedValue {
    /// Flat normalized identifier (extension stripped, `index` collapsed,
    /// nested segments hyphen-joined)
    pub filename: String,

    /// Place-relative path, extension-stripped and `/`-separated
    pub relative_path: String,

    /// Absolute path the value was loaded from
    pub path: PathBuf,

    /// The loaded value
    pub value: Value,
}

/// Scanning controls for one place, borrowed from its rule.
pub struct ScanSpec<'a> {
    pub recursive: bool,
    pub include: Option<&'a PathFilter>,
    pub exclude: Option<&'a PathFilter>,
}

impl ScanSpec<'_> {
    /// Whether a place-relative path survives the include/exclude filters.
    pub fn admits(&self, relative_path: &str) -> bool {
        if let Some(include) = self.include {
            if !include(relative_path) {
                return false;
            }
        }
        if let Some(exclude) = self.exclude {
            if exclude(relative_path) {
                return false;
            }
        }
        true
    }
}

/// Resolves the values matching a place.
///
/// Absence is not an error: a place with no backing file yields an empty
/// vec. Errors are reserved for explicit reference failures (unreadable or
/// unparseable files).
pub trait Loader: Send + Sync {
    fn resolve(&self, place: &str, spec: &ScanSpec<'_>) -> Result<Vec<LoadedValue>, LoadError>;
}
