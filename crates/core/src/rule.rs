//! Placement rules — the atomic unit of binder configuration.
//!
//! A rule names a logical slot (its `place`), the target capability to
//! invoke for values found there, and how those values are shaped into
//! call arguments. Rules carry sort-time constraints (`before`/`after`)
//! that are stripped once the manifest is resolved.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Predicate over a place-relative path (`/`-separated, extension kept),
/// used for include/exclude filtering during directory scans.
pub type PathFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Pure transform enriching a loaded value with naming information:
/// `(value, filename, relative_path) -> value`.
///
/// `filename` is the flat normalized identifier of the file; the relative
/// path is extension-stripped and `/`-separated. Identical input must yield
/// identical output.
pub type FilenameTransform = Arc<dyn Fn(Value, &str, &str) -> Value + Send + Sync>;

/// One named parameter of an invocation signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Field name looked up on the loaded value
    pub name: String,

    /// Optional parameters may be omitted when trailing and unset
    pub optional: bool,
}

impl Param {
    /// Parse the bracket convention used in config files: `"name"` is
    /// required, `"[name]"` is optional.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Param {
                name: inner.to_string(),
                optional: true,
            }
        } else {
            Param {
                name: trimmed.to_string(),
                optional: false,
            }
        }
    }
}

/// Ordered list of named parameters mapping a loaded value's fields onto
/// positional call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
}

impl Signature {
    /// Build a signature from bracket-convention parameter names.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Signature {
            params: raw.into_iter().map(|p| Param::parse(p.as_ref())).collect(),
        }
    }
}

/// The atomic unit of binder configuration.
///
/// Scanning controls (`recursive`, `include`, `exclude`) and `awaited` are
/// `Option` so the manifest's reserved defaults entry can fill fields a rule
/// leaves unset. `before`/`after`/`meta` are sort-time metadata and do not
/// appear in a resolved manifest.
#[derive(Clone, Default)]
pub struct PlacementRule {
    /// Logical slot this rule binds (e.g. `"routes"`); unique after resolution
    pub place: String,

    /// Dotted capability path on the target (e.g. `"auth.strategy"`)
    pub method: String,

    /// How value fields map onto positional arguments; a missing signature
    /// passes the value as a single options argument
    pub signature: Option<Signature>,

    /// Whether this place may match many values (one invocation per value)
    pub list: bool,

    /// Scan nested subdirectories of the place
    pub recursive: Option<bool>,

    /// Keep only matching place-relative paths
    pub include: Option<PathFilter>,

    /// Drop matching place-relative paths; when neither `include` nor
    /// `exclude` is set, resolution installs the helpers exclusion
    pub exclude: Option<PathFilter>,

    /// Per-value enrichment from derived naming information
    pub use_filename: Option<FilenameTransform>,

    /// Places this rule must precede (sort-time only)
    pub before: Vec<String>,

    /// Places this rule must follow (sort-time only)
    pub after: Vec<String>,

    /// Await the invocation before proceeding (effective default: true)
    pub awaited: Option<bool>,

    /// Free-form tooling metadata (examples, docs); stripped post-sort
    pub meta: Option<Value>,
}

impl PlacementRule {
    /// Create a rule with the two mandatory fields set.
    pub fn new(place: impl Into<String>, method: impl Into<String>) -> Self {
        PlacementRule {
            place: place.into(),
            method: method.into(),
            ..PlacementRule::default()
        }
    }

    /// Effective `recursive` setting.
    pub fn is_recursive(&self) -> bool {
        self.recursive.unwrap_or(false)
    }

    /// Effective `awaited` setting.
    pub fn is_awaited(&self) -> bool {
        self.awaited.unwrap_or(true)
    }

    /// The scanning controls handed to the loader.
    pub fn scan_spec(&self) -> crate::loader::ScanSpec<'_> {
        crate::loader::ScanSpec {
            recursive: self.is_recursive(),
            include: self.include.as_ref(),
            exclude: self.exclude.as_ref(),
        }
    }
}

/// Default exclusion: any path with a segment named `helpers` is skipped.
pub fn excludes_helpers(path: &str) -> bool {
    path.split('/').any(|segment| segment == "helpers")
}

impl fmt::Debug for PlacementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementRule")
            .field("place", &self.place)
            .field("method", &self.method)
            .field("signature", &self.signature)
            .field("list", &self.list)
            .field("recursive", &self.recursive)
            .field("include", &self.include.as_ref().map(|_| "<fn>"))
            .field("exclude", &self.exclude.as_ref().map(|_| "<fn>"))
            .field("use_filename", &self.use_filename.as_ref().map(|_| "<fn>"))
            .field("before", &self.before)
            .field("after", &self.after)
            .field("awaited", &self.awaited)
            .field("meta", &self.meta)
            .finish()
    }
}
