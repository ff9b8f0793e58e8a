//! Error types for the atelier domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all atelier operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Ordering errors ---
    #[error("Sort error: {0}")]
    Sort(#[from] SortError),

    // --- Manifest resolution errors ---
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    // --- Loader errors ---
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    // --- Target invocation errors ---
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Tags a failure with the rule and file being processed when it
    /// surfaced, so a failed registration names its origin.
    #[error("At place '{place}'{}: {source}", fmt_file(.file))]
    Rule {
        place: String,
        file: Option<String>,
        #[source]
        source: Box<Error>,
    },
}

fn fmt_file(file: &Option<String>) -> String {
    match file {
        Some(name) => format!(" ({name})"),
        None => String::new(),
    }
}

impl Error {
    /// Wrap an error with the place (and optionally the file) it arose in.
    pub fn at_place(place: &str, file: Option<&str>, source: impl Into<Error>) -> Self {
        Error::Rule {
            place: place.to_string(),
            file: file.map(str::to_string),
            source: Box::new(source.into()),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum SortError {
    #[error("Cyclic dependency among placement groups: {}", groups.join(", "))]
    CyclicDependency { groups: Vec<String> },
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Unknown place '{0}': amendment modifies a rule the base set does not contain")]
    UnknownPlace(String),
}

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Referenced value not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    #[error("Unknown target method: {0}")]
    UnknownMethod(String),

    #[error("'{0}' names a capability namespace, not a method")]
    Namespace(String),

    #[error("Invalid value for method {method}: {reason}")]
    InvalidValue { method: String, reason: String },

    #[error("Method {method} failed: {reason}")]
    Failed { method: String, reason: String },
}
