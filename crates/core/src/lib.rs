//! # Atelier Core
//!
//! Domain types, traits, and error definitions for the atelier binder.
//! This crate has **zero framework dependencies** — it defines the model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping the loader or target via configuration
//! - Easy testing with spy/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod loader;
pub mod naming;
pub mod rule;
pub mod target;

// Re-export key types at crate root for ergonomics
pub use error::{Error, InvocationError, LoadError, ResolveError, Result, SortError};
pub use loader::{LoadedValue, Loader, ScanSpec};
pub use rule::{FilenameTransform, Param, PathFilter, PlacementRule, Signature};
pub use target::{Capability, CapabilityMap, Target};
