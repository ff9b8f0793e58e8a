//! # Atelier Engine
//!
//! The execution engine and public API of the atelier binder: resolve a
//! directory's manifest, load its values, and invoke the target's
//! capabilities in dependency order.
//!
//! ```no_run
//! use atelier_core::CapabilityMap;
//! use atelier_engine::{ComposeConfig, register};
//!
//! # async fn example() -> atelier_core::Result<()> {
//! let mut server = CapabilityMap::new();
//! server.insert_sync("route", |_args| Ok(()));
//!
//! register(&mut server, &ComposeConfig::new("./config")).await?;
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod run;

pub use compose::{ComposeConfig, Registration, compose_with, register, register_in, resolve_manifest};
pub use run::{RunContext, run};

// Re-export the pieces callers need alongside the engine
pub use atelier_core::{
    CapabilityMap, Error, InvocationError, LoadError, Loader, PlacementRule, ResolveError, Result,
    SortError, Target,
};
pub use atelier_loader::FsLoader;
pub use atelier_manifest::{AmendmentList, Amendments, RuleDefaults, server_rules};
