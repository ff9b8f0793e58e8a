//! Manifest resolution for the atelier binder.
//!
//! A manifest starts as a base set of placement rules (the server rule set
//! in [`defaults`]), gets caller amendments applied ([`amend`]), and comes
//! out as an ordered, constraint-satisfying sequence ready for execution.
//! Directories may also carry a data-only amendment file ([`file`]).

pub mod amend;
pub mod defaults;
pub mod file;

pub use amend::{Amendment, AmendmentList, Amendments, RuleDefaults, resolve, resolve_list};
pub use defaults::server_rules;
pub use file::{AMENDMENT_FILE, DEFAULTS_KEY};
