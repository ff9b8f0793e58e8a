//! Directory-local amendment files.
//!
//! A configuration directory may carry a `.atelier.toml` supplying default
//! amendments for its own registration pass. The schema is data-only:
//! transforms and path predicates can only come from programmatic
//! amendments. Explicit caller amendments cause the file to be ignored
//! entirely, never merged (that decision lives in the engine).

use std::fs;
use std::path::Path;

use atelier_core::error::{Error, Result};
use atelier_core::rule::{PlacementRule, Signature};
use serde::Deserialize;
use tracing::info;

use crate::amend::{Amendments, RuleDefaults};

/// Name of the directory-local amendment file.
pub const AMENDMENT_FILE: &str = ".atelier.toml";

/// Reserved table applying baseline fields to every rule.
pub const DEFAULTS_KEY: &str = "$defaults";

/// Data-only rule specification.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    method: String,
    #[serde(default)]
    signature: Option<Vec<String>>,
    #[serde(default)]
    list: bool,
    #[serde(default)]
    recursive: Option<bool>,
    #[serde(default, rename = "async")]
    awaited: Option<bool>,
    #[serde(default)]
    before: Vec<String>,
    #[serde(default)]
    after: Vec<String>,
    #[serde(default)]
    meta: Option<toml::Value>,
}

impl RuleSpec {
    fn into_rule(self, place: &str) -> Result<PlacementRule> {
        let meta = self
            .meta
            .map(|m| serde_json::to_value(m))
            .transpose()
            .map_err(|e| Error::Config {
                message: format!("Invalid meta for place '{place}': {e}"),
            })?;

        Ok(PlacementRule {
            signature: self.signature.map(Signature::parse),
            list: self.list,
            recursive: self.recursive,
            awaited: self.awaited,
            before: self.before,
            after: self.after,
            meta,
            ..PlacementRule::new(place, self.method)
        })
    }
}

/// The reserved `$defaults` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsSpec {
    #[serde(default)]
    recursive: Option<bool>,
    #[serde(default, rename = "async")]
    awaited: Option<bool>,
    #[serde(default)]
    meta: Option<toml::Value>,
}

impl DefaultsSpec {
    fn into_defaults(self) -> Result<RuleDefaults> {
        let meta = self
            .meta
            .map(|m| serde_json::to_value(m))
            .transpose()
            .map_err(|e| Error::Config {
                message: format!("Invalid meta in {DEFAULTS_KEY}: {e}"),
            })?;

        Ok(RuleDefaults {
            recursive: self.recursive,
            awaited: self.awaited,
            meta,
            ..RuleDefaults::default()
        })
    }
}

/// Parse amendment-file text.
///
/// Each top-level key is a place: a table replaces (or adds) the rule at
/// that place, `false` removes it, and the reserved [`DEFAULTS_KEY`] table
/// supplies baseline fields.
pub fn parse(text: &str) -> Result<Amendments> {
    let table: toml::Table = toml::from_str(text).map_err(|e| Error::Config {
        message: format!("Invalid amendment file: {e}"),
    })?;

    let mut amendments = Amendments::new();

    for (place, entry) in table {
        if place == DEFAULTS_KEY {
            let spec: DefaultsSpec = entry.try_into().map_err(|e| Error::Config {
                message: format!("Invalid {DEFAULTS_KEY} table: {e}"),
            })?;
            amendments = amendments.defaults(spec.into_defaults()?);
            continue;
        }

        match entry {
            toml::Value::Boolean(false) => {
                amendments = amendments.remove(place);
            }
            toml::Value::Table(_) => {
                let spec: RuleSpec = entry.try_into().map_err(|e| Error::Config {
                    message: format!("Invalid rule for place '{place}': {e}"),
                })?;
                let rule = spec.into_rule(&place)?;
                amendments = amendments.rule(rule);
            }
            other => {
                return Err(Error::Config {
                    message: format!(
                        "Place '{place}' must be a table or false, got {}",
                        other.type_str()
                    ),
                });
            }
        }
    }

    Ok(amendments)
}

/// Load the amendment file from a directory, if present.
pub fn load(directory: &Path) -> Result<Option<Amendments>> {
    let path = directory.join(AMENDMENT_FILE);
    if !path.exists() {
        info!(directory = %directory.display(), "No amendment file, using base rules");
        return Ok(None);
    }

    let text = fs::read_to_string(&path).map_err(|e| Error::Config {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    parse(&text).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amend::{Amendment, resolve};
    use crate::defaults::server_rules;

    #[test]
    fn parses_rule_removal_and_defaults() {
        let amendments = parse(
            r#"
            routes = false

            ["$defaults"]
            recursive = true

            [special]
            method = "special"
            signature = ["myArg", "[options]"]
            list = false
            after = ["bind"]
            "#,
        )
        .unwrap();

        assert!(matches!(amendments.get("routes"), Some(Amendment::Remove)));

        let manifest = resolve(&server_rules(), &amendments).unwrap();
        assert!(manifest.iter().all(|r| r.place != "routes"));

        let special = manifest.iter().find(|r| r.place == "special").unwrap();
        assert_eq!(special.method, "special");
        let sig = special.signature.as_ref().unwrap();
        assert_eq!(sig.params[0].name, "myArg");
        assert!(sig.params[1].optional);
        // $defaults applied
        assert_eq!(special.recursive, Some(true));

        let index = |place: &str| manifest.iter().position(|r| r.place == place).unwrap();
        assert!(index("bind") < index("special"));
    }

    #[test]
    fn replacement_from_file_wins_entirely() {
        let amendments = parse("[routes]\nmethod = \"myRoute\"\n").unwrap();
        let manifest = resolve(&server_rules(), &amendments).unwrap();
        let routes = manifest.iter().find(|r| r.place == "routes").unwrap();
        assert_eq!(routes.method, "myRoute");
        assert!(!routes.list);
        assert!(routes.use_filename.is_none());
    }

    #[test]
    fn async_key_maps_to_awaited() {
        let amendments = parse("[plugins]\nmethod = \"register\"\nasync = false\n").unwrap();
        let Some(Amendment::Rule(rule)) = amendments.get("plugins") else {
            panic!("expected rule amendment");
        };
        assert_eq!(rule.awaited, Some(false));
    }

    #[test]
    fn non_table_entry_is_rejected() {
        let err = parse("routes = 3\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        // `true` is not a rule either
        assert!(parse("routes = true\n").is_err());
    }

    #[test]
    fn unknown_rule_field_is_rejected() {
        let err = parse("[routes]\nmethod = \"route\"\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn load_reads_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(AMENDMENT_FILE), "routes = false\n").unwrap();
        let amendments = load(dir.path()).unwrap().unwrap();
        assert!(matches!(amendments.get("routes"), Some(Amendment::Remove)));
    }
}
