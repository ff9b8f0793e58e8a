//! The base rule set for a web-server-shaped target.
//!
//! Each rule binds one conventional directory (or file) to one capability
//! of the target, with filename-fill transforms that never override a field
//! the loaded value already carries. Ordering constraints make the implicit
//! dependencies explicit: context is bound before anything that closes over
//! it, auth strategies follow their schemes, and routes come last.

use std::sync::Arc;

use atelier_core::naming::{camelize, extract_from_path};
use atelier_core::rule::{FilenameTransform, PlacementRule, Signature};
use serde_json::{Map, Value};

/// Server extension points recognized in `extensions/` paths.
const EXTENSION_POINTS: &[&str] = &[
    "onPreStart",
    "onPostStart",
    "onPreStop",
    "onPostStop",
    "onRequest",
    "onPreAuth",
    "onCredentials",
    "onPostAuth",
    "onPreHandler",
    "onPostHandler",
    "onPreResponse",
    "onPostResponse",
];

/// Insert `field: value` unless the object already defines it.
/// Non-object values pass through unchanged.
fn set_default(value: Value, field: &str, fill: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if !map.contains_key(field) {
                map.insert(field.to_string(), fill);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Fill `field` with the raw filename.
fn passthru_on(field: &'static str) -> FilenameTransform {
    Arc::new(move |value, filename, _path| {
        set_default(value, field, Value::String(filename.to_string()))
    })
}

/// Fill `field` with the camelized filename.
fn camelize_on(field: &'static str) -> FilenameTransform {
    Arc::new(move |value, filename, _path| {
        set_default(value, field, Value::String(camelize(filename)))
    })
}

/// Decorations name their property (and optionally their type) through the
/// filename: `prop` fills `property`, `type.prop` fills both. Other forms
/// leave the value alone and the target's own validation reports them.
fn decoration_transform() -> FilenameTransform {
    Arc::new(|value, filename, _path| {
        let parts: Vec<&str> = filename.split('.').collect();
        match parts.as_slice() {
            [prop] => set_default(value, "property", Value::String(camelize(prop))),
            [ty, prop] => {
                let value = set_default(value, "type", Value::String(ty.to_string()));
                set_default(value, "property", Value::String(camelize(prop)))
            }
            _ => value,
        }
    })
}

/// Extensions infer their extension-point type from the path: either a
/// directory segment (`on-pre-start/log.json`) or a compound basename
/// (`on-pre-start.log.json`).
fn extension_transform() -> FilenameTransform {
    Arc::new(|value, _filename, path| {
        match extract_from_path(path, EXTENSION_POINTS) {
            (Some(ty), _) => set_default(value, "type", Value::String(ty)),
            (None, _) => value,
        }
    })
}

/// Routes default their id from the filename, except multi-method routes
/// (an id must name exactly one route).
fn route_transform() -> FilenameTransform {
    Arc::new(|value, filename, _path| {
        let Value::Object(mut map) = value else {
            return value;
        };

        let multi_method = matches!(map.get("method"), Some(Value::Array(_)));
        if !multi_method {
            let options = map
                .entry("options")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(options) = options {
                if !options.contains_key("id") {
                    options.insert("id".to_string(), Value::String(filename.to_string()));
                }
            }
        }

        Value::Object(map)
    })
}

/// The base placement rules for a web-server target.
pub fn server_rules() -> Vec<PlacementRule> {
    vec![
        PlacementRule {
            before: vec!["routes".into()],
            ..PlacementRule::new("path", "path")
        },
        PlacementRule {
            before: vec![
                "methods".into(),
                "decorations".into(),
                "extensions".into(),
                "routes".into(),
            ],
            ..PlacementRule::new("bind", "bind")
        },
        PlacementRule {
            list: true,
            awaited: Some(true),
            signature: Some(Signature::parse(["plugins", "[options]"])),
            use_filename: Some(passthru_on("plugins")),
            ..PlacementRule::new("plugins", "register")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["dependencies", "[after]"])),
            use_filename: Some(passthru_on("dependencies")),
            after: vec!["plugins".into()],
            ..PlacementRule::new("dependencies", "dependency")
        },
        PlacementRule {
            list: true,
            awaited: Some(true),
            use_filename: Some(passthru_on("name")),
            after: vec!["plugins".into()],
            ..PlacementRule::new("caches", "cache.provision")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["name", "method", "[options]"])),
            use_filename: Some(camelize_on("name")),
            after: vec!["bind".into()],
            ..PlacementRule::new("methods", "method")
        },
        PlacementRule {
            after: vec!["plugins".into()],
            ..PlacementRule::new("view-manager", "views")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse([
                "type",
                "property",
                "method",
                "[options]",
            ])),
            use_filename: Some(decoration_transform()),
            ..PlacementRule::new("decorations", "decorate")
        },
        PlacementRule {
            list: true,
            use_filename: Some(extension_transform()),
            after: vec!["bind".into()],
            ..PlacementRule::new("extensions", "ext")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["key", "value"])),
            use_filename: Some(camelize_on("key")),
            ..PlacementRule::new("expose", "expose")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["name", "scheme"])),
            use_filename: Some(passthru_on("name")),
            ..PlacementRule::new("auth/schemes", "auth.scheme")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["name", "scheme", "[options]"])),
            use_filename: Some(passthru_on("name")),
            after: vec!["auth/schemes".into()],
            ..PlacementRule::new("auth/strategies", "auth.strategy")
        },
        PlacementRule {
            after: vec!["auth/strategies".into()],
            ..PlacementRule::new("auth/default", "auth.default")
        },
        PlacementRule {
            list: true,
            signature: Some(Signature::parse(["name", "[options]"])),
            use_filename: Some(passthru_on("name")),
            ..PlacementRule::new("cookies", "state")
        },
        PlacementRule {
            list: true,
            use_filename: Some(route_transform()),
            after: vec![
                "path".into(),
                "bind".into(),
                "methods".into(),
                "extensions".into(),
                "auth/default".into(),
                "cookies".into(),
            ],
            ..PlacementRule::new("routes", "route")
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amend::{Amendments, resolve};
    use serde_json::json;

    #[test]
    fn places_are_unique() {
        let rules = server_rules();
        let mut places: Vec<&str> = rules.iter().map(|r| r.place.as_str()).collect();
        places.sort_unstable();
        places.dedup();
        assert_eq!(places.len(), rules.len());
    }

    #[test]
    fn base_rules_resolve_cleanly() {
        let manifest = resolve(&server_rules(), &Amendments::new()).unwrap();
        assert_eq!(manifest.len(), server_rules().len());

        let index = |place: &str| manifest.iter().position(|r| r.place == place).unwrap();
        assert!(index("bind") < index("methods"));
        assert!(index("auth/schemes") < index("auth/strategies"));
        assert!(index("auth/strategies") < index("auth/default"));
        assert!(index("plugins") < index("dependencies"));
        // Routes follow everything they depend on
        for place in ["path", "bind", "methods", "extensions", "auth/default", "cookies"] {
            assert!(index(place) < index("routes"), "{place} after routes");
        }
    }

    #[test]
    fn passthru_fills_missing_field_only() {
        let transform = passthru_on("name");
        let filled = transform(json!({}), "my-cookie", "my-cookie");
        assert_eq!(filled, json!({"name": "my-cookie"}));

        let kept = transform(json!({"name": "explicit"}), "my-cookie", "my-cookie");
        assert_eq!(kept["name"], "explicit");
    }

    #[test]
    fn camelize_fills_camelized_name() {
        let transform = camelize_on("name");
        let filled = transform(json!({"method": {}}), "my-named-method", "my-named-method");
        assert_eq!(filled["name"], "myNamedMethod");
    }

    #[test]
    fn decoration_filename_forms() {
        let transform = decoration_transform();

        let prop_only = transform(json!({"type": "server"}), "test-dec", "test-dec");
        assert_eq!(prop_only["property"], "testDec");
        assert_eq!(prop_only["type"], "server");

        let typed = transform(json!({}), "server.test-dec", "server.test-dec");
        assert_eq!(typed["type"], "server");
        assert_eq!(typed["property"], "testDec");

        // Three parts: left for the target to reject
        let bad = transform(json!({}), "server.bad.test-dec", "server.bad.test-dec");
        assert_eq!(bad, json!({}));
    }

    #[test]
    fn extension_type_from_directory_or_compound() {
        let transform = extension_transform();

        let from_dir = transform(json!({}), "on-pre-start-log", "on-pre-start/log");
        assert_eq!(from_dir["type"], "onPreStart");

        let from_compound = transform(json!({}), "on-pre-start.log", "on-pre-start.log");
        assert_eq!(from_compound["type"], "onPreStart");

        let explicit = transform(json!({"type": "onPostAuth"}), "on-pre-handler", "on-pre-handler");
        assert_eq!(explicit["type"], "onPostAuth");

        let plain = transform(json!({}), "log", "log");
        assert_eq!(plain, json!({}));
    }

    #[test]
    fn route_id_defaults_from_filename() {
        let transform = route_transform();

        let filled = transform(json!({"method": "get", "path": "/x"}), "id-route", "id-route");
        assert_eq!(filled["options"]["id"], "id-route");

        let kept = transform(
            json!({"method": "get", "options": {"id": "explicit"}}),
            "id-route",
            "id-route",
        );
        assert_eq!(kept["options"]["id"], "explicit");
    }

    #[test]
    fn multi_method_route_gets_no_id() {
        let transform = route_transform();
        let value = transform(
            json!({"method": ["get", "post"], "path": "/x"}),
            "multi",
            "multi",
        );
        assert_eq!(value.get("options"), None);
    }
}
