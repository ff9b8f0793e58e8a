//! The public registration surface.
//!
//! `resolve_manifest` is pure resolution (plus reading the directory's own
//! amendment file when the caller passes none); `register` is the full
//! resolve + load + execute pass; `compose_with` curries a configuration
//! into a reusable registration entry point.

use std::path::{Path, PathBuf};

use atelier_core::error::Result;
use atelier_core::rule::PlacementRule;
use atelier_core::target::Target;
use atelier_loader::FsLoader;
use atelier_manifest::{Amendments, amend, defaults, file};
use tracing::debug;

use crate::run::{RunContext, run};

/// Configuration for one registration entry point.
pub struct ComposeConfig {
    /// Directory whose conventional layout is bound to the target
    pub directory: PathBuf,

    /// Explicit amendments. When set, a directory-local amendment file is
    /// ignored entirely, never merged.
    pub amendments: Option<Amendments>,
}

impl ComposeConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        ComposeConfig {
            directory: directory.into(),
            amendments: None,
        }
    }

    pub fn amendments(mut self, amendments: Amendments) -> Self {
        self.amendments = Some(amendments);
        self
    }
}

/// Resolve the ordered manifest for a directory.
///
/// Amendment precedence: explicit caller amendments win outright; otherwise
/// the directory's own `.atelier.toml` applies; otherwise the base rules
/// stand alone.
pub fn resolve_manifest(
    directory: &Path,
    amendments: Option<&Amendments>,
) -> Result<Vec<PlacementRule>> {
    let base = defaults::server_rules();

    match amendments {
        Some(explicit) => {
            debug!(directory = %directory.display(), "Resolving with explicit amendments");
            amend::resolve(&base, explicit)
        }
        None => match file::load(directory)? {
            Some(from_file) => amend::resolve(&base, &from_file),
            None => amend::resolve(&base, &Amendments::new()),
        },
    }
}

/// Full registration pass: resolve, load, execute.
pub async fn register<T: Target>(target: &mut T, config: &ComposeConfig) -> Result<()> {
    let mut ctx = RunContext::new();
    register_in(target, config, &mut ctx).await
}

/// Registration pass inside an existing scope tree. Places already
/// consumed by an ancestor pass are skipped.
pub async fn register_in<T: Target>(
    target: &mut T,
    config: &ComposeConfig,
    ctx: &mut RunContext,
) -> Result<()> {
    let manifest = resolve_manifest(&config.directory, config.amendments.as_ref())?;
    let loader = FsLoader::new(&config.directory);
    run(&manifest, target, &loader, ctx).await
}

/// Curry a configuration into a reusable registration entry point.
pub fn compose_with(config: ComposeConfig) -> Registration {
    Registration { config }
}

/// A reusable registration entry point bound to one directory and
/// amendment set.
pub struct Registration {
    config: ComposeConfig,
}

impl Registration {
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Register into a fresh scope.
    pub async fn register<T: Target>(&self, target: &mut T) -> Result<()> {
        register(target, &self.config).await
    }

    /// Register inside an existing scope tree.
    pub async fn register_in<T: Target>(&self, target: &mut T, ctx: &mut RunContext) -> Result<()> {
        register_in(target, &self.config, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::target::CapabilityMap;
    use serde_json::{Value, json};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type CallLog = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

    /// A server-shaped spy target covering the base capability surface.
    fn spy_server() -> (CapabilityMap, CallLog) {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut target = CapabilityMap::new();
        for method in [
            "path",
            "bind",
            "register",
            "dependency",
            "cache.provision",
            "method",
            "views",
            "decorate",
            "ext",
            "expose",
            "auth.scheme",
            "auth.strategy",
            "auth.default",
            "state",
            "route",
            "special",
        ] {
            let name = method.to_string();
            let log = log.clone();
            target.insert_sync(method, move |args| {
                log.lock().unwrap().push((name.clone(), args));
                Ok(())
            });
        }
        (target, log)
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn end_to_end_respects_ordering_constraints() {
        let dir = TempDir::new().unwrap();
        // Declared "out of order" on disk; constraints decide execution order
        write(
            dir.path(),
            "routes/hi.json",
            r#"{"method": "get", "path": "/hi"}"#,
        );
        write(
            dir.path(),
            "methods/say-hi.json",
            r#"{"method": {"kind": "fn"}}"#,
        );
        write(dir.path(), "bind.json", r#"{"some": "context"}"#);

        let (mut target, log) = spy_server();
        register(&mut target, &ComposeConfig::new(dir.path()))
            .await
            .unwrap();

        let calls = log.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(order, vec!["bind", "method", "route"]);

        // The method rule camelized the filename into its name argument
        let method_call = calls.iter().find(|(m, _)| m == "method").unwrap();
        assert_eq!(method_call.1[0], json!("sayHi"));

        // The route rule defaulted the id from the filename
        let route_call = calls.iter().find(|(m, _)| m == "route").unwrap();
        assert_eq!(route_call.1[0]["options"]["id"], "hi");
    }

    #[tokio::test]
    async fn auth_schemes_precede_strategies_and_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth/default.json", r#""session""#);
        write(
            dir.path(),
            "auth/strategies/session.json",
            r#"{"scheme": "cookie"}"#,
        );
        write(
            dir.path(),
            "auth/schemes/cookie.json",
            r#"{"scheme": {"kind": "cookie"}}"#,
        );

        let (mut target, log) = spy_server();
        register(&mut target, &ComposeConfig::new(dir.path()))
            .await
            .unwrap();

        let calls = log.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(order, vec!["auth.scheme", "auth.strategy", "auth.default"]);

        // Strategy name filled from filename
        let strategy = calls.iter().find(|(m, _)| m == "auth.strategy").unwrap();
        assert_eq!(strategy.1[0], json!("session"));
    }

    #[tokio::test]
    async fn directory_amendment_file_applies_when_no_explicit_amendments() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".atelier.toml", "routes = false\n");
        write(dir.path(), "routes/hi.json", r#"{"method": "get", "path": "/hi"}"#);
        write(dir.path(), "bind.json", r#"{"some": "context"}"#);

        let (mut target, log) = spy_server();
        register(&mut target, &ComposeConfig::new(dir.path()))
            .await
            .unwrap();

        let calls = log.lock().unwrap();
        assert!(calls.iter().all(|(m, _)| m != "route"));
        assert!(calls.iter().any(|(m, _)| m == "bind"));
    }

    #[tokio::test]
    async fn explicit_amendments_make_the_file_ignored_entirely() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".atelier.toml", "routes = false\n");
        write(dir.path(), "routes/hi.json", r#"{"method": "get", "path": "/hi"}"#);

        let (mut target, log) = spy_server();
        let config = ComposeConfig::new(dir.path()).amendments(Amendments::new());
        register(&mut target, &config).await.unwrap();

        // The file's removal did not apply
        assert!(log.lock().unwrap().iter().any(|(m, _)| m == "route"));
    }

    #[tokio::test]
    async fn resolve_manifest_is_pure_and_deterministic() {
        let dir = TempDir::new().unwrap();
        let one = resolve_manifest(dir.path(), None).unwrap();
        let two = resolve_manifest(dir.path(), None).unwrap();
        let places = |m: &[PlacementRule]| {
            m.iter().map(|r| r.place.clone()).collect::<Vec<_>>()
        };
        assert_eq!(places(&one), places(&two));
        assert!(!one.is_empty());
    }

    #[tokio::test]
    async fn compose_with_is_reusable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "expose/api-version.json", r#"{"value": 2}"#);

        let registration = compose_with(ComposeConfig::new(dir.path()));

        let (mut first, first_log) = spy_server();
        registration.register(&mut first).await.unwrap();
        let (mut second, second_log) = spy_server();
        registration.register(&mut second).await.unwrap();

        assert_eq!(first_log.lock().unwrap().len(), 1);
        assert_eq!(second_log.lock().unwrap().len(), 1);

        // Exposed key camelized from the filename
        let calls = first_log.lock().unwrap();
        assert_eq!(calls[0].1[0], json!("apiVersion"));
        assert_eq!(calls[0].1[1], json!(2));
    }

    #[tokio::test]
    async fn nested_scopes_do_not_rerun_consumed_places() {
        let parent = TempDir::new().unwrap();
        let child = TempDir::new().unwrap();
        write(parent.path(), "bind.json", r#"{"scope": "parent"}"#);
        write(child.path(), "bind.json", r#"{"scope": "child"}"#);
        write(child.path(), "routes/hi.json", r#"{"method": "get", "path": "/hi"}"#);

        let (mut target, log) = spy_server();
        let mut ctx = RunContext::new();

        register_in(&mut target, &ComposeConfig::new(parent.path()), &mut ctx)
            .await
            .unwrap();
        register_in(&mut target, &ComposeConfig::new(child.path()), &mut ctx)
            .await
            .unwrap();

        let calls = log.lock().unwrap();
        let binds: Vec<_> = calls.iter().filter(|(m, _)| m == "bind").collect();
        assert_eq!(binds.len(), 1);
        assert_eq!(binds[0].1[0]["scope"], "parent");
        // Child-only places still ran
        assert!(calls.iter().any(|(m, _)| m == "route"));
    }

    #[tokio::test]
    async fn custom_place_from_amendments_runs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "special.json", r#"{"myArg": "mySpecialValue"}"#);

        let amendments = Amendments::new().rule(PlacementRule {
            signature: Some(atelier_core::rule::Signature::parse(["myArg"])),
            ..PlacementRule::new("special", "special")
        });

        let (mut target, log) = spy_server();
        let config = ComposeConfig::new(dir.path()).amendments(amendments);
        register(&mut target, &config).await.unwrap();

        let calls = log.lock().unwrap();
        let special = calls.iter().find(|(m, _)| m == "special").unwrap();
        assert_eq!(special.1, vec![json!("mySpecialValue")]);
    }

    #[tokio::test]
    async fn registration_failure_surfaces_first_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "routes/broken.json", "{not json");

        let (mut target, _log) = spy_server();
        let err = register(&mut target, &ComposeConfig::new(dir.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("routes"));
    }
}
