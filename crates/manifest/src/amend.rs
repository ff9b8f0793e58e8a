//! Amendment resolution — merging caller overrides into the base rule set.
//!
//! Amendments are keyed by place and preserve insertion order. A rule entry
//! replaces the base rule at that place entirely (no deep merge); `Remove`
//! deletes the place; `Update` patches an existing base rule and fails when
//! the place is unknown. A defaults entry fills fields other rules leave
//! unset. The merged set is linearized by the sorter and comes out with
//! sort-time metadata stripped.

use std::collections::HashSet;
use std::sync::Arc;

use atelier_core::error::{Error, ResolveError, Result};
use atelier_core::rule::{PathFilter, PlacementRule, excludes_helpers};
use atelier_topo::{Constraints, Sorter};
use serde_json::Value;

/// Patch function for `Amendment::Update`.
pub type UpdateFn = Arc<dyn Fn(&PlacementRule) -> PlacementRule + Send + Sync>;

/// One override, keyed by place.
pub enum Amendment {
    /// Replace the base rule at this place, or add a new place
    Rule(PlacementRule),

    /// Drop this place from the manifest
    Remove,

    /// Patch the existing base rule; the place must exist in the base
    Update(UpdateFn),
}

/// Baseline fields applied to every resolved rule that leaves them unset,
/// before sorting. The file schema exposes this as the reserved `$defaults`
/// entry.
#[derive(Clone, Default)]
pub struct RuleDefaults {
    pub recursive: Option<bool>,
    pub include: Option<PathFilter>,
    pub exclude: Option<PathFilter>,
    pub awaited: Option<bool>,
    pub meta: Option<Value>,
}

/// A place-keyed override set with insertion order preserved.
#[derive(Default)]
pub struct Amendments {
    entries: Vec<(String, Amendment)>,
    defaults: RuleDefaults,
}

impl std::fmt::Debug for Amendments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Amendments")
            .field(
                "places",
                &self.entries.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Amendments {
    pub fn new() -> Self {
        Amendments::default()
    }

    /// Replace or add the rule at `rule.place`.
    pub fn rule(mut self, rule: PlacementRule) -> Self {
        self.set(rule.place.clone(), Amendment::Rule(rule));
        self
    }

    /// Drop a place from the manifest. Removing a place the base does not
    /// contain is a no-op.
    pub fn remove(mut self, place: impl Into<String>) -> Self {
        self.set(place.into(), Amendment::Remove);
        self
    }

    /// Patch an existing base rule. Resolution fails with `UnknownPlace`
    /// when the base has no rule at `place`.
    pub fn update<F>(mut self, place: impl Into<String>, patch: F) -> Self
    where
        F: Fn(&PlacementRule) -> PlacementRule + Send + Sync + 'static,
    {
        self.set(place.into(), Amendment::Update(Arc::new(patch)));
        self
    }

    /// Set the defaults entry.
    pub fn defaults(mut self, defaults: RuleDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Insert an amendment, replacing any earlier entry for the same place
    /// at its original position.
    pub fn set(&mut self, place: String, amendment: Amendment) {
        match self.entries.iter().position(|(p, _)| *p == place) {
            Some(i) => self.entries[i] = (place, amendment),
            None => self.entries.push((place, amendment)),
        }
    }

    pub fn get(&self, place: &str) -> Option<&Amendment> {
        self.entries
            .iter()
            .find(|(p, _)| p == place)
            .map(|(_, a)| a)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The legacy array-based override form: explicit add and remove lists,
/// applied in declared order.
#[derive(Default)]
pub struct AmendmentList {
    pub add: Vec<PlacementRule>,
    pub remove: Vec<String>,
}

/// Merge amendments into the base rules and produce the ordered manifest.
///
/// The output satisfies every before/after constraint, keeps base positions
/// for replaced rules, appends new places in amendment insertion order, and
/// carries no sort-time metadata.
pub fn resolve(base: &[PlacementRule], amendments: &Amendments) -> Result<Vec<PlacementRule>> {
    let mut sorter = Sorter::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for rule in base {
        seen.insert(rule.place.as_str());
        let resolved = match amendments.get(&rule.place) {
            None => rule.clone(),
            Some(Amendment::Remove) => continue,
            Some(Amendment::Rule(replacement)) => replacement.clone(),
            Some(Amendment::Update(patch)) => patch(rule),
        };
        enter(&mut sorter, finish(resolved, &amendments.defaults));
    }

    for (place, amendment) in &amendments.entries {
        if seen.contains(place.as_str()) {
            continue;
        }
        match amendment {
            Amendment::Rule(rule) => {
                enter(&mut sorter, finish(rule.clone(), &amendments.defaults));
            }
            Amendment::Remove => {}
            Amendment::Update(_) => {
                return Err(ResolveError::UnknownPlace(place.clone()).into());
            }
        }
    }

    let manifest = sorter.sort().map_err(Error::from)?;
    Ok(manifest)
}

/// Resolve using the legacy array form. Equivalent semantics to [`resolve`]
/// (add replaces by place, remove deletes by place) with declared array
/// order instead of key order.
pub fn resolve_list(base: &[PlacementRule], list: &AmendmentList) -> Result<Vec<PlacementRule>> {
    let mut amendments = Amendments::new();
    for place in &list.remove {
        amendments = amendments.remove(place.clone());
    }
    for rule in &list.add {
        amendments = amendments.rule(rule.clone());
    }
    resolve(base, &amendments)
}

/// Apply the defaults entry and the helpers exclusion to one merged rule.
fn finish(mut rule: PlacementRule, defaults: &RuleDefaults) -> PlacementRule {
    if rule.recursive.is_none() {
        rule.recursive = defaults.recursive;
    }
    if rule.include.is_none() {
        rule.include = defaults.include.clone();
    }
    if rule.exclude.is_none() {
        rule.exclude = defaults.exclude.clone();
    }
    if rule.awaited.is_none() {
        rule.awaited = defaults.awaited;
    }
    if rule.meta.is_none() {
        rule.meta = defaults.meta.clone();
    }

    if rule.include.is_none() && rule.exclude.is_none() {
        rule.exclude = Some(Arc::new(excludes_helpers));
    }

    rule
}

/// Hand a rule to the sorter keyed by place, then strip sort-time metadata
/// from the copy that will appear in the manifest.
fn enter(sorter: &mut Sorter<PlacementRule>, rule: PlacementRule) {
    let constraints = Constraints {
        group: rule.place.clone(),
        before: rule.before.clone(),
        after: rule.after.clone(),
    };
    let stripped = PlacementRule {
        before: Vec::new(),
        after: Vec::new(),
        meta: None,
        ..rule
    };
    sorter.add(stripped, constraints);
}
