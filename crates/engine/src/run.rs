//! Manifest execution.
//!
//! Strictly sequential: one rule's values are fully processed (including
//! any awaited invocation) before the next rule begins. That sequencing is
//! what makes the sorted manifest's before/after guarantees hold at
//! runtime. The first failure aborts the pass; side effects already
//! applied to the target stay in place.

use std::collections::HashSet;

use atelier_core::error::{Error, InvocationError, Result};
use atelier_core::loader::{LoadedValue, Loader};
use atelier_core::rule::PlacementRule;
use atelier_core::target::Target;
use serde_json::Value;
use tracing::{debug, info};

/// Tracks which places have been executed in a scope tree.
///
/// Nested registration passes share one context so a place satisfied by a
/// parent scope is not re-run by a child. The context is always passed
/// explicitly; there is no ambient state.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    consumed: HashSet<String>,
}

impl RunContext {
    pub fn new() -> Self {
        RunContext::default()
    }

    /// Whether a place has already been executed in this scope tree.
    pub fn is_consumed(&self, place: &str) -> bool {
        self.consumed.contains(place)
    }

    /// Record a place as executed.
    pub fn consume(&mut self, place: impl Into<String>) {
        self.consumed.insert(place.into());
    }

    /// Number of places executed so far.
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

/// Execute a resolved manifest against a target.
///
/// For each rule in manifest order: resolve the matching values through the
/// loader, shape each one (filename transform, signature mapping), and
/// invoke the rule's method on the target. Fails fast with the failing
/// place and file attached.
pub async fn run<T, L>(
    manifest: &[PlacementRule],
    target: &mut T,
    loader: &L,
    ctx: &mut RunContext,
) -> Result<()>
where
    T: Target,
    L: Loader + ?Sized,
{
    for rule in manifest {
        if ctx.is_consumed(&rule.place) {
            debug!(place = %rule.place, "Place satisfied by ancestor scope, skipping");
            continue;
        }

        let values = loader
            .resolve(&rule.place, &rule.scan_spec())
            .map_err(|e| Error::at_place(&rule.place, None, e))?;

        if !rule.list && values.len() > 1 {
            return Err(Error::at_place(
                &rule.place,
                None,
                InvocationError::InvalidValue {
                    method: rule.method.clone(),
                    reason: format!("{} values matched a single-valued place", values.len()),
                },
            ));
        }

        debug!(
            place = %rule.place,
            method = %rule.method,
            values = values.len(),
            "Applying placement rule"
        );

        let satisfied = !values.is_empty();
        for loaded in values {
            apply(rule, loaded, target).await?;
        }

        // Only a place that actually applied values satisfies child scopes
        if satisfied {
            ctx.consume(rule.place.clone());
        }
    }

    info!(rules = manifest.len(), "Registration pass complete");
    Ok(())
}

/// Process one loaded value for a rule.
async fn apply<T: Target>(rule: &PlacementRule, loaded: LoadedValue, target: &mut T) -> Result<()> {
    let LoadedValue {
        filename,
        relative_path,
        value,
        ..
    } = loaded;

    // A list value that is already an array fans out once per element,
    // with the filename transform skipped.
    if rule.list {
        if let Value::Array(elements) = value {
            for element in elements {
                invoke(rule, element, target)
                    .await
                    .map_err(|e| Error::at_place(&rule.place, Some(&filename), e))?;
            }
            return Ok(());
        }
    }

    let value = match &rule.use_filename {
        Some(transform) => transform(value, &filename, &relative_path),
        None => value,
    };

    invoke(rule, value, target)
        .await
        .map_err(|e| Error::at_place(&rule.place, Some(&filename), e))
}

/// Derive arguments and dispatch one invocation.
async fn invoke<T: Target>(
    rule: &PlacementRule,
    value: Value,
    target: &mut T,
) -> std::result::Result<(), InvocationError> {
    let args = derive_args(rule, value)?;
    if rule.is_awaited() {
        target.invoke_async(&rule.method, args).await
    } else {
        target.invoke(&rule.method, args)
    }
}

/// Map a value onto positional arguments.
///
/// Without a signature the value is the single argument. With one, named
/// fields map positionally; trailing unset optional parameters are dropped
/// and unset required ones become `null` for the target to reject.
fn derive_args(
    rule: &PlacementRule,
    value: Value,
) -> std::result::Result<Vec<Value>, InvocationError> {
    let Some(signature) = &rule.signature else {
        return Ok(vec![value]);
    };

    let Value::Object(mut fields) = value else {
        return Err(InvocationError::InvalidValue {
            method: rule.method.clone(),
            reason: "signature mapping requires an object value".into(),
        });
    };

    let mut args: Vec<Option<Value>> = signature
        .params
        .iter()
        .map(|param| fields.remove(&param.name))
        .collect();

    while args.last().is_some_and(Option::is_none)
        && signature.params[args.len() - 1].optional
    {
        args.pop();
    }

    Ok(args
        .into_iter()
        .map(|arg| arg.unwrap_or(Value::Null))
        .collect())
}
