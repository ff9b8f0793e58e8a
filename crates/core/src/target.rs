//! Target trait — the abstraction over the object being populated.
//!
//! The engine never reflects over the target at runtime. Its capability
//! surface is a fixed set of named methods, addressed by dotted paths and
//! invoked with arguments derived from loaded values. `CapabilityMap` is
//! the shipped dispatch-table implementation of that surface.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::InvocationError;

/// The object a registration pass populates.
///
/// `invoke` is the synchronous entry point; `invoke_async` is awaited for
/// rules declared awaited and defaults to the synchronous path, so purely
/// synchronous targets implement one method.
#[async_trait]
pub trait Target: Send {
    /// Invoke a capability by dotted method path.
    fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<(), InvocationError>;

    /// Invoke a capability, awaiting its completion.
    async fn invoke_async(&mut self, method: &str, args: Vec<Value>) -> Result<(), InvocationError> {
        self.invoke(method, args)
    }
}

/// Synchronous capability handler.
pub type SyncHandler = Box<dyn FnMut(Vec<Value>) -> Result<(), InvocationError> + Send>;

/// Asynchronous capability handler.
pub type AsyncHandler =
    Box<dyn FnMut(Vec<Value>) -> BoxFuture<'static, Result<(), InvocationError>> + Send>;

/// One entry of a target's capability surface.
pub enum Capability {
    /// A nested namespace (one dotted-path segment)
    Namespace(CapabilityMap),

    /// A synchronous method
    Sync(SyncHandler),

    /// An asynchronous method; rules invoking it must be awaited
    Async(AsyncHandler),
}

/// A dispatch table keyed by method name, nestable to model dotted paths
/// such as `auth.strategy`.
#[derive(Default)]
pub struct CapabilityMap {
    entries: HashMap<String, Capability>,
}

impl CapabilityMap {
    /// Create an empty capability surface.
    pub fn new() -> Self {
        CapabilityMap {
            entries: HashMap::new(),
        }
    }

    /// Register a capability under a dotted path, creating intermediate
    /// namespaces as needed. A later insert under the same path wins.
    pub fn insert(&mut self, method: &str, capability: Capability) {
        match method.split_once('.') {
            Some((head, rest)) => {
                let entry = self
                    .entries
                    .entry(head.to_string())
                    .or_insert_with(|| Capability::Namespace(CapabilityMap::new()));
                if !matches!(entry, Capability::Namespace(_)) {
                    *entry = Capability::Namespace(CapabilityMap::new());
                }
                if let Capability::Namespace(map) = entry {
                    map.insert(rest, capability);
                }
            }
            None => {
                self.entries.insert(method.to_string(), capability);
            }
        }
    }

    /// Register a synchronous handler under a dotted path.
    pub fn insert_sync<F>(&mut self, method: &str, handler: F)
    where
        F: FnMut(Vec<Value>) -> Result<(), InvocationError> + Send + 'static,
    {
        self.insert(method, Capability::Sync(Box::new(handler)));
    }

    /// Register an asynchronous handler under a dotted path.
    pub fn insert_async<F>(&mut self, method: &str, handler: F)
    where
        F: FnMut(Vec<Value>) -> BoxFuture<'static, Result<(), InvocationError>> + Send + 'static,
    {
        self.insert(method, Capability::Async(Box::new(handler)));
    }

    /// Whether a dotted path resolves to an invocable method.
    pub fn has_method(&self, method: &str) -> bool {
        matches!(
            self.lookup(method),
            Some(Capability::Sync(_) | Capability::Async(_))
        )
    }

    fn lookup(&self, method: &str) -> Option<&Capability> {
        match method.split_once('.') {
            Some((head, rest)) => match self.entries.get(head)? {
                Capability::Namespace(map) => map.lookup(rest),
                _ => None,
            },
            None => self.entries.get(method),
        }
    }

    fn lookup_mut(&mut self, method: &str) -> Option<&mut Capability> {
        match method.split_once('.') {
            Some((head, rest)) => match self.entries.get_mut(head)? {
                Capability::Namespace(map) => map.lookup_mut(rest),
                _ => None,
            },
            None => self.entries.get_mut(method),
        }
    }
}

#[async_trait]
impl Target for CapabilityMap {
    fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<(), InvocationError> {
        match self.lookup_mut(method) {
            None => Err(InvocationError::UnknownMethod(method.to_string())),
            Some(Capability::Namespace(_)) => {
                Err(InvocationError::Namespace(method.to_string()))
            }
            Some(Capability::Sync(handler)) => handler(args),
            Some(Capability::Async(_)) => Err(InvocationError::Failed {
                method: method.to_string(),
                reason: "asynchronous capability requires an awaited invocation".into(),
            }),
        }
    }

    async fn invoke_async(&mut self, method: &str, args: Vec<Value>) -> Result<(), InvocationError> {
        match self.lookup_mut(method) {
            None => Err(InvocationError::UnknownMethod(method.to_string())),
            Some(Capability::Namespace(_)) => {
                Err(InvocationError::Namespace(method.to_string()))
            }
            Some(Capability::Sync(handler)) => handler(args),
            Some(Capability::Async(handler)) => handler(args).await,
        }
    }
}
