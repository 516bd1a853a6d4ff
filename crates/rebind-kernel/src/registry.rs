//! The callable registry boundary.
//!
//! The session never reaches into ambient state directly. It reads and writes
//! through `Registry`, which production code binds to the process-wide table
//! and tests bind to an isolated `MemoryRegistry`.
//!
//! Registries are shared state: every method takes `&self` and
//! implementations provide their own interior mutability.

use crate::callable::{CallError, CallResult, Callable};
use crate::name::QualifiedName;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Name-keyed access to bound callables.
pub trait Registry {
    /// Whether a callable is bound directly in the named slot.
    ///
    /// Inherited bindings do not count.
    fn exists(&self, name: &QualifiedName) -> bool;

    /// The callable bound directly in the named slot.
    fn get(&self, name: &QualifiedName) -> Option<Callable>;

    /// Install or overwrite the binding.
    fn set(&self, name: &QualifiedName, callable: Callable);

    /// Remove the binding entirely, returning what was there.
    fn unset(&self, name: &QualifiedName) -> Option<Callable>;

    /// Whether some ancestor of the name's namespace provides the symbol.
    fn exists_in_ancestor(&self, name: &QualifiedName) -> bool;

    /// Carry invocation-shape metadata from `from` onto `onto`.
    fn copy_signature(&self, from: &Callable, onto: Callable) -> Callable {
        match from.signature() {
            Some(signature) => onto.with_signature(signature.clone()),
            None => onto,
        }
    }
}

impl<T: Registry + ?Sized> Registry for &T {
    fn exists(&self, name: &QualifiedName) -> bool {
        (**self).exists(name)
    }

    fn get(&self, name: &QualifiedName) -> Option<Callable> {
        (**self).get(name)
    }

    fn set(&self, name: &QualifiedName, callable: Callable) {
        (**self).set(name, callable)
    }

    fn unset(&self, name: &QualifiedName) -> Option<Callable> {
        (**self).unset(name)
    }

    fn exists_in_ancestor(&self, name: &QualifiedName) -> bool {
        (**self).exists_in_ancestor(name)
    }

    fn copy_signature(&self, from: &Callable, onto: Callable) -> Callable {
        (**self).copy_signature(from, onto)
    }
}

impl<T: Registry + ?Sized> Registry for Arc<T> {
    fn exists(&self, name: &QualifiedName) -> bool {
        (**self).exists(name)
    }

    fn get(&self, name: &QualifiedName) -> Option<Callable> {
        (**self).get(name)
    }

    fn set(&self, name: &QualifiedName, callable: Callable) {
        (**self).set(name, callable)
    }

    fn unset(&self, name: &QualifiedName) -> Option<Callable> {
        (**self).unset(name)
    }

    fn exists_in_ancestor(&self, name: &QualifiedName) -> bool {
        (**self).exists_in_ancestor(name)
    }

    fn copy_signature(&self, from: &Callable, onto: Callable) -> Callable {
        (**self).copy_signature(from, onto)
    }
}

/// In-memory registry: an indirection table from name to implementation,
/// plus a namespace inheritance table used for method resolution.
///
/// Call sites go through `call`, so rewriting a slot is all it takes to
/// change what they run.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    bindings: RwLock<BTreeMap<QualifiedName, Callable>>,
    parents: RwLock<BTreeMap<String, Vec<String>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a callable under a fully-qualified name.
    pub fn define(&self, name: impl Into<QualifiedName>, callable: Callable) -> &Self {
        self.write_bindings().insert(name.into(), callable);
        self
    }

    /// Declare the ordered parent namespaces of `namespace`.
    pub fn set_parents<I, S>(&self, namespace: &str, parents: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parents: Vec<String> = parents.into_iter().map(Into::into).collect();
        self.parents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), parents);
        self
    }

    pub fn parents_of(&self, namespace: &str) -> Vec<String> {
        self.parents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// All directly bound names, in order.
    pub fn names(&self) -> Vec<QualifiedName> {
        self.read_bindings().keys().cloned().collect()
    }

    /// Method resolution: the name's own slot, then its ancestors
    /// depth-first in declared parent order.
    pub fn resolve(&self, name: &QualifiedName) -> Option<Callable> {
        if let Some(callable) = self.get(name) {
            return Some(callable);
        }
        self.resolve_in_ancestors(name)
    }

    /// Invoke whatever `name` currently resolves to.
    pub fn call(&self, name: impl Into<QualifiedName>, args: &[Value]) -> CallResult {
        let name = name.into();
        let callable = self.resolve(&name).ok_or_else(|| CallError::Unbound {
            name: name.to_string(),
        })?;
        callable.call(args)
    }

    fn resolve_in_ancestors(&self, name: &QualifiedName) -> Option<Callable> {
        let parents = self.parents.read().unwrap_or_else(PoisonError::into_inner);
        let bindings = self.read_bindings();

        let mut visited = BTreeSet::new();
        visited.insert(name.namespace().to_string());
        let mut stack: Vec<&str> = parents
            .get(name.namespace())
            .map(|list| list.iter().rev().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(namespace) = stack.pop() {
            if !visited.insert(namespace.to_string()) {
                continue;
            }
            if let Some(callable) = bindings.get(&name.rehome(namespace)) {
                return Some(callable.clone());
            }
            if let Some(grandparents) = parents.get(namespace) {
                stack.extend(grandparents.iter().rev().map(String::as_str));
            }
        }
        None
    }

    fn read_bindings(&self) -> RwLockReadGuard<'_, BTreeMap<QualifiedName, Callable>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_bindings(&self) -> RwLockWriteGuard<'_, BTreeMap<QualifiedName, Callable>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for MemoryRegistry {
    fn exists(&self, name: &QualifiedName) -> bool {
        self.read_bindings().contains_key(name)
    }

    fn get(&self, name: &QualifiedName) -> Option<Callable> {
        self.read_bindings().get(name).cloned()
    }

    fn set(&self, name: &QualifiedName, callable: Callable) {
        self.write_bindings().insert(name.clone(), callable);
    }

    fn unset(&self, name: &QualifiedName) -> Option<Callable> {
        self.write_bindings().remove(name)
    }

    fn exists_in_ancestor(&self, name: &QualifiedName) -> bool {
        self.resolve_in_ancestors(name).is_some()
    }
}
