//! Override sessions: scoped replacement of registry bindings.
//!
//! A session records, per fully-qualified name, what occupied the slot
//! before the session first touched it. Restoring a name reconciles the slot
//! with that record exactly once. Dropping the session restores everything
//! still recorded, on every exit path including unwinding.
//!
//! ```text
//!            replace / wrap                 inject / inherit
//!   bound ─────────────────▶ overridden    unbound ─────────▶ injected
//!     ▲                          │            ▲                  │
//!     └──── restore: set(prior) ─┘            └── restore: unset ┘
//! ```
//!
//! All install operations share one path: resolve the name, check the
//! mode's precondition, validate the candidate, record the prior binding on
//! first touch, then write the registry.

use crate::callable::{Callable, Candidate, Wrapper, validate};
use crate::config::{BatchPolicy, SessionConfig};
use crate::error::OverrideError;
use crate::name::{NameResolver, QualifiedName};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a name was first installed by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    /// Swap an existing binding.
    Replace,

    /// Create a binding that must not exist.
    Inject,

    /// Create a binding absent locally but provided by an ancestor.
    Inherit,

    /// Install a binding that delegates to the captured original.
    Wrap,
}

impl InstallMode {
    /// Whether the mode requires the slot to be bound beforehand.
    pub fn requires_existing(self) -> bool {
        matches!(self, Self::Replace | Self::Wrap)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Inject => "inject",
            Self::Inherit => "inherit",
            Self::Wrap => "wrap",
        }
    }
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What restoring a name must reinstate.
#[derive(Debug, Clone)]
struct SavedBinding {
    /// `None`: the slot was unbound and restore removes it.
    prior: Option<Callable>,
    mode: InstallMode,
}

enum Pending {
    Replacement(Candidate<Callable>),
    Wrapper(Candidate<Wrapper>),
}

enum Body {
    Replacement(Callable),
    Wrapper(Wrapper),
}

struct Planned {
    name: QualifiedName,
    mode: InstallMode,
    body: Body,
}

/// One row of a `SessionReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    pub name: QualifiedName,
    pub mode: InstallMode,
    /// Whether restore reinstates a callable (as opposed to unbinding).
    pub had_prior: bool,
}

/// Serializable view of a session's live overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub namespace: String,
    pub batch_policy: BatchPolicy,
    pub overrides: Vec<OverrideEntry>,
}

/// Owner of a set of live overrides over a shared registry.
pub struct OverrideSession<R: Registry> {
    registry: R,
    resolver: NameResolver,
    frames: Vec<String>,
    batch_policy: BatchPolicy,
    saved: BTreeMap<QualifiedName, SavedBinding>,
}

impl<R: Registry> OverrideSession<R> {
    pub fn new(registry: R) -> Self {
        Self::with_config(registry, &SessionConfig::default())
    }

    pub fn with_config(registry: R, config: &SessionConfig) -> Self {
        Self {
            registry,
            resolver: config.resolver(),
            frames: Vec::new(),
            batch_policy: config.batch_policy,
            saved: BTreeMap::new(),
        }
    }

    /// Set the caller context used for unqualified names, innermost first.
    pub fn with_caller_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames = frames.into_iter().map(Into::into).collect();
        self
    }

    /// Shorthand for a single caller frame.
    pub fn in_namespace(self, namespace: impl Into<String>) -> Self {
        self.with_caller_frames([namespace.into()])
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    /// Namespace that unqualified names resolve into.
    pub fn current_namespace(&self) -> &str {
        self.resolver.current_namespace(&self.frames)
    }

    pub fn resolve(&self, name: &str) -> QualifiedName {
        self.resolver.resolve(name, &self.frames)
    }

    // ─── Install ────────────────────────────────────────────────────────────

    /// Swap the existing binding of `name`.
    pub fn replace(
        &mut self,
        name: &str,
        replacement: impl Into<Candidate<Callable>>,
    ) -> Result<&mut Self, OverrideError> {
        self.replace_batch([(name, replacement)])
    }

    pub fn replace_batch<I, N, C>(&mut self, pairs: I) -> Result<&mut Self, OverrideError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<Candidate<Callable>>,
    {
        self.install(InstallMode::Replace, replacements(pairs))
    }

    /// Alias of `replace`.
    pub fn override_with(
        &mut self,
        name: &str,
        replacement: impl Into<Candidate<Callable>>,
    ) -> Result<&mut Self, OverrideError> {
        self.replace(name, replacement)
    }

    /// Alias of `replace_batch`.
    pub fn override_batch<I, N, C>(&mut self, pairs: I) -> Result<&mut Self, OverrideError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<Candidate<Callable>>,
    {
        self.replace_batch(pairs)
    }

    /// Bind `name`, which must not currently be bound.
    pub fn inject(
        &mut self,
        name: &str,
        replacement: impl Into<Candidate<Callable>>,
    ) -> Result<&mut Self, OverrideError> {
        self.inject_batch([(name, replacement)])
    }

    pub fn inject_batch<I, N, C>(&mut self, pairs: I) -> Result<&mut Self, OverrideError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<Candidate<Callable>>,
    {
        self.install(InstallMode::Inject, replacements(pairs))
    }

    /// Bind `name` locally where it is currently only provided by an
    /// ancestor namespace.
    pub fn inherit(
        &mut self,
        name: &str,
        replacement: impl Into<Candidate<Callable>>,
    ) -> Result<&mut Self, OverrideError> {
        self.inherit_batch([(name, replacement)])
    }

    pub fn inherit_batch<I, N, C>(&mut self, pairs: I) -> Result<&mut Self, OverrideError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<Candidate<Callable>>,
    {
        self.install(InstallMode::Inherit, replacements(pairs))
    }

    /// Bind `name` to `wrapper` composed around its current binding.
    ///
    /// The wrapper is invoked as `wrapper(original, args)`. The composed
    /// callable carries the original's signature.
    pub fn wrap(
        &mut self,
        name: &str,
        wrapper: impl Into<Candidate<Wrapper>>,
    ) -> Result<&mut Self, OverrideError> {
        self.wrap_batch([(name, wrapper)])
    }

    pub fn wrap_batch<I, N, C>(&mut self, pairs: I) -> Result<&mut Self, OverrideError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<Candidate<Wrapper>>,
    {
        let pending = pairs
            .into_iter()
            .map(|(name, wrapper)| (name.as_ref().to_string(), Pending::Wrapper(wrapper.into())))
            .collect();
        self.install(InstallMode::Wrap, pending)
    }

    /// Replace each name with a callable that returns `null`.
    pub fn noop(&mut self, names: &[&str]) -> Result<&mut Self, OverrideError> {
        self.replace_batch(names.iter().map(|name| (*name, Callable::noop())))
    }

    fn install(
        &mut self,
        mode: InstallMode,
        pending: Vec<(String, Pending)>,
    ) -> Result<&mut Self, OverrideError> {
        match self.batch_policy {
            BatchPolicy::Atomic => {
                let mut claimed = BTreeSet::new();
                let mut plan = Vec::with_capacity(pending.len());
                for (name, candidate) in pending {
                    let planned = self.plan(&name, mode, candidate)?;
                    if !mode.requires_existing() && !claimed.insert(planned.name.clone()) {
                        return Err(OverrideError::AlreadyExists { name: planned.name });
                    }
                    plan.push(planned);
                }
                for planned in plan {
                    self.apply(planned)?;
                }
            }
            BatchPolicy::Sequential => {
                for (name, candidate) in pending {
                    let planned = self.plan(&name, mode, candidate)?;
                    self.apply(planned)?;
                }
            }
        }
        Ok(self)
    }

    fn plan(
        &self,
        name: &str,
        mode: InstallMode,
        candidate: Pending,
    ) -> Result<Planned, OverrideError> {
        let name = self.resolve(name);

        if let Some(saved) = self.saved.get(&name)
            && saved.mode.requires_existing() != mode.requires_existing()
        {
            return Err(OverrideError::ModeConflict {
                name,
                installed: saved.mode,
                requested: mode,
            });
        }

        let exists = self.registry.exists(&name);
        if mode.requires_existing() {
            if !exists {
                return Err(OverrideError::NoSuchCallable { name });
            }
        } else {
            if exists {
                return Err(OverrideError::AlreadyExists { name });
            }
            if mode == InstallMode::Inherit && !self.registry.exists_in_ancestor(&name) {
                return Err(OverrideError::NotInheritable { name });
            }
        }

        let body = match candidate {
            Pending::Replacement(candidate) => Body::Replacement(validate(candidate)?),
            Pending::Wrapper(candidate) => Body::Wrapper(validate(candidate)?),
        };
        Ok(Planned { name, mode, body })
    }

    fn apply(&mut self, planned: Planned) -> Result<(), OverrideError> {
        let Planned { name, mode, body } = planned;
        let current = self.registry.get(&name);

        let callable = match body {
            Body::Replacement(callable) => callable,
            Body::Wrapper(wrapper) => {
                let original = current
                    .clone()
                    .ok_or_else(|| OverrideError::NoSuchCallable { name: name.clone() })?;
                let wrapped = wrapper.around(original.clone());
                self.registry.copy_signature(&original, wrapped)
            }
        };

        let first_touch = !self.saved.contains_key(&name);
        if first_touch {
            let prior = if mode.requires_existing() { current } else { None };
            self.saved.insert(name.clone(), SavedBinding { prior, mode });
        }
        self.registry.set(&name, callable);
        tracing::debug!(name = %name, mode = %mode, first_touch, "installed override");
        Ok(())
    }

    // ─── Restore ────────────────────────────────────────────────────────────

    /// Reconcile the named slots with what they held before this session.
    ///
    /// With no names, restores the single overridden name; fails with
    /// `AmbiguousRestore` when more than one is overridden. Every name is
    /// checked before any slot is touched.
    pub fn restore(&mut self, names: &[&str]) -> Result<&mut Self, OverrideError> {
        if names.is_empty() {
            if self.saved.len() > 1 {
                return Err(OverrideError::AmbiguousRestore {
                    names: self.overridden(),
                });
            }
            for name in self.overridden() {
                self.reconcile(&name);
            }
            return Ok(self);
        }

        let mut targets = Vec::with_capacity(names.len());
        let mut seen = BTreeSet::new();
        for name in names {
            let name = self.resolve(name);
            if !self.saved.contains_key(&name) || !seen.insert(name.clone()) {
                return Err(OverrideError::NotOverridden { name });
            }
            targets.push(name);
        }
        for name in &targets {
            self.reconcile(name);
        }
        Ok(self)
    }

    /// Restore every overridden name regardless of count.
    pub fn restore_all(&mut self) -> &mut Self {
        for name in self.overridden() {
            self.reconcile(&name);
        }
        self
    }

    fn reconcile(&mut self, name: &QualifiedName) {
        let Some(saved) = self.saved.remove(name) else {
            return;
        };
        let restored = saved.prior.is_some();
        match saved.prior {
            Some(prior) => self.registry.set(name, prior),
            None => {
                self.registry.unset(name);
            }
        }
        tracing::debug!(name = %name, mode = %saved.mode, restored, "restored override");
    }

    // ─── Introspection ──────────────────────────────────────────────────────

    pub fn is_overridden(&self, name: &str) -> bool {
        self.saved.contains_key(&self.resolve(name))
    }

    /// Currently overridden names, in order.
    pub fn overridden(&self) -> Vec<QualifiedName> {
        self.saved.keys().cloned().collect()
    }

    pub fn installed_mode(&self, name: &str) -> Option<InstallMode> {
        self.saved.get(&self.resolve(name)).map(|saved| saved.mode)
    }

    /// The callable that occupied `name` before this session touched it.
    pub fn original(&self, name: &str) -> Result<Callable, OverrideError> {
        let name = self.resolve(name);
        match self.saved.get(&name) {
            None => Err(OverrideError::NotOverridden { name }),
            Some(SavedBinding {
                prior: Some(prior), ..
            }) => Ok(prior.clone()),
            Some(_) => Err(OverrideError::NoSuchCallable { name }),
        }
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            namespace: self.current_namespace().to_string(),
            batch_policy: self.batch_policy,
            overrides: self
                .saved
                .iter()
                .map(|(name, saved)| OverrideEntry {
                    name: name.clone(),
                    mode: saved.mode,
                    had_prior: saved.prior.is_some(),
                })
                .collect(),
        }
    }
}

impl<R: Registry> std::fmt::Debug for OverrideSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideSession")
            .field("namespace", &self.current_namespace())
            .field("batch_policy", &self.batch_policy)
            .field("overridden", &self.saved.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<R: Registry> Drop for OverrideSession<R> {
    fn drop(&mut self) {
        if !self.saved.is_empty() {
            tracing::debug!(remaining = self.saved.len(), "session dropped; restoring");
        }
        self.restore_all();
    }
}

fn replacements<I, N, C>(pairs: I) -> Vec<(String, Pending)>
where
    I: IntoIterator<Item = (N, C)>,
    N: AsRef<str>,
    C: Into<Candidate<Callable>>,
{
    pairs
        .into_iter()
        .map(|(name, replacement)| {
            (
                name.as_ref().to_string(),
                Pending::Replacement(replacement.into()),
            )
        })
        .collect()
}
