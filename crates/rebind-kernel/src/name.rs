//! Fully-qualified names and caller-context resolution.
//!
//! A registry slot is addressed by a namespace-qualified identifier such as
//! `App::Widget::render`. Callers usually write the short form (`render`)
//! and expect it to mean "the `render` in the namespace I am calling from".
//!
//! The caller context is an explicit list of frames, innermost first. The
//! embedding layer supplies it (for example `module_path!()` at the call
//! site). Frames that belong to the override machinery itself are skipped so
//! that helpers layered over the session do not capture the resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Separator between namespace segments and the final symbol.
pub const SEPARATOR: &str = "::";

/// Namespace used when no caller frame qualifies.
pub const DEFAULT_NAMESPACE: &str = "main";

/// Opaque key identifying one binding slot in a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Wrap an already-qualified name. No validation is performed.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Join a namespace and a symbol.
    ///
    /// An empty namespace yields the bare symbol.
    pub fn join(namespace: &str, symbol: &str) -> Self {
        if namespace.is_empty() {
            Self(symbol.to_string())
        } else {
            Self(format!("{namespace}{SEPARATOR}{symbol}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last separator, or `""` when unqualified.
    pub fn namespace(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(namespace, _)| namespace)
            .unwrap_or("")
    }

    /// The final segment.
    pub fn symbol(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, symbol)| symbol)
            .unwrap_or(&self.0)
    }

    /// The same symbol re-homed into another namespace.
    pub fn rehome(&self, namespace: &str) -> Self {
        Self::join(namespace, self.symbol())
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether `name` already carries a namespace.
pub fn is_qualified(name: &str) -> bool {
    name.contains(SEPARATOR)
}

/// Turns possibly-unqualified names into fully-qualified ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolver {
    fallback: String,
    internal: BTreeSet<String>,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl NameResolver {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            internal: BTreeSet::new(),
        }
    }

    /// Mark a namespace (and everything nested under it) as internal.
    pub fn with_internal(mut self, namespace: impl Into<String>) -> Self {
        self.internal.insert(namespace.into());
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn is_internal(&self, frame: &str) -> bool {
        self.internal.iter().any(|internal| {
            frame == internal
                || frame
                    .strip_prefix(internal.as_str())
                    .is_some_and(|rest| rest.starts_with(SEPARATOR))
        })
    }

    /// The nearest caller frame outside the internal namespaces.
    pub fn current_namespace<'a, S: AsRef<str>>(&'a self, frames: &'a [S]) -> &'a str {
        frames
            .iter()
            .map(|frame| frame.as_ref())
            .find(|frame| !frame.is_empty() && !self.is_internal(frame))
            .unwrap_or(self.fallback.as_str())
    }

    /// Qualify `name` against the caller context.
    pub fn resolve<S: AsRef<str>>(&self, name: &str, frames: &[S]) -> QualifiedName {
        if is_qualified(name) {
            return QualifiedName::new(name);
        }
        let namespace = self.current_namespace(frames);
        let resolved = QualifiedName::join(namespace, name);
        tracing::trace!(name, resolved = %resolved, "resolved unqualified name");
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        NameResolver::default()
            .with_internal("rebind_kernel")
            .with_internal("rebind_ambient")
    }

    #[test]
    fn qualified_names_pass_through_unchanged() {
        let frames = ["app::tests"];
        assert_eq!(
            resolver().resolve("Other::thing", &frames),
            QualifiedName::new("Other::thing")
        );
    }

    #[test]
    fn unqualified_names_use_the_nearest_external_frame() {
        let frames = [
            "rebind_kernel::session",
            "rebind_ambient::scope",
            "app::widget::tests",
            "app",
        ];
        assert_eq!(
            resolver().resolve("render", &frames),
            QualifiedName::new("app::widget::tests::render")
        );
    }

    #[test]
    fn internal_match_requires_a_segment_boundary() {
        let r = resolver();
        assert!(r.is_internal("rebind_kernel"));
        assert!(r.is_internal("rebind_kernel::session"));
        assert!(!r.is_internal("rebind_kernel_extras"));
        assert_eq!(
            r.resolve("f", &["rebind_kernel_extras"]),
            QualifiedName::new("rebind_kernel_extras::f")
        );
    }

    #[test]
    fn falls_back_when_every_frame_is_internal() {
        let frames = ["rebind_kernel::session"];
        assert_eq!(
            resolver().resolve("helper", &frames),
            QualifiedName::new("main::helper")
        );
        let none: [&str; 0] = [];
        assert_eq!(
            resolver().resolve("helper", &none),
            QualifiedName::new("main::helper")
        );
    }

    #[test]
    fn namespace_and_symbol_split_on_last_separator() {
        let name = QualifiedName::new("a::b::c");
        assert_eq!(name.namespace(), "a::b");
        assert_eq!(name.symbol(), "c");
        assert_eq!(name.rehome("z").as_str(), "z::c");

        let bare = QualifiedName::new("solo");
        assert_eq!(bare.namespace(), "");
        assert_eq!(bare.symbol(), "solo");
    }
}
