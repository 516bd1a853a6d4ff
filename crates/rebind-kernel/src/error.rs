//! Error types for override sessions and their configuration.

use crate::name::QualifiedName;
use crate::session::InstallMode;

/// Caller-visible failures of install and restore operations.
///
/// Every variant is local and recoverable: the registry and the session's
/// saved-binding table are left as they were for the failing name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    /// `replace`/`wrap` target is not bound.
    #[error("{name} does not exist")]
    NoSuchCallable { name: QualifiedName },

    /// `inject`/`inherit` target is already bound.
    #[error("{name} already exists")]
    AlreadyExists { name: QualifiedName },

    /// `inherit` target is not provided by any ancestor namespace.
    #[error("could not find {symbol} in any parent of {namespace}", symbol = .name.symbol(), namespace = .name.namespace())]
    NotInheritable { name: QualifiedName },

    /// The supplied replacement is not invocable.
    #[error("replacement is not callable: {value}")]
    InvalidCallable { value: String },

    /// Restore named a slot this session never touched (or already restored).
    #[error("{name} was not overridden")]
    NotOverridden { name: QualifiedName },

    /// Zero-argument restore while several names are overridden.
    #[error("restore of {} overridden names requires naming them: {}", .names.len(), join_names(.names))]
    AmbiguousRestore { names: Vec<QualifiedName> },

    /// A live override was installed under the opposite precondition.
    #[error("{name} is live as {installed}; restore it before {requested}")]
    ModeConflict {
        name: QualifiedName,
        installed: InstallMode,
        requested: InstallMode,
    },
}

fn join_names(names: &[QualifiedName]) -> String {
    names
        .iter()
        .map(QualifiedName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures loading a `SessionConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
