//! Session configuration.
//!
//! ```toml
//! default_namespace = "main"
//! internal_namespaces = ["rebind_kernel", "rebind_ambient"]
//! batch_policy = "atomic"
//! ```

use crate::error::ConfigError;
use crate::name::{DEFAULT_NAMESPACE, NameResolver};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a multi-pair install call behaves when one pair fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Check every pair first; apply only if all pass.
    #[default]
    Atomic,

    /// Apply each pair as soon as it passes. A failure leaves earlier
    /// pairs of the same call installed (and tracked for restore).
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Namespace for unqualified names when no caller frame qualifies.
    pub default_namespace: String,

    /// Caller frames skipped during name resolution.
    pub internal_namespaces: Vec<String>,

    pub batch_policy: BatchPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            internal_namespaces: vec!["rebind_kernel".to_string(), "rebind_ambient".to_string()],
            batch_policy: BatchPolicy::Atomic,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })
    }

    pub fn resolver(&self) -> NameResolver {
        self.internal_namespaces.iter().fold(
            NameResolver::new(self.default_namespace.clone()),
            |resolver, namespace| resolver.with_internal(namespace.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.batch_policy, BatchPolicy::Atomic);
    }

    #[test]
    fn fields_override_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
default_namespace = "App"
internal_namespaces = ["harness"]
batch_policy = "sequential"
"#,
        )
        .unwrap();
        assert_eq!(config.default_namespace, "App");
        assert_eq!(config.batch_policy, BatchPolicy::Sequential);

        let resolver = config.resolver();
        assert!(resolver.is_internal("harness::setup"));
        assert!(!resolver.is_internal("rebind_kernel"));
        assert_eq!(resolver.fallback(), "App");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SessionConfig::from_toml_str("strict = true").unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = SessionConfig::load("/nonexistent/rebind.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rebind.toml"));
    }
}
