//! The process-wide registry.

use rebind_kernel::{
    CallResult, Callable, MemoryRegistry, OverrideSession, QualifiedName, Registry, SessionConfig,
};
use serde_json::Value;
use std::sync::OnceLock;

/// The registry shared by every session in the process.
pub fn global() -> &'static MemoryRegistry {
    static GLOBAL: OnceLock<MemoryRegistry> = OnceLock::new();
    GLOBAL.get_or_init(MemoryRegistry::new)
}

/// Bind a callable in the global registry.
pub fn define(name: impl Into<QualifiedName>, callable: Callable) {
    global().define(name, callable);
}

/// Declare the parent namespaces of `namespace` in the global registry.
pub fn set_parents<I, S>(namespace: &str, parents: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    global().set_parents(namespace, parents);
}

/// Dispatch through the global registry.
pub fn call(name: impl Into<QualifiedName>, args: &[Value]) -> CallResult {
    global().call(name, args)
}

/// Zero-sized handle implementing `Registry` over `global()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalRegistry;

impl GlobalRegistry {
    /// A session whose caller context is `frame` (usually `module_path!()`).
    pub fn session_from(frame: &str) -> OverrideSession<Self> {
        OverrideSession::new(Self).in_namespace(frame)
    }

    pub fn session_with_config(frame: &str, config: &SessionConfig) -> OverrideSession<Self> {
        OverrideSession::with_config(Self, config).in_namespace(frame)
    }
}

impl Registry for GlobalRegistry {
    fn exists(&self, name: &QualifiedName) -> bool {
        global().exists(name)
    }

    fn get(&self, name: &QualifiedName) -> Option<Callable> {
        global().get(name)
    }

    fn set(&self, name: &QualifiedName, callable: Callable) {
        global().set(name, callable)
    }

    fn unset(&self, name: &QualifiedName) -> Option<Callable> {
        global().unset(name)
    }

    fn exists_in_ancestor(&self, name: &QualifiedName) -> bool {
        global().exists_in_ancestor(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handle_reads_and_writes_the_global_table() {
        define("global_tests::answer", Callable::constant(json!(41)));
        let name = QualifiedName::new("global_tests::answer");
        assert!(GlobalRegistry.exists(&name));

        GlobalRegistry.set(&name, Callable::constant(json!(42)));
        assert_eq!(call("global_tests::answer", &[]).unwrap(), json!(42));

        GlobalRegistry.unset(&name);
        assert!(!global().exists(&name));
    }

    #[test]
    fn internal_frames_fall_back_to_the_default_namespace() {
        let session = GlobalRegistry::session_from(module_path!());
        assert_eq!(session.current_namespace(), "main");
    }
}
