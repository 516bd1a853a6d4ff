//! # rebind-ambient
//!
//! Production binding of the rebind kernel to one process-wide registry:
//! - `global()` / `GlobalRegistry`: the shared name → callable table
//! - `session!()`: a session whose unqualified names resolve against the
//!   invoking module
//! - `scoped`: run a closure with a session that restores on every exit path
//!
//! Call sites dispatch through `call`, so an override is visible to every
//! caller in the process until it is restored.

pub mod global;
pub mod scope;

pub use global::{GlobalRegistry, call, define, global, set_parents};
pub use rebind_kernel as kernel;
pub use scope::{scoped, scoped_with_config};

/// Open an override session over the global registry.
///
/// Unqualified names resolve into the module that invokes the macro.
///
/// ```ignore
/// let mut session = rebind_ambient::session!();
/// session.replace("fetch", Callable::constant(json!("stub")))?;
/// ```
#[macro_export]
macro_rules! session {
    () => {
        $crate::GlobalRegistry::session_from(module_path!())
    };
    ($config:expr) => {
        $crate::GlobalRegistry::session_with_config(module_path!(), $config)
    };
}
