//! # Rebind Kernel
//!
//! Scoped replacement of named callables: install an alternate
//! implementation under a fully-qualified name for the duration of a test or
//! a bounded region, and get the original back, exactly once, when the
//! owning session says so or goes away.
//!
//! This crate is **registry-agnostic**: it rewrites slots through the
//! `Registry` trait and never owns the table it rewrites.
//!
//! ## Architecture
//!
//! ```text
//! NameResolver          ← short name + caller frames → QualifiedName
//!     │
//! Registry              ← exists / get / set / unset / ancestors / signature
//!     │
//! validate              ← Candidate → Callable | Wrapper
//!     │
//! OverrideSession       ← replace / inject / inherit / wrap / restore
//! ```

pub mod callable;
pub mod config;
pub mod error;
pub mod name;
pub mod registry;
pub mod session;

pub use callable::{CallError, CallResult, Callable, Candidate, Signature, Wrapper, validate};
pub use config::{BatchPolicy, SessionConfig};
pub use error::{ConfigError, OverrideError};
pub use name::{NameResolver, QualifiedName};
pub use registry::{MemoryRegistry, Registry};
pub use session::{InstallMode, OverrideEntry, OverrideSession, SessionReport};
