//! Scoped sessions over the global registry.

use crate::global::GlobalRegistry;
use rebind_kernel::{OverrideSession, SessionConfig};

/// Run `body` with a fresh session; every override it installs is restored
/// when `body` returns or unwinds.
///
/// `frames` is the caller context for unqualified names, innermost first.
pub fn scoped<T>(
    frames: &[&str],
    body: impl FnOnce(&mut OverrideSession<GlobalRegistry>) -> T,
) -> T {
    scoped_with_config(frames, &SessionConfig::default(), body)
}

pub fn scoped_with_config<T>(
    frames: &[&str],
    config: &SessionConfig,
    body: impl FnOnce(&mut OverrideSession<GlobalRegistry>) -> T,
) -> T {
    let mut session = OverrideSession::with_config(GlobalRegistry, config)
        .with_caller_frames(frames.iter().copied());
    tracing::debug!(namespace = session.current_namespace(), "entering override scope");
    body(&mut session)
}
