//! Integration tests: sessions over the process-wide registry.
//!
//! Tests in this binary share one registry and may run in parallel, so each
//! test works under its own names.

use rebind_ambient::kernel::{BatchPolicy, CallError, Callable, OverrideError, SessionConfig, Wrapper};
use rebind_ambient::{call, define, scoped, set_parents};
use serde_json::json;

#[test]
fn session_macro_resolves_against_the_invoking_module() {
    define("global_session::greet", Callable::constant(json!("hello")));

    let mut session = rebind_ambient::session!();
    assert_eq!(session.current_namespace(), "global_session");
    session
        .replace("greet", Callable::constant(json!("stubbed")))
        .unwrap();
    assert_eq!(call("global_session::greet", &[]).unwrap(), json!("stubbed"));

    drop(session);
    assert_eq!(call("global_session::greet", &[]).unwrap(), json!("hello"));
}

#[test]
fn session_macro_accepts_a_config() {
    let config = SessionConfig {
        batch_policy: BatchPolicy::Sequential,
        ..SessionConfig::default()
    };
    let session = rebind_ambient::session!(&config);
    assert_eq!(session.batch_policy(), BatchPolicy::Sequential);
}

#[test]
fn injected_helper_disappears_after_restore() {
    let mut session = rebind_ambient::session!();
    session
        .inject("injected_helper", Callable::constant(json!(42)))
        .unwrap();
    assert_eq!(
        call("global_session::injected_helper", &[]).unwrap(),
        json!(42)
    );

    session.restore(&["injected_helper"]).unwrap();
    assert_eq!(
        call("global_session::injected_helper", &[]),
        Err(CallError::Unbound {
            name: "global_session::injected_helper".to_string()
        })
    );
}

#[test]
fn inherit_over_global_namespaces() {
    set_parents("Gs::Child", ["Gs::Parent"]);
    define("Gs::Parent::util", Callable::constant(json!("parent")));

    scoped(&["global_session"], |session| {
        session
            .inherit("Gs::Child::util", Callable::constant(json!("child-stub")))
            .unwrap();
        assert_eq!(call("Gs::Child::util", &[]).unwrap(), json!("child-stub"));
    });
    assert_eq!(call("Gs::Child::util", &[]).unwrap(), json!("parent"));
}

#[test]
fn scoped_restores_when_the_body_unwinds() {
    define("global_session::fragile", Callable::constant(json!("intact")));

    let outcome = std::panic::catch_unwind(|| {
        scoped(&["global_session"], |session| {
            session
                .wrap("fragile", Wrapper::new(|_, _| Ok(json!("wrapped"))))
                .unwrap();
            if call("global_session::fragile", &[]) == Ok(json!("wrapped")) {
                panic!("test body failed after wrapping");
            }
        })
    });
    assert!(outcome.is_err());
    assert_eq!(call("global_session::fragile", &[]).unwrap(), json!("intact"));
}

#[test]
fn scoped_propagates_override_errors() {
    let result: Result<(), OverrideError> = scoped(&["global_session"], |session| {
        session.replace("never_defined", Callable::noop())?;
        Ok(())
    });
    assert_eq!(
        result,
        Err(OverrideError::NoSuchCallable {
            name: "global_session::never_defined".into()
        })
    );
}
