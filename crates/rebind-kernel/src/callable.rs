//! Callable values, replacement candidates, and wrap composition.
//!
//! Arguments and results travel as `serde_json::Value` so that a registry can
//! hold heterogeneous callables behind one type. A `Callable` is a shared,
//! immutable body plus optional invocation-shape metadata (`Signature`).

use crate::error::OverrideError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of invoking a callable.
pub type CallResult = Result<Value, CallError>;

type Body = dyn Fn(&[Value]) -> CallResult + Send + Sync;
type WrapBody = dyn Fn(&Callable, &[Value]) -> CallResult + Send + Sync;

/// Failures raised by invocation, never by the override session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// Nothing is bound under the name (registry-level failure).
    #[error("undefined callable {name}")]
    Unbound { name: String },

    #[error("expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("call failed: {0}")]
    Failed(String),
}

/// Invocation-shape metadata carried alongside a callable body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Exact number of arguments accepted, when constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,

    /// Free-form prototype text, e.g. `($$)` or `fn(i64) -> i64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
}

impl Signature {
    pub fn with_arity(arity: usize) -> Self {
        Self {
            arity: Some(arity),
            prototype: None,
        }
    }
}

/// An invocable value stored in a registry slot.
#[derive(Clone)]
pub struct Callable {
    body: Arc<Body>,
    signature: Option<Signature>,
}

impl Callable {
    pub fn new(body: impl Fn(&[Value]) -> CallResult + Send + Sync + 'static) -> Self {
        Self {
            body: Arc::new(body),
            signature: None,
        }
    }

    /// A callable that ignores its arguments and returns `value`.
    pub fn constant(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// A callable that does nothing and returns `null`.
    pub fn noop() -> Self {
        Self::new(|_| Ok(Value::Null))
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Invoke the body, enforcing the signature's arity when present.
    pub fn call(&self, args: &[Value]) -> CallResult {
        if let Some(expected) = self.signature.as_ref().and_then(|sig| sig.arity)
            && expected != args.len()
        {
            return Err(CallError::Arity {
                expected,
                actual: args.len(),
            });
        }
        (self.body)(args)
    }

    /// Whether both handles share the same body.
    pub fn same_body(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.body, &b.body)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("body", &Arc::as_ptr(&self.body).cast::<()>())
            .field("signature", &self.signature)
            .finish()
    }
}

/// A body that receives the displaced callable as its first argument.
#[derive(Clone)]
pub struct Wrapper {
    body: Arc<WrapBody>,
}

impl Wrapper {
    pub fn new(body: impl Fn(&Callable, &[Value]) -> CallResult + Send + Sync + 'static) -> Self {
        Self {
            body: Arc::new(body),
        }
    }

    /// Compose around `original`, captured by value.
    ///
    /// The result never re-reads the registry, so stacked wraps delegate to
    /// whatever was bound when each wrap was installed.
    pub fn around(&self, original: Callable) -> Callable {
        let body = Arc::clone(&self.body);
        Callable::new(move |args| body(&original, args))
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("body", &Arc::as_ptr(&self.body).cast::<()>())
            .finish()
    }
}

/// What a caller hands to an install operation.
///
/// Hosts that marshal replacements from dynamic data can end up holding a
/// plain value where a callable was expected; `validate` rejects those.
#[derive(Debug, Clone)]
pub enum Candidate<F> {
    Invocable(F),
    Inert(Value),
}

impl From<Callable> for Candidate<Callable> {
    fn from(callable: Callable) -> Self {
        Self::Invocable(callable)
    }
}

impl From<Wrapper> for Candidate<Wrapper> {
    fn from(wrapper: Wrapper) -> Self {
        Self::Invocable(wrapper)
    }
}

impl<F> From<Value> for Candidate<F> {
    fn from(value: Value) -> Self {
        Self::Inert(value)
    }
}

/// Confirm a candidate is invocable.
pub fn validate<F>(candidate: Candidate<F>) -> Result<F, OverrideError> {
    match candidate {
        Candidate::Invocable(body) => Ok(body),
        Candidate::Inert(value) => Err(OverrideError::InvalidCallable {
            value: describe_value(&value),
        }),
    }
}

/// Short human-readable description of a non-callable value.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("array of {} item(s)", items.len()),
        Value::Object(map) => format!("object with {} key(s)", map.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arity_is_enforced_only_when_declared() {
        let free = Callable::new(|args| Ok(json!(args.len())));
        assert_eq!(free.call(&[json!(1), json!(2)]).unwrap(), json!(2));

        let unary = free.clone().with_signature(Signature::with_arity(1));
        assert_eq!(
            unary.call(&[json!(1), json!(2)]),
            Err(CallError::Arity {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(unary.call(&[json!("x")]).unwrap(), json!(1));
    }

    #[test]
    fn wrapper_sees_the_captured_original() {
        let original = Callable::constant(json!("original"));
        let wrapper = Wrapper::new(|orig, args| {
            if args.first() == Some(&json!("skip")) {
                Ok(json!("short-circuit"))
            } else {
                orig.call(args)
            }
        });
        let wrapped = wrapper.around(original);
        assert_eq!(wrapped.call(&[json!("pass")]).unwrap(), json!("original"));
        assert_eq!(
            wrapped.call(&[json!("skip")]).unwrap(),
            json!("short-circuit")
        );
    }

    #[test]
    fn inert_candidates_are_rejected_with_a_description() {
        let err = validate::<Callable>(json!(42).into()).unwrap_err();
        assert_eq!(
            err,
            OverrideError::InvalidCallable {
                value: "number 42".to_string()
            }
        );

        let err = validate::<Wrapper>(Candidate::Inert(json!("sub"))).unwrap_err();
        assert!(err.to_string().contains("string \"sub\""));
    }

    #[test]
    fn clones_share_a_body() {
        let a = Callable::noop();
        let b = a.clone();
        assert!(Callable::same_body(&a, &b));
        assert!(!Callable::same_body(&a, &Callable::noop()));
    }
}
