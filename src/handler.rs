//! # Handlers and the fulfiller
//!
//! A handler comes in one of two shapes:
//!
//! 1. **Callable**: any `Fn(Value) -> R` where `R` converts into a handler
//!    outcome (a value, `()`, or a `Result`).
//! 2. **Capability**: an object implementing [`Capability`], which answers to
//!    named methods. On the success track the method `resolved` is used, on
//!    the failure track `failed`, and status dispatchers use their own names
//!    (`not_found`, `forbidden`, ...).
//!
//! The shape is inspected once, when the handler is queued, producing a
//! [`Callback`]. Invoking a callback is then a plain match on its tag.

use crate::core::Value;
#[cfg(feature = "std")]
use crate::error::panic_to_error;
use crate::error::PromiseError;
use std::rc::Rc;
#[cfg(feature = "std")]
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Method looked up on capability objects attached to the success track.
pub const RESOLVED: &str = "resolved";
/// Method looked up on capability objects attached to the failure track.
pub const FAILED: &str = "failed";

pub type HandlerResult = Result<Value, PromiseError>;

/// An object exposing named handler methods.
///
/// ```
/// use curler::{Capability, HandlerResult, Value};
///
/// struct Printer;
///
/// impl Capability for Printer {
///     fn responds_to(&self, method: &str) -> bool {
///         matches!(method, "resolved" | "failed")
///     }
///
///     fn invoke(&self, method: &str, value: Value) -> HandlerResult {
///         println!("{method}: {value}");
///         Ok(Value::Undefined)
///     }
/// }
/// ```
pub trait Capability {
    /// Whether the object exposes `method`.
    fn responds_to(&self, method: &str) -> bool;

    /// Call `method` with the carried value. Only invoked for methods the
    /// object responds to.
    fn invoke(&self, method: &str, value: Value) -> HandlerResult;

    /// Whether the object can be called directly when it lacks the
    /// requested method.
    fn is_callable(&self) -> bool {
        false
    }

    fn call(&self, _value: Value) -> HandlerResult {
        Err(PromiseError::InvalidCallback { method: "call".to_string() })
    }
}

/// Conversion of a handler's return value into a chain outcome.
pub trait IntoOutcome {
    fn into_outcome(self) -> HandlerResult;
}

impl IntoOutcome for Value {
    fn into_outcome(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::Undefined)
    }
}

impl IntoOutcome for &str {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::from(self))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::String(self))
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::Boolean(self))
    }
}

impl IntoOutcome for f64 {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::Number(self))
    }
}

impl IntoOutcome for i32 {
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::from(self))
    }
}

impl IntoOutcome for PromiseError {
    /// Returning (not raising) an error hands it on as a value.
    fn into_outcome(self) -> HandlerResult {
        Ok(Value::Error(self))
    }
}

impl<T: Into<Value>> IntoOutcome for Result<T, PromiseError> {
    fn into_outcome(self) -> HandlerResult {
        self.map(Into::into)
    }
}

type PlainFn = Rc<dyn Fn(Value) -> HandlerResult>;

/// A handler as supplied by the caller, before its shape is resolved.
#[derive(Clone)]
pub enum Handler {
    Callable(PlainFn),
    Capability(Rc<dyn Capability>),
}

impl Handler {
    pub fn func<F, R>(f: F) -> Self
    where
        F: Fn(Value) -> R + 'static,
        R: IntoOutcome,
    {
        Handler::Callable(Rc::new(move |value| f(value).into_outcome()))
    }

    pub fn capability<C: Capability + 'static>(object: Rc<C>) -> Self {
        Handler::Capability(object)
    }

    /// Resolve the handler's shape for invocation through `method`.
    pub(crate) fn bind(self, method: &str) -> Callback {
        match self {
            Handler::Callable(f) => Callback::Plain(f),
            Handler::Capability(object) => {
                if object.responds_to(method) {
                    Callback::Method {
                        target: object,
                        method: method.to_string(),
                    }
                } else if object.is_callable() {
                    Callback::Invoke(object)
                } else {
                    log::debug!("handler without `{method}` method queued; it will fail when invoked");
                    Callback::Invalid { method: method.to_string() }
                }
            }
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Callable(_) => write!(f, "Handler::Callable"),
            Handler::Capability(_) => write!(f, "Handler::Capability"),
        }
    }
}

/// Conversion into a [`Handler`]; implemented for closures and handlers.
pub trait IntoHandler {
    fn into_handler(self) -> Handler;
}

impl IntoHandler for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl<F, R> IntoHandler for F
where
    F: Fn(Value) -> R + 'static,
    R: IntoOutcome,
{
    fn into_handler(self) -> Handler {
        Handler::func(self)
    }
}

/// A queued handler with its shape already resolved.
#[derive(Clone)]
pub(crate) enum Callback {
    Plain(PlainFn),
    Method { target: Rc<dyn Capability>, method: String },
    Invoke(Rc<dyn Capability>),
    Invalid { method: String },
}

impl Callback {
    fn describe(&self) -> &str {
        match self {
            Callback::Plain(_) => "callable",
            Callback::Method { method, .. } => method,
            Callback::Invoke(_) => "callable object",
            Callback::Invalid { .. } => "invalid",
        }
    }
}

/// Invoke `callback` with `value`.
///
/// Errors returned by the handler come back as `Err`; a panic inside the
/// handler is caught and reported as [`PromiseError::Panicked`] so it can be
/// routed into the failure track like any other raised error.
pub(crate) fn fulfill(callback: &Callback, value: Value) -> HandlerResult {
    log::trace!("fulfill: invoking {} handler with {value}", callback.describe());
    guarded(|| match callback {
        Callback::Plain(f) => f(value),
        Callback::Method { target, method } => target.invoke(method, value),
        Callback::Invoke(target) => target.call(value),
        Callback::Invalid { method } => Err(PromiseError::InvalidCallback { method: method.clone() }),
    })
}

/// Run `f`, turning a panic into [`PromiseError::Panicked`].
#[cfg(feature = "std")]
pub(crate) fn guarded(f: impl FnOnce() -> HandlerResult) -> HandlerResult {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let err = panic_to_error(payload);
            log::debug!("guarded: handler panicked: {err}");
            Err(err)
        }
    }
}

// Without `std` panics are left to unwind through the chain.
#[cfg(not(feature = "std"))]
pub(crate) fn guarded(f: impl FnOnce() -> HandlerResult) -> HandlerResult {
    f()
}
