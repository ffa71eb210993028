//! HTTP status sugar for the failure track.
//!
//! Every registration installs an ordinary failure handler. When the carried
//! error is a [`Response`](crate::Response) whose status code belongs to the
//! rule, the caller's handler runs (a capability object through the method
//! named after the rule) and its result becomes the new carried error. Any
//! other error passes through untouched, so a `fails` handler registered
//! afterwards still sees it.
//!
//! ```
//! use curler::{Promise, Response, Value};
//!
//! Promise::rejected(Response::new(404))
//!     .forbidden(|_: Value| println!("unauthorized"))
//!     .not_found(|_: Value| println!("not found"))
//!     .fails(|err: Value| println!("other error {err}"));
//! ```

use crate::core::Value;
use crate::handler::{Handler, IntoHandler, fulfill};
use crate::promise::Promise;

/// A named set of status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusRule {
    name: &'static str,
    codes: &'static [u16],
}

impl StatusRule {
    pub const fn new(name: &'static str, codes: &'static [u16]) -> Self {
        StatusRule { name, codes }
    }

    /// Method looked up on capability objects for this rule.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn codes(&self) -> &'static [u16] {
        self.codes
    }

    pub fn matches(&self, status: u16) -> bool {
        self.codes.contains(&status)
    }

    /// Whether `error` is a response this rule applies to.
    pub fn matches_value(&self, error: &Value) -> bool {
        error.status().is_some_and(|status| self.matches(status))
    }
}

pub const FORBIDDEN: StatusRule = StatusRule::new("forbidden", &[401, 403]);
pub const CREATED: StatusRule = StatusRule::new("created", &[201]);
// only reaches the failure track when empty responses are ignored
pub const NO_CONTENT: StatusRule = StatusRule::new("no_content", &[204]);
pub const AUTHORIZATION_REQUIRED: StatusRule = StatusRule::new("authorization_required", &[401]);
pub const PAYMENT_REQUIRED: StatusRule = StatusRule::new("payment_required", &[402]);
pub const UNAUTHORIZED: StatusRule = StatusRule::new("unauthorized", &[403]);
pub const NOT_FOUND: StatusRule = StatusRule::new("not_found", &[404]);
pub const NOT_ALLOWED: StatusRule = StatusRule::new("not_allowed", &[405]);
pub const NOT_ACCEPTABLE: StatusRule = StatusRule::new("not_acceptable", &[406]);
pub const CONFLICT: StatusRule = StatusRule::new("conflict", &[409]);
pub const GONE: StatusRule = StatusRule::new("gone", &[410]);
pub const TOO_MANY_REQUESTS: StatusRule = StatusRule::new("too_many_requests", &[429]);
pub const INTERNAL_ERROR: StatusRule = StatusRule::new("internal_error", &[500]);
pub const NOT_IMPLEMENTED: StatusRule = StatusRule::new("not_implemented", &[501]);
pub const UNAVAILABLE: StatusRule = StatusRule::new("unavailable", &[503]);

/// All predefined rules, in the order their registration methods are listed.
pub const RULES: &[StatusRule] = &[
    FORBIDDEN,
    CREATED,
    NO_CONTENT,
    AUTHORIZATION_REQUIRED,
    PAYMENT_REQUIRED,
    UNAUTHORIZED,
    NOT_FOUND,
    NOT_ALLOWED,
    NOT_ACCEPTABLE,
    CONFLICT,
    GONE,
    TOO_MANY_REQUESTS,
    INTERNAL_ERROR,
    NOT_IMPLEMENTED,
    UNAVAILABLE,
];

impl Promise {
    /// Register `handler` for failures whose response status matches `rule`.
    pub fn on_status(&self, rule: StatusRule, handler: impl IntoHandler) -> &Self {
        let callback = handler.into_handler().bind(rule.name());
        self.fails(Handler::func(move |error: Value| {
            if rule.matches_value(&error) {
                log::trace!("on_status: `{}` matched status {:?}", rule.name(), error.status());
                fulfill(&callback, error)
            } else {
                Ok(error)
            }
        }))
    }

    /// 401 or 403.
    pub fn forbidden(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(FORBIDDEN, handler)
    }

    pub fn created(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(CREATED, handler)
    }

    /// 204, for requests that ignore empty responses.
    pub fn no_content(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(NO_CONTENT, handler)
    }

    pub fn authorization_required(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(AUTHORIZATION_REQUIRED, handler)
    }

    pub fn payment_required(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(PAYMENT_REQUIRED, handler)
    }

    pub fn unauthorized(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(UNAUTHORIZED, handler)
    }

    pub fn not_found(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(NOT_FOUND, handler)
    }

    pub fn not_allowed(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(NOT_ALLOWED, handler)
    }

    pub fn not_acceptable(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(NOT_ACCEPTABLE, handler)
    }

    pub fn conflict(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(CONFLICT, handler)
    }

    pub fn gone(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(GONE, handler)
    }

    pub fn too_many_requests(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(TOO_MANY_REQUESTS, handler)
    }

    pub fn internal_error(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(INTERNAL_ERROR, handler)
    }

    pub fn not_implemented(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(NOT_IMPLEMENTED, handler)
    }

    pub fn unavailable(&self, handler: impl IntoHandler) -> &Self {
        self.on_status(UNAVAILABLE, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    #[test]
    fn test_rule_matching() {
        assert!(FORBIDDEN.matches(401));
        assert!(FORBIDDEN.matches(403));
        assert!(!FORBIDDEN.matches(404));
        assert!(NOT_FOUND.matches_value(&Value::from(Response::new(404))));
        assert!(!NOT_FOUND.matches_value(&Value::from(404)));
        assert!(!NOT_FOUND.matches_value(&Value::from("404")));
    }

    #[test]
    fn test_rule_names_are_unique() {
        for (i, a) in RULES.iter().enumerate() {
            for b in &RULES[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
        assert_eq!(RULES.len(), 15);
    }
}
