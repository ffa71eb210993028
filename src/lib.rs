pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod handler;
pub(crate) mod promise;
pub(crate) mod request;
pub(crate) mod response;
pub mod status;

pub use crate::core::Value;
pub use error::PromiseError;
pub use handler::{Capability, FAILED, Handler, HandlerResult, IntoHandler, IntoOutcome, RESOLVED};
pub use promise::{Outcome, Promise, Reject, Resolve};
pub use request::{Method, Request, RequestOptions, Transport};
pub use response::Response;
pub use status::StatusRule;
