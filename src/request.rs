use crate::core::Value;
use crate::error::PromiseError;
use crate::promise::Promise;
use crate::response::Response;
use indexmap::IndexMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs read by transports. Only `ignore_empty_responses` affects how a
/// response settles the promise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
    /// Treat 204 No Content as a failure instead of a success.
    pub ignore_empty_responses: bool,
    pub follow_redirects: bool,
    pub verify_tls: bool,
    /// Ask the transport for verbose connection output.
    pub debug: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            ignore_empty_responses: false,
            follow_redirects: true,
            verify_tls: true,
            debug: false,
        }
    }
}

/// The network client performing a request. Implementations do the actual
/// I/O; the request layer only turns the outcome into a settled promise.
pub trait Transport {
    fn execute(&self, request: &Request) -> Result<Response, PromiseError>;
}

/// An outgoing request whose outcome is delivered as a [`Promise`].
///
/// A 2xx response resolves the promise with the response, any other status
/// rejects it with the response, and a transport failure rejects it with the
/// error. With [`RequestOptions::ignore_empty_responses`] set, 204 rejects.
#[derive(Clone, Debug, Default)]
pub struct Request {
    method: Option<Method>,
    url: String,
    headers: IndexMap<String, String>,
    body: Option<String>,
    options: RequestOptions,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Set an outgoing header, either as `("Name", "value")` or as a single
    /// `"Name: value"` line with an empty value argument.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        let (name, value) = match name.split_once(':') {
            Some((n, v)) if value.is_empty() => (n, v),
            _ => (name, value),
        };
        self.headers.insert(name.trim().to_string(), value.trim().to_string());
        self
    }

    pub fn reset_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    pub fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }

    pub fn ignore_empty_responses(&mut self) -> &mut Self {
        self.options.ignore_empty_responses = true;
        self
    }

    pub fn avoid_redirect(&mut self) -> &mut Self {
        self.options.follow_redirects = false;
        self
    }

    pub fn ignore_tls_certificate(&mut self) -> &mut Self {
        self.options.verify_tls = false;
        self
    }

    pub fn debug_connection(&mut self) -> &mut Self {
        self.options.debug = true;
        self
    }

    /// Method of the last request sent.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn get(&mut self, transport: &dyn Transport) -> Promise {
        self.send(Method::Get, None, None, transport)
    }

    pub fn delete(&mut self, transport: &dyn Transport) -> Promise {
        self.send(Method::Delete, None, None, transport)
    }

    pub fn head(&mut self, transport: &dyn Transport) -> Promise {
        self.send(Method::Head, None, None, transport)
    }

    pub fn options_request(&mut self, transport: &dyn Transport) -> Promise {
        self.send(Method::Options, None, None, transport)
    }

    /// Send an already encoded `body` of the given content type.
    pub fn post(&mut self, body: impl Into<String>, content_type: &str, transport: &dyn Transport) -> Promise {
        self.send(Method::Post, Some(body.into()), Some(content_type), transport)
    }

    pub fn put(&mut self, body: impl Into<String>, content_type: &str, transport: &dyn Transport) -> Promise {
        self.send(Method::Put, Some(body.into()), Some(content_type), transport)
    }

    pub fn patch(&mut self, body: impl Into<String>, content_type: &str, transport: &dyn Transport) -> Promise {
        self.send(Method::Patch, Some(body.into()), Some(content_type), transport)
    }

    fn send(&mut self, method: Method, body: Option<String>, content_type: Option<&str>, transport: &dyn Transport) -> Promise {
        self.method = Some(method);
        self.body = body;
        match content_type {
            Some(content_type) => {
                self.headers.insert("Content-Type".to_string(), content_type.to_string());
            }
            None => {
                self.headers.shift_remove("Content-Type");
            }
        }
        log::debug!("send: {method} {}", self.url);

        let request: &Request = self;
        Promise::new(|resolve, reject| {
            let response = transport.execute(request)?;
            if request.accepts(&response) {
                resolve.call(response);
            } else {
                reject.call(response);
            }
            Ok::<Value, PromiseError>(Value::Undefined)
        })
    }

    /// Whether `response` settles the promise as a success.
    pub fn accepts(&self, response: &Response) -> bool {
        response.is_success() && !(self.options.ignore_empty_responses && response.is_empty_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_forms() {
        let mut req = Request::new("http://example.com");
        req.set_header("Accept: text/plain", "");
        req.set_header(" X-Token ", " abc ");
        assert_eq!(req.headers().get("Accept").map(String::as_str), Some("text/plain"));
        assert_eq!(req.headers().get("X-Token").map(String::as_str), Some("abc"));
        req.reset_headers();
        assert!(req.headers().is_empty());
    }

    #[test]
    fn test_accepts() {
        let mut req = Request::new("http://example.com");
        assert!(req.accepts(&Response::new(200)));
        assert!(req.accepts(&Response::new(204)));
        assert!(!req.accepts(&Response::new(404)));
        req.ignore_empty_responses();
        assert!(!req.accepts(&Response::new(204)));
        assert!(req.accepts(&Response::new(201)));
    }

    #[test]
    fn test_default_options() {
        let opts = RequestOptions::default();
        assert!(!opts.ignore_empty_responses);
        assert!(opts.follow_redirects);
        assert!(opts.verify_tls);
        assert!(!opts.debug);
    }
}
