use indexmap::IndexMap;

/// Outcome of a transport round trip, carried through a promise chain.
///
/// Only the status code matters to the promise machinery; headers and body
/// are passed along untouched for the handlers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    status: u16,
    headers: IndexMap<String, String>,
    body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add an incoming header. Names are stored lower-cased with `-`
    /// replaced by `_`, so `Content-Type` is looked up as `content_type`.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(normalize_header_name(name), value.trim().to_string());
        self
    }

    /// Parse a raw `Name: value` header line as received from the wire.
    /// Lines without a colon (status lines, blank separators) are skipped.
    pub fn push_header_line(&mut self, line: &str) {
        if let Some((name, value)) = line.trim().split_once(':')
            && !name.trim().is_empty()
        {
            self.headers.insert(normalize_header_name(name), value.trim().to_string());
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&normalize_header_name(name)).map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 204 No Content.
    pub fn is_empty_success(&self) -> bool {
        self.status == 204
    }
}

fn normalize_header_name(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}
