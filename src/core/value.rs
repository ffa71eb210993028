use crate::error::PromiseError;
use crate::response::Response;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Payload threaded through a promise chain.
///
/// Success handlers receive and return the carried value, failure handlers
/// the carried error. Both tracks use the same representation so that a
/// failure handler can hand back anything it likes as the next error.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Error(PromiseError),
    Response(Rc<Response>),
}

impl Value {
    /// Truthiness used by the failure track: a handler returning a falsy
    /// value has absorbed the error.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Error(_) | Value::Response(_) => true,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&PromiseError> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Value::Response(resp) => Some(resp),
            _ => None,
        }
    }

    /// Status code of a response-bearing value.
    pub fn status(&self) -> Option<u16> {
        self.as_response().map(Response::status)
    }

    /// Property lookup on object values, `None` for everything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// JSON rendition of the value. Values without a JSON counterpart
    /// (undefined, non-finite numbers) map to `null`; errors become their
    /// message and responses their body.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.is_finite() && *n == n.trunc() && n.abs() < i64::MAX as f64 {
                    serde_json::Value::Number(serde_json::Number::from(*n as i64))
                } else {
                    serde_json::Number::from_f64(*n).map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(out)
            }
            Value::Error(err) => serde_json::Value::String(err.to_string()),
            Value::Response(resp) => serde_json::Value::String(resp.body().to_string()),
        }
    }

    /// Parse a JSON document into a value.
    pub fn from_json_str(text: &str) -> Result<Value, PromiseError> {
        let json = serde_json::from_str::<serde_json::Value>(text)?;
        Ok(Value::from(json))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.is_finite() && *n == n.trunc() {
                    // `{:.0}` also covers integral values past the i64 range
                    // and prints `-0` as `0`.
                    write!(f, "{:.0}", n + 0.0)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Error(err) => write!(f, "Error: {err}"),
            Value::Response(resp) => write!(f, "Response {}", resp.status()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Undefined, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl From<PromiseError> for Value {
    fn from(err: PromiseError) -> Self {
        Value::Error(err)
    }
}

impl From<Response> for Value {
    fn from(resp: Response) -> Self {
        Value::Response(Rc::new(resp))
    }
}

impl From<Rc<Response>> for Value {
    fn from(resp: Rc<Response>) -> Self {
        Value::Response(resp)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Undefined, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(Vec::new()).is_truthy());
        assert!(Value::Object(IndexMap::new()).is_truthy());
        assert!(Value::from(PromiseError::message("")).is_truthy());
        assert!(Value::from(Response::new(404)).is_truthy());
    }

    #[test]
    fn test_json_keeps_key_order() {
        let v = Value::from_json_str(r#"{"foo":"bar","bar":"baz","n":3}"#).unwrap();
        assert_eq!(v.get("foo"), Some(&Value::from("bar")));
        assert_eq!(v.get("n"), Some(&Value::from(3)));
        assert_eq!(v.to_string(), r#"{"foo":"bar","bar":"baz","n":3}"#);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Value::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("success 2").to_string(), "success 2");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::from(-1e20).to_string(), "-100000000000000000000");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::from(PromiseError::message("boom")).to_string(), "Error: boom");
        assert_eq!(Value::from(Response::new(403)).to_string(), "Response 403");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<&str>), Value::Undefined);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
