use crate::core::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PromiseError {
    #[error("invalid callback: handler exposes no `{method}` method and is not callable")]
    InvalidCallback { method: String },

    #[error("{message}")]
    Message { message: String },

    #[error("handler panicked: {message}")]
    Panicked { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Thrown value: {value}")]
    Throw { value: Box<Value> },
}

impl PromiseError {
    pub fn message(message: impl Into<String>) -> Self {
        PromiseError::Message { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        PromiseError::Transport { message: message.into() }
    }

    /// Raise an arbitrary value. The value itself, not an error wrapping it,
    /// becomes the carried error of the failure track.
    pub fn throw(value: impl Into<Value>) -> Self {
        PromiseError::Throw { value: Box::new(value.into()) }
    }

    /// Convert a raised error into the payload handed to failure handlers.
    pub fn into_value(self) -> Value {
        match self {
            PromiseError::Throw { value } => *value,
            other => Value::Error(other),
        }
    }
}

impl From<&str> for PromiseError {
    fn from(message: &str) -> Self {
        PromiseError::message(message)
    }
}

impl From<String> for PromiseError {
    fn from(message: String) -> Self {
        PromiseError::Message { message }
    }
}

impl From<serde_json::Error> for PromiseError {
    fn from(err: serde_json::Error) -> Self {
        PromiseError::message(err.to_string())
    }
}

// Turns a panic payload into an error the failure track can carry.
#[cfg(feature = "std")]
pub(crate) fn panic_to_error(payload: Box<dyn std::any::Any + Send>) -> PromiseError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    PromiseError::Panicked { message }
}

// Macro that constructs a Message error from format arguments, in the
// manner of `format!`.
#[macro_export]
macro_rules! raise {
    ($($arg:tt)*) => {
        $crate::PromiseError::Message {
            message: format!($($arg)*),
        }
    };
}
