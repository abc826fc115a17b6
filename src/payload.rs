use serde_json::Value;

/// A type which represents a `payload` in the `socket.io` context: the
/// positional arguments carried by an event. A payload could either be of
/// the type `Payload::Text`, which holds the already decoded JSON arguments,
/// or of the type `Payload::String`, a convenience for a single plain text
/// argument. The enum is used for both data that's sent and data that's
/// received.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Payload {
    Text(Vec<Value>),
    String(String),
}

impl Payload {
    /// The payload as positional JSON arguments.
    pub(crate) fn into_args(self) -> Vec<Value> {
        match self {
            Payload::Text(values) => values,
            Payload::String(string) => vec![Value::String(string)],
        }
    }
}

impl From<&str> for Payload {
    fn from(string: &str) -> Self {
        Self::String(string.to_owned())
    }
}

impl From<String> for Payload {
    fn from(string: String) -> Self {
        Self::String(string)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Text(vec![value])
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self::Text(values)
    }
}
