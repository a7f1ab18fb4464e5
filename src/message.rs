use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The payload carried by an `Exchange`. A message is never edited by the
/// engine: `update` hands back a new message and leaves this one alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    body: Value,
    #[serde(default)]
    headers: HashMap<String, Value>,
}

impl Message {
    pub fn new<B: Into<Value>>(body: B) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// A message whose body is a plain string.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(Value::String(text.into()))
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The body as text: strings verbatim, anything else as JSON.
    pub fn text_body(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// A copy of this message with a new body and the same headers.
    #[must_use]
    pub fn update<B: Into<Value>>(&self, body: B) -> Message {
        Message {
            body: body.into(),
            headers: self.headers.clone(),
        }
    }

    pub fn headers(&self) -> &HashMap<String, Value> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    pub fn with_header<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
