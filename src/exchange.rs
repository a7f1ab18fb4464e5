use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::message::Message;

/// The exchange pattern of a route.
///
/// In a `RequestReply` exchange the originating consumer expects the final
/// `in` message back as its reply. A `RequestOnly` exchange only goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExchangePattern {
    RequestReply,
    #[default]
    RequestOnly,
}

impl std::fmt::Display for ExchangePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangePattern::RequestReply => write!(f, "RequestReply"),
            ExchangePattern::RequestOnly => write!(f, "RequestOnly"),
        }
    }
}

/// One unit of work flowing through a route.
///
/// A step reads the current message with [`Exchange::in_message`] and may
/// stage a replacement with [`Exchange::set_out`]. Between steps the engine
/// rotates: a staged message becomes the new `in`, otherwise `in` is kept
/// as is and the next step sees the same message.
#[derive(Debug, Clone)]
pub struct Exchange {
    id: String,
    pattern: ExchangePattern,
    created: DateTime<Utc>,
    in_message: Option<Message>,
    out_message: Option<Message>,
    properties: HashMap<String, Value>,
}

impl Exchange {
    pub fn new<I: Into<String>>(id: I, pattern: ExchangePattern) -> Self {
        Self {
            id: id.into(),
            pattern,
            created: Utc::now(),
            in_message: None,
            out_message: None,
            properties: HashMap::new(),
        }
    }

    /// Stable for the whole life of the exchange.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// The current message. Only empty on an exchange built by hand and
    /// never rotated.
    pub fn in_message(&self) -> Option<&Message> {
        self.in_message.as_ref()
    }

    /// Stage the message the next step should see.
    pub fn set_out(&mut self, message: Message) {
        self.out_message = Some(message);
    }

    /// The staged message, if the current step set one.
    pub fn out_message(&self) -> Option<&Message> {
        self.out_message.as_ref()
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        self.properties.insert(name.into(), value.into());
    }

    /// Promote the staged message to `in`. No-op when nothing was staged.
    pub(crate) fn rotate(&mut self) {
        if let Some(out) = self.out_message.take() {
            self.in_message = Some(out);
        }
    }
}
