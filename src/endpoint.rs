use std::collections::HashMap;
use std::sync::Arc;
use serde::Serialize;

use crate::{
    error::EndpointError,
    processor::{Consumer, Producer},
};

/// An address-scoped factory. Not every endpoint can play both roles; the
/// one it cannot play must fail with `NotAConsumer` / `NotAProducer`.
pub trait Endpoint: Send + Sync {
    /// Create the Consumer that receives the route's `Initiator` and feeds
    /// messages into the route.
    fn create_consumer(&self) -> Result<Arc<dyn Consumer>, EndpointError>;

    /// Create the Producer that takes messages off the exchange and sends
    /// them somewhere else.
    fn create_producer(&self) -> Result<Arc<dyn Producer>, EndpointError>;
}

/// An address string split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub prefix: String,
    pub path: String,
    /// Everything after `?`, verbatim.
    pub options: String,
    /// Always empty: option strings are not parsed into pairs.
    pub option_map: HashMap<String, String>,
}

/// Split `prefix:path?options`. Without a `:` every part is empty.
pub fn parse(address: &str) -> Address {
    let Some((prefix, rest)) = address.split_once(':') else {
        return Address::default();
    };
    let (path, options) = match rest.split_once('?') {
        Some((path, options)) => (path, options),
        None => (rest, ""),
    };
    Address {
        prefix: prefix.to_string(),
        path: path.to_string(),
        options: options.to_string(),
        option_map: HashMap::new(),
    }
}

/// The registry key of an address: the text before the first `:`.
pub(crate) fn prefix_of(address: &str) -> Option<&str> {
    address.split_once(':').map(|(prefix, _)| prefix)
}
