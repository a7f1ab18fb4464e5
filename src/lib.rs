pub mod builder;
pub mod component;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod id;
pub mod logger;
pub mod message;
pub mod processor;
pub mod route;

#[cfg(test)]
mod test_support;

pub use builder::{RouteBuilder, RouteConfiguration};
pub use component::Component;
pub use context::Context;
pub use endpoint::{Address, Endpoint, parse};
pub use error::{ContextError, EndpointError, Phase, RouteError};
pub use exchange::{Exchange, ExchangePattern};
pub use message::Message;
pub use processor::{Consumer, FnProcessor, Processor, Producer, Service, Step};
pub use route::{Initiator, Route};
