//! A `mock:` component that records what flows through it.
//!
//! Consumers remember every initiator they are started with so a test can
//! [`MockComponent::send`] into a route; producers keep every message they
//! process. Both are cached per address, so every route that names the same
//! address shares one consumer or producer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use routekit::{
    Component, Consumer, Context, Endpoint, EndpointError, Exchange, ExchangePattern, Initiator,
    Message, Processor, Producer, RouteError, Service,
};
use tracing::{debug, warn};

pub const PREFIX: &str = "mock";

pub fn component_creator(_context: &Context) -> anyhow::Result<MockComponent> {
    Ok(MockComponent::default())
}

#[derive(Clone, Default)]
pub struct MockComponent {
    consumers: Arc<DashMap<String, Arc<MockConsumer>>>,
    producers: Arc<DashMap<String, Arc<MockProducer>>>,
}

impl MockComponent {
    /// Push `message` into every route that consumes from `address`.
    ///
    /// Routes with the request-reply pattern get their final message
    /// recorded as a reply on the consumer. A failing route does not keep
    /// the message from the others; the first failure is returned once all
    /// of them ran. An unknown address does nothing.
    pub fn send(&self, address: &str, message: Message) -> Result<(), RouteError> {
        let Some(consumer) = self.consumers.get(address).map(|entry| entry.value().clone()) else {
            debug!(address, "no mock consumer, message dropped");
            return Ok(());
        };

        let initiators = lock(&consumer.initiators).clone();
        let mut first_error = None;
        for initiator in initiators {
            match initiator.exchange(message.clone()) {
                Ok(exchange) => {
                    if exchange.pattern() == ExchangePattern::RequestReply {
                        let reply = exchange.in_message().cloned().unwrap_or_default();
                        lock(&consumer.responses).push(reply);
                    }
                }
                Err(err) => {
                    warn!(address, route = initiator.route_id(), "mock send failed: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// `(replies, messages)` recorded by the consumer at `address`.
    pub fn consumer_stats(&self, address: &str) -> (usize, Vec<Message>) {
        match self.consumers.get(address) {
            Some(consumer) => {
                let responses = lock(&consumer.responses).clone();
                (responses.len(), responses)
            }
            None => (0, Vec::new()),
        }
    }

    /// `(invocations, messages)` recorded by the producer at `address`.
    pub fn producer_stats(&self, address: &str) -> (usize, Vec<Message>) {
        match self.producers.get(address) {
            Some(producer) => {
                let messages = lock(&producer.messages).clone();
                (messages.len(), messages)
            }
            None => (0, Vec::new()),
        }
    }

    /// The producer cached for `address`, if a route has created it.
    pub fn producer(&self, address: &str) -> Option<Arc<dyn Producer>> {
        self.producers
            .get(address)
            .map(|entry| -> Arc<dyn Producer> { entry.value().clone() })
    }
}

impl Component for MockComponent {
    fn prefix(&self) -> String {
        PREFIX.to_string()
    }

    fn create_endpoint(&self, address: &str, _options: &HashMap<String, String>) -> Box<dyn Endpoint> {
        Box::new(MockEndpoint {
            name: address.to_string(),
            component: self.clone(),
        })
    }
}

impl std::fmt::Debug for MockComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockComponent")
            .field("consumers", &self.consumers.len())
            .field("producers", &self.producers.len())
            .finish()
    }
}

// a poisoned lock only means another test thread panicked mid-record
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct MockEndpoint {
    name: String,
    component: MockComponent,
}

impl Endpoint for MockEndpoint {
    fn create_consumer(&self) -> Result<Arc<dyn Consumer>, EndpointError> {
        let consumer: Arc<dyn Consumer> = self
            .component
            .consumers
            .entry(self.name.clone())
            .or_insert_with(|| {
                Arc::new(MockConsumer {
                    name: self.name.clone(),
                    initiators: Mutex::new(Vec::new()),
                    responses: Mutex::new(Vec::new()),
                })
            })
            .value()
            .clone();
        Ok(consumer)
    }

    fn create_producer(&self) -> Result<Arc<dyn Producer>, EndpointError> {
        let producer: Arc<dyn Producer> = self
            .component
            .producers
            .entry(self.name.clone())
            .or_insert_with(|| {
                Arc::new(MockProducer {
                    name: self.name.clone(),
                    messages: Mutex::new(Vec::new()),
                })
            })
            .value()
            .clone();
        Ok(producer)
    }
}

struct MockConsumer {
    name: String,
    initiators: Mutex<Vec<Initiator>>,
    responses: Mutex<Vec<Message>>,
}

impl Service for MockConsumer {}

impl Consumer for MockConsumer {
    fn start(&self, initiator: Initiator) -> anyhow::Result<()> {
        debug!(consumer = %self.name, route = initiator.route_id(), "mock consumer started");
        lock(&self.initiators).push(initiator);
        Ok(())
    }
}

struct MockProducer {
    name: String,
    messages: Mutex<Vec<Message>>,
}

impl Service for MockProducer {}

impl Processor for MockProducer {
    fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        // an exchange that never had a message still counts as an invocation
        let message = exchange.in_message().cloned().unwrap_or_default();
        debug!(producer = %self.name, exchange = exchange.id(), "mock producer invoked");
        lock(&self.messages).push(message);
        Ok(())
    }
}

impl Producer for MockProducer {}
