//! A small recording component used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};

use crate::{
    component::Component,
    endpoint::Endpoint,
    error::{EndpointError, RouteError},
    exchange::Exchange,
    message::Message,
    processor::{Consumer, Processor, Producer, Service},
    route::Initiator,
};

#[derive(Default)]
struct TapState {
    addresses: Arc<Mutex<Vec<String>>>,
    consumers: Mutex<HashMap<String, Arc<TapConsumer>>>,
    producers: Mutex<HashMap<String, Arc<TapProducer>>>,
    events: Mutex<Vec<String>>,
}

impl TapState {
    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    /// Record `phase` for `address`, then fail if the address asks for it.
    fn phase(&self, phase: &str, address: &str) -> anyhow::Result<()> {
        self.event(format!("{phase} {address}"));
        if address.ends_with(&format!(":fail-{phase}")) {
            bail!("{address} refuses to {phase}");
        }
        Ok(())
    }
}

/// Consumers keep every initiator they are started with; producers record
/// each message they see.
///
/// The address suffix picks a failure: `:fail` producers error on every
/// message, `:fail-init` and `:fail-start` services error in that phase, and
/// a `:broken` endpoint cannot create anything.
pub(crate) struct TapComponent {
    prefix: String,
    consumers_allowed: bool,
    producers_allowed: bool,
    state: Arc<TapState>,
}

impl TapComponent {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            consumers_allowed: true,
            producers_allowed: true,
            state: Arc::new(TapState::default()),
        }
    }

    pub fn without_consumers(mut self) -> Self {
        self.consumers_allowed = false;
        self
    }

    pub fn without_producers(mut self) -> Self {
        self.producers_allowed = false;
        self
    }

    pub fn addresses(&self) -> Arc<Mutex<Vec<String>>> {
        self.state.addresses.clone()
    }

    pub fn trigger(&self, address: &str, message: Message) -> Vec<Result<Exchange, RouteError>> {
        let consumer = self.state.consumers.lock().unwrap().get(address).cloned();
        let Some(consumer) = consumer else {
            return Vec::new();
        };
        let initiators = consumer.initiators.lock().unwrap().clone();
        initiators
            .iter()
            .map(|initiator| initiator.exchange(message.clone()))
            .collect()
    }

    pub fn received(&self, address: &str) -> Vec<Message> {
        match self.state.producers.lock().unwrap().get(address) {
            Some(producer) => producer.messages.lock().unwrap().clone(),
            None => Vec::new(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }

    pub fn handle(&self) -> TapComponent {
        TapComponent {
            prefix: self.prefix.clone(),
            consumers_allowed: self.consumers_allowed,
            producers_allowed: self.producers_allowed,
            state: self.state.clone(),
        }
    }
}

impl Component for TapComponent {
    fn prefix(&self) -> String {
        self.prefix.clone()
    }

    fn create_endpoint(&self, address: &str, _options: &HashMap<String, String>) -> Box<dyn Endpoint> {
        self.state.addresses.lock().unwrap().push(address.to_string());
        Box::new(TapEndpoint {
            address: address.to_string(),
            consumers_allowed: self.consumers_allowed,
            producers_allowed: self.producers_allowed,
            state: self.state.clone(),
        })
    }
}

struct TapEndpoint {
    address: String,
    consumers_allowed: bool,
    producers_allowed: bool,
    state: Arc<TapState>,
}

impl TapEndpoint {
    fn broken(&self) -> Option<EndpointError> {
        self.address
            .ends_with(":broken")
            .then(|| EndpointError::Other(anyhow!("{} is broken", self.address)))
    }
}

impl Endpoint for TapEndpoint {
    fn create_consumer(&self) -> Result<Arc<dyn Consumer>, EndpointError> {
        if !self.consumers_allowed {
            return Err(EndpointError::NotAConsumer);
        }
        if let Some(err) = self.broken() {
            return Err(err);
        }
        let mut consumers = self.state.consumers.lock().unwrap();
        let consumer: Arc<dyn Consumer> = consumers
            .entry(self.address.clone())
            .or_insert_with(|| {
                Arc::new(TapConsumer {
                    address: self.address.clone(),
                    state: self.state.clone(),
                    initiators: Mutex::new(Vec::new()),
                })
            })
            .clone();
        Ok(consumer)
    }

    fn create_producer(&self) -> Result<Arc<dyn Producer>, EndpointError> {
        if !self.producers_allowed {
            return Err(EndpointError::NotAProducer);
        }
        if let Some(err) = self.broken() {
            return Err(err);
        }
        let mut producers = self.state.producers.lock().unwrap();
        let producer: Arc<dyn Producer> = producers
            .entry(self.address.clone())
            .or_insert_with(|| {
                Arc::new(TapProducer {
                    address: self.address.clone(),
                    state: self.state.clone(),
                    messages: Mutex::new(Vec::new()),
                })
            })
            .clone();
        Ok(producer)
    }
}

struct TapConsumer {
    address: String,
    state: Arc<TapState>,
    initiators: Mutex<Vec<Initiator>>,
}

impl Service for TapConsumer {
    fn init(&self) -> anyhow::Result<()> {
        self.state.phase("init", &self.address)
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.state.event(format!("stop {}", self.address));
        self.initiators.lock().unwrap().clear();
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        self.state.event(format!("close {}", self.address));
        Ok(())
    }
}

impl Consumer for TapConsumer {
    fn start(&self, initiator: Initiator) -> anyhow::Result<()> {
        self.state.phase("start", &self.address)?;
        self.initiators.lock().unwrap().push(initiator);
        Ok(())
    }
}

struct TapProducer {
    address: String,
    state: Arc<TapState>,
    messages: Mutex<Vec<Message>>,
}

impl Service for TapProducer {
    fn init(&self) -> anyhow::Result<()> {
        self.state.phase("init", &self.address)
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.state.event(format!("stop {}", self.address));
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        self.state.event(format!("close {}", self.address));
        Ok(())
    }
}

impl Processor for TapProducer {
    fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        if self.address.ends_with(":fail") {
            bail!("{} refuses every message", self.address);
        }
        if let Some(message) = exchange.in_message() {
            self.messages.lock().unwrap().push(message.clone());
        }
        Ok(())
    }
}

impl Producer for TapProducer {
    fn start(&self) -> anyhow::Result<()> {
        self.state.phase("start", &self.address)
    }
}
