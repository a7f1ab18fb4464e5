//! Synchronous hand-off between routes in the same context.
//!
//! A route that sends `to("direct:x")` runs, on the same thread, the route
//! that consumes `from("direct:x")`. The nested route sees the sender's
//! current message; whatever it ends with is not passed back.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use dashmap::DashMap;
use routekit::{
    Component, Consumer, Context, Endpoint, EndpointError, Exchange, Initiator, Processor,
    Producer, Service,
};
use tracing::{debug, warn};

pub const PREFIX: &str = "direct";

pub fn component_creator(_context: &Context) -> anyhow::Result<DirectComponent> {
    Ok(DirectComponent::default())
}

/// Links named producers to the consumer started under the same name.
#[derive(Clone, Default)]
pub struct DirectComponent {
    directs: Arc<DashMap<String, Initiator>>,
}

impl DirectComponent {
    /// Names that currently have a started consumer, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.directs.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

impl Component for DirectComponent {
    fn prefix(&self) -> String {
        PREFIX.to_string()
    }

    fn create_endpoint(&self, address: &str, _options: &HashMap<String, String>) -> Box<dyn Endpoint> {
        Box::new(DirectEndpoint {
            name: address.to_string(),
            directs: self.directs.clone(),
        })
    }
}

impl std::fmt::Debug for DirectComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectComponent")
            .field("names", &self.names())
            .finish()
    }
}

struct DirectEndpoint {
    name: String,
    directs: Arc<DashMap<String, Initiator>>,
}

impl Endpoint for DirectEndpoint {
    fn create_consumer(&self) -> Result<Arc<dyn Consumer>, EndpointError> {
        Ok(Arc::new(DirectConsumer {
            name: self.name.clone(),
            directs: self.directs.clone(),
        }))
    }

    fn create_producer(&self) -> Result<Arc<dyn Producer>, EndpointError> {
        Ok(Arc::new(DirectProducer {
            name: self.name.clone(),
            directs: self.directs.clone(),
        }))
    }
}

struct DirectConsumer {
    name: String,
    directs: Arc<DashMap<String, Initiator>>,
}

impl Service for DirectConsumer {
    fn stop(&self) -> anyhow::Result<()> {
        self.directs.remove(&self.name);
        debug!(name = %self.name, "direct consumer stopped");
        Ok(())
    }
}

impl Consumer for DirectConsumer {
    /// Several routes consuming the same name: the last one started wins.
    fn start(&self, initiator: Initiator) -> anyhow::Result<()> {
        if let Some(previous) = self.directs.insert(self.name.clone(), initiator) {
            warn!(
                name = %self.name,
                replaced = previous.route_id(),
                "direct name was already consumed, replacing"
            );
        }
        Ok(())
    }
}

struct DirectProducer {
    name: String,
    directs: Arc<DashMap<String, Initiator>>,
}

impl Service for DirectProducer {}

impl Processor for DirectProducer {
    fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        // clone out of the map so the nested route can reach it again
        let initiator = self.directs.get(&self.name).map(|entry| entry.value().clone());
        let Some(initiator) = initiator else {
            bail!("no consumer registered for direct endpoint {}", self.name);
        };
        let message = exchange.in_message().cloned().unwrap_or_default();
        initiator.exchange(message)?;
        Ok(())
    }
}

impl Producer for DirectProducer {}
