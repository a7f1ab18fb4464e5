use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::{Phase, RouteError},
    exchange::{Exchange, ExchangePattern},
    id::IdGenerator,
    message::Message,
    processor::{Consumer, Service, Step},
};

/// The immutable half of a route, shared with its initiator.
struct RouteCore {
    id: String,
    pattern: ExchangePattern,
    steps: Vec<Step>,
    ids: Arc<dyn IdGenerator>,
}

/// The handle a consumer uses to push messages into its route.
///
/// One initiator is created per started route and cloned into every
/// consumer of that route. Clones share the same route.
#[derive(Clone)]
pub struct Initiator {
    route: Arc<RouteCore>,
}

impl Initiator {
    /// Run `message` through the route's steps on the calling thread.
    ///
    /// The message is staged and rotated in, then every step is processed
    /// followed by a rotation, and a last rotation flushes whatever the
    /// final step staged. A step error abandons this invocation only.
    pub fn exchange(&self, message: Message) -> Result<Exchange, RouteError> {
        let route = &self.route;
        let started = Instant::now();

        let mut exchange = Exchange::new(route.ids.next_id(), route.pattern);
        exchange.set_out(message);
        exchange.rotate();

        for (index, step) in route.steps.iter().enumerate() {
            if let Err(source) = step.process(&mut exchange) {
                warn!(route = %route.id, exchange = %exchange.id(), step = index, "step failed: {source:#}");
                return Err(RouteError::Step {
                    route: route.id.clone(),
                    step: index,
                    source,
                });
            }
            exchange.rotate();
        }
        exchange.rotate();

        tracing::event!(
            target: "exchange",
            tracing::Level::INFO,
            route = %route.id,
            exchange = %exchange.id(),
            pattern = %exchange.pattern(),
            created = %exchange.created().to_rfc3339(),
            steps = route.steps.len(),
            message = %report_body(&exchange),
            elapsed_us = started.elapsed().as_micros() as u64,
            "exchange completed"
        );

        Ok(exchange)
    }

    /// The owning route's pattern. Replies are up to the consumer.
    pub fn pattern(&self) -> ExchangePattern {
        self.route.pattern
    }

    pub fn route_id(&self) -> &str {
        &self.route.id
    }
}

fn report_body(exchange: &Exchange) -> String {
    exchange
        .in_message()
        .and_then(|message| serde_json::to_string(message).ok())
        .unwrap_or_default()
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("route", &self.route.id)
            .field("pattern", &self.route.pattern)
            .finish()
    }
}

/// A built route: its consumers, its steps and, while started, its initiator.
pub struct Route {
    core: Arc<RouteCore>,
    consumers: Vec<Arc<dyn Consumer>>,
    initiator: Option<Initiator>,
}

impl Route {
    pub(crate) fn new(
        id: String,
        pattern: ExchangePattern,
        consumers: Vec<Arc<dyn Consumer>>,
        steps: Vec<Step>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            core: Arc::new(RouteCore { id, pattern, steps, ids }),
            consumers,
            initiator: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.core.pattern
    }

    pub fn consumers(&self) -> &[Arc<dyn Consumer>] {
        &self.consumers
    }

    pub fn steps(&self) -> &[Step] {
        &self.core.steps
    }

    pub fn initiator(&self) -> Option<&Initiator> {
        self.initiator.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.initiator.is_some()
    }

    /// Push a message through this route without going through a consumer.
    pub fn exchange(&self, message: Message) -> Result<Exchange, RouteError> {
        match &self.initiator {
            Some(initiator) => initiator.exchange(message),
            None => Err(RouteError::NotStarted(self.core.id.clone())),
        }
    }

    pub fn init(&self) -> Result<(), RouteError> {
        self.each_service(Phase::Init)
    }

    /// Create the initiator and hand it to every consumer, then start the
    /// producers. The route only counts as started once all of them did.
    pub fn start(&mut self) -> Result<(), RouteError> {
        let initiator = Initiator {
            route: self.core.clone(),
        };

        for consumer in &self.consumers {
            consumer
                .start(initiator.clone())
                .map_err(|source| self.lifecycle_error(Phase::Start, source))?;
        }
        for producer in self.core.steps.iter().filter_map(Step::producer) {
            producer
                .start()
                .map_err(|source| self.lifecycle_error(Phase::Start, source))?;
        }
        self.initiator = Some(initiator);

        info!(
            route = %self.core.id,
            pattern = %self.core.pattern,
            consumers = self.consumers.len(),
            steps = self.core.steps.len(),
            "route started"
        );
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), RouteError> {
        self.initiator = None;
        self.each_service(Phase::Stop)?;
        debug!(route = %self.core.id, "route stopped");
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), RouteError> {
        self.initiator = None;
        self.each_service(Phase::Close)
    }

    fn each_service(&self, phase: Phase) -> Result<(), RouteError> {
        for consumer in &self.consumers {
            call_phase(consumer.as_ref(), phase)
                .map_err(|source| self.lifecycle_error(phase, source))?;
        }
        for producer in self.core.steps.iter().filter_map(Step::producer) {
            call_phase(producer.as_ref(), phase)
                .map_err(|source| self.lifecycle_error(phase, source))?;
        }
        Ok(())
    }

    fn lifecycle_error(&self, phase: Phase, source: anyhow::Error) -> RouteError {
        RouteError::Lifecycle {
            route: self.core.id.clone(),
            phase,
            source,
        }
    }
}

fn call_phase<S: Service + ?Sized>(service: &S, phase: Phase) -> anyhow::Result<()> {
    match phase {
        Phase::Init => service.init(),
        Phase::Stop => service.stop(),
        Phase::Close => service.close(),
        // consumers and producers each have their own start
        Phase::Start => Ok(()),
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.core.id)
            .field("pattern", &self.core.pattern)
            .field("consumers", &self.consumers.len())
            .field("steps", &self.core.steps)
            .field("started", &self.is_started())
            .finish()
    }
}
