use std::fmt;
use std::sync::Arc;

use crate::{exchange::Exchange, route::Initiator};

/// Lifecycle hooks shared by consumers and producers. All default to no-ops.
pub trait Service: Send + Sync {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A step in a route. It reads `exchange.in_message()` and may stage a new
/// message with `exchange.set_out(..)` for the steps after it.
pub trait Processor: Send + Sync {
    fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()>;
}

/// The inbound side of an endpoint. On start it receives the route's
/// initiator and calls `initiator.exchange(..)` whenever its own trigger fires.
pub trait Consumer: Service {
    fn start(&self, initiator: Initiator) -> anyhow::Result<()>;
}

/// The outbound side of an endpoint: a processor with a lifecycle.
pub trait Producer: Processor + Service {
    fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Wraps a closure as a processor.
pub struct FnProcessor<F> {
    function: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut Exchange) + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut Exchange) + Send + Sync,
{
    fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        (self.function)(exchange);
        Ok(())
    }
}

/// One entry of a route's step list. Only sinks take part in the lifecycle.
#[derive(Clone)]
pub enum Step {
    Transform(Arc<dyn Processor>),
    Sink(Arc<dyn Producer>),
}

impl Step {
    pub fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        match self {
            Step::Transform(processor) => processor.process(exchange),
            Step::Sink(producer) => producer.process(exchange),
        }
    }

    pub fn producer(&self) -> Option<&Arc<dyn Producer>> {
        match self {
            Step::Transform(_) => None,
            Step::Sink(producer) => Some(producer),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Transform(_) => f.write_str("Step::Transform"),
            Step::Sink(_) => f.write_str("Step::Sink"),
        }
    }
}
