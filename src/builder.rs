use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, warn};

use crate::{
    component::Component,
    endpoint::{parse, prefix_of, Endpoint},
    error::EndpointError,
    exchange::{Exchange, ExchangePattern},
    id::IdGenerator,
    processor::{Consumer, FnProcessor, Processor, Step},
    route::Route,
};

/// The component registry as seen by one `Context::add` call.
pub(crate) type Registry = Arc<HashMap<String, Arc<dyn Component>>>;

/// Handed to the closure given to `Context::add`. Every `from*` call on the
/// builder starts a new route; the calls chained on the returned
/// configuration all describe that same route.
///
/// ```ignore
/// context.add(|builder| {
///     builder.from("direct:orders").to("direct:audit").to("mock:out");
///     builder
///         .from("direct:left")
///         .from("direct:right")
///         .process_fn(|exchange| tracing::info!("exchange {}", exchange.id()))
///         .to_f(format_args!("direct:sink{}", 3));
/// });
/// ```
pub struct RouteBuilder {
    components: Registry,
    configurations: Vec<RouteConfiguration>,
}

impl RouteBuilder {
    pub(crate) fn new(components: Registry) -> Self {
        Self {
            components,
            configurations: Vec::new(),
        }
    }

    fn next_configuration(&mut self) -> &mut RouteConfiguration {
        self.configurations
            .push(RouteConfiguration::new(self.components.clone()));
        let last = self.configurations.len() - 1;
        &mut self.configurations[last]
    }

    /// Start a route from an address such as `direct:route1`.
    pub fn from(&mut self, address: &str) -> &mut RouteConfiguration {
        self.next_configuration().from(address)
    }

    pub fn from_f(&mut self, address: fmt::Arguments<'_>) -> &mut RouteConfiguration {
        self.from(&address.to_string())
    }

    /// Start a route from an endpoint that was created outside the registry.
    pub fn from_endpoint(&mut self, endpoint: &dyn Endpoint) -> &mut RouteConfiguration {
        self.next_configuration().from_endpoint(endpoint)
    }

    pub(crate) fn build(self, ids: &Arc<dyn IdGenerator>) -> Vec<Route> {
        self.configurations
            .into_iter()
            .map(|configuration| configuration.build(ids.clone()))
            .collect()
    }
}

/// A route in the making.
///
/// An address whose prefix has no registered component contributes nothing:
/// the call is skipped and the chain carries on. The same goes for an
/// endpoint that cannot play the requested role.
pub struct RouteConfiguration {
    components: Registry,
    pattern: Option<ExchangePattern>,
    consumers: Vec<Arc<dyn Consumer>>,
    steps: Vec<Step>,
}

impl RouteConfiguration {
    fn new(components: Registry) -> Self {
        Self {
            components,
            pattern: None,
            consumers: Vec::new(),
            steps: Vec::new(),
        }
    }

    fn resolve(&self, address: &str) -> Option<Box<dyn Endpoint>> {
        let Some(prefix) = prefix_of(address) else {
            debug!(address, "address has no prefix, skipping");
            return None;
        };
        match self.components.get(prefix) {
            Some(component) => {
                let parsed = parse(address);
                Some(component.create_endpoint(address, &parsed.option_map))
            }
            None => {
                debug!(address, prefix, "no component registered for prefix, skipping");
                None
            }
        }
    }

    /// Add another consumer to this route (fan-in).
    pub fn from(&mut self, address: &str) -> &mut Self {
        if let Some(endpoint) = self.resolve(address) {
            self.from_endpoint(endpoint.as_ref());
        }
        self
    }

    pub fn from_f(&mut self, address: fmt::Arguments<'_>) -> &mut Self {
        self.from(&address.to_string())
    }

    pub fn from_endpoint(&mut self, endpoint: &dyn Endpoint) -> &mut Self {
        match endpoint.create_consumer() {
            Ok(consumer) => self.consumers.push(consumer),
            Err(err) => skipped("consumer", &err),
        }
        self
    }

    /// Append the producer of `address` as the next step.
    pub fn to(&mut self, address: &str) -> &mut Self {
        if let Some(endpoint) = self.resolve(address) {
            self.to_endpoint(endpoint.as_ref());
        }
        self
    }

    pub fn to_f(&mut self, address: fmt::Arguments<'_>) -> &mut Self {
        self.to(&address.to_string())
    }

    pub fn to_endpoint(&mut self, endpoint: &dyn Endpoint) -> &mut Self {
        match endpoint.create_producer() {
            Ok(producer) => self.steps.push(Step::Sink(producer)),
            Err(err) => skipped("producer", &err),
        }
        self
    }

    pub fn process<P: Processor + 'static>(&mut self, processor: P) -> &mut Self {
        self.steps.push(Step::Transform(Arc::new(processor)));
        self
    }

    pub fn process_fn<F>(&mut self, function: F) -> &mut Self
    where
        F: Fn(&mut Exchange) + Send + Sync + 'static,
    {
        self.process(FnProcessor::new(function))
    }

    /// Only the first pattern call on a configuration counts.
    pub fn request_reply(&mut self) -> &mut Self {
        self.pattern.get_or_insert(ExchangePattern::RequestReply);
        self
    }

    pub fn request_only(&mut self) -> &mut Self {
        self.pattern.get_or_insert(ExchangePattern::RequestOnly);
        self
    }

    fn build(self, ids: Arc<dyn IdGenerator>) -> Route {
        let id = ids.next_id();
        debug!(
            route = %id,
            consumers = self.consumers.len(),
            steps = self.steps.len(),
            "route built"
        );
        Route::new(
            id,
            self.pattern.unwrap_or_default(),
            self.consumers,
            self.steps,
            ids,
        )
    }
}

fn skipped(role: &str, err: &EndpointError) {
    if err.is_unsupported_role() {
        debug!("skipping {role}: {err}");
    } else {
        warn!("skipping {role}, endpoint failed: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequenceGenerator;
    use crate::message::Message;
    use crate::test_support::TapComponent;

    fn registry_with(component: TapComponent) -> Registry {
        let mut map: HashMap<String, Arc<dyn Component>> = HashMap::new();
        map.insert(component.prefix(), Arc::new(component));
        Arc::new(map)
    }

    fn build(builder: RouteBuilder) -> Vec<Route> {
        let ids: Arc<dyn IdGenerator> = Arc::new(SequenceGenerator::new("test"));
        builder.build(&ids)
    }

    #[test]
    fn test_each_from_on_builder_starts_a_route() {
        let mut builder = RouteBuilder::new(registry_with(TapComponent::new("tap")));
        builder.from("tap:a").to("tap:b");
        builder.from("tap:c").to("tap:d").to("tap:e");

        let routes = build(builder);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].steps().len(), 1);
        assert_eq!(routes[1].steps().len(), 2);
        assert_ne!(routes[0].id(), routes[1].id());
    }

    #[test]
    fn test_from_on_configuration_fans_in() {
        let mut builder = RouteBuilder::new(registry_with(TapComponent::new("tap")));
        builder.from("tap:a").from("tap:b").to("tap:c");

        let routes = build(builder);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].consumers().len(), 2);
    }

    #[test]
    fn test_unknown_prefix_is_skipped() {
        let mut builder = RouteBuilder::new(registry_with(TapComponent::new("tap")));
        builder
            .from("nowhere:a")
            .from("tap:a")
            .to("nowhere:b")
            .to("no-colon")
            .to("tap:b");

        let routes = build(builder);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].consumers().len(), 1);
        assert_eq!(routes[0].steps().len(), 1);
    }

    #[test]
    fn test_route_with_nothing_resolved_still_builds() {
        let mut builder = RouteBuilder::new(Arc::new(HashMap::new()));
        builder.from("nowhere:a").to("nowhere:b");

        let routes = build(builder);
        assert_eq!(routes.len(), 1);
        assert!(routes[0].consumers().is_empty());
        assert!(routes[0].steps().is_empty());
    }

    #[test]
    fn test_unsupported_role_is_skipped() {
        let tap = TapComponent::new("tap").without_consumers();
        let mut builder = RouteBuilder::new(registry_with(tap));
        builder.from("tap:a").to("tap:b");

        let routes = build(builder);
        assert!(routes[0].consumers().is_empty());
        assert_eq!(routes[0].steps().len(), 1);
    }

    #[test]
    fn test_pattern_first_call_wins() {
        let mut builder = RouteBuilder::new(registry_with(TapComponent::new("tap")));
        builder.from("tap:a").request_reply().request_only();
        builder.from("tap:b").request_only().request_reply();
        builder.from("tap:c");

        let routes = build(builder);
        assert_eq!(routes[0].pattern(), ExchangePattern::RequestReply);
        assert_eq!(routes[1].pattern(), ExchangePattern::RequestOnly);
        assert_eq!(routes[2].pattern(), ExchangePattern::RequestOnly);
    }

    #[test]
    fn test_formatted_addresses_resolve() {
        let tap = TapComponent::new("tap");
        let seen = tap.addresses();
        let mut builder = RouteBuilder::new(registry_with(tap));
        builder
            .from_f(format_args!("tap:route{}", 3))
            .to_f(format_args!("tap:{}", "12"));

        build(builder);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["tap:route3".to_string(), "tap:12".to_string()]
        );
    }

    #[test]
    fn test_process_steps_are_transforms() {
        let mut builder = RouteBuilder::new(Arc::new(HashMap::new()));
        builder
            .from("nowhere:a")
            .process_fn(|exchange| exchange.set_property("seen", true));

        let routes = build(builder);
        assert!(matches!(routes[0].steps()[0], Step::Transform(_)));
    }

    struct Shout;

    impl Processor for Shout {
        fn process(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
            let text = match exchange.in_message() {
                Some(message) => message.text_body().to_uppercase(),
                None => anyhow::bail!("nothing to shout"),
            };
            exchange.set_out(Message::text(text));
            Ok(())
        }
    }

    #[test]
    fn test_endpoints_created_outside_the_registry() {
        let tap = TapComponent::new("tap");
        let source = tap.create_endpoint("tap:manual", &HashMap::new());
        let extra = tap.create_endpoint("tap:extra", &HashMap::new());
        let sink = tap.create_endpoint("tap:out", &HashMap::new());

        let mut builder = RouteBuilder::new(Arc::new(HashMap::new()));
        builder
            .from_endpoint(source.as_ref())
            .from_endpoint(extra.as_ref())
            .process(Shout)
            .to_endpoint(sink.as_ref());

        let mut routes = build(builder);
        assert_eq!(routes[0].consumers().len(), 2);
        assert_eq!(routes[0].steps().len(), 2);

        routes[0].start().unwrap();
        tap.trigger("tap:manual", Message::text("hello")).remove(0).unwrap();
        tap.trigger("tap:extra", Message::text("again")).remove(0).unwrap();
        assert_eq!(
            tap.received("tap:out"),
            vec![Message::text("HELLO"), Message::text("AGAIN")]
        );
    }

    #[test]
    fn test_processor_error_fails_the_step() {
        let tap = TapComponent::new("tap");
        let source = tap.create_endpoint("tap:manual", &HashMap::new());

        let mut builder = RouteBuilder::new(Arc::new(HashMap::new()));
        builder.from_endpoint(source.as_ref()).process(Shout);
        let mut routes = build(builder);
        routes[0].start().unwrap();

        let mut exchange = Exchange::new("empty", ExchangePattern::RequestOnly);
        let step = &routes[0].steps()[0];
        assert!(step.process(&mut exchange).is_err());
        assert!(step.producer().is_none());
    }

    #[test]
    fn test_producer_role_missing_is_skipped() {
        let tap = TapComponent::new("tap").without_producers();
        let mut builder = RouteBuilder::new(registry_with(tap));
        builder.from("tap:a").to("tap:b").to("tap:c");

        let routes = build(builder);
        assert_eq!(routes[0].consumers().len(), 1);
        assert!(routes[0].steps().is_empty());
    }

    #[test]
    fn test_failing_endpoint_is_skipped() {
        let mut builder = RouteBuilder::new(registry_with(TapComponent::new("tap")));
        builder
            .from("tap:in:broken")
            .from("tap:in")
            .to("tap:out:broken")
            .to("tap:out");

        let routes = build(builder);
        assert_eq!(routes[0].consumers().len(), 1);
        assert_eq!(routes[0].steps().len(), 1);
    }

    #[test]
    fn test_unsupported_role_errors() {
        assert!(EndpointError::NotAConsumer.is_unsupported_role());
        assert!(EndpointError::NotAProducer.is_unsupported_role());
        assert!(!EndpointError::Other(anyhow::anyhow!("boom")).is_unsupported_role());
    }
}
