use thiserror::Error;

/// Errors an `Endpoint` returns when asked for a role it cannot play.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The endpoint cannot create Consumers.
    #[error("this endpoint cannot create consumers")]
    NotAConsumer,

    /// The endpoint cannot create Producers.
    #[error("this endpoint cannot create producers")]
    NotAProducer,

    /// Anything else the endpoint failed on.
    #[error("endpoint error: {0}")]
    Other(#[from] anyhow::Error),
}

impl EndpointError {
    pub fn is_unsupported_role(&self) -> bool {
        matches!(self, EndpointError::NotAConsumer | EndpointError::NotAProducer)
    }
}

/// Which lifecycle call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Start,
    Stop,
    Close,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Start => write!(f, "start"),
            Phase::Stop => write!(f, "stop"),
            Phase::Close => write!(f, "close"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RouteError {
    /// A step failed while processing; the invocation was abandoned.
    #[error("route `{route}` step {step} failed: {source}")]
    Step {
        route: String,
        step: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A consumer or producer failed a lifecycle call.
    #[error("route `{route}` failed to {phase}: {source}")]
    Lifecycle {
        route: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// The route has no initiator because it was never started or was stopped.
    #[error("route `{0}` is not started")]
    NotStarted(String),
}

#[derive(Error, Debug)]
pub enum ContextError {
    /// The component creator failed; nothing was registered.
    #[error("component registration failed: {0}")]
    Registration(#[source] anyhow::Error),

    /// The context was started with `seal_on_start` and can take no more components.
    #[error("registration is closed, cannot register `{0}`")]
    RegistrationClosed(String),

    #[error(transparent)]
    Route(#[from] RouteError),
}
