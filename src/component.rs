use std::collections::HashMap;

use crate::endpoint::Endpoint;

/// A provider of Endpoints. The context registers it under the value of
/// [`Component::prefix`] (unless an explicit prefix is given), which is how
/// `from`/`to` find it while a route is being built.
pub trait Component: Send + Sync {
    /// The address prefix used to look this component up.
    fn prefix(&self) -> String;

    /// Create the endpoint for a full address string such as
    /// `direct:route1`. Called once per address the builder resolves, so it
    /// should stay cheap.
    fn create_endpoint(&self, address: &str, options: &HashMap<String, String>) -> Box<dyn Endpoint>;
}
