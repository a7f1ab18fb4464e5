use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use crate::{
    builder::{Registry, RouteBuilder},
    component::Component,
    config::{ConfigManager, ContextConfig},
    error::ContextError,
    id::IdGenerator,
    route::Route,
};

/// Collects components and routes and drives their lifecycle.
///
/// Register every component before adding the routes that use it: each
/// `add` call builds against the registry as it is at that moment, and
/// later registrations are not seen by those routes.
pub struct Context {
    components: Registry,
    routes: Vec<Route>,
    ids: Arc<dyn IdGenerator>,
    config: ConfigManager,
    settings: ContextConfig,
    started: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_settings(ContextConfig::default(), ConfigManager::default())
    }

    /// Build a context whose settings are read from `config`.
    pub fn from_config(config: ConfigManager) -> Self {
        let settings = ContextConfig::from_manager(&config);
        Self::with_settings(settings, config)
    }

    pub fn with_settings(settings: ContextConfig, config: ConfigManager) -> Self {
        Self {
            components: Arc::new(HashMap::new()),
            routes: Vec::new(),
            ids: settings.id_generator(),
            config,
            settings,
            started: false,
        }
    }

    /// Replace the id service. Routes already built keep the one they got.
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn settings(&self) -> &ContextConfig {
        &self.settings
    }

    pub fn ids(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    /// Create a component and store it under its own prefix.
    ///
    /// The first component registered under a prefix wins; a later one is
    /// dropped from the registry but still handed back to the caller.
    pub fn register<C, F>(&mut self, creator: F) -> Result<Arc<C>, ContextError>
    where
        C: Component + 'static,
        F: FnOnce(&Context) -> anyhow::Result<C>,
    {
        let component = Arc::new(creator(self).map_err(ContextError::Registration)?);
        let prefix = component.prefix();
        self.store(prefix, component.clone())?;
        Ok(component)
    }

    /// Like [`Context::register`] but under an explicit prefix.
    pub fn register_with_prefix<C, F>(&mut self, prefix: &str, creator: F) -> Result<Arc<C>, ContextError>
    where
        C: Component + 'static,
        F: FnOnce(&Context) -> anyhow::Result<C>,
    {
        let component = Arc::new(creator(self).map_err(ContextError::Registration)?);
        self.store(prefix.to_string(), component.clone())?;
        Ok(component)
    }

    fn store(&mut self, prefix: String, component: Arc<dyn Component>) -> Result<(), ContextError> {
        if self.started && self.settings.seal_on_start {
            return Err(ContextError::RegistrationClosed(prefix));
        }
        if self.components.contains_key(&prefix) {
            debug!(prefix = %prefix, "component already registered, keeping the first");
            return Ok(());
        }
        // routes built earlier keep their own snapshot
        Arc::make_mut(&mut self.components).insert(prefix.clone(), component);
        info!(prefix = %prefix, "component registered");
        Ok(())
    }

    pub fn component(&self, prefix: &str) -> Option<Arc<dyn Component>> {
        self.components.get(prefix).cloned()
    }

    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.components.keys().cloned().collect();
        prefixes.sort();
        prefixes
    }

    /// Run `creator` against a fresh builder and keep every route it describes.
    pub fn add<F>(&mut self, creator: F)
    where
        F: FnOnce(&mut RouteBuilder),
    {
        let mut builder = RouteBuilder::new(self.components.clone());
        creator(&mut builder);
        let routes = builder.build(&self.ids);
        debug!(routes = routes.len(), "routes added");
        self.routes.extend(routes);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.id() == id)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn init(&self) -> Result<(), ContextError> {
        for route in &self.routes {
            route.init()?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ContextError> {
        for route in &mut self.routes {
            route.start()?;
        }
        self.started = true;
        info!(routes = self.routes.len(), "context started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ContextError> {
        for route in &mut self.routes {
            route.stop()?;
        }
        info!(routes = self.routes.len(), "context stopped");
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ContextError> {
        for route in &mut self.routes {
            route.close()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("prefixes", &self.prefixes())
            .field("routes", &self.routes)
            .field("ids", &self.ids)
            .field("config", &self.config)
            .field("started", &self.started)
            .finish()
    }
}
