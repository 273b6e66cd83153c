use crate::application::ApplicationBuilder;
use crate::error::Result;
use crate::exception::ExceptionHandlerMiddleware;
use crate::middleware::MiddlewareRef;
use crate::routing::{ControllerTree, RouteDiscovery};
use std::any::type_name;

/// A unit of bootstrap work.
///
/// All providers are registered before any is booted, so `boot` may rely on
/// services another provider registered.
pub trait ServiceProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Register services, middleware and routes.
    fn register(&self, _app: &mut ApplicationBuilder) -> Result<()> {
        Ok(())
    }

    /// Runs after every provider has registered.
    fn boot(&self, _app: &mut ApplicationBuilder) -> Result<()> {
        Ok(())
    }
}

/// Wires the HTTP stack: the exception middleware and route discovery over
/// a mask tree plus its override trees.
#[derive(Debug, Clone)]
pub struct WebServiceProvider {
    discovery: RouteDiscovery,
}

impl WebServiceProvider {
    pub fn new(mask: ControllerTree) -> Self {
        Self {
            discovery: RouteDiscovery::new(mask),
        }
    }

    pub fn with_override(mut self, tree: ControllerTree) -> Self {
        self.discovery = self.discovery.with_override(tree);
        self
    }

    pub fn discovery(&self) -> &RouteDiscovery {
        &self.discovery
    }
}

impl ServiceProvider for WebServiceProvider {
    fn register(&self, app: &mut ApplicationBuilder) -> Result<()> {
        app.router_mut()
            .add_middleware(MiddlewareRef::of::<ExceptionHandlerMiddleware>());
        Ok(())
    }

    fn boot(&self, app: &mut ApplicationBuilder) -> Result<()> {
        let count = app.router_mut().route_discovery(&self.discovery)?;
        tracing::debug!(count, "Web routes registered");
        Ok(())
    }
}
