//! Composition root.
//!
//! [`ApplicationBuilder`] owns the mutable bootstrap state: the container, the
//! router under construction and the shared services. Providers register into
//! it, then boot; `build` freezes everything into an [`Application`] whose
//! parts are shared read-only across requests.

use crate::config::AppConfig;
use crate::di::Container;
use crate::error::Result;
use crate::events::{
    EventDispatcher, MANTLE_BOOTED, MANTLE_INITIALIZED, PLUGINS_BOOTED, PLUGINS_INITIALIZED,
};
use crate::logging::Logger;
use crate::routing::{Router, RouterBuilder};
use axum::{body::Body, http::Request, response::Response};
use std::sync::Arc;

mod provider;
mod shutdown;

pub use provider::{ServiceProvider, WebServiceProvider};
pub use shutdown::shutdown_signal;

pub struct ApplicationBuilder {
    config: AppConfig,
    container: Container,
    router: RouterBuilder,
    events: Arc<EventDispatcher>,
    logger: Arc<Logger>,
    providers: Vec<Box<dyn ServiceProvider>>,
}

impl ApplicationBuilder {
    /// Start a builder with the shared services already in the container.
    pub fn new(config: AppConfig) -> Result<Self> {
        let events = Arc::new(EventDispatcher::new());
        let logger = Arc::new(Logger::from_config(&config)?);

        let mut container = Container::new();
        container
            .register(config.clone())
            .register_arc(Arc::clone(&events))
            .register_arc(Arc::clone(&logger));

        Ok(Self {
            router: RouterBuilder::new(Arc::clone(&events)),
            config,
            container,
            events,
            logger,
            providers: Vec::new(),
        })
    }

    pub fn provider<P: ServiceProvider>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn router_mut(&mut self) -> &mut RouterBuilder {
        &mut self.router
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Register then boot every provider, and freeze the result.
    pub fn build(mut self) -> Result<Application> {
        let providers = std::mem::take(&mut self.providers);

        for provider in &providers {
            tracing::debug!(provider = provider.name(), "Registering provider");
            provider.register(&mut self)?;
        }
        self.events.dispatch(MANTLE_INITIALIZED, Vec::new());
        self.events.dispatch(PLUGINS_INITIALIZED, Vec::new());

        for provider in &providers {
            tracing::debug!(provider = provider.name(), "Booting provider");
            provider.boot(&mut self)?;
        }
        self.events.dispatch(PLUGINS_BOOTED, Vec::new());

        let container = Arc::new(self.container);
        let router = Arc::new(
            self.router
                .build(Arc::clone(&container))
                .with_max_body_bytes(self.config.max_body_bytes),
        );
        tracing::info!(
            routes = router.routes().len(),
            services = container.len(),
            "Application booted"
        );
        self.events.dispatch(MANTLE_BOOTED, Vec::new());

        Ok(Application {
            config: self.config,
            container,
            router,
            events: self.events,
            logger: self.logger,
        })
    }
}

/// A booted application.
pub struct Application {
    config: AppConfig,
    container: Arc<Container>,
    router: Arc<Router>,
    events: Arc<EventDispatcher>,
    logger: Arc<Logger>,
}

impl Application {
    pub fn builder(config: AppConfig) -> Result<ApplicationBuilder> {
        ApplicationBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Dispatch a single request without a server.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response> {
        self.router.handle(request).await
    }

    pub fn into_axum(&self) -> axum::Router {
        Arc::clone(&self.router).into_axum()
    }

    /// Bind the configured address and serve until a shutdown signal.
    pub async fn serve(self) -> Result<()> {
        let address = self.config.address();
        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!(%address, "Listening");

        axum::serve(listener, self.into_axum())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Action;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    struct Hello;

    impl ServiceProvider for Hello {
        fn register(&self, app: &mut ApplicationBuilder) -> Result<()> {
            app.container_mut().register(String::from("hello"));
            Ok(())
        }

        fn boot(&self, app: &mut ApplicationBuilder) -> Result<()> {
            let greeting = app.container().make::<String>()?;
            app.router_mut().get(
                "/",
                Action::closure("hello", move |_request| {
                    let greeting = String::clone(&greeting);
                    async move { greeting }
                }),
            )?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_providers_register_then_boot() {
        let app = Application::builder(AppConfig::default())
            .unwrap()
            .provider(Hello)
            .build()
            .unwrap();

        let response = app
            .handle(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.container().make::<EventDispatcher>().is_ok());
        assert!(app.container().make::<Logger>().is_ok());
        assert_eq!(app.container().make::<AppConfig>().unwrap().port, 3000);
    }

    #[test]
    fn test_lifecycle_events_in_order() {
        let builder = Application::builder(AppConfig::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event in [MANTLE_INITIALIZED, PLUGINS_INITIALIZED, PLUGINS_BOOTED, MANTLE_BOOTED] {
            let seen = seen.clone();
            builder
                .events()
                .listen(event, move |_| seen.lock().unwrap().push(event));
        }

        builder.build().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![MANTLE_INITIALIZED, PLUGINS_INITIALIZED, PLUGINS_BOOTED, MANTLE_BOOTED]
        );
    }
}
