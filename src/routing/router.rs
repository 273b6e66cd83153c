use crate::di::Container;
use crate::error::{MantleError, Result};
use crate::events::{DISPATCH_BEGIN, DISPATCH_SERVED, EventDispatcher, ROUTE_ADDED};
use crate::exception::HttpException;
use crate::http::HttpMethod;
use crate::middleware::{FinalHandler, MiddlewareDispatcher, MiddlewareRef};
use crate::request::ServerRequest;
use crate::routing::{
    Action, CompiledRoute, Invocation, Resolution, RouteDiscovery, RoutePattern, RouteTable,
};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Collects routes and global middleware during bootstrap.
pub struct RouterBuilder {
    events: Arc<EventDispatcher>,
    middleware: Vec<MiddlewareRef>,
    table: RouteTable,
}

impl RouterBuilder {
    pub fn new(events: Arc<EventDispatcher>) -> Self {
        Self {
            events,
            middleware: Vec::new(),
            table: RouteTable::new(),
        }
    }

    /// Append a global middleware; the first added runs outermost.
    pub fn add_middleware(&mut self, middleware: MiddlewareRef) -> &mut Self {
        tracing::debug!(middleware = middleware.name(), "Global middleware added");
        self.middleware.push(middleware);
        self
    }

    /// Register a route. Duplicates are accepted; the first registered wins.
    pub fn add_route(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        action: Action,
        middleware: Vec<MiddlewareRef>,
    ) -> Result<&mut Self> {
        if !pattern.starts_with('/') {
            return Err(MantleError::InvalidAction {
                method: method.to_string(),
                pattern: pattern.to_string(),
                reason: "route paths must start with '/'".to_string(),
            });
        }
        let compiled = RoutePattern::compile(pattern)?;

        tracing::debug!(%method, pattern, action = %action.describe(), "Route added");
        self.table.push(CompiledRoute {
            method,
            pattern: compiled,
            action,
            middleware,
        });
        self.events
            .dispatch(ROUTE_ADDED, vec![json!(method.to_string()), json!(pattern)]);
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Get, pattern, action, Vec::new())
    }

    pub fn post(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Post, pattern, action, Vec::new())
    }

    pub fn put(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Put, pattern, action, Vec::new())
    }

    pub fn patch(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Patch, pattern, action, Vec::new())
    }

    pub fn delete(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Delete, pattern, action, Vec::new())
    }

    pub fn options(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Options, pattern, action, Vec::new())
    }

    pub fn head(&mut self, pattern: &str, action: Action) -> Result<&mut Self> {
        self.add_route(HttpMethod::Head, pattern, action, Vec::new())
    }

    /// Register every route `discovery` yields, returning how many were added.
    pub fn route_discovery(&mut self, discovery: &RouteDiscovery) -> Result<usize> {
        let mut count = 0;
        for route in discovery.discover() {
            tracing::debug!(class = %route.class, path = route.path, "Discovered route");
            self.add_route(route.method, route.path, route.action, route.middleware)?;
            count += 1;
        }
        tracing::info!(count, namespace = discovery.root().namespace(), "Route discovery finished");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn build(self, container: Arc<Container>) -> Router {
        Router {
            container,
            events: self.events,
            middleware: self.middleware,
            table: self.table,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// The immutable route table and global middleware, shared by all requests.
pub struct Router {
    container: Arc<Container>,
    events: Arc<EventDispatcher>,
    middleware: Vec<MiddlewareRef>,
    table: RouteTable,
    max_body_bytes: usize,
}

impl Router {
    pub fn builder(events: Arc<EventDispatcher>) -> RouterBuilder {
        RouterBuilder::new(events)
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        self.table.routes()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Dispatch one request through the global middleware, the matched
    /// route's middleware and its action.
    ///
    /// Unmatched paths reach the pipeline as `NotFound` or
    /// `MethodNotAllowed`, so middleware still sees them.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let span = tracing::info_span!("dispatch", %method, %path);

        async move {
            self.events
                .dispatch(DISPATCH_BEGIN, vec![json!(method.as_str()), json!(path)]);

            let no_middleware: &[MiddlewareRef] = &[];
            let (route_middleware, final_handler) = match self.table.resolve(&method, &path) {
                Resolution::Matched { route, params } => {
                    tracing::debug!(action = %route.action.describe(), "Route matched");
                    let action = route.action.clone();
                    let container = Arc::clone(&self.container);
                    let limit = self.max_body_bytes;
                    let final_handler = FinalHandler::new(move |request| {
                        Box::pin(async move {
                            let request = ServerRequest::from_request(request, params, limit).await?;
                            action.invoke(container, Invocation::new(request)).await
                        })
                    });
                    (route.middleware.as_slice(), final_handler)
                }
                Resolution::MethodNotAllowed { allowed } => (
                    no_middleware,
                    FinalHandler::failing(HttpException::MethodNotAllowed { allowed }),
                ),
                Resolution::NotFound => (no_middleware, FinalHandler::failing(HttpException::NotFound)),
            };

            let dispatcher = MiddlewareDispatcher::from_refs(
                self.middleware.iter().chain(route_middleware),
                &self.container,
                final_handler,
            )?;
            let response = dispatcher.handle(request).await?;

            tracing::debug!(status = response.status().as_u16(), "Request served");
            self.events.dispatch(
                DISPATCH_SERVED,
                vec![
                    json!(method.as_str()),
                    json!(path),
                    json!(response.status().as_u16()),
                ],
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Like [`Router::handle`], rendering escaped errors as responses.
    pub async fn respond(&self, request: Request<Body>) -> Response {
        match self.handle(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "Request failed");
                err.into_response()
            }
        }
    }

    /// Serve this router as an axum fallback, so every request reaches it.
    pub fn into_axum(self: Arc<Self>) -> axum::Router {
        axum::Router::new().fallback(move |request: Request<Body>| {
            let router = Arc::clone(&self);
            async move { router.respond(request).await }
        })
    }
}
