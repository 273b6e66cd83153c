//! Middleware pipeline.
//!
//! Each middleware receives the request and a [`Next`] handle. Calling
//! `next.run(request)` hands the request to the rest of the chain; not calling
//! it short-circuits the chain.

use crate::di::{Container, Injectable};
use crate::error::{MantleError, Result};
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

mod dispatcher;

pub use dispatcher::{FinalHandler, MiddlewareDispatcher};

/// A request-handling unit of the pipeline.
///
/// # Example
/// ```
/// use mantle::prelude::*;
///
/// #[derive(Injectable)]
/// struct PoweredBy {}
///
/// #[async_trait]
/// impl Middleware for PoweredBy {
///     async fn process(&self, request: Request<Body>, next: Next) -> mantle::Result<Response> {
///         let mut response = next.run(request).await?;
///         response
///             .headers_mut()
///             .insert("x-powered-by", "mantle".parse().unwrap());
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn process(&self, request: Request<Body>, next: Next) -> Result<Response>;
}

/// The remainder of the chain, handed to each middleware.
pub struct Next {
    dispatcher: MiddlewareDispatcher,
}

impl Next {
    pub(crate) fn new(dispatcher: MiddlewareDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Execute the rest of the chain
    pub async fn run(self, request: Request<Body>) -> Result<Response> {
        self.dispatcher.handle(request).await
    }
}

/// A middleware named at registration time and materialised per request.
#[derive(Clone)]
pub enum MiddlewareRef {
    Instance(Arc<dyn Middleware>),
    Resolve {
        name: &'static str,
        resolve: fn(&Container) -> Result<Arc<dyn Middleware>>,
    },
}

fn autowire_middleware<M: Middleware + Injectable>(container: &Container) -> Result<Arc<dyn Middleware>> {
    container
        .autowire::<M>()
        .map(|middleware| middleware as Arc<dyn Middleware>)
}

impl MiddlewareRef {
    pub fn instance<M: Middleware>(middleware: M) -> Self {
        MiddlewareRef::Instance(Arc::new(middleware))
    }

    /// A middleware constructed through the container on each request.
    pub fn of<M: Middleware + Injectable>() -> Self {
        MiddlewareRef::Resolve {
            name: type_name::<M>(),
            resolve: autowire_middleware::<M>,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MiddlewareRef::Instance(_) => "<instance>",
            MiddlewareRef::Resolve { name, .. } => *name,
        }
    }

    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Middleware>> {
        match self {
            MiddlewareRef::Instance(middleware) => Ok(Arc::clone(middleware)),
            MiddlewareRef::Resolve { name, resolve } => resolve(container).map_err(|err| match err {
                MantleError::DependencyNotFound { .. } | MantleError::NotInstantiable { .. } => {
                    MantleError::InvalidMiddleware {
                        name: format!("{name} ({err})"),
                    }
                }
                other => other,
            }),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MiddlewareRef").field(&self.name()).finish()
    }
}

impl<M: Middleware> From<Arc<M>> for MiddlewareRef {
    fn from(middleware: Arc<M>) -> Self {
        MiddlewareRef::Instance(middleware)
    }
}
