//! # Mantle
//!
//! A small HTTP micro-framework: declarative route discovery, a middleware
//! pipeline and a dependency injection container, served through axum.
//!
//! ## Features
//!
//! - **Route discovery**: controllers declare routes with attributes; a base
//!   ("mask") tree can be transparently overridden by an application tree
//! - **Regex router**: `{name}` placeholders, first registered match wins,
//!   `404`/`405` with an `Allow` header
//! - **Middleware pipeline**: chain of responsibility ending in a final handler
//!   that serializes controller return values as JSON
//! - **Dependency injection**: registry-based container with bindings,
//!   factories, call-time parameter resolution and cycle detection
//! - **Multi-channel logging** on top of `tracing`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mantle::prelude::*;
//!
//! #[controller]
//! pub struct HomeController {}
//!
//! #[routes]
//! impl HomeController {
//!     #[uget("/")]
//!     #[uget("/item/{id}")]
//!     async fn index(&self, #[default(1)] id: i64) -> String {
//!         format!("item {id}")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> mantle::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let mask = ControllerTree::new("Mask\\Http", module_path!()).controller::<HomeController>();
//!
//!     Application::builder(config)?
//!         .provider(WebServiceProvider::new(mask))
//!         .build()?
//!         .serve()
//!         .await
//! }
//! ```

extern crate self as mantle;

pub mod application;
pub mod config;
pub mod di;
pub mod error;
pub mod events;
pub mod exception;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod routing;

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future, the currency of controller invokers and
/// middleware.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export core types
pub use application::{Application, ApplicationBuilder, ServiceProvider, WebServiceProvider};
pub use config::{AppConfig, ConfigService, UnhandledErrors};
pub use di::{Container, ContainerBuilder, Injectable};
pub use error::{MantleError, Result};
pub use events::EventDispatcher;
pub use exception::HttpException;
pub use http::{HttpMethod, HttpStatus};
pub use request::ServerRequest;
pub use routing::{Router, RouterBuilder};

// Re-export macros
pub use mantle_macro::{Injectable as DeriveInjectable, controller, routes};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use mantle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::application::{
        Application, ApplicationBuilder, ServiceProvider, WebServiceProvider, shutdown_signal,
    };
    pub use crate::config::{AppConfig, ConfigService, UnhandledErrors};
    pub use crate::di::{CallArgs, Container, ContainerBuilder, Injectable, Param, Parameters};
    pub use crate::error::{MantleError, Result};
    pub use crate::events::EventDispatcher;
    pub use crate::exception::{ExceptionHandlerMiddleware, HttpException};
    pub use crate::http::{HttpMethod, HttpStatus};
    pub use crate::logging::{Level, Logger};
    pub use crate::middleware::{Middleware, MiddlewareRef, Next};
    pub use crate::request::ServerRequest;
    pub use crate::routing::{
        Action, Controller, ControllerTree, IntoReply, Invokable, Json, Reply, RouteDiscovery,
        Router, RouterBuilder,
    };
    pub use crate::{DeriveInjectable as Injectable, controller, routes};
    pub use async_trait::async_trait;
    pub use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
