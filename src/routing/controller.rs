use crate::BoxFuture;
use crate::di::{Container, Injectable, Parameters};
use crate::error::Result;
use crate::request::ServerRequest;
use crate::routing::{IntoReply, Reply, RouteAttribute, RouteParams};
use async_trait::async_trait;
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased entry point of a route action.
pub type Invoker =
    Arc<dyn Fn(Arc<Container>, Invocation) -> BoxFuture<'static, Result<Reply>> + Send + Sync>;

/// Per-request input of an action.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request: ServerRequest,
}

impl Invocation {
    pub fn new(request: ServerRequest) -> Self {
        Self { request }
    }

    pub fn params(&self) -> &RouteParams {
        self.request.params()
    }

    /// Path parameters as named call arguments.
    pub fn parameters(&self) -> Parameters {
        Parameters::from(self.request.params())
    }
}

/// A routed method of a controller, as generated by `#[routes]`.
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub routes: Vec<RouteAttribute>,
    pub invoker: Invoker,
}

impl MethodDescriptor {
    pub fn new<F>(name: &'static str, routes: Vec<RouteAttribute>, invoker: F) -> Self
    where
        F: Fn(Arc<Container>, Invocation) -> BoxFuture<'static, Result<Reply>> + Send + Sync + 'static,
    {
        Self {
            name,
            routes,
            invoker: Arc::new(invoker),
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// A type whose methods declare routes.
///
/// Implemented by `#[routes]`; `type_path` is the fully qualified Rust path
/// used to derive the controller's class identity during discovery.
pub trait Controller: Injectable {
    fn type_path() -> &'static str {
        type_name::<Self>()
    }

    fn methods() -> Vec<MethodDescriptor>;
}

/// The routed surface of one controller type.
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    pub type_path: &'static str,
    pub methods: Vec<MethodDescriptor>,
}

impl ControllerDescriptor {
    pub fn of<C: Controller>() -> Self {
        Self {
            type_path: C::type_path(),
            methods: C::methods(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }
}

/// A single-action controller, called with the path parameters by position.
#[async_trait]
pub trait Invokable: Injectable {
    type Output: IntoReply + Send;

    async fn invoke(&self, args: Vec<String>) -> Self::Output;
}

/// What a route runs once matched.
#[derive(Clone)]
pub enum Action {
    /// A single callable target.
    Invokable {
        controller: &'static str,
        invoker: Invoker,
    },
    /// A method of a container-resolved controller.
    Method {
        controller: &'static str,
        method: &'static str,
        invoker: Invoker,
    },
}

impl Action {
    pub fn invokable<C: Invokable>() -> Self {
        Action::Invokable {
            controller: type_name::<C>(),
            invoker: Arc::new(
                |container: Arc<Container>, invocation: Invocation| -> BoxFuture<'static, Result<Reply>> {
                Box::pin(async move {
                    let controller = container.autowire::<C>()?;
                    controller
                        .invoke(invocation.params().positional())
                        .await
                        .into_reply()
                })
            }),
        }
    }

    pub fn method(controller: &'static str, method: &'static str, invoker: Invoker) -> Self {
        Action::Method {
            controller,
            method,
            invoker,
        }
    }

    /// A closure receiving the request.
    pub fn closure<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(ServerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let f = Arc::new(f);
        Action::Invokable {
            controller: name,
            invoker: Arc::new(
                move |_container: Arc<Container>, invocation: Invocation| -> BoxFuture<'static, Result<Reply>> {
                let f = Arc::clone(&f);
                Box::pin(async move { f(invocation.request).await.into_reply() })
            }),
        }
    }

    pub fn controller(&self) -> &'static str {
        match self {
            Action::Invokable { controller, .. } | Action::Method { controller, .. } => *controller,
        }
    }

    pub fn method_name(&self) -> Option<&'static str> {
        match self {
            Action::Invokable { .. } => None,
            Action::Method { method, .. } => Some(*method),
        }
    }

    pub fn describe(&self) -> String {
        match self.method_name() {
            Some(method) => format!("{}::{}", self.controller(), method),
            None => self.controller().to_string(),
        }
    }

    pub fn invoke(&self, container: Arc<Container>, invocation: Invocation) -> BoxFuture<'static, Result<Reply>> {
        match self {
            Action::Invokable { invoker, .. } | Action::Method { invoker, .. } => invoker(container, invocation),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.describe()).finish()
    }
}
