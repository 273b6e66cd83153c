use crate::di::{Container, Injectable};
use crate::error::Result;
use std::sync::Arc;

/// Builder for constructing a dependency injection container
///
/// Registration happens here during bootstrap; the finished container is then
/// shared read-only.
///
/// # Example
/// ```
/// use mantle::prelude::*;
///
/// trait Clock: Send + Sync {}
///
/// #[derive(Injectable)]
/// struct SystemClock {}
///
/// impl Clock for SystemClock {}
///
/// let container = ContainerBuilder::new()
///     .register(AppConfig::default())
///     .bind::<dyn Clock, SystemClock, _>(|clock| clock as Arc<dyn Clock>)
///     .build();
/// assert!(container.make::<dyn Clock>().is_ok());
/// ```
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            container: Container::new(),
        }
    }

    /// Register a service instance
    pub fn register<T: Send + Sync + 'static>(mut self, instance: T) -> Self {
        self.container.register(instance);
        self
    }

    pub fn register_arc<T: ?Sized + Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        self.container.register_arc(instance);
        self
    }

    /// Register a type constructed on every resolution
    pub fn provide<T: Injectable>(mut self) -> Self {
        self.container.provide::<T>();
        self
    }

    /// Register a type constructed once, on first resolution
    pub fn singleton<T: Injectable>(mut self) -> Self {
        self.container.singleton::<T>();
        self
    }

    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.container.factory::<T, F>(factory);
        self
    }

    /// Bind an abstract type to a concrete implementation
    ///
    /// Resolving `Arc<dyn Trait>` then constructs `Impl` and converts it.
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        Impl: Injectable,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.container.bind::<Trait, Impl, F>(caster);
        self
    }

    /// Build the container
    pub fn build(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
