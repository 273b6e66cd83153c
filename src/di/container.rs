use crate::di::call::{CallArgs, Parameters};
use crate::di::{Injectable, resolution};
use crate::error::{MantleError, Result};
use crate::request::ServerRequest;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

/// Type-erased service. The inner value is always an `Arc<T>`, which lets the
/// same storage hold sized services and trait objects alike.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

type FactoryFn = Arc<dyn Fn(&Container) -> Result<Erased> + Send + Sync>;

#[derive(Clone)]
enum Provider {
    /// A shared, pre-built instance.
    Instance(Erased),
    /// Built anew on every resolution.
    Transient(FactoryFn),
    /// Built on first resolution, shared afterwards.
    Singleton {
        factory: FactoryFn,
        cell: Arc<OnceCell<Erased>>,
    },
    /// An abstract type forwarded to a concrete one.
    Bound {
        concrete: &'static str,
        factory: FactoryFn,
    },
}

#[derive(Clone)]
struct Registration {
    type_name: &'static str,
    provider: Provider,
}

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Erased {
    Arc::new(value)
}

pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: Erased) -> Result<Arc<T>> {
    value
        .downcast::<Arc<T>>()
        .map(|outer| Arc::clone(&*outer))
        .map_err(|_| MantleError::DowncastFailed {
            type_name: type_name::<T>().to_string(),
        })
}

/// Thread-safe dependency injection container.
///
/// Services are keyed by type. Registration happens during bootstrap through
/// `&mut self`; resolution is `&self` and safe to share behind an `Arc`.
#[derive(Clone, Default)]
pub struct Container {
    providers: DashMap<TypeId, Registration>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    fn insert<T: ?Sized + 'static>(&mut self, provider: Provider) -> &mut Self {
        let registration = Registration {
            type_name: type_name::<T>(),
            provider,
        };
        if self
            .providers
            .insert(TypeId::of::<T>(), registration)
            .is_some()
        {
            tracing::debug!(service = type_name::<T>(), "Replacing container registration");
        }
        self
    }

    /// Register a shared instance.
    pub fn register<T: Send + Sync + 'static>(&mut self, instance: T) -> &mut Self {
        self.register_arc(Arc::new(instance))
    }

    /// Register an already shared instance, which may be a trait object.
    pub fn register_arc<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) -> &mut Self {
        self.insert::<T>(Provider::Instance(erase(instance)))
    }

    /// Register `T` to be constructed through [`Injectable`] on every resolution.
    pub fn provide<T: Injectable>(&mut self) -> &mut Self {
        let factory: FactoryFn = Arc::new(|container| T::inject(container).map(|v| erase(Arc::new(v))));
        self.insert::<T>(Provider::Transient(factory))
    }

    /// Register `T` to be constructed once, on first resolution.
    pub fn singleton<T: Injectable>(&mut self) -> &mut Self {
        let factory: FactoryFn = Arc::new(|container| T::inject(container).map(|v| erase(Arc::new(v))));
        self.insert::<T>(Provider::Singleton {
            factory,
            cell: Arc::new(OnceCell::new()),
        })
    }

    /// Register a factory closure for `T`, invoked on every resolution.
    pub fn factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |container| factory(container).map(erase));
        self.insert::<T>(Provider::Transient(factory))
    }

    /// Bind an abstract type to a concrete implementation.
    ///
    /// Resolving `Abstract` resolves `Concrete` (auto-wiring it when it has no
    /// registration of its own) and converts it with `caster`. The last bind
    /// for an abstract type wins.
    pub fn bind<Abstract, Concrete, F>(&mut self, caster: F) -> &mut Self
    where
        Abstract: ?Sized + Send + Sync + 'static,
        Concrete: Injectable,
        F: Fn(Arc<Concrete>) -> Arc<Abstract> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |container| {
            let concrete = container.autowire::<Concrete>()?;
            Ok(erase(caster(concrete)))
        });
        self.insert::<Abstract>(Provider::Bound {
            concrete: type_name::<Concrete>(),
            factory,
        })
    }

    /// Resolve a registered service.
    ///
    /// # Errors
    /// `NotInstantiable` for an abstract type without a binding,
    /// `DependencyNotFound` for any other unregistered type, and
    /// `CircularDependency` when construction re-enters a type.
    pub fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let type_id = TypeId::of::<T>();
        let registration = self
            .providers
            .get(&type_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(Self::missing::<T>)?;

        let erased = resolution::enter(type_id, registration.type_name, || {
            self.produce(&registration)
        })?;
        unerase::<T>(erased)
    }

    /// Resolve `T`, constructing it through [`Injectable`] when it has no
    /// registration.
    pub fn autowire<T: Injectable>(&self) -> Result<Arc<T>> {
        let type_id = TypeId::of::<T>();
        if self.providers.contains_key(&type_id) {
            return self.make::<T>();
        }
        resolution::enter(type_id, type_name::<T>(), || T::inject(self).map(Arc::new))
    }

    /// Invoke `target` with call-time parameter resolution.
    ///
    /// Inside the closure, [`CallArgs::get`] resolves a parameter from the
    /// explicit `parameters` first, then from the container, then from a
    /// declared default.
    pub fn call<R, F>(&self, parameters: &Parameters, target: F) -> Result<R>
    where
        F: FnOnce(&CallArgs<'_>) -> Result<R>,
    {
        target(&CallArgs::new(self, parameters, None))
    }

    /// Same as [`Container::call`], with the current request available to
    /// `ServerRequest` parameters.
    pub fn call_with_request<R, F>(
        &self,
        parameters: &Parameters,
        request: &ServerRequest,
        target: F,
    ) -> Result<R>
    where
        F: FnOnce(&CallArgs<'_>) -> Result<R>,
    {
        target(&CallArgs::new(self, parameters, Some(request)))
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }

    /// The concrete type an abstract type is bound to, if any.
    pub fn binding_of<T: ?Sized + 'static>(&self) -> Option<&'static str> {
        self.providers
            .get(&TypeId::of::<T>())
            .and_then(|entry| match &entry.provider {
                Provider::Bound { concrete, .. } => Some(*concrete),
                _ => None,
            })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn produce(&self, registration: &Registration) -> Result<Erased> {
        match &registration.provider {
            Provider::Instance(instance) => Ok(Arc::clone(instance)),
            Provider::Transient(factory) | Provider::Bound { factory, .. } => factory(self),
            Provider::Singleton { factory, cell } => {
                cell.get_or_try_init(|| factory(self)).map(Arc::clone)
            }
        }
    }

    fn missing<T: ?Sized + 'static>() -> MantleError {
        let name = type_name::<T>();
        if name.starts_with("dyn ") {
            MantleError::NotInstantiable {
                type_name: name.to_string(),
                reason: "abstract type without a binding".to_string(),
            }
        } else {
            MantleError::DependencyNotFound {
                type_name: name.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestService {
        value: i32,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Injectable for English {
        fn inject(_container: &Container) -> Result<Self> {
            Ok(English)
        }
    }

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct French;

    impl Injectable for French {
        fn inject(_container: &Container) -> Result<Self> {
            Ok(French)
        }
    }

    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".to_string()
        }
    }

    struct Welcome {
        greeter: Arc<dyn Greeter>,
    }

    impl Injectable for Welcome {
        fn inject(container: &Container) -> Result<Self> {
            Ok(Welcome {
                greeter: container.make::<dyn Greeter>()?,
            })
        }
    }

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Injectable for Counted {
        fn inject(_container: &Container) -> Result<Self> {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Counted)
        }
    }

    struct Ping {
        _pong: Arc<Pong>,
    }

    struct Pong {
        _ping: Arc<Ping>,
    }

    impl Injectable for Ping {
        fn inject(container: &Container) -> Result<Self> {
            Ok(Ping {
                _pong: container.autowire::<Pong>()?,
            })
        }
    }

    impl Injectable for Pong {
        fn inject(container: &Container) -> Result<Self> {
            Ok(Pong {
                _ping: container.autowire::<Ping>()?,
            })
        }
    }

    #[test]
    fn test_register_and_make() {
        let mut container = Container::new();
        container.register(TestService { value: 42 });
        let service = container.make::<TestService>().unwrap();
        assert_eq!(service.value, 42);
    }

    #[test]
    fn test_bind_abstract_to_concrete() {
        let mut container = Container::new();
        container.bind::<dyn Greeter, English, _>(|c| c as Arc<dyn Greeter>);
        let greeter = container.make::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert_eq!(
            container.binding_of::<dyn Greeter>(),
            Some(type_name::<English>())
        );
    }

    #[test]
    fn test_last_bind_wins() {
        let mut container = Container::new();
        container.bind::<dyn Greeter, English, _>(|c| c as Arc<dyn Greeter>);
        container.bind::<dyn Greeter, French, _>(|c| c as Arc<dyn Greeter>);
        assert_eq!(container.make::<dyn Greeter>().unwrap().greet(), "bonjour");
    }

    #[test]
    fn test_autowire_injects_bound_dependency() {
        let mut container = Container::new();
        container.bind::<dyn Greeter, French, _>(|c| c as Arc<dyn Greeter>);
        let welcome = container.autowire::<Welcome>().unwrap();
        assert_eq!(welcome.greeter.greet(), "bonjour");
    }

    #[test]
    fn test_unbound_abstract_is_not_instantiable() {
        let container = Container::new();
        match container.make::<dyn Greeter>() {
            Err(MantleError::NotInstantiable { .. }) => {}
            other => panic!("expected NotInstantiable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_concrete_is_not_found() {
        let container = Container::new();
        assert!(matches!(
            container.make::<TestService>(),
            Err(MantleError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_transient_and_singleton_lifetimes() {
        let mut container = Container::new();
        container.provide::<English>();
        let a = container.make::<English>().unwrap();
        let b = container.make::<English>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        BUILT.store(0, Ordering::SeqCst);
        container.singleton::<Counted>();
        let a = container.make::<Counted>().unwrap();
        let b = container.make::<Counted>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_closure() {
        let mut container = Container::new();
        container.register(TestService { value: 7 });
        container.factory::<dyn Greeter, _>(|c| {
            let service = c.make::<TestService>()?;
            Ok(if service.value > 5 {
                Arc::new(French) as Arc<dyn Greeter>
            } else {
                Arc::new(English) as Arc<dyn Greeter>
            })
        });
        assert_eq!(container.make::<dyn Greeter>().unwrap().greet(), "bonjour");
    }

    #[test]
    fn test_constructor_cycle_is_detected() {
        let container = Container::new();
        match container.autowire::<Ping>() {
            Err(MantleError::CircularDependency { cycle }) => {
                assert!(cycle.contains("Ping"));
                assert!(cycle.contains("Pong"));
            }
            other => panic!("expected a cycle, got {:?}", other.err()),
        }
    }
}
