use crate::di::Container;
use crate::error::Result;

/// Trait for types that can be constructed by the DI container
///
/// This trait is typically implemented automatically via `#[derive(Injectable)]`
/// or the `#[controller]` attribute. Each `Arc<T>` field is resolved with
/// [`Container::make`]; fields marked `#[inject(auto)]` are auto-wired with
/// [`Container::autowire`] and fields marked `#[inject(default)]` use `Default`.
///
/// # Example
/// ```
/// use mantle::prelude::*;
///
/// pub trait UserRepository: Send + Sync {}
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     repository: Arc<dyn UserRepository>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the container
    ///
    /// # Errors
    /// Returns an error if any required dependency cannot be resolved.
    fn inject(container: &Container) -> Result<Self>;
}
