use proc_macro::TokenStream;

mod controller;
mod injectable;
mod routes;

/// Derive macro for making a struct injectable into the DI container
///
/// `Arc<T>` fields are resolved from the container. Mark a field
/// `#[inject(auto)]` to construct an unregistered `T: Injectable` on the fly,
/// or `#[inject(default)]` to fill it with `Default::default()`.
///
/// # Example
/// ```ignore
/// use mantle::prelude::*;
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     repository: Arc<dyn UserRepository>,
///     #[inject(default)]
///     retries: usize,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro for declaring a controller
///
/// Same field rules as `#[derive(Injectable)]`.
///
/// # Example
/// ```ignore
/// use mantle::prelude::*;
///
/// #[controller]
/// pub struct UserController {
///     users: Arc<UserService>,
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_attribute(attr, item)
}

/// Attribute macro for declaring routes in an impl block
///
/// `#[get]`, `#[post]`, `#[put]`, `#[patch]`, `#[delete]`, `#[options]` and
/// `#[head]` declare plain routes. Their `u`-prefixed forms (`#[uget]`, ...)
/// declare unmasked routes, which an override tree may take over. Each
/// attribute takes a path and an optional `middleware = [..]` list, and may be
/// repeated.
///
/// Parameters are resolved by name: path parameters first, then the
/// container. `#[default(expr)]` supplies a value for absent parameters.
///
/// Public methods without route attributes are still registered so they can
/// override an unmasked route of a base controller.
///
/// # Example
/// ```ignore
/// #[routes]
/// impl UserController {
///     #[uget("/users")]
///     #[uget("/users/{page}", middleware = [AuditMiddleware])]
///     async fn list(&self, #[default(1)] page: u32) -> Json<Vec<User>> {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn routes(attr: TokenStream, item: TokenStream) -> TokenStream {
    routes::routes_attribute(attr, item)
}
