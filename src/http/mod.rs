//! HTTP vocabulary shared by the router, the exceptions and the controllers.

mod method;
mod status;

pub use method::HttpMethod;
pub use status::HttpStatus;

/// Content type attached to every serialized controller reply.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
