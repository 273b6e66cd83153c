use mantle::prelude::*;

/// Tags responses of the routes it is attached to.
#[derive(Injectable)]
pub struct SomethingMiddleware;

#[async_trait]
impl Middleware for SomethingMiddleware {
    async fn process(&self, request: Request<Body>, next: Next) -> mantle::Result<Response> {
        let mut response = next.run(request).await?;
        response
            .headers_mut()
            .insert("x-something", mantle::axum::http::HeaderValue::from_static("Value"));
        Ok(response)
    }
}
