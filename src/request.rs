use crate::error::{MantleError, Result};
use crate::exception::HttpException;
use crate::routing::RouteParams;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Uri};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: RouteParams,
}

/// The request as seen by a controller: head, buffered body and the path
/// parameters captured by the matched route.
///
/// Cheap to clone; one is built per dispatched request.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    inner: Arc<Inner>,
}

impl ServerRequest {
    /// Buffer `request` up to `limit` bytes.
    pub async fn from_request(request: Request<Body>, params: RouteParams, limit: usize) -> Result<Self> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await.map_err(|err| {
            tracing::debug!(error = %err, limit, "Rejecting request body");
            MantleError::Http(body_rejection(err))
        })?;
        Ok(Self {
            inner: Arc::new(Inner {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
                params,
            }),
        })
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Deserialize the body as JSON; malformed bodies are bad requests.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.inner.body).map_err(|err| {
            tracing::debug!(error = %err, "Rejecting malformed JSON body");
            MantleError::Http(HttpException::BadRequest)
        })
    }

    pub fn params(&self) -> &RouteParams {
        &self.inner.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name)
    }

    /// Deserialize the URL-encoded query string; malformed queries are bad
    /// requests. A missing query decodes like an empty one.
    ///
    /// ```ignore
    /// let filters: HashMap<String, String> = request.query()?;
    /// ```
    pub fn query<T: DeserializeOwned>(&self) -> Result<T> {
        serde_urlencoded::from_str(self.inner.uri.query().unwrap_or_default()).map_err(|err| {
            tracing::debug!(error = %err, "Rejecting malformed query string");
            MantleError::Http(HttpException::BadRequest)
        })
    }
}

/// Exceeding the body limit is 413; any other read failure is a bad request.
fn body_rejection(err: axum::Error) -> HttpException {
    if err.into_inner().downcast_ref::<LengthLimitError>().is_some() {
        HttpException::PayloadTooLarge
    } else {
        HttpException::BadRequest
    }
}
