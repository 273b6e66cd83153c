use crate::config::{AppConfig, UnhandledErrors};
use crate::di::{Container, Injectable};
use crate::error::{MantleError, Result};
use crate::http::HttpStatus;
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};

/// Translates [`HttpException`](crate::exception::HttpException)s raised
/// further down the chain into responses.
///
/// Registered first so it wraps everything else. What happens to other errors
/// is decided by the [`UnhandledErrors`] policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionHandlerMiddleware {
    policy: UnhandledErrors,
}

impl ExceptionHandlerMiddleware {
    pub fn new(policy: UnhandledErrors) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnhandledErrors {
        self.policy
    }
}

impl Injectable for ExceptionHandlerMiddleware {
    fn inject(container: &Container) -> Result<Self> {
        let policy = match container.make::<AppConfig>() {
            Ok(config) => config.unhandled_errors,
            Err(MantleError::DependencyNotFound { .. }) => UnhandledErrors::default(),
            Err(err) => return Err(err),
        };
        Ok(Self::new(policy))
    }
}

#[async_trait]
impl Middleware for ExceptionHandlerMiddleware {
    async fn process(&self, request: Request<Body>, next: Next) -> Result<Response> {
        match next.run(request).await {
            Ok(response) => Ok(response),
            Err(MantleError::Http(exception)) => {
                tracing::debug!(status = exception.status().code(), "Translating HTTP exception");
                Ok(exception.into_response())
            }
            Err(err) => match self.policy {
                UnhandledErrors::Propagate => Err(err),
                UnhandledErrors::InternalServerError => {
                    tracing::error!(error = %err, "Unhandled error while dispatching request");
                    Ok(HttpStatus::InternalServerError
                        .status_code()
                        .into_response())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpException;
    use crate::http::HttpMethod;
    use crate::middleware::{FinalHandler, MiddlewareDispatcher};
    use crate::routing::Reply;
    use axum::http::StatusCode;
    use axum::http::header::ALLOW;
    use std::sync::Arc;

    fn dispatch_error(
        policy: UnhandledErrors,
        error: impl FnOnce() -> MantleError + Send + 'static,
    ) -> MiddlewareDispatcher {
        let final_handler =
            FinalHandler::new(move |_request| Box::pin(async move { Err::<Reply, _>(error()) }));
        MiddlewareDispatcher::new(
            vec![Arc::new(ExceptionHandlerMiddleware::new(policy)) as Arc<dyn Middleware>],
            final_handler,
        )
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_http_exception_becomes_response() {
        let dispatcher = dispatch_error(UnhandledErrors::Propagate, || {
            HttpException::MethodNotAllowed {
                allowed: vec![HttpMethod::Post, HttpMethod::Delete],
            }
            .into()
        });
        let response = dispatcher.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST, DELETE");
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_by_default() {
        let dispatcher = dispatch_error(UnhandledErrors::Propagate, || {
            MantleError::Internal("boom".into())
        });
        assert!(matches!(
            dispatcher.handle(request()).await,
            Err(MantleError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_fatal_error_can_become_500() {
        let dispatcher = dispatch_error(UnhandledErrors::InternalServerError, || {
            MantleError::Internal("boom".into())
        });
        let response = dispatcher.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_policy_read_from_config() {
        let mut container = Container::new();
        container.register(AppConfig {
            unhandled_errors: UnhandledErrors::InternalServerError,
            ..AppConfig::default()
        });
        let middleware = ExceptionHandlerMiddleware::inject(&container).unwrap();
        assert_eq!(middleware.policy(), UnhandledErrors::InternalServerError);

        let fallback = ExceptionHandlerMiddleware::inject(&Container::new()).unwrap();
        assert_eq!(fallback.policy(), UnhandledErrors::Propagate);
    }
}
