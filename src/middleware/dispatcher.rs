use crate::BoxFuture;
use crate::di::Container;
use crate::error::Result;
use crate::exception::HttpException;
use crate::middleware::{Middleware, MiddlewareRef, Next};
use crate::routing::Reply;
use axum::{body::Body, http::Request, response::Response};
use std::collections::VecDeque;
use std::sync::Arc;

type FinalFn = Box<dyn FnOnce(Request<Body>) -> BoxFuture<'static, Result<Reply>> + Send>;

/// The terminal unit of the pipeline.
///
/// Produces the controller's [`Reply`] and renders it: responses pass through
/// untouched, anything else becomes a JSON body.
pub struct FinalHandler {
    run: FinalFn,
}

impl FinalHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<'static, Result<Reply>> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// A final handler that raises `exception` once the chain reaches it.
    pub fn failing(exception: HttpException) -> Self {
        Self::new(move |_request| Box::pin(async move { Err(exception.into()) }))
    }

    pub async fn handle(self, request: Request<Body>) -> Result<Response> {
        let reply = (self.run)(request).await?;
        reply.into_response()
    }
}

/// Runs a middleware stack front to back, then the final handler.
pub struct MiddlewareDispatcher {
    stack: VecDeque<Arc<dyn Middleware>>,
    final_handler: FinalHandler,
}

impl MiddlewareDispatcher {
    pub fn new(stack: impl IntoIterator<Item = Arc<dyn Middleware>>, final_handler: FinalHandler) -> Self {
        Self {
            stack: stack.into_iter().collect(),
            final_handler,
        }
    }

    /// Materialise `refs` through the container, in order.
    pub fn from_refs<'a>(
        refs: impl IntoIterator<Item = &'a MiddlewareRef>,
        container: &Container,
        final_handler: FinalHandler,
    ) -> Result<Self> {
        let stack = refs
            .into_iter()
            .map(|middleware| middleware.resolve(container))
            .collect::<Result<VecDeque<_>>>()?;
        Ok(Self {
            stack,
            final_handler,
        })
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn handle(mut self, request: Request<Body>) -> BoxFuture<'static, Result<Response>> {
        match self.stack.pop_front() {
            Some(middleware) => Box::pin(async move {
                let next = Next::new(self);
                middleware.process(request, next).await
            }),
            None => Box::pin(self.final_handler.handle(request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MantleError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn process(&self, request: Request<Body>, next: Next) -> Result<Response> {
            self.log.lock().unwrap().push(self.label);
            next.run(request).await
        }
    }

    struct Halt;

    #[async_trait]
    impl Middleware for Halt {
        async fn process(&self, _request: Request<Body>, _next: Next) -> Result<Response> {
            Ok(StatusCode::UNAUTHORIZED.into_response())
        }
    }

    fn recording_final(log: Arc<Mutex<Vec<&'static str>>>) -> FinalHandler {
        FinalHandler::new(move |_request| {
            Box::pin(async move {
                log.lock().unwrap().push("final");
                Ok(Reply::data(serde_json::json!({ "a": 1 })))
            })
        })
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_stack_calls_final_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = MiddlewareDispatcher::new(Vec::new(), recording_final(log.clone()));

        let response = dispatcher.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["final"]);
    }

    #[tokio::test]
    async fn test_each_middleware_runs_once_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack: Vec<Arc<dyn Middleware>> = ["first", "second", "third"]
            .into_iter()
            .map(|label| {
                Arc::new(Recorder {
                    label,
                    log: log.clone(),
                }) as Arc<dyn Middleware>
            })
            .collect();
        let dispatcher = MiddlewareDispatcher::new(stack, recording_final(log.clone()));

        dispatcher.handle(request()).await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "second", "third", "final"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_of_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Recorder {
                label: "outer",
                log: log.clone(),
            }),
            Arc::new(Halt),
            Arc::new(Recorder {
                label: "inner",
                log: log.clone(),
            }),
        ];
        let dispatcher = MiddlewareDispatcher::new(stack, recording_final(log.clone()));

        let response = dispatcher.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), vec!["outer"]);
    }

    #[tokio::test]
    async fn test_failing_final_handler_raises_exception() {
        let dispatcher = MiddlewareDispatcher::new(Vec::new(), FinalHandler::failing(HttpException::NotFound));
        let result = dispatcher.handle(request()).await;
        assert!(matches!(
            result,
            Err(MantleError::Http(HttpException::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_unknown_middleware_type_is_invalid() {
        struct Unregistered;

        #[async_trait]
        impl Middleware for Unregistered {
            async fn process(&self, request: Request<Body>, next: Next) -> Result<Response> {
                next.run(request).await
            }
        }

        let refs = vec![MiddlewareRef::Resolve {
            name: "Unregistered",
            resolve: |container| container.make::<Unregistered>().map(|m| m as Arc<dyn Middleware>),
        }];
        let result = MiddlewareDispatcher::from_refs(&refs, &Container::new(), FinalHandler::failing(HttpException::NotFound));
        assert!(matches!(
            result,
            Err(MantleError::InvalidMiddleware { .. })
        ));
    }
}
