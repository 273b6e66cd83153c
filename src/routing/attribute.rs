use crate::http::HttpMethod;
use crate::middleware::MiddlewareRef;

/// A route declared on a controller method.
///
/// Generated by the `#[get]` … `#[head]` attributes (plain routes) and their
/// `#[uget]` … `#[uhead]` counterparts (unmasked routes, which an override
/// tree may take over).
#[derive(Debug, Clone)]
pub struct RouteAttribute {
    pub method: HttpMethod,
    pub path: &'static str,
    pub middleware: Vec<MiddlewareRef>,
    pub unmasked: bool,
}

impl RouteAttribute {
    pub fn new(method: HttpMethod, path: &'static str, unmasked: bool) -> Self {
        Self {
            method,
            path,
            middleware: Vec::new(),
            unmasked,
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<MiddlewareRef>) -> Self {
        self.middleware = middleware;
        self
    }
}
