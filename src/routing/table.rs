use crate::http::HttpMethod;
use crate::middleware::MiddlewareRef;
use crate::routing::{Action, RouteParams, RoutePattern};
use axum::http::Method;
use std::collections::HashMap;

/// A registered route with its compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub method: HttpMethod,
    pub pattern: RoutePattern,
    pub action: Action,
    pub middleware: Vec<MiddlewareRef>,
}

/// Outcome of matching a request line against the table.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        route: &'a CompiledRoute,
        params: RouteParams,
    },
    /// The path exists under other verbs, listed in registration order.
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    NotFound,
}

/// Routes in registration order, indexed per verb.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    by_method: HashMap<HttpMethod, Vec<usize>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: CompiledRoute) {
        self.by_method
            .entry(route.method)
            .or_default()
            .push(self.routes.len());
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route of `method` whose pattern matches all of `path` wins.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let requested = HttpMethod::from_method(method);

        if let Some(indices) = requested.and_then(|verb| self.by_method.get(&verb)) {
            for &index in indices {
                let route = &self.routes[index];
                if let Some(params) = route.pattern.captures(path) {
                    return Resolution::Matched { route, params };
                }
            }
        }

        let mut allowed: Vec<HttpMethod> = Vec::new();
        for route in &self.routes {
            if Some(route.method) != requested
                && !allowed.contains(&route.method)
                && route.pattern.is_match(path)
            {
                allowed.push(route.method);
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Reply;

    fn route(method: HttpMethod, pattern: &str, name: &'static str) -> CompiledRoute {
        CompiledRoute {
            method,
            pattern: RoutePattern::compile(pattern).unwrap(),
            action: Action::closure(name, |_request| async { Reply::Empty }),
            middleware: Vec::new(),
        }
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table.push(route(HttpMethod::Get, "/item/{id}", "first"));
        table.push(route(HttpMethod::Get, "/item/{slug}", "second"));
        table.push(route(HttpMethod::Post, "/thing", "create"));
        table.push(route(HttpMethod::Delete, "/thing", "remove"));
        table.push(route(HttpMethod::Post, "/thing", "duplicate"));
        table
    }

    #[test]
    fn test_first_registered_match_wins() {
        let table = table();
        match table.resolve(&Method::GET, "/item/5") {
            Resolution::Matched { route, params } => {
                assert_eq!(route.action.controller(), "first");
                assert_eq!(params.get("id"), Some("5"));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_other_verbs_yield_method_not_allowed_in_registration_order() {
        let table = table();
        match table.resolve(&Method::GET, "/thing") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![HttpMethod::Post, HttpMethod::Delete]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let table = table();
        assert!(matches!(
            table.resolve(&Method::GET, "/nowhere"),
            Resolution::NotFound
        ));
        assert!(matches!(
            table.resolve(&Method::PUT, "/item/5/extra"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_extension_method_never_matches() {
        let table = table();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert!(matches!(
            table.resolve(&purge, "/thing"),
            Resolution::MethodNotAllowed { .. }
        ));
    }
}
