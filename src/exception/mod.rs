//! The recoverable HTTP exception family.
//!
//! These are the only errors the exception middleware turns into responses;
//! everything else is a programming error and follows the configured
//! [`UnhandledErrors`](crate::config::UnhandledErrors) policy.

use crate::http::{HttpMethod, HttpStatus};
use axum::body::Body;
use axum::http::header::ALLOW;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

mod handler;

pub use handler::ExceptionHandlerMiddleware;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpException {
    #[error("Bad Request")]
    BadRequest,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed { allowed: Vec<HttpMethod> },

    #[error("Conflict")]
    Conflict,

    #[error("Gone")]
    Gone,

    #[error("Payload Too Large")]
    PayloadTooLarge,

    #[error("Locked")]
    Locked,

    #[error("Too Many Requests")]
    TooManyRequests,
}

impl HttpException {
    pub fn status(&self) -> HttpStatus {
        match self {
            HttpException::BadRequest => HttpStatus::BadRequest,
            HttpException::Unauthorized => HttpStatus::Unauthorized,
            HttpException::Forbidden => HttpStatus::Forbidden,
            HttpException::NotFound => HttpStatus::NotFound,
            HttpException::MethodNotAllowed { .. } => HttpStatus::MethodNotAllowed,
            HttpException::Conflict => HttpStatus::Conflict,
            HttpException::Gone => HttpStatus::Gone,
            HttpException::PayloadTooLarge => HttpStatus::PayloadTooLarge,
            HttpException::Locked => HttpStatus::Locked,
            HttpException::TooManyRequests => HttpStatus::TooManyRequests,
        }
    }

    /// The prepared response of exceptions that carry more than a status.
    pub fn response(&self) -> Option<Response> {
        match self {
            HttpException::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Response::builder()
                    .status(self.status().status_code())
                    .header(ALLOW, allow)
                    .body(Body::empty())
                    .ok()
            }
            _ => None,
        }
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        self.response()
            .unwrap_or_else(|| self.status().status_code().into_response())
    }
}
