use crate::exception::HttpException;
use crate::http::HttpStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MantleError>;

#[derive(Debug, Error)]
pub enum MantleError {
    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Type {type_name} is not instantiable: {reason}")]
    NotInstantiable { type_name: String, reason: String },

    #[error("Unable to resolve parameter '{name}'")]
    UnresolvableParameter { name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("Invalid action for route {method} {pattern}: {reason}")]
    InvalidAction {
        method: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid middleware: {name}")]
    InvalidMiddleware { name: String },

    #[error(
        "The return value of a controller must be either a response or a JSON-serializable value: {0}"
    )]
    Serialization(#[source] serde_json::Error),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Invalid level name: {0}")]
    InvalidLevel(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error(transparent)]
    Http(#[from] HttpException),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for MantleError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HttpException>() {
            Ok(exception) => MantleError::Http(exception),
            Err(err) => MantleError::Other(err),
        }
    }
}

impl MantleError {
    /// Whether the error belongs to the HTTP exception family that the
    /// exception middleware translates into a response.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MantleError::Http(_))
    }

    pub fn as_http(&self) -> Option<&HttpException> {
        match self {
            MantleError::Http(exception) => Some(exception),
            _ => None,
        }
    }
}

impl axum::response::IntoResponse for MantleError {
    fn into_response(self) -> axum::response::Response {
        match self {
            MantleError::Http(exception) => exception.into_response(),
            other => {
                tracing::error!(error = %other, "Unhandled error while serving request");
                let status = HttpStatus::InternalServerError;
                (status.status_code(), status.reason()).into_response()
            }
        }
    }
}
