use crate::error::{MantleError, Result};
use crate::http::JSON_CONTENT_TYPE;
use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

type Serializer = Box<dyn FnOnce() -> serde_json::Result<Vec<u8>> + Send>;

/// What a controller handed back to the final handler.
pub enum Reply {
    /// A complete response, passed through unchanged.
    Response(Response),
    /// Data rendered as a JSON body.
    Data(Serializer),
    /// No value: a JSON response without a body.
    Empty,
}

impl Reply {
    pub fn data<T: Serialize + Send + 'static>(value: T) -> Self {
        Reply::Data(Box::new(move || serde_json::to_vec(&value)))
    }

    /// Render the reply.
    ///
    /// # Errors
    /// `Serialization` when the data cannot be encoded as JSON.
    pub fn into_response(self) -> Result<Response> {
        let body = match self {
            Reply::Response(response) => return Ok(response),
            Reply::Data(serialize) => Body::from(serialize().map_err(MantleError::Serialization)?),
            Reply::Empty => Body::empty(),
        };
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .map_err(|err| MantleError::Internal(err.to_string()))
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Response(response) => f.debug_tuple("Response").field(&response.status()).finish(),
            Reply::Data(_) => f.write_str("Data(..)"),
            Reply::Empty => f.write_str("Empty"),
        }
    }
}

/// Conversion of controller return values into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply>;
}

/// Marks a value for JSON rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize + Send + 'static> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::data(self.0))
    }
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for StatusCode {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Response(self.into_response()))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Empty)
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Reply> {
        match self {
            Some(value) => value.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl<T, E> IntoReply for std::result::Result<T, E>
where
    T: IntoReply,
    E: Into<MantleError>,
{
    fn into_reply(self) -> Result<Reply> {
        self.map_err(Into::into)?.into_reply()
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Vec<T> {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::data(self))
    }
}

macro_rules! data_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<Reply> {
                    Ok(Reply::data(self))
                }
            }
        )*
    };
}

data_reply!(
    serde_json::Value,
    String,
    &'static str,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    isize,
    usize,
    f32,
    f64,
);
