//! Call-time parameter resolution.
//!
//! A target invoked through [`Container::call`] pulls each of its parameters
//! out of a [`CallArgs`] by name. Lookup order is: an explicit entry in the
//! supplied [`Parameters`], then the container (for service types), then the
//! caller's declared default.

use crate::di::Container;
use crate::di::container::{Erased, erase, unerase};
use crate::error::{MantleError, Result};
use crate::exception::HttpException;
use crate::request::ServerRequest;
use crate::routing::RouteParams;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

/// An explicit call argument.
#[derive(Clone)]
pub enum Argument {
    /// Raw text, typically a captured path segment. Parsed on demand.
    Text(String),
    /// A typed value.
    Value(Erased),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Argument::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// Named arguments supplied to [`Container::call`].
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    entries: HashMap<String, Argument>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_text(name, value);
        self
    }

    pub fn with_value<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert_value(name, value);
        self
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(name.into(), Argument::Text(value.into()));
    }

    pub fn insert_value<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.entries
            .insert(name.into(), Argument::Value(erase(Arc::new(value))));
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&RouteParams> for Parameters {
    fn from(params: &RouteParams) -> Self {
        params
            .iter()
            .fold(Parameters::new(), |acc, (name, value)| acc.with_text(name, value))
    }
}

/// The view a call target has of its arguments.
pub struct CallArgs<'a> {
    container: &'a Container,
    parameters: &'a Parameters,
    request: Option<&'a ServerRequest>,
}

impl<'a> CallArgs<'a> {
    pub(crate) fn new(
        container: &'a Container,
        parameters: &'a Parameters,
        request: Option<&'a ServerRequest>,
    ) -> Self {
        Self {
            container,
            parameters,
            request,
        }
    }

    pub fn container(&self) -> &Container {
        self.container
    }

    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    pub fn request(&self) -> Option<&ServerRequest> {
        self.request
    }

    /// Resolve a parameter without a default.
    pub fn get<T: CallArgument>(&self, name: &str) -> Result<T> {
        T::from_call(name, self)?.ok_or_else(|| MantleError::UnresolvableParameter {
            name: name.to_string(),
        })
    }

    /// Resolve a parameter, falling back to `default`.
    pub fn get_or<T: CallArgument>(&self, name: &str, default: T) -> Result<T> {
        Ok(T::from_call(name, self)?.unwrap_or(default))
    }

    pub fn get_or_else<T: CallArgument>(&self, name: &str, default: impl FnOnce() -> T) -> Result<T> {
        Ok(T::from_call(name, self)?.unwrap_or_else(default))
    }

    /// The raw text of an explicit argument.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.parameters.get(name) {
            Some(Argument::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn value<T: Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>> {
        match self.parameters.get(name) {
            Some(Argument::Value(value)) => unerase::<T>(Arc::clone(value)).map(Some),
            _ => Ok(None),
        }
    }
}

/// A type that can be produced for a named call parameter.
///
/// `Ok(None)` means "not supplied": the caller's default applies, or the
/// parameter is unresolvable.
pub trait CallArgument: Sized {
    fn from_call(name: &str, args: &CallArgs<'_>) -> Result<Option<Self>>;
}

fn parse_text<T: FromStr>(name: &str, text: &str) -> Result<T> {
    text.parse::<T>().map_err(|_| {
        tracing::debug!(
            parameter = name,
            value = text,
            expected = std::any::type_name::<T>(),
            "Rejecting unparsable parameter"
        );
        MantleError::Http(HttpException::BadRequest)
    })
}

macro_rules! scalar_call_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CallArgument for $ty {
                fn from_call(name: &str, args: &CallArgs<'_>) -> Result<Option<Self>> {
                    match args.parameters.get(name) {
                        Some(Argument::Text(text)) => parse_text::<$ty>(name, text).map(Some),
                        Some(Argument::Value(_)) => {
                            Ok(args.value::<$ty>(name)?.map(|value| value.as_ref().clone()))
                        }
                        None => Ok(None),
                    }
                }
            }
        )*
    };
}

scalar_call_argument!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String,
);

impl<T: ?Sized + Send + Sync + 'static> CallArgument for Arc<T> {
    fn from_call(name: &str, args: &CallArgs<'_>) -> Result<Option<Self>> {
        match args.parameters.get(name) {
            Some(Argument::Value(value)) => unerase::<T>(Arc::clone(value)).map(Some),
            Some(Argument::Text(_)) => Err(MantleError::DowncastFailed {
                type_name: std::any::type_name::<T>().to_string(),
            }),
            // Only an unregistered `T` is "not supplied"; failures while
            // building a registered one propagate.
            None if !args.container.contains::<T>() => Ok(None),
            None => args.container.make::<T>().map(Some),
        }
    }
}

impl<T: CallArgument> CallArgument for Option<T> {
    fn from_call(name: &str, args: &CallArgs<'_>) -> Result<Option<Self>> {
        T::from_call(name, args).map(Some)
    }
}

impl CallArgument for ServerRequest {
    fn from_call(_name: &str, args: &CallArgs<'_>) -> Result<Option<Self>> {
        Ok(args.request.cloned())
    }
}

/// A parameter parsed from text with [`FromStr`], for types without a
/// dedicated [`CallArgument`] impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<T>(pub T);

impl<T> Param<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Param<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: FromStr> CallArgument for Param<T> {
    fn from_call(name: &str, args: &CallArgs<'_>) -> Result<Option<Self>> {
        args.text(name)
            .map(|text| parse_text::<T>(name, text).map(Param))
            .transpose()
    }
}
