//! Route declaration, discovery, matching and dispatch.

mod attribute;
mod controller;
mod discovery;
mod params;
mod pattern;
mod reply;
mod router;
mod table;

pub use attribute::RouteAttribute;
pub use controller::{
    Action, Controller, ControllerDescriptor, Invocation, Invokable, Invoker, MethodDescriptor,
};
pub use discovery::{ControllerTree, DiscoveredRoute, RouteDiscovery};
pub use params::RouteParams;
pub use pattern::RoutePattern;
pub use reply::{IntoReply, Json, Reply};
pub use router::{Router, RouterBuilder};
pub use table::{CompiledRoute, Resolution, RouteTable};
