mod builder;
mod call;
mod container;
mod injectable;
mod resolution;

pub use builder::ContainerBuilder;
pub use call::{Argument, CallArgs, CallArgument, Param, Parameters};
pub use container::Container;
pub use injectable::Injectable;
