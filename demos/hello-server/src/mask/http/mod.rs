pub mod hello_world;
pub mod home;
