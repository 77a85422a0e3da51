pub mod host;
pub mod port;
pub mod target;
