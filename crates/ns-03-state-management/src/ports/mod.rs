//! Ports: the seams other crates plug into.

pub mod api;
pub mod validator;

pub use api::*;
pub use validator::*;
