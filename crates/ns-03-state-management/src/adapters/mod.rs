pub mod schema_validator;

pub use schema_validator::*;
