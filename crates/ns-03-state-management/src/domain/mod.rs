pub mod cache;
pub mod config;
pub mod errors;
pub mod manager;
pub mod options;
pub mod schema;
pub mod stats;
pub mod subscriptions;

pub use cache::*;
pub use config::*;
pub use errors::*;
pub use manager::*;
pub use options::*;
pub use schema::*;
pub use stats::StateStats;
pub use subscriptions::*;
