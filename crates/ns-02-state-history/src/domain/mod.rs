pub mod errors;
pub mod history;
pub mod options;

pub use errors::*;
pub use history::*;
pub use options::*;
