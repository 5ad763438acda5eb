pub mod config;
pub mod errors;
pub mod transaction;

pub use config::*;
pub use errors::*;
pub use transaction::*;
