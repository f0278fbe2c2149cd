// Shared module
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod topic;
pub mod utils;

pub use cache::*;
pub use config::*;
pub use database::*;
pub use errors::*;
pub use topic::*;
pub use utils::*;
