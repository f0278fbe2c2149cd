// Database module
pub mod connection;
pub mod store;
pub mod memory;
pub mod repositories;

pub use connection::*;
pub use store::*;
pub use memory::*;
pub use repositories::*;
