// Shared errors
pub mod intake_error;

pub use intake_error::*;
