pub mod consumer;
pub mod processor;
pub mod scheduler;

pub use consumer::*;
pub use processor::*;
pub use scheduler::*;
