pub mod error_queue;
pub mod market_data;
pub mod cost_estimator;
pub mod classifier;
pub mod context_resolver;
pub mod router;
pub mod lineage;
pub mod order_service;

pub use error_queue::*;
pub use market_data::*;
pub use cost_estimator::*;
pub use classifier::*;
pub use context_resolver::*;
pub use router::*;
pub use lineage::*;
pub use order_service::*;
