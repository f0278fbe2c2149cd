pub mod counter_order;
pub mod reference_price;

pub use counter_order::*;
pub use reference_price::*;
