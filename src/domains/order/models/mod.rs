pub mod enums;
pub mod command;
pub mod request;
pub mod order;
pub mod account;
pub mod instrument;
pub mod rejection;

pub use enums::*;
pub use command::*;
pub use request::*;
pub use order::*;
pub use account::*;
pub use instrument::*;
pub use rejection::*;
