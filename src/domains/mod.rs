// Domains module
pub mod order;
pub mod intake;
pub mod bot;
