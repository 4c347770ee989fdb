pub mod config;
pub mod output;
pub mod session;
pub mod ticket;
