pub mod contact_api;
pub mod gateway;
pub mod session_store;
pub mod terminal;
pub mod ticket_api;
