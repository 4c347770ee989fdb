pub mod credential;
pub mod form;
pub mod format;
pub mod ticket;
