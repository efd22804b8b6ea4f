pub mod admin;
pub mod client;
pub mod public;
