//! Cross-subsystem flows.

pub mod client_journey;
pub mod concurrency;
pub mod durability;
