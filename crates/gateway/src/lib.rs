//! # Gateway
//!
//! The HTTP surface: public case intake, the staff admin API, and the
//! client portal, all on one axum router.
//!
//! Handlers stay thin; they parse, call a service, and map the result. The
//! error taxonomy is centralized in [`ApiError`] so a domain error always
//! reaches the wire with the same status code regardless of route.

#![deny(unsafe_code)]

pub mod error;
pub mod router;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, ClientAuth, SourceIp, StaffAuth};
