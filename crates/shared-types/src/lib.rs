//! # Shared Types
//!
//! Common vocabulary shared by every casetrack subsystem: case identifiers,
//! normalized email addresses, and the clock abstraction used wherever
//! expiry is evaluated.
//!
//! Nothing in this crate touches storage or the network; the types here are
//! the words the subsystem contracts are written in.

pub mod case_id;
pub mod clock;
pub mod email;

pub use case_id::{CaseId, CaseIdError};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use email::{EmailAddress, EmailError};
