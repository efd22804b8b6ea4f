//! # Authentication
//!
//! The authentication layer for casetrack, covering both identity planes:
//!
//! - **Staff** authenticate with credentials, gated by the [`LoginGuard`]
//!   brute-force lockout, and receive a signed stateless token.
//! - **Clients** authenticate with a one-time code issued against an email
//!   that owns at least one case, and receive an opaque store-backed token.
//!
//! ## Domain Invariants
//!
//! | Invariant | Where enforced |
//! |-----------|----------------|
//! | At most one live code *or* session per identity, never both | [`IdentityState`] is an enum; issuing/verifying replaces the whole record |
//! | One-time codes are single use | verification swaps the record to a session inside one store update |
//! | Lockout after 5 failures within 15 minutes per source | [`LoginGuard`] counter map |
//! | Expiry is lazy | every check compares against an injected [`Clock`](shared_types::Clock) |
//!
//! Codes are never echoed through any production response path; automated
//! tests read them from the [`CapturingNotifier`] double.

pub mod errors;
pub mod guard;
pub mod identity;
pub mod notify;
pub mod otp;
pub mod session;

pub use errors::AuthError;
pub use guard::{LoginCheck, LoginGuard, LoginGuardConfig};
pub use identity::{IdentityRecord, IdentityState};
pub use notify::{
    notify_best_effort, CapturingNotifier, EmailPriority, FailingNotifier, LogNotifier,
    Notification, Notifier, NotifyError,
};
pub use otp::{CaseOwnership, ClientSession, OtpConfig, OtpService};
pub use session::{
    Plane, Role, SessionConfig, SessionIdentity, SessionManager, StaffCredentials,
};
