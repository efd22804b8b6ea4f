//! Notifier port.
//!
//! Email delivery is an external collaborator. The core hands a
//! [`Notification`] to whatever implements [`Notifier`] and moves on;
//! delivery failure is logged and swallowed, never propagated into the
//! operation that triggered it.
//!
//! The [`CapturingNotifier`] double is also the sanctioned way for tests to
//! observe issued one-time codes; there is no runtime flag that leaks them
//! through a response.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{CaseId, EmailAddress, Timestamp};
use tracing::{info, warn};

/// Delivery failure. Strictly best-effort: callers log and continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification delivery failed: {message}")]
pub struct NotifyError {
    pub message: String,
}

/// Message priority for staff-composed mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailPriority {
    #[default]
    Normal,
    High,
    Urgent,
}

impl EmailPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// A transactional notification the core wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// One-time login code for a client.
    LoginCode {
        to: EmailAddress,
        code: String,
        expires_at: Timestamp,
    },
    /// Confirmation that a newly submitted case was received.
    CaseReceived { to: EmailAddress, case_id: CaseId },
    /// A case's status changed.
    StatusChanged {
        to: EmailAddress,
        case_id: CaseId,
        status: String,
        notes: Option<String>,
    },
    /// A client replied on a case; addressed toward staff.
    ClientReplied {
        staff: EmailAddress,
        case_id: CaseId,
        client: EmailAddress,
        message: String,
    },
    /// Staff-composed mail to a client.
    StaffMail {
        to: EmailAddress,
        cc: Option<EmailAddress>,
        subject: String,
        body: String,
        case_id: Option<CaseId>,
        priority: EmailPriority,
    },
}

/// External delivery collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Fire and forget: deliver, log failure, never fail the caller.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    if let Err(err) = notifier.deliver(notification).await {
        warn!(error = %err, "notification dropped");
    }
}

/// Production stand-in that records deliveries in the log. Actual SMTP
/// transport lives outside this codebase, behind the same trait.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        match &notification {
            Notification::LoginCode { to, .. } => {
                info!(to = %to, "delivering login code")
            }
            Notification::CaseReceived { to, case_id } => {
                info!(to = %to, case = %case_id, "delivering case-received confirmation")
            }
            Notification::StatusChanged { to, case_id, status, .. } => {
                info!(to = %to, case = %case_id, status, "delivering status update")
            }
            Notification::ClientReplied { staff, case_id, .. } => {
                info!(to = %staff, case = %case_id, "delivering client-reply alert")
            }
            Notification::StaffMail { to, subject, .. } => {
                info!(to = %to, subject, "delivering staff mail")
            }
        }
        Ok(())
    }
}

/// Test double capturing every notification.
#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured notifications, in delivery order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// The most recent login code issued to `email`, if any. This is the
    /// documented bypass for automated OTP tests.
    pub fn last_login_code(&self, email: &EmailAddress) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find_map(|n| match n {
                Notification::LoginCode { to, code, .. } if to == email => {
                    Some(code.clone())
                }
                _ => None,
            })
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification);
        Ok(())
    }
}

/// Test double that always fails delivery.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError {
            message: "smtp unreachable".to_string(),
        })
    }
}
