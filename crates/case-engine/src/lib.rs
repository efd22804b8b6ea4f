//! # Case Engine
//!
//! The case lifecycle: public intake with attachments, staff edits with an
//! append-only audit trail, client replies, listing/search/export.
//!
//! All case state lives in one record-store collection; every mutation is a
//! single queued update, which is what makes the audit logs append-only and
//! `updatedAt` monotonic under concurrent staff and client writers.

pub mod attachments;
pub mod case;
pub mod csv;
pub mod errors;
pub mod query;
pub mod reclaim;
pub mod service;

pub use attachments::{
    AttachmentStore, FsAttachmentStore, InMemoryAttachmentStore, IncomingFile, MAX_FILES,
    MAX_FILE_BYTES,
};
pub use case::{
    status, Case, CaseNote, CaseUpdate, ClientCaseView, ClientReply, EmailRecord,
    PublicCaseView, StoredFile, Submission, ValidSubmission,
};
pub use errors::CaseError;
pub use query::{CasePage, CaseQuery, PageMeta, SortOrder};
pub use reclaim::{AssetReclaim, ReclaimFile, ReclaimService, ReclaimSubmission};
pub use service::{CasePatch, CaseService};
