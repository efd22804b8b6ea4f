//! Attachment policy and storage.
//!
//! Policy: at most 5 files per submission, 10 MiB each, allow-listed
//! MIME/extension pairs. Stored names are `{unix-millis}-{sanitized}` and
//! retrieval re-checks that shape before any path is built, so a crafted
//! name never reaches the filesystem.

use crate::errors::CaseError;
use async_trait::async_trait;
use std::path::PathBuf;

pub const MAX_FILES: usize = 5;
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const ALLOWED_MIME: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const ALLOWED_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "pdf", "txt", "doc", "docx"];

/// A file received from a multipart submission, held in memory until the
/// policy check passes.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Check a whole submission against the upload policy.
pub fn check_upload(files: &[IncomingFile]) -> Result<(), CaseError> {
    if files.len() > MAX_FILES {
        return Err(CaseError::rejected(format!(
            "at most {MAX_FILES} files per submission"
        )));
    }
    for file in files {
        if file.bytes.len() as u64 > MAX_FILE_BYTES {
            return Err(CaseError::rejected(format!(
                "{} exceeds the {} MiB limit",
                file.original_name,
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        if !ALLOWED_MIME.contains(&file.content_type.as_str()) {
            return Err(CaseError::rejected(format!(
                "file type {} not allowed",
                file.content_type
            )));
        }
        let ext = extension(&file.original_name);
        if !ALLOWED_EXT.contains(&ext.as_str()) {
            return Err(CaseError::rejected(format!(
                "file extension .{ext} not allowed"
            )));
        }
    }
    Ok(())
}

/// Types accepted by the asset-reclaim intake. Narrower than the contact
/// form and checked on MIME alone: documents and photos, nothing else.
const RECLAIM_MIME: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// Check an asset-reclaim submission against its upload policy.
pub fn check_reclaim_upload(files: &[IncomingFile]) -> Result<(), CaseError> {
    if files.len() > MAX_FILES {
        return Err(CaseError::rejected(format!(
            "at most {MAX_FILES} files per submission"
        )));
    }
    for file in files {
        if file.bytes.len() as u64 > MAX_FILE_BYTES {
            return Err(CaseError::rejected(format!(
                "{} exceeds the {} MiB limit",
                file.original_name,
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        if !RECLAIM_MIME.contains(&file.content_type.as_str()) {
            return Err(CaseError::rejected(format!(
                "file type {} not allowed",
                file.content_type
            )));
        }
    }
    Ok(())
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Replace anything outside `[A-Za-z0-9.\-_]` with an underscore.
pub fn sanitize_name(original: &str) -> String {
    original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Stored name for an upload: millisecond timestamp prefix plus the
/// sanitized original name.
pub fn stored_name(unix_millis: u64, original: &str) -> String {
    format!("{unix_millis}-{}", sanitize_name(original))
}

/// Whether `name` matches the stored-name shape `^\d+-[A-Za-z0-9._-]+$`.
/// Anything else (traversal attempts included) is refused before lookup.
pub fn is_stored_name(name: &str) -> bool {
    let Some((prefix, rest)) = name.split_once('-') else {
        return false;
    };
    !prefix.is_empty()
        && prefix.bytes().all(|b| b.is_ascii_digit())
        && !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

/// Whether `key` is an acceptable per-case directory segment: the id
/// formats this crate generates (`C-...`, `AR-...`), nothing path-like.
fn is_case_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Where attachment bytes live. Keyed by the owning record's id string so
/// both intake channels share one store.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn save(
        &self,
        case_key: &str,
        stored_name: &str,
        bytes: &[u8],
    ) -> Result<(), CaseError>;

    /// Read back a stored attachment. The name must already match
    /// [`is_stored_name`]; implementations re-check and refuse otherwise.
    async fn open(&self, case_key: &str, stored_name: &str) -> Result<Vec<u8>, CaseError>;
}

/// Filesystem store: `{root}/{case-key}/{stored-name}`. Both path segments
/// are validated shapes, never raw request input.
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, case_key: &str, stored_name: &str) -> Result<PathBuf, CaseError> {
        if !is_case_key(case_key) {
            return Err(CaseError::rejected("invalid case key"));
        }
        if !is_stored_name(stored_name) {
            return Err(CaseError::rejected("invalid stored filename"));
        }
        Ok(self.root.join(case_key).join(stored_name))
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn save(
        &self,
        case_key: &str,
        stored_name: &str,
        bytes: &[u8],
    ) -> Result<(), CaseError> {
        let path = self.path_for(case_key, stored_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CaseError::storage(&e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CaseError::storage(&e))
    }

    async fn open(&self, case_key: &str, stored_name: &str) -> Result<Vec<u8>, CaseError> {
        let path = self.path_for(case_key, stored_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CaseError::NotFound),
            Err(e) => Err(CaseError::storage(&e)),
        }
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryAttachmentStore {
    files: parking_lot::Mutex<std::collections::HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn save(
        &self,
        case_key: &str,
        stored_name: &str,
        bytes: &[u8],
    ) -> Result<(), CaseError> {
        if !is_stored_name(stored_name) {
            return Err(CaseError::rejected("invalid stored filename"));
        }
        self.files.lock().insert(
            (case_key.to_string(), stored_name.to_string()),
            bytes.to_vec(),
        );
        Ok(())
    }

    async fn open(&self, case_key: &str, stored_name: &str) -> Result<Vec<u8>, CaseError> {
        if !is_stored_name(stored_name) {
            return Err(CaseError::rejected("invalid stored filename"));
        }
        self.files
            .lock()
            .get(&(case_key.to_string(), stored_name.to_string()))
            .cloned()
            .ok_or(CaseError::NotFound)
    }
}
