use thiserror::Error;

/// Failure talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("document store error: {0}")]
    Backend(String),
}

/// A single file transfer that did not make it to blob storage.
#[derive(Debug, Error)]
#[error("upload of '{file_name}' failed: {reason}")]
pub struct UploadError {
    pub file_name: String,
    pub reason: String,
}

/// Everything that can stop a catalog submission. None of these are fatal;
/// the caller keeps its form state and retries by resubmitting.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("write failed: {0}")]
    Write(#[from] StoreError),
    #[error("a submission is already in progress")]
    InFlight,
}
