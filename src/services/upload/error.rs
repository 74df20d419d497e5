use thiserror::Error;

/// Failure taxonomy of the upload pipeline.
///
/// `QueueLocked` and `IndexOutOfRange` are synchronous contract violations on
/// queue mutation. `Unauthenticated` aborts a run before any transfer is
/// issued. The remaining variants are per-file terminal reasons and never
/// abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("upload queue is locked while a batch is in flight")]
    QueueLocked,

    #[error("no queued file at index {0}")]
    IndexOutOfRange(usize),

    #[error("no authenticated caller for this upload session")]
    Unauthenticated,

    #[error("storage transfer failed: {0}")]
    StorageTransferFailed(String),

    #[error("metadata persist failed: {0}")]
    MetadataPersistFailed(String),

    #[error("transfer cancelled")]
    Cancelled,
}

impl UploadError {
    /// Stable machine-readable tag, used by the API layer.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::QueueLocked => "queue_locked",
            UploadError::IndexOutOfRange(_) => "index_out_of_range",
            UploadError::Unauthenticated => "unauthenticated",
            UploadError::StorageTransferFailed(_) => "storage_transfer_failed",
            UploadError::MetadataPersistFailed(_) => "metadata_persist_failed",
            UploadError::Cancelled => "cancelled",
        }
    }
}
