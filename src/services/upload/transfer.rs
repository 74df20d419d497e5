use crate::services::storage::{ObjectStorage, ProgressFn};
use crate::services::upload::error::UploadError;
use crate::services::upload::outcome::TransferOutcome;
use crate::services::upload::progress::ProgressTracker;
use crate::services::upload::types::{CallerIdentity, QueuedFile};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Drives one batch: a storage put per queued file with bounded parallelism,
/// republishing progress through the session tracker and classifying each
/// terminal outcome. One file's failure never aborts the rest.
pub struct TransferOrchestrator {
    storage: Arc<dyn ObjectStorage>,
    progress: Arc<ProgressTracker>,
    concurrency: usize,
}

impl TransferOrchestrator {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        progress: Arc<ProgressTracker>,
        concurrency: usize,
    ) -> Self {
        Self {
            storage,
            progress,
            concurrency: concurrency.max(1),
        }
    }

    /// Transfers every file of the frozen queue, returning exactly one
    /// `(file, outcome)` pair per input, in queue order.
    ///
    /// An absent identity fails the whole run with `Unauthenticated` before
    /// any transfer is issued. Once `cancel` fires, no new transfer starts
    /// and in-flight ones resolve to `Cancelled`.
    pub async fn run(
        &self,
        files: Vec<QueuedFile>,
        identity: Option<&CallerIdentity>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(QueuedFile, TransferOutcome)>, UploadError> {
        let identity = identity.ok_or(UploadError::Unauthenticated)?;
        let owner_id = identity.user_id.clone();
        let total = files.len();

        let mut outcomes: Vec<(QueuedFile, TransferOutcome)> = futures::stream::iter(files)
            .map(|queued| {
                let owner_id = owner_id.clone();
                async move {
                    let outcome = self.transfer_one(&owner_id, &queued, cancel).await;
                    (queued, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Completion order is whatever the pool produced; the contract is
        // one entry per input file, reported in queue order.
        outcomes.sort_by_key(|(queued, _)| queued.queue_index);
        debug_assert_eq!(outcomes.len(), total);
        Ok(outcomes)
    }

    async fn transfer_one(
        &self,
        owner_id: &str,
        queued: &QueuedFile,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        if cancel.is_cancelled() {
            return TransferOutcome::Failure {
                reason: UploadError::Cancelled,
            };
        }

        let key = storage_key(owner_id, &queued.file.name);
        let tracker = self.progress.clone();
        let progress_key = key.clone();
        let on_progress: ProgressFn = Arc::new(move |loaded, total| {
            tracker.publish(&progress_key, loaded, total);
        });

        let put = self.storage.put(&key, queued.file.data.clone(), on_progress);
        let outcome = tokio::select! {
            _ = cancel.cancelled() => TransferOutcome::Failure {
                reason: UploadError::Cancelled,
            },
            result = put => match result {
                Ok(stored_key) => TransferOutcome::Success {
                    storage_key: stored_key,
                },
                Err(e) => {
                    tracing::warn!("⛈️  Transfer failed for '{}': {}", queued.file.name, e);
                    TransferOutcome::Failure {
                        reason: UploadError::StorageTransferFailed(e.to_string()),
                    }
                }
            },
        };

        self.progress.finish(&key);
        outcome
    }
}

/// Collision-resistant storage key: a fresh v4 UUID scoped under the owner,
/// keeping the original extension so the stored object stays recognizable.
pub fn storage_key(owner_id: &str, filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "pdf".to_string());
    format!("{}/papers/{}.{}", owner_id, Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_shape() {
        let key = storage_key("user-1", "My Paper.PDF");
        assert!(key.starts_with("user-1/papers/"));
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn storage_key_defaults_extension() {
        let key = storage_key("user-1", "noext");
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn storage_keys_never_collide_for_same_name() {
        let a = storage_key("user-1", "same.pdf");
        let b = storage_key("user-1", "same.pdf");
        assert_ne!(a, b);
    }
}
