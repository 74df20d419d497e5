use crate::services::metadata::{MetadataStore, NewPaper};
use crate::services::upload::error::UploadError;
use crate::services::upload::session::SessionStatus;
use crate::services::upload::types::{CallerIdentity, QueuedFile};
use crate::utils::validation::title_from_filename;
use std::sync::Arc;

/// Terminal classification of one file within a session. Produced exactly
/// once per queued file per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { storage_key: String },
    Failure { reason: UploadError },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

/// Aggregate result of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub status: SessionStatus,
}

/// Folds per-file outcomes into a [`SessionResult`] and catalogs the
/// successful ones through the metadata store.
pub struct OutcomeAggregator {
    metadata: Arc<dyn MetadataStore>,
}

impl OutcomeAggregator {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Writes a catalog record for every successful transfer. A record that
    /// cannot be written demotes the file to `MetadataPersistFailed`: the
    /// bytes are in storage but unreachable through the catalog, which is a
    /// failure from the user's point of view.
    pub async fn persist(
        &self,
        owner: &CallerIdentity,
        outcomes: Vec<(QueuedFile, TransferOutcome)>,
    ) -> Vec<(QueuedFile, TransferOutcome)> {
        let mut finalized = Vec::with_capacity(outcomes.len());
        for (queued, outcome) in outcomes {
            let outcome = match outcome {
                TransferOutcome::Success { storage_key } => {
                    let record = NewPaper {
                        title: title_from_filename(&queued.file.name),
                        storage_key: storage_key.clone(),
                        owner_id: owner.user_id.clone(),
                        size_bytes: queued.file.byte_size as i64,
                        declared_type: queued.file.declared_type.clone(),
                    };
                    match self.metadata.insert(record).await {
                        Ok(_) => TransferOutcome::Success { storage_key },
                        Err(e) => {
                            tracing::error!(
                                "📇 Catalog write failed for '{}' ({}): {}",
                                queued.file.name,
                                storage_key,
                                e
                            );
                            TransferOutcome::Failure {
                                reason: UploadError::MetadataPersistFailed(e.to_string()),
                            }
                        }
                    }
                }
                failure => failure,
            };
            finalized.push((queued, outcome));
        }
        finalized
    }

    /// Pure fold of outcomes into counts and a terminal status. Idempotent:
    /// the same outcome list always yields the same result.
    pub fn aggregate(outcomes: &[(QueuedFile, TransferOutcome)]) -> SessionResult {
        let success_count = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .count();
        let failure_count = outcomes.len() - success_count;
        let status = if failure_count == 0 {
            SessionStatus::Success
        } else if success_count == 0 {
            SessionStatus::Error
        } else {
            SessionStatus::Partial
        };
        SessionResult {
            success_count,
            failure_count,
            status,
        }
    }
}
