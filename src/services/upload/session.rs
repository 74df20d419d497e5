use crate::config::UploadPolicy;
use crate::services::upload::error::UploadError;
use crate::services::upload::outcome::{SessionResult, TransferOutcome};
use crate::services::upload::types::{CandidateFile, QueuedFile};
use crate::services::upload::validator::{self, Admission};
use serde::Serialize;
use std::sync::Mutex;
use utoipa::ToSchema;

/// Externally observable session status.
///
/// `idle → uploading → {success, partial, error}`, and any terminal state
/// returns to `idle` on the next queue edit. Re-entering `uploading` from a
/// terminal state retries whatever is still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Uploading,
    Success,
    Partial,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Success | SessionStatus::Partial | SessionStatus::Error
        )
    }
}

struct SessionInner {
    queue: Vec<QueuedFile>,
    status: SessionStatus,
}

impl SessionInner {
    /// Queue edits are only legal while idle. A terminal state rolls back to
    /// idle on the edit; an in-flight batch rejects it.
    fn ensure_editable(&mut self) -> Result<(), UploadError> {
        match self.status {
            SessionStatus::Uploading => Err(UploadError::QueueLocked),
            status if status.is_terminal() => {
                self.status = SessionStatus::Idle;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn reindex(&mut self) {
        for (position, queued) in self.queue.iter_mut().enumerate() {
            queued.queue_index = position;
        }
    }
}

/// One user-facing upload session: the ordered queue plus its status, both
/// guarded by a single lock. The queue is frozen for the whole duration of a
/// batch; no two batches run concurrently against the same session.
pub struct UploadSession {
    policy: UploadPolicy,
    inner: Mutex<SessionInner>,
}

impl UploadSession {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(SessionInner {
                queue: Vec::new(),
                status: SessionStatus::Idle,
            }),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Validates and appends new candidates. Inadmissible files come back in
    /// `Admission::rejected` without a cause.
    pub fn add(&self, candidates: Vec<CandidateFile>) -> Result<Admission, UploadError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        let admission = validator::admit(candidates, &inner.queue, &self.policy);
        inner.queue.extend(admission.admitted.iter().cloned());
        Ok(admission)
    }

    /// Removes the file at `index`; later entries shift down by one.
    pub fn remove_at(&self, index: usize) -> Result<CandidateFile, UploadError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        if index >= inner.queue.len() {
            return Err(UploadError::IndexOutOfRange(index));
        }
        let removed = inner.queue.remove(index);
        inner.reindex();
        Ok(removed.file)
    }

    pub fn clear(&self) -> Result<(), UploadError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        inner.queue.clear();
        Ok(())
    }

    /// Ordered view of the queue.
    pub fn snapshot(&self) -> Vec<QueuedFile> {
        self.lock().queue.clone()
    }

    /// Freezes the queue and transitions to `uploading`, returning the files
    /// of this batch. Fails with `QueueLocked` while another batch is in
    /// flight; starting from a terminal state is a retry.
    pub fn begin(&self) -> Result<Vec<QueuedFile>, UploadError> {
        let mut inner = self.lock();
        if inner.status == SessionStatus::Uploading {
            return Err(UploadError::QueueLocked);
        }
        inner.status = SessionStatus::Uploading;
        Ok(inner.queue.clone())
    }

    /// Rolls an aborted batch back to idle with the queue untouched.
    pub fn abort(&self) {
        let mut inner = self.lock();
        if inner.status == SessionStatus::Uploading {
            inner.status = SessionStatus::Idle;
        }
    }

    /// Records the batch outcome: fully succeeded files leave the queue,
    /// failed ones stay queued for retry, and the status becomes terminal.
    pub fn complete(&self, outcomes: &[(QueuedFile, TransferOutcome)], result: &SessionResult) {
        let mut inner = self.lock();
        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(file, _)| file.queue_index)
            .collect();
        inner
            .queue
            .retain(|queued| failed.contains(&queued.queue_index));
        inner.reindex();
        inner.status = result.status;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
