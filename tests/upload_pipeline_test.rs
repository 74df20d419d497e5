use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;
use paper_vault::config::UploadPolicy;
use paper_vault::entities::papers;
use paper_vault::services::metadata::{MetadataStore, NewPaper};
use paper_vault::services::storage::{ObjectStorage, ProgressFn};
use paper_vault::services::upload::{
    CallerIdentity, CandidateFile, OutcomeAggregator, ProgressTracker, SessionStatus,
    TransferOrchestrator, TransferOutcome, UploadError, UploadSession,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Object-storage double. Fails any put whose payload starts with the
/// configured marker, and records every attempted key.
struct FlakyStorage {
    fail_marker: Mutex<Option<Vec<u8>>>,
    puts: Mutex<Vec<String>>,
}

impl FlakyStorage {
    fn new(fail_marker: Option<&[u8]>) -> Arc<Self> {
        Arc::new(Self {
            fail_marker: Mutex::new(fail_marker.map(|m| m.to_vec())),
            puts: Mutex::new(Vec::new()),
        })
    }

    fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    fn heal(&self) {
        *self.fail_marker.lock().unwrap() = None;
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn put(&self, key: &str, data: Bytes, on_progress: ProgressFn) -> Result<String> {
        self.puts.lock().unwrap().push(key.to_string());
        let total = data.len() as u64;
        on_progress(0, total);
        on_progress(total / 2, total);

        let should_fail = self
            .fail_marker
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|marker| data.starts_with(marker));
        if should_fail {
            return Err(anyhow!("simulated transfer failure"));
        }

        on_progress(total, total);
        Ok(key.to_string())
    }

    async fn get(&self, _key: &str) -> Result<ByteStream> {
        Err(anyhow!("not supported by this double"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Metadata-store double. Insert fails for configured titles.
struct FlakyCatalog {
    fail_titles: HashSet<String>,
    inserted: Mutex<Vec<NewPaper>>,
}

impl FlakyCatalog {
    fn new(fail_titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_titles: fail_titles.iter().map(|t| t.to_string()).collect(),
            inserted: Mutex::new(Vec::new()),
        })
    }

    fn inserted_titles(&self) -> Vec<String> {
        self.inserted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect()
    }
}

fn model_from(record: &NewPaper) -> papers::Model {
    papers::Model {
        id: Uuid::new_v4().to_string(),
        owner_id: record.owner_id.clone(),
        title: record.title.clone(),
        storage_key: record.storage_key.clone(),
        size_bytes: record.size_bytes,
        declared_type: record.declared_type.clone(),
        is_favorite: false,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl MetadataStore for FlakyCatalog {
    async fn insert(&self, record: NewPaper) -> Result<papers::Model> {
        if self.fail_titles.contains(&record.title) {
            return Err(anyhow!("simulated catalog failure"));
        }
        let model = model_from(&record);
        self.inserted.lock().unwrap().push(record);
        Ok(model)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<papers::Model>> {
        Ok(self
            .inserted
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .map(model_from)
            .collect())
    }

    async fn find_for_owner(&self, _owner_id: &str, _id: &str) -> Result<Option<papers::Model>> {
        Ok(None)
    }

    async fn set_favorite(
        &self,
        _owner_id: &str,
        _id: &str,
        _favorite: bool,
    ) -> Result<Option<papers::Model>> {
        Ok(None)
    }

    async fn delete(&self, _owner_id: &str, _id: &str) -> Result<Option<papers::Model>> {
        Ok(None)
    }
}

fn policy() -> UploadPolicy {
    UploadPolicy {
        accepted_type: "application/pdf".to_string(),
        max_files: 10,
        max_file_size: 1024 * 1024,
        transfer_concurrency: 2,
    }
}

fn pdf(name: &str, content: &str) -> CandidateFile {
    CandidateFile::new(
        name,
        "application/pdf",
        Bytes::from(content.as_bytes().to_vec()),
    )
}

fn identity() -> CallerIdentity {
    CallerIdentity::new("researcher-1")
}

async fn run_batch(
    session: &UploadSession,
    storage: Arc<FlakyStorage>,
    catalog: Arc<FlakyCatalog>,
    tracker: Arc<ProgressTracker>,
) -> (
    Vec<(paper_vault::services::upload::QueuedFile, TransferOutcome)>,
    paper_vault::services::upload::SessionResult,
) {
    let files = session.begin().unwrap();
    let orchestrator = TransferOrchestrator::new(storage, tracker, 2);
    let cancel = CancellationToken::new();
    let outcomes = orchestrator
        .run(files, Some(&identity()), &cancel)
        .await
        .unwrap();

    let aggregator = OutcomeAggregator::new(catalog);
    let outcomes = aggregator.persist(&identity(), outcomes).await;
    let result = OutcomeAggregator::aggregate(&outcomes);
    session.complete(&outcomes, &result);
    (outcomes, result)
}

#[tokio::test]
async fn partial_batch_keeps_failed_file_queued() {
    let storage = FlakyStorage::new(Some(b"FAIL"));
    let catalog = FlakyCatalog::new(&[]);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session
        .add(vec![
            pdf("a.pdf", "%PDF a"),
            pdf("b.pdf", "FAIL b"),
            pdf("c.pdf", "%PDF c"),
        ])
        .unwrap();

    let (outcomes, result) =
        run_batch(&session, storage.clone(), catalog.clone(), tracker.clone()).await;

    // Exactly one outcome per file at session start.
    assert_eq!(outcomes.len(), 3);
    assert_eq!(result.success_count + result.failure_count, 3);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.status, SessionStatus::Partial);

    // Every file was attempted exactly once.
    assert_eq!(storage.put_count(), 3);

    // Only the succeeded files were cataloged.
    assert_eq!(catalog.inserted_titles(), vec!["a", "c"]);

    // The failed file stays queued for retry, reindexed from zero.
    let remaining = session.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].file.name, "b.pdf");
    assert_eq!(remaining[0].queue_index, 0);
    assert_eq!(session.status(), SessionStatus::Partial);

    // Progress slots are destroyed with their terminal outcomes.
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn retry_attempts_only_files_still_queued() {
    let storage = FlakyStorage::new(Some(b"FAIL"));
    let catalog = FlakyCatalog::new(&[]);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session
        .add(vec![pdf("a.pdf", "%PDF a"), pdf("b.pdf", "FAIL b")])
        .unwrap();

    let (_, result) =
        run_batch(&session, storage.clone(), catalog.clone(), tracker.clone()).await;
    assert_eq!(result.status, SessionStatus::Partial);
    assert_eq!(storage.put_count(), 2);

    // The storage recovers; re-entering uploading from a terminal state
    // retries only what is still queued.
    storage.heal();
    let (outcomes, result) =
        run_batch(&session, storage.clone(), catalog.clone(), tracker).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0.file.name, "b.pdf");
    assert_eq!(result.status, SessionStatus::Success);
    assert_eq!(storage.put_count(), 3);
    assert!(session.snapshot().is_empty());
    assert_eq!(catalog.inserted_titles(), vec!["a", "b"]);
}

#[tokio::test]
async fn missing_identity_fails_before_any_transfer() {
    let storage = FlakyStorage::new(None);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session.add(vec![pdf("a.pdf", "%PDF a")]).unwrap();
    let files = session.begin().unwrap();

    let orchestrator = TransferOrchestrator::new(storage.clone(), tracker, 2);
    let cancel = CancellationToken::new();
    let err = orchestrator.run(files, None, &cancel).await.unwrap_err();

    assert_eq!(err, UploadError::Unauthenticated);
    assert_eq!(storage.put_count(), 0);

    // The queue is untouched by the aborted run.
    session.abort();
    assert_eq!(session.snapshot().len(), 1);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn catalog_failure_demotes_stored_file_to_failure() {
    let storage = FlakyStorage::new(None);
    let catalog = FlakyCatalog::new(&["b"]);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session
        .add(vec![pdf("a.pdf", "%PDF a"), pdf("b.pdf", "%PDF b")])
        .unwrap();

    let (outcomes, result) = run_batch(&session, storage, catalog.clone(), tracker).await;

    assert_eq!(result.status, SessionStatus::Partial);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);

    let (_, b_outcome) = outcomes
        .iter()
        .find(|(file, _)| file.file.name == "b.pdf")
        .unwrap();
    assert!(matches!(
        b_outcome,
        TransferOutcome::Failure {
            reason: UploadError::MetadataPersistFailed(_)
        }
    ));

    // Partial-persisted files stay queued like any other failure.
    let remaining = session.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].file.name, "b.pdf");
    assert_eq!(catalog.inserted_titles(), vec!["a"]);
}

#[tokio::test]
async fn cancellation_yields_one_outcome_per_file() {
    let storage = FlakyStorage::new(None);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session
        .add(vec![pdf("a.pdf", "%PDF a"), pdf("b.pdf", "%PDF b")])
        .unwrap();
    let files = session.begin().unwrap();

    let orchestrator = TransferOrchestrator::new(storage.clone(), tracker, 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcomes = orchestrator
        .run(files, Some(&identity()), &cancel)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    for (_, outcome) in &outcomes {
        assert!(matches!(
            outcome,
            TransferOutcome::Failure {
                reason: UploadError::Cancelled
            }
        ));
    }
    assert_eq!(storage.put_count(), 0);

    let result = OutcomeAggregator::aggregate(&outcomes);
    assert_eq!(result.status, SessionStatus::Error);
    assert_eq!(result.failure_count, 2);
}

#[tokio::test]
async fn outcomes_are_reported_in_queue_order() {
    let storage = FlakyStorage::new(None);
    let catalog = FlakyCatalog::new(&[]);
    let tracker = Arc::new(ProgressTracker::new());

    let session = UploadSession::new(policy());
    session
        .add(vec![
            pdf("a.pdf", "%PDF a"),
            pdf("b.pdf", "%PDF b"),
            pdf("c.pdf", "%PDF c"),
            pdf("d.pdf", "%PDF d"),
        ])
        .unwrap();

    let (outcomes, result) = run_batch(&session, storage, catalog, tracker).await;

    assert_eq!(result.status, SessionStatus::Success);
    let names: Vec<_> = outcomes
        .iter()
        .map(|(file, _)| file.file.name.as_str())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);
}
