use bytes::Bytes;

/// A file handed over by the user, before validation. Ephemeral: it either
/// becomes a [`QueuedFile`] or is discarded.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub byte_size: u64,
    pub declared_type: String,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            byte_size: data.len() as u64,
            declared_type: declared_type.into(),
            data,
        }
    }
}

/// An admitted file waiting for (or mid) transfer. `queue_index` is the
/// position in insertion order; it is re-derived when an earlier entry is
/// removed.
#[derive(Debug, Clone)]
pub struct QueuedFile {
    pub queue_index: usize,
    pub file: CandidateFile,
}

/// The authenticated owner a batch is uploaded on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
