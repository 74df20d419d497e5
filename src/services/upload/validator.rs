use crate::config::UploadPolicy;
use crate::services::upload::types::{CandidateFile, QueuedFile};

/// Outcome of admitting a candidate set. Rejected files carry no per-file
/// cause; the UI treats them as a silent filter, not an error.
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: Vec<QueuedFile>,
    pub rejected: Vec<CandidateFile>,
}

/// Filters a raw candidate set down to admissible files.
///
/// Admissible means: declared content type matches the configured type
/// (compared on the normalized essence, parameters stripped), the declared
/// size is within bounds, and the combined queue stays under `max_files`.
/// Files already queued are never evicted in favor of new ones; excess new
/// files land in `rejected` in arrival order.
///
/// Pure: no side effects, no I/O.
pub fn admit(
    candidates: Vec<CandidateFile>,
    current_queue: &[QueuedFile],
    policy: &UploadPolicy,
) -> Admission {
    let capacity = policy.max_files.saturating_sub(current_queue.len());
    let mut next_index = current_queue.len();

    let mut admission = Admission::default();
    for candidate in candidates {
        if !type_matches(&candidate.declared_type, &policy.accepted_type) {
            admission.rejected.push(candidate);
            continue;
        }
        if candidate.byte_size as usize > policy.max_file_size {
            admission.rejected.push(candidate);
            continue;
        }
        if admission.admitted.len() >= capacity {
            admission.rejected.push(candidate);
            continue;
        }
        admission.admitted.push(QueuedFile {
            queue_index: next_index,
            file: candidate,
        });
        next_index += 1;
    }
    admission
}

/// Compares a declared content type against the accepted one, ignoring
/// parameters (`application/pdf; charset=binary` still matches) and case.
fn type_matches(declared: &str, accepted: &str) -> bool {
    declared
        .parse::<mime::Mime>()
        .map(|m| m.essence_str().eq_ignore_ascii_case(accepted))
        .unwrap_or(false)
}
