use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use utoipa::ToSchema;

/// Per-file transfer progress, as published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferProgress {
    pub file_key: String,
    /// 0..=100, non-decreasing for a given key.
    pub percent: u8,
}

/// Tracks per-file percentages for one upload session.
///
/// Storage callbacks may arrive from whichever task drives that transfer;
/// the map entry lock serializes writers per key, and stale updates (a lower
/// percentage than already recorded) are discarded so observers only ever
/// see a monotonic sequence.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    slots: DashMap<String, u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `(loaded, total)` for a file key. Returns the published
    /// progress, or `None` when the update was stale and dropped.
    pub fn publish(&self, file_key: &str, loaded: u64, total: u64) -> Option<TransferProgress> {
        let percent = clamp_percent(loaded, total);
        match self.slots.entry(file_key.to_string()) {
            Entry::Occupied(mut slot) => {
                if percent <= *slot.get() {
                    return None;
                }
                *slot.get_mut() = percent;
            }
            Entry::Vacant(slot) => {
                slot.insert(percent);
            }
        }
        Some(TransferProgress {
            file_key: file_key.to_string(),
            percent,
        })
    }

    /// Drops the slot for a file that reached its terminal outcome.
    pub fn finish(&self, file_key: &str) {
        self.slots.remove(file_key);
    }

    /// Immutable view of all in-flight files, ordered by key for stable
    /// output.
    pub fn snapshot(&self) -> Vec<TransferProgress> {
        let mut all: Vec<TransferProgress> = self
            .slots
            .iter()
            .map(|slot| TransferProgress {
                file_key: slot.key().clone(),
                percent: *slot.value(),
            })
            .collect();
        all.sort_by(|a, b| a.file_key.cmp(&b.file_key));
        all
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn clamp_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded as u128 * 100) / total as u128;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_per_key() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.publish("k", 30, 100).unwrap().percent, 30);
        assert_eq!(tracker.publish("k", 60, 100).unwrap().percent, 60);
        // A late callback with a lower value is discarded.
        assert!(tracker.publish("k", 45, 100).is_none());
        assert_eq!(tracker.snapshot()[0].percent, 60);
    }

    #[test]
    fn percent_is_clamped() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.publish("k", 250, 100).unwrap().percent, 100);
        let empty = ProgressTracker::new();
        assert_eq!(empty.publish("z", 0, 0).unwrap().percent, 100);
    }

    #[test]
    fn finish_destroys_the_slot() {
        let tracker = ProgressTracker::new();
        tracker.publish("k", 100, 100);
        tracker.finish("k");
        assert!(tracker.is_empty());
    }

    #[test]
    fn snapshot_orders_by_key() {
        let tracker = ProgressTracker::new();
        tracker.publish("b", 10, 100);
        tracker.publish("a", 20, 100);
        let keys: Vec<_> = tracker
            .snapshot()
            .into_iter()
            .map(|p| p.file_key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
