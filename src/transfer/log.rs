//! Bounded, lock-guarded log of served payloads.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::transfer::TransferObservation;

/// Default number of observations kept.
pub const DEFAULT_CAPACITY: usize = 100;

struct LogState {
    entries: VecDeque<TransferObservation>,
    next_seq: u64,
}

/// Bounded in-memory log of recent transfers.
///
/// Entries are kept in insertion order and capped at `capacity`; the oldest
/// entries are dropped when the cap is exceeded. Every operation takes the
/// same lock, so a snapshot never observes a half-applied append or eviction.
pub struct TransferRecorder {
    state: Mutex<LogState>,
    capacity: usize,
}

impl Default for TransferRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TransferRecorder {
    /// Create an empty log. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(LogState {
                entries: VecDeque::with_capacity(capacity),
                next_seq: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an observation, truncating the oldest if over capacity.
    ///
    /// Returns the sequence number assigned to the entry.
    pub fn append(&self, mut observation: TransferObservation) -> u64 {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        observation.seq = seq;
        state.entries.push_back(observation);

        while state.entries.len() > self.capacity {
            state.entries.pop_front();
        }
        seq
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<TransferObservation> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Remove all entries. Sequence numbers keep increasing.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Poison is ignored: no operation leaves partial state behind.
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadSpec;
    use crate::transfer::ClientInfo;
    use std::sync::Arc;

    fn observation(size: u64) -> TransferObservation {
        TransferObservation::new(
            &PayloadSpec::Dimensions {
                width: 10,
                height: 10,
            },
            size,
            ClientInfo::default(),
            0,
        )
    }

    #[test]
    fn empty_log_returns_empty_snapshot() {
        let log = TransferRecorder::default();
        assert!(log.snapshot().is_empty());
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 100);
    }

    #[test]
    fn append_and_snapshot() {
        let log = TransferRecorder::default();
        log.append(observation(1024));
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].image_size, 1024);
    }

    #[test]
    fn append_beyond_limit_truncates_oldest() {
        let log = TransferRecorder::new(3);
        for i in 0..5 {
            log.append(observation(i * 100));
        }
        let sizes: Vec<u64> = log.snapshot().iter().map(|e| e.image_size).collect();
        assert_eq!(sizes, vec![200, 300, 400]);
    }

    #[test]
    fn hundred_fifty_appends_keep_last_hundred_in_order() {
        let log = TransferRecorder::default();
        for i in 0..150 {
            log.append(observation(i));
        }
        let entries = log.snapshot();
        assert_eq!(entries.len(), 100);
        let sizes: Vec<u64> = entries.iter().map(|e| e.image_size).collect();
        let expected: Vec<u64> = (50..150).collect();
        assert_eq!(sizes, expected);
        assert!(entries.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn clear_empties_log() {
        let log = TransferRecorder::default();
        log.append(observation(1));
        log.append(observation(2));
        log.clear();
        assert!(log.snapshot().is_empty());

        let seq = log.append(observation(3));
        assert_eq!(seq, 2);
    }

    #[test]
    fn snapshot_is_detached_from_log() {
        let log = TransferRecorder::default();
        log.append(observation(1));
        let snap = log.snapshot();
        log.clear();
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let log = Arc::new(TransferRecorder::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.append(observation(i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 400);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let log = Arc::new(TransferRecorder::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.append(observation(i));
                        assert!(log.len() <= 100);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 100);
    }
}
