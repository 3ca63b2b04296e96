//! Summary statistics over the transfer log.
//!
//! `summarize` works on a snapshot, never on the live log, so the numbers
//! always describe one consistent view.

use serde::Serialize;

use crate::transfer::TransferObservation;

/// Number of entries reported as recent by default.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

const NO_DATA_MESSAGE: &str = "No requests yet";

/// Aggregated numbers for a non-empty log.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSummary {
    pub total_requests: usize,
    pub total_data_served: u64,
    pub average_image_size: f64,
    /// Newest entries, oldest first.
    pub recent_requests: Vec<TransferObservation>,
}

/// Body of the "nothing recorded yet" answer.
#[derive(Debug, Clone, Serialize)]
pub struct NoDataNotice {
    pub message: &'static str,
    pub total_requests: usize,
}

/// Result of a stats query.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatsReport {
    NoData(NoDataNotice),
    Summary(TransferSummary),
}

impl StatsReport {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        matches!(self, StatsReport::NoData(_))
    }
}

/// Compute statistics for a snapshot of the log.
pub fn summarize(entries: &[TransferObservation], recent_window: usize) -> StatsReport {
    if entries.is_empty() {
        return StatsReport::NoData(NoDataNotice {
            message: NO_DATA_MESSAGE,
            total_requests: 0,
        });
    }

    let total_requests = entries.len();
    let total_data_served: u64 = entries.iter().map(|e| e.image_size).sum();
    let average_image_size = total_data_served as f64 / total_requests as f64;
    let recent_start = total_requests.saturating_sub(recent_window);

    StatsReport::Summary(TransferSummary {
        total_requests,
        total_data_served,
        average_image_size,
        recent_requests: entries[recent_start..].to_vec(),
    })
}
