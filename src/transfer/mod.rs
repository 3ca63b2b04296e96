//! Server-side transfer bookkeeping.
//!
//! - `log`: bounded, lock-guarded log of served payloads
//! - `stats`: summaries computed from a log snapshot

pub mod log;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payload::{PayloadLabel, PayloadSpec};

/// Best-effort identity of the requesting client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One served payload.
#[derive(Debug, Clone, Serialize)]
pub struct TransferObservation {
    /// Assigned by the recorder on append.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub image_size: u64,
    #[serde(flatten)]
    pub payload: PayloadLabel,
    pub generation_ms: u64,
}

impl TransferObservation {
    pub fn new(spec: &PayloadSpec, image_size: u64, client: ClientInfo, generation_ms: u64) -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now(),
            client_ip: client.ip,
            user_agent: client.user_agent,
            image_size,
            payload: spec.label(),
            generation_ms,
        }
    }
}
