//! Streaming download probe.
//!
//! Uses reqwest's blocking client and reads the body in fixed-size chunks so
//! the measured duration covers the actual transfer. Every failure is turned
//! into a [`DownloadResult::Failure`]; nothing escapes as an error or panic,
//! which lets a multi-run probe carry on past a bad attempt.

use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Serialize;

use crate::error::SpeedError;

/// Default read size while streaming the body.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Progress emitted while a body is streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    /// Declared `Content-Length`, if any.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completion percentage, only known when the server declared a length.
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| self.downloaded as f64 / total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadEvent {
    /// Response headers received.
    Started { total: Option<u64> },
    /// One chunk consumed.
    Progress(DownloadProgress),
}

/// A completed download.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub url: String,
    pub size_bytes: u64,
    pub content_length: Option<u64>,
    pub duration_secs: f64,
    pub throughput_bps: f64,
}

impl DownloadReport {
    pub fn new(url: &str, size_bytes: u64, content_length: Option<u64>, duration: Duration) -> Self {
        let duration_secs = duration.as_secs_f64();
        Self {
            url: url.to_string(),
            size_bytes,
            content_length,
            duration_secs,
            throughput_bps: throughput(size_bytes, duration_secs),
        }
    }
}

/// Bytes per second, or 0 when the duration is not positive.
pub fn throughput(bytes: u64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        bytes as f64 / duration_secs
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    HttpStatus(u16),
    Network,
    Unexpected,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadFailure {
    pub url: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Outcome of a single download attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadResult {
    Success(DownloadReport),
    Failure(DownloadFailure),
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadResult::Success(_))
    }

    pub fn url(&self) -> &str {
        match self {
            DownloadResult::Success(report) => &report.url,
            DownloadResult::Failure(failure) => &failure.url,
        }
    }
}

/// HTTP client configured for speed probes.
pub struct Downloader {
    client: Client,
    chunk_size: usize,
}

impl Downloader {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration, chunk_size: usize) -> Result<Self, SpeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("imgspeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SpeedError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Download `url`, reporting progress through `on_event`.
    pub fn download<F>(&self, url: &str, mut on_event: F) -> DownloadResult
    where
        F: FnMut(DownloadEvent),
    {
        tracing::info!(url, "Starting download");
        match self.stream(url, &mut on_event) {
            Ok(report) => {
                tracing::info!(
                    url,
                    bytes = report.size_bytes,
                    secs = report.duration_secs,
                    "Download complete"
                );
                DownloadResult::Success(report)
            }
            Err((kind, error)) => {
                tracing::warn!(url, ?kind, %error, "Download failed");
                DownloadResult::Failure(DownloadFailure {
                    url: url.to_string(),
                    kind,
                    error,
                })
            }
        }
    }

    fn stream(
        &self,
        url: &str,
        on_event: &mut dyn FnMut(DownloadEvent),
    ) -> Result<DownloadReport, (FailureKind, String)> {
        let started = Instant::now();

        let response = self.client.get(url).send().map_err(reqwest_failure)?;
        let mut response = response.error_for_status().map_err(reqwest_failure)?;

        let total = response.content_length();
        tracing::debug!(?total, status = %response.status(), "Response headers received");
        on_event(DownloadEvent::Started { total });

        let mut buf = vec![0u8; self.chunk_size];
        let mut downloaded: u64 = 0;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_failure(&e)),
            };
            downloaded += n as u64;
            let progress = DownloadProgress { downloaded, total };
            tracing::trace!(downloaded, percent = ?progress.percent(), "Chunk received");
            on_event(DownloadEvent::Progress(progress));
        }

        Ok(DownloadReport::new(url, downloaded, total, started.elapsed()))
    }
}

fn reqwest_failure(err: reqwest::Error) -> (FailureKind, String) {
    (classify_reqwest(&err), error_chain(&err))
}

fn io_failure(err: &io::Error) -> (FailureKind, String) {
    let kind = if err.kind() == io::ErrorKind::TimedOut {
        FailureKind::Timeout
    } else {
        match err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
        {
            Some(inner) => classify_reqwest(inner),
            None => FailureKind::Unexpected,
        }
    };
    (kind, error_chain(err))
}

fn classify_reqwest(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if let Some(status) = err.status() {
        FailureKind::HttpStatus(status.as_u16())
    } else if err.is_builder() {
        FailureKind::Unexpected
    } else {
        FailureKind::Network
    }
}

/// Render an error and its sources as `outer: inner: root`.
fn error_chain(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let inner_text = inner.to_string();
        if !text.contains(&inner_text) {
            text.push_str(": ");
            text.push_str(&inner_text);
        }
        source = inner.source();
    }
    text
}

/// Results of a sequence of download attempts.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSummary {
    pub attempted: usize,
    pub succeeded: usize,
    /// Mean throughput over successful runs only.
    pub average_throughput_bps: Option<f64>,
    pub results: Vec<DownloadResult>,
}

impl ProbeSummary {
    pub fn from_results(results: Vec<DownloadResult>) -> Self {
        let speeds: Vec<f64> = results
            .iter()
            .filter_map(|result| match result {
                DownloadResult::Success(report) => Some(report.throughput_bps),
                DownloadResult::Failure(_) => None,
            })
            .collect();

        let average_throughput_bps = if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        };

        Self {
            attempted: results.len(),
            succeeded: speeds.len(),
            average_throughput_bps,
            results,
        }
    }
}

/// Events emitted by [`run_probe`].
#[derive(Debug)]
pub enum ProbeEvent<'a> {
    RunStarted { run: usize, of: usize },
    Download(DownloadEvent),
    RunFinished { run: usize, of: usize, result: &'a DownloadResult },
}

/// Download `url` `runs` times, one after another.
pub fn run_probe<F>(downloader: &Downloader, url: &str, runs: usize, mut on_event: F) -> ProbeSummary
where
    F: FnMut(ProbeEvent<'_>),
{
    let runs = runs.max(1);
    let mut results = Vec::with_capacity(runs);

    for run in 1..=runs {
        on_event(ProbeEvent::RunStarted { run, of: runs });
        let result = downloader.download(url, |event| on_event(ProbeEvent::Download(event)));
        on_event(ProbeEvent::RunFinished {
            run,
            of: runs,
            result: &result,
        });
        results.push(result);
    }

    ProbeSummary::from_results(results)
}
