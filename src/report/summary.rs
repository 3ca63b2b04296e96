//! Console output for probe results.
//!
//! Everything writes to a caller-supplied `Write` so the CLI can target
//! stdout while tests capture into a buffer.

use std::io::{self, Write};

use crate::net::downloader::{DownloadFailure, DownloadReport, DownloadResult, ProbeSummary};
use crate::report::format::{format_bytes, format_speed, SpeedBand};

const RULE: &str = "==================================================";

/// Announce the payload size once headers arrive.
pub fn write_file_size<W: Write>(out: &mut W, total: Option<u64>) -> io::Result<()> {
    match total {
        Some(total) => writeln!(out, "File size: {}", format_bytes(total as f64)),
        None => writeln!(out, "File size: Unknown (streaming)"),
    }
}

pub fn write_result<W: Write>(out: &mut W, result: &DownloadResult) -> io::Result<()> {
    match result {
        DownloadResult::Success(report) => write_report(out, report),
        DownloadResult::Failure(failure) => write_failure(out, failure),
    }
}

fn write_report<W: Write>(out: &mut W, report: &DownloadReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "DOWNLOAD SPEED TEST RESULTS")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "URL: {}", report.url)?;
    writeln!(out, "File size: {}", format_bytes(report.size_bytes as f64))?;
    writeln!(out, "Download time: {:.2} seconds", report.duration_secs)?;
    writeln!(out, "Download speed: {}", format_speed(report.throughput_bps))?;
    writeln!(out, "{}", RULE)?;
    writeln!(
        out,
        "{}",
        SpeedBand::classify(report.throughput_bps).description()
    )
}

fn write_failure<W: Write>(out: &mut W, failure: &DownloadFailure) -> io::Result<()> {
    writeln!(out, "Test failed: {}", failure.error)
}

/// Header printed before each run of a multi-run probe.
pub fn write_run_header<W: Write>(out: &mut W, run: usize, of: usize) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "--- Test {}/{} ---", run, of)
}

/// Average line for multi-run probes. Prints nothing for a single run or
/// when every run failed.
pub fn write_probe_summary<W: Write>(out: &mut W, summary: &ProbeSummary) -> io::Result<()> {
    if summary.attempted <= 1 {
        return Ok(());
    }
    match summary.average_throughput_bps {
        Some(average) => {
            writeln!(out)?;
            writeln!(out, "AVERAGE SPEED: {}", format_speed(average))?;
            writeln!(
                out,
                "Tests completed: {}/{}",
                summary.succeeded, summary.attempted
            )
        }
        None => writeln!(out, "\nAll {} tests failed", summary.attempted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::downloader::FailureKind;

    const MB: f64 = 1024.0 * 1024.0;

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn report(bps: f64) -> DownloadReport {
        DownloadReport {
            url: "http://localhost:5000/image/1920/1080".to_string(),
            size_bytes: 2 * 1024 * 1024,
            content_length: Some(2 * 1024 * 1024),
            duration_secs: 0.5,
            throughput_bps: bps,
        }
    }

    #[test]
    fn success_block_has_size_speed_and_band() {
        let text = render(|out| write_result(out, &DownloadResult::Success(report(12.0 * MB))));
        assert!(text.contains("DOWNLOAD SPEED TEST RESULTS"));
        assert!(text.contains("File size: 2.00 MB"));
        assert!(text.contains("Download time: 0.50 seconds"));
        assert!(text.contains("Download speed: 12.00 MB/s"));
        assert!(text.contains("Excellent speed!"));
    }

    #[test]
    fn failure_line_carries_error() {
        let result = DownloadResult::Failure(DownloadFailure {
            url: "http://localhost/missing".to_string(),
            kind: FailureKind::HttpStatus(404),
            error: "HTTP status client error (404 Not Found)".to_string(),
        });
        let text = render(|out| write_result(out, &result));
        assert_eq!(text, "Test failed: HTTP status client error (404 Not Found)\n");
    }

    #[test]
    fn file_size_line_handles_unknown_length() {
        assert_eq!(
            render(|out| write_file_size(out, Some(1536))),
            "File size: 1.50 KB\n"
        );
        assert_eq!(
            render(|out| write_file_size(out, None)),
            "File size: Unknown (streaming)\n"
        );
    }

    #[test]
    fn multi_run_average_line() {
        let summary = ProbeSummary::from_results(vec![
            DownloadResult::Success(report(2.0 * MB)),
            DownloadResult::Success(report(4.0 * MB)),
            DownloadResult::Success(report(6.0 * MB)),
        ]);
        let text = render(|out| write_probe_summary(out, &summary));
        assert!(text.contains("AVERAGE SPEED: 4.00 MB/s"));
        assert!(text.contains("Tests completed: 3/3"));
    }

    #[test]
    fn single_run_has_no_average_line() {
        let summary = ProbeSummary::from_results(vec![DownloadResult::Success(report(MB))]);
        assert!(render(|out| write_probe_summary(out, &summary)).is_empty());
    }

    #[test]
    fn run_header_numbers_runs() {
        assert!(render(|out| write_run_header(out, 2, 5)).contains("--- Test 2/5 ---"));
    }
}
