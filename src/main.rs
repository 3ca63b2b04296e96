use std::io::{self, Write};
use std::time::Duration;

use clap::{CommandFactory, Parser};
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod net;
mod payload;
mod progress;
mod report;
mod transfer;

use cli::args::{Cli, Commands, GenerateArgs, ProbeArgs, ServeArgs};
use config::types::{AppConfig, Verbosity};
use error::SpeedError;
use net::downloader::{run_probe, DownloadEvent, Downloader, ProbeEvent};
use payload::encoder::PayloadEncoder;
use payload::PayloadSpec;
use progress::bar::create_download_progress;
use report::format::format_bytes;
use report::summary;

fn main() {
    let cli = Cli::parse();

    // Convert CLI flags to verbosity level
    let verbosity = Verbosity::from((cli.quiet, cli.verbose));

    // RUST_LOG env var overrides CLI flags
    let filter = verbosity.as_tracing_filter();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr) // Keep stdout clean for output
        .init();

    tracing::debug!("Verbosity level: {:?}", verbosity);

    if let Err(err) = run(cli, verbosity) {
        display_error(&err);
        std::process::exit(1);
    }
}

/// Execute the dispatched command.
fn run(cli: Cli, verbosity: Verbosity) -> Result<(), SpeedError> {
    match cli.command {
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "imgspeed", &mut io::stdout());
            Ok(())
        }
        command => {
            let config = AppConfig::load(cli.config.as_deref())?;
            match command {
                Commands::Serve(args) => serve(args, &config, verbosity),
                Commands::Probe(args) => probe(args, &config, verbosity),
                Commands::Generate(args) => generate(args, &config, verbosity),
                Commands::Completions(_) => Ok(()),
            }
        }
    }
}

fn serve(args: ServeArgs, config: &AppConfig, verbosity: Verbosity) -> Result<(), SpeedError> {
    let host = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);

    tracing::info!(host = %host, port, "Serve command received");
    if !verbosity.is_quiet() {
        eprintln!("Serving test images on http://{}:{} (Ctrl-C to stop)", host, port);
    }
    net::server::run_server_sync(&host, port, config)
}

fn probe(args: ProbeArgs, config: &AppConfig, verbosity: Verbosity) -> Result<(), SpeedError> {
    let url = args.url.unwrap_or_else(|| config.probe.default_url.clone());
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.probe.timeout_secs));
    let runs = args.multiple as usize;
    let downloader = Downloader::new(timeout, config.probe.chunk_size)?;

    let text = !args.json;
    let mut stdout = io::stdout().lock();
    let mut write_error: Option<io::Error> = None;
    let mut bar: Option<ProgressBar> = None;

    if text {
        record(&mut write_error, writeln!(stdout, "Image Download Speed Test"));
        record(&mut write_error, writeln!(stdout, "Testing download speed for: {}", url));
        if runs > 1 {
            record(&mut write_error, writeln!(stdout, "Running {} tests...", runs));
        }
    }

    let outcome = run_probe(&downloader, &url, runs, |event| match event {
        ProbeEvent::RunStarted { run, of } => {
            if text && of > 1 {
                record(&mut write_error, summary::write_run_header(&mut stdout, run, of));
            }
        }
        ProbeEvent::Download(DownloadEvent::Started { total }) => {
            if text {
                record(&mut write_error, summary::write_file_size(&mut stdout, total));
            }
            bar = Some(create_download_progress(total, verbosity.is_quiet() || !text));
        }
        ProbeEvent::Download(DownloadEvent::Progress(progress)) => {
            if let Some(bar) = &bar {
                bar.set_position(progress.downloaded);
            }
        }
        ProbeEvent::RunFinished { run, of, result } => {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
            tracing::debug!(run, of, url = result.url(), ok = result.is_success(), "Run finished");
            if text {
                record(&mut write_error, summary::write_result(&mut stdout, result));
            }
        }
    });

    if text {
        record(&mut write_error, summary::write_probe_summary(&mut stdout, &outcome));
    } else {
        serde_json::to_writer_pretty(&mut stdout, &outcome).map_err(io::Error::from)?;
        writeln!(stdout)?;
    }
    if let Some(err) = write_error {
        return Err(err.into());
    }

    if outcome.succeeded == 0 {
        return Err(SpeedError::ProbeFailed {
            attempted: outcome.attempted,
        });
    }
    Ok(())
}

/// Keep the first write failure; later writes are attempted regardless.
fn record(slot: &mut Option<io::Error>, result: io::Result<()>) {
    if let Err(err) = result {
        slot.get_or_insert(err);
    }
}

fn generate(args: GenerateArgs, config: &AppConfig, verbosity: Verbosity) -> Result<(), SpeedError> {
    let spec = match (args.width, args.height, args.target_kb) {
        (Some(width), Some(height), _) => PayloadSpec::Dimensions { width, height },
        (_, _, Some(target_kb)) => PayloadSpec::TargetSize { target_kb },
        _ => {
            return Err(SpeedError::InvalidRequest(
                "pass --width and --height, or --target-kb".to_string(),
            ))
        }
    };

    let encoder = PayloadEncoder::new(config.encoder.clone());
    let payload = encoder.generate(&spec)?;
    std::fs::write(&args.output, &payload.bytes)?;

    tracing::info!(
        path = %args.output.display(),
        size = payload.size(),
        quality = payload.quality,
        "Payload written"
    );
    if !verbosity.is_quiet() {
        eprintln!(
            "Wrote {} ({}x{}, quality {}, {})",
            args.output.display(),
            payload.width,
            payload.height,
            payload.quality,
            format_bytes(payload.size() as f64),
        );
    }
    Ok(())
}

/// Display a SpeedError with optional suggestion hint to stderr.
fn display_error(err: &SpeedError) {
    eprintln!("error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {}", suggestion);
    }
}
