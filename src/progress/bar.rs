use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress display for one download.
///
/// With a known length this is a byte bar with rate and ETA; without one it
/// is a spinner counting bytes. Renders to stderr so piped output stays
/// clean. Returns a hidden bar if quiet mode is active.
pub fn create_download_progress(total_bytes: Option<u64>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = match total_bytes {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {percent:>3}% {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    };
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb
}
