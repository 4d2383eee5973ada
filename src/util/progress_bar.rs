
use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// Shared function to pull our progress bar styling
pub fn get_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {bar:40.green/white} {pos}/{len} contigs ({percent}); ETA: {eta_precise}; {msg}")
        .expect("progress template is static")
        .with_key("percent", |state: &ProgressState, w: &mut dyn std::fmt::Write| write!(w, "{:.1}%", state.fraction()*100.0).unwrap_or_default())
        .progress_chars("=>-")
}

/// Creates a styled bar for `num_contigs` contigs; hidden when `quiet` is set
pub fn contig_progress_bar(num_contigs: u64, quiet: bool) -> ProgressBar {
    if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(num_contigs).with_style(get_progress_style())
    }
}
