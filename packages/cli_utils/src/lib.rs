#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the deprivation overlay CLI.
//!
//! [`OverlayProgress`] renders the overlay's stage and pair progress as one
//! `indicatif` bar, and [`init_logger`] sets up `indicatif-log-bridge` so
//! that `log::info!` and friends are suspended while the bar redraws.

use std::time::Duration;

use deprivation_overlay::progress::{OverlayStage, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// A single bar that follows an overlay run stage by stage.
///
/// Stages without a known pair count (candidate search) show as a spinner.
/// Stages with one switch to a bar counting pairs with throughput and ETA.
pub struct OverlayProgress {
    bar: ProgressBar,
    spinner_style: ProgressStyle,
    pairs_style: ProgressStyle,
}

impl OverlayProgress {
    /// Adds the run's bar to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));

        let spinner_style = ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pairs_style = ProgressStyle::with_template(
            "{prefix:.bold.dim} {msg:<32} {wide_bar:.green/dim} {pos}/{len} pairs ({per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

        bar.set_style(spinner_style.clone());

        Self {
            bar,
            spinner_style,
            pairs_style,
        }
    }
}

impl ProgressCallback for OverlayProgress {
    fn start_stage(&self, stage: OverlayStage, pairs: Option<u64>) {
        self.bar
            .set_prefix(format!("[{}/{}]", stage.step(), OverlayStage::ALL.len()));
        self.bar.set_message(stage.label());
        self.bar.set_position(0);

        match pairs {
            Some(total) => {
                self.bar.set_length(total);
                self.bar.set_style(self.pairs_style.clone());
            }
            None => {
                self.bar.unset_length();
                self.bar.set_style(self.spinner_style.clone());
            }
        }
    }

    fn advance(&self, pairs: u64) {
        self.bar.inc(pairs);
    }

    fn finish(&self, summary: String) {
        self.bar.set_style(self.spinner_style.clone());
        self.bar.finish_with_message(summary);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
