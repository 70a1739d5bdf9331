#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the postcode map.
//!
//! Provides an `indicatif` spinner behind the [`SearchProgress`] trait, plus
//! [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while the spinner redraws.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use postcode_map_pipeline::{SearchProgress, SubmissionState};

pub use indicatif::MultiProgress;

/// An `indicatif` spinner that follows a submission through its states.
///
/// The spinner stays up from `Validating` until the submission reaches
/// `Success` or `Failed`, then clears itself so the caller can print the
/// outcome.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    /// Adds a spinner to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        Self { bar }
    }
}

impl SearchProgress for SpinnerProgress {
    fn on_transition(&self, state: SubmissionState) {
        if state.is_terminal() {
            self.bar.finish_and_clear();
        } else {
            self.bar.set_message(state.label());
        }
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
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
        .ok(); // already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
