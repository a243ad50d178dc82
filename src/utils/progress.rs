//! Progress indicators for long-running closure operations.
//!
//! Wraps `indicatif` with a single style. Setting `NIX_CLOSURE_NO_PROGRESS` (to any value)
//! turns every bar into a hidden one, which is what CI and tests want.
//!
//! ```rust
//! use nix_closure::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new(3);
//! progress.set_message("Annotating store paths");
//! progress.inc(3);
//! progress.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

/// Environment variable that disables progress output.
pub const NO_PROGRESS_ENV: &str = "NIX_CLOSURE_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A cloneable progress bar; clones share the same underlying bar.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a bar for `len` units of work, hidden when progress is disabled.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Create a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set the total amount of work.
    pub fn set_length(&self, len: u64) {
        self.inner.set_length(len);
    }

    /// Set the message shown next to the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advance by `delta` units.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Finish and erase the bar.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg:.bold} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
