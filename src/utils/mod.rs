//! Supporting utilities
//!
//! - [`progress`] - Progress bars for long-running operations

pub mod progress;

pub use progress::ProgressBar;
