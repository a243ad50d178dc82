//! Test utilities for nix-closure
//!
//! This module provides helpers shared by unit tests and the integration tests under `tests/`:
//! - One-time tracing initialization that writes through the test harness
//! - [`StoreFixture`], a temporary fake store with an output directory and result symlink
//! - [`CannedGraph`], a graph source answering with fixed DOT text
//!
//! # Example
//!
//! ```rust,no_run
//! use nix_closure::test_utils::StoreFixture;
//!
//! let fixture = StoreFixture::new();
//! let pkg = fixture.add_package("aaa-hello-2.12", &[("bin/hello", b"hello")]);
//! fixture.link_result("result", &pkg);
//! ```

pub mod fixtures;

pub use fixtures::{CannedGraph, StoreFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set, that level is used; otherwise
/// `RUST_LOG` is honoured when present and logging stays off when it is not.
///
/// ```bash
/// RUST_LOG=closure=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
