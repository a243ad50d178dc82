//! Integration test suite for nix-closure
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **closure_build**: the library pipeline over a fake store with a canned graph source
//! - **cli**: the `nix-closure` binary, using a shell script in place of the store's graph tool

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

#[cfg(unix)]
mod cli;
#[cfg(unix)]
mod closure_build;
