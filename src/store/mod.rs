//! Interaction with the content-addressed store.
//!
//! - [`identity`]: recover name, version and digest from store path names
//! - [`command`]: run the store's command-line tools with captured output and timeouts

pub mod command;
pub mod identity;

pub use command::{StoreCommand, StoreCommandOutput};
pub use identity::{AppIdentity, clean_name, parse_identity, store_location};
