//! Content hashing for store paths and result binaries.
//!
//! Two flavours are provided:
//!
//! - [`tree_hash`]: SHA-256 over the NAR serialization of a file or directory tree, encoded in
//!   Nix base32. This is the same value Nix reports as a path's `narHash`, and it depends on
//!   names, contents, executable bits and symlink targets, never on timestamps or ownership.
//! - [`file_hash`]: plain SHA-256 of a single file's bytes as lowercase hex, used for the result
//!   executable where bit-for-bit identity is what matters.
//!
//! Both are blocking; async callers run them on `spawn_blocking`.

pub mod base32;
pub mod nar;

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::core::{ClosureError, Result};

/// Compute the NAR tree digest of `path`.
///
/// # Examples
///
/// ```rust,no_run
/// use nix_closure::hash::tree_hash;
/// use std::path::Path;
///
/// let digest = tree_hash(Path::new("/nix/store/abc-hello-2.12"))?;
/// assert_eq!(digest.len(), 52);
/// # Ok::<(), nix_closure::core::ClosureError>(())
/// ```
///
/// # Errors
///
/// Returns [`ClosureError::ReadError`] if any entry under `path` cannot be read. No partial
/// digest is ever returned.
pub fn tree_hash(path: &Path) -> Result<String> {
    tree_hash_until(path, &AtomicBool::new(false))
}

/// Compute the NAR tree digest of `path`, giving up once `cancel` is set.
///
/// # Errors
///
/// As [`tree_hash`]; a cancelled hash is a [`ClosureError::ReadError`] of kind
/// [`io::ErrorKind::Interrupted`].
pub fn tree_hash_until(path: &Path, cancel: &AtomicBool) -> Result<String> {
    let mut hasher = Sha256::new();
    nar::dump_path_until(path, &mut hasher, cancel)?;
    let digest = base32::encode(&hasher.finalize());
    tracing::trace!(target: "hash", "{} => {}", path.display(), digest);
    Ok(digest)
}

/// Compute the SHA-256 of a single file as lowercase hex.
///
/// Symlinks are followed, so a wrapper link in `bin/` hashes the file it points to.
///
/// # Errors
///
/// Returns [`ClosureError::ReadError`] if the file cannot be opened or read.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ClosureError::read(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| ClosureError::read(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}
