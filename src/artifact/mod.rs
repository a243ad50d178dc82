//! Resolution of the top-level build artifact.
//!
//! `nix build` leaves a symlink (usually `result`) in the output directory pointing at the store
//! path of the build. The artifact descriptor combines:
//!
//! - the identity parsed from that store path,
//! - the NAR tree digest of the whole store path (`result_hash`),
//! - a hash of the payload inside it (`binary_hash`):
//!   - a `bin/` directory: SHA-256 of the result executable,
//!   - otherwise an OCI image manifest: the image config digest,
//!   - otherwise empty.
//!
//! When `bin/` holds several entries the entries are sorted by file name and the first one is
//! taken as the result binary, with a warning naming the choice.
//!
//! A manifest that is present but unusable (not JSON, no `config.digest`, or an empty digest) is a
//! [`ClosureError::ManifestError`], never an empty `binary_hash`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{BIN_DIR, MANIFEST_FILE_NAMES, SHA256_DIGEST_PREFIX};
use crate::core::{ClosureError, Result};
use crate::hash::{file_hash, tree_hash};
use crate::store::parse_identity;

/// Identity and hashes of the top-level build output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// NAR tree digest of the resolved store path
    pub result_hash: String,
    /// Digest segment(s) of the resolved store path
    pub result_digest: String,
    /// Hash of the payload; empty when the artifact has no recognised payload
    pub binary_hash: String,
    /// Store path the output symlink resolves to
    pub store_path: PathBuf,
}

/// The subset of an OCI image manifest this crate reads.
#[derive(Debug, Deserialize)]
struct ImageManifest {
    config: Descriptor,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
}

/// Resolve `output_dir/symlink_name` into an [`ArtifactDescriptor`].
///
/// This performs blocking file system I/O.
///
/// # Errors
///
/// - [`ClosureError::SymlinkError`] if the output is not a readable symlink
/// - [`ClosureError::ArtifactResolution`] wrapping the hashing, identity or payload failure
pub fn resolve_artifact(
    output_dir: &Path,
    symlink_name: &str,
    store_root: &Path,
) -> Result<ArtifactDescriptor> {
    let link = output_dir.join(symlink_name);
    let target = fs::read_link(&link).map_err(|source| ClosureError::SymlinkError {
        path: link.clone(),
        source,
    })?;
    // relative link targets are relative to the directory holding the link
    let target = if target.is_absolute() { target } else { output_dir.join(target) };
    tracing::debug!(target: "closure", "{} -> {}", link.display(), target.display());

    let result_hash = tree_hash(&target).map_err(|e| ClosureError::artifact("hash", e))?;
    let identity = parse_identity(&target.to_string_lossy(), store_root)
        .map_err(|e| ClosureError::artifact("identity", e))?;
    let binary_hash = binary_hash(&target).map_err(|e| ClosureError::artifact("binary", e))?;

    Ok(ArtifactDescriptor {
        name: identity.name,
        version: identity.version,
        result_hash,
        result_digest: identity.result_digest,
        binary_hash,
        store_path: target,
    })
}

/// Determine the payload hash of a resolved store path.
///
/// # Errors
///
/// [`ClosureError::NoBinaryFound`] for an empty `bin/`, [`ClosureError::ManifestError`] for an
/// unusable manifest, [`ClosureError::ReadError`] for I/O failures.
pub fn binary_hash(store_path: &Path) -> Result<String> {
    let bin_dir = store_path.join(BIN_DIR);
    if bin_dir.is_dir() {
        let binary = find_result_binary(&bin_dir)?;
        tracing::debug!(target: "closure", "Result binary: {}", binary.display());
        return file_hash(&binary);
    }

    for manifest_name in MANIFEST_FILE_NAMES {
        let manifest = store_path.join(manifest_name);
        if manifest.is_file() {
            tracing::debug!(target: "closure", "Image manifest: {}", manifest.display());
            return manifest_config_digest(&manifest);
        }
    }

    tracing::debug!(
        target: "closure",
        "No bin/ or image manifest in {}; binary hash left empty",
        store_path.display()
    );
    Ok(String::new())
}

/// Pick the result executable inside `bin_dir`.
fn find_result_binary(bin_dir: &Path) -> Result<PathBuf> {
    let mut entries = fs::read_dir(bin_dir)
        .map_err(|e| ClosureError::read(bin_dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| ClosureError::read(bin_dir, e))?;
    entries.sort();

    let Some(first) = entries.first().cloned() else {
        return Err(ClosureError::NoBinaryFound {
            dir: bin_dir.to_path_buf(),
        });
    };

    if entries.len() > 1 {
        tracing::warn!(
            target: "closure",
            "{} contains {} entries; using {} as the result binary",
            bin_dir.display(),
            entries.len(),
            first.display()
        );
    }

    Ok(first)
}

fn manifest_config_digest(path: &Path) -> Result<String> {
    let content = fs::read(path).map_err(|e| ClosureError::read(path, e))?;
    let manifest: ImageManifest =
        serde_json::from_slice(&content).map_err(|e| ClosureError::ManifestError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let digest = manifest.config.digest;
    if digest.is_empty() {
        return Err(ClosureError::ManifestError {
            path: path.to_path_buf(),
            reason: "config.digest is empty".to_string(),
        });
    }
    Ok(digest.strip_prefix(SHA256_DIGEST_PREFIX).unwrap_or(&digest).to_string())
}
