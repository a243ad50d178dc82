//! Identity recovery from store path names.
//!
//! Store paths are named `<digest>-<name>-<version>`. Package names may contain hyphens
//! themselves, so the name is split from the right: the version is the trailing segment, the
//! name the one before it, and the digest is everything else.

use serde::Serialize;
use std::path::Path;

use crate::core::{ClosureError, Result};

/// Name, version and digest recovered from a store path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppIdentity {
    /// Leading digest segment(s) of the store path
    pub result_digest: String,
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
}

/// Parse an [`AppIdentity`] from a store path.
///
/// The `store_root` prefix (with or without trailing slash) is stripped when present. The
/// remainder must split into at least three hyphen-separated segments.
///
/// # Examples
///
/// ```rust
/// use nix_closure::store::parse_identity;
/// use std::path::Path;
///
/// let id = parse_identity("/nix/store/abc123-hello-2.12", Path::new("/nix/store")).unwrap();
/// assert_eq!(id.name, "hello");
/// assert_eq!(id.version, "2.12");
/// assert_eq!(id.result_digest, "abc123");
/// ```
///
/// # Errors
///
/// Returns [`ClosureError::MalformedPath`] when fewer than three segments remain.
pub fn parse_identity(path: &str, store_root: &Path) -> Result<AppIdentity> {
    let relative = strip_store_root(path, store_root);
    let parts: Vec<&str> = relative.split('-').collect();
    if parts.len() < 3 {
        return Err(ClosureError::MalformedPath {
            path: relative.to_string(),
        });
    }

    let version = parts[parts.len() - 1];
    let name = parts[parts.len() - 2];
    Ok(AppIdentity {
        result_digest: parts[..parts.len() - 2].join("-"),
        name: name.to_string(),
        version: version.to_string(),
    })
}

fn strip_store_root<'a>(path: &'a str, store_root: &Path) -> &'a str {
    let root = store_root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path;
    }
    path.strip_prefix(root).and_then(|rest| rest.strip_prefix('/')).unwrap_or(path)
}

/// Remove the DOT quoting from a node name.
///
/// Strips every leading and trailing `"` and unescapes `\"` sequences.
pub fn clean_name(raw: &str) -> String {
    raw.trim_matches('"').replace("\\\"", "\"")
}

/// Resolve a cleaned node name to a location in the store.
///
/// Absolute names are used as-is; bare store path names are joined onto `store_root`.
pub fn store_location(name: &str, store_root: &Path) -> std::path::PathBuf {
    let path = Path::new(name);
    if path.is_absolute() { path.to_path_buf() } else { store_root.join(path) }
}
