//! NAR (Nix ARchive) serialization.
//!
//! A NAR is a canonical, timestamp-free serialization of a file system tree. Every token is a
//! length-prefixed string: a little-endian `u64` length, the bytes, then zero padding up to the
//! next multiple of eight. The grammar is:
//!
//! ```text
//! nar       = "nix-archive-1" node
//! node      = "(" "type" ( regular | symlink | directory ) ")"
//! regular   = "regular" [ "executable" "" ] "contents" <bytes>
//! symlink   = "symlink" "target" <target>
//! directory = "directory" { "entry" "(" "name" <name> "node" node ")" }
//! ```
//!
//! Directory entries appear sorted by their raw file name bytes. Symlinks are recorded by target
//! and never followed, including the root. A link whose target does not exist is still recorded.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use crate::core::{ClosureError, Result};

const NAR_MAGIC: &str = "nix-archive-1";

/// File contents are streamed in chunks of this size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Serialize the tree rooted at `root` into `sink`.
///
/// # Errors
///
/// Returns [`ClosureError::ReadError`] for the first entry that cannot be listed, inspected or
/// read, and for unsupported file types (sockets, devices, FIFOs).
pub fn dump_path<W: Write>(root: &Path, sink: &mut W) -> Result<()> {
    dump_path_until(root, sink, &AtomicBool::new(false))
}

/// Like [`dump_path`], but stops as soon as `cancel` is set.
///
/// The flag is checked before every entry and between content chunks, so a large file does not
/// delay cancellation.
///
/// # Errors
///
/// As [`dump_path`], plus a [`ClosureError::ReadError`] of kind
/// [`io::ErrorKind::Interrupted`] once cancelled.
pub fn dump_path_until<W: Write>(root: &Path, sink: &mut W, cancel: &AtomicBool) -> Result<()> {
    let mut nar = NarWriter {
        sink,
        cancel,
    };
    let sink_error = |e| ClosureError::read(root, e);

    nar.str(NAR_MAGIC).map_err(sink_error)?;

    // depths of directories whose node is still open
    let mut open_dirs: Vec<usize> = Vec::new();

    let walker = WalkDir::new(root).follow_links(false).follow_root_links(false).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        nar.check_cancelled().map_err(|e| ClosureError::read(entry.path(), e))?;
        let depth = entry.depth();

        while open_dirs.last().is_some_and(|&d| d >= depth) {
            let closed = open_dirs.pop().unwrap_or_default();
            nar.close_node(closed).map_err(sink_error)?;
        }

        let path = entry.path();
        if depth > 0 {
            nar.entry(entry.file_name().as_encoded_bytes()).map_err(sink_error)?;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            nar.directory().map_err(sink_error)?;
            open_dirs.push(depth);
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|e| ClosureError::read(path, e))?;
            nar.symlink(target.as_os_str().as_encoded_bytes()).map_err(sink_error)?;
            nar.close_node(depth).map_err(sink_error)?;
        } else if file_type.is_file() {
            let metadata = entry.metadata().map_err(|e| walk_error(root, e))?;
            let mut file = File::open(path).map_err(|e| ClosureError::read(path, e))?;
            nar.regular(is_executable(&metadata), metadata.len(), &mut file)
                .map_err(|e| ClosureError::read(path, e))?;
            nar.close_node(depth).map_err(sink_error)?;
        } else {
            return Err(ClosureError::read(
                path,
                io::Error::new(io::ErrorKind::Unsupported, "unsupported file type"),
            ));
        }
    }

    while let Some(depth) = open_dirs.pop() {
        nar.close_node(depth).map_err(sink_error)?;
    }

    Ok(())
}

fn walk_error(root: &Path, error: walkdir::Error) -> ClosureError {
    let path = error.path().unwrap_or(root).to_path_buf();
    let source = error.into_io_error().unwrap_or_else(|| io::Error::other("file system loop"));
    ClosureError::read(path, source)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

struct NarWriter<'a, W: Write> {
    sink: &'a mut W,
    cancel: &'a AtomicBool,
}

impl<W: Write> NarWriter<'_, W> {
    fn check_cancelled(&self) -> io::Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "hashing cancelled"));
        }
        Ok(())
    }

    fn bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.sink.write_all(&(data.len() as u64).to_le_bytes())?;
        self.sink.write_all(data)?;
        self.pad(data.len() as u64)
    }

    fn str(&mut self, s: &str) -> io::Result<()> {
        self.bytes(s.as_bytes())
    }

    fn pad(&mut self, len: u64) -> io::Result<()> {
        let rem = (len % 8) as usize;
        if rem != 0 {
            self.sink.write_all(&[0u8; 8][..8 - rem])?;
        }
        Ok(())
    }

    fn entry(&mut self, name: &[u8]) -> io::Result<()> {
        self.str("entry")?;
        self.str("(")?;
        self.str("name")?;
        self.bytes(name)?;
        self.str("node")
    }

    fn directory(&mut self) -> io::Result<()> {
        self.str("(")?;
        self.str("type")?;
        self.str("directory")
    }

    fn symlink(&mut self, target: &[u8]) -> io::Result<()> {
        self.str("(")?;
        self.str("type")?;
        self.str("symlink")?;
        self.str("target")?;
        self.bytes(target)
    }

    fn regular(&mut self, executable: bool, len: u64, contents: &mut File) -> io::Result<()> {
        self.str("(")?;
        self.str("type")?;
        self.str("regular")?;
        if executable {
            self.str("executable")?;
            self.str("")?;
        }
        self.str("contents")?;
        self.sink.write_all(&len.to_le_bytes())?;

        let mut reader = contents.take(len);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut copied = 0u64;
        loop {
            self.check_cancelled()?;
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.sink.write_all(&buf[..n])?;
            copied += n as u64;
        }
        if copied != len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank while hashing"));
        }
        self.pad(len)
    }

    /// Close a node, and its surrounding `entry` unless it is the root.
    fn close_node(&mut self, depth: usize) -> io::Result<()> {
        self.str(")")?;
        if depth > 0 {
            self.str(")")?;
        }
        Ok(())
    }
}
