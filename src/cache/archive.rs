//! cache::archive
//!
//! Unpacking module archives into scratch directories.
//!
//! Module zips store every file under a single `<path>@<version>/` directory.
//! That prefix is stripped so the module root lands directly in the
//! destination. Entries that would escape the destination are rejected.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::CacheError;
use crate::core::types::ModuleIdentity;

/// Normalize an entry path, rejecting absolute and parent components.
fn safe_rel_path(p: &Path) -> Result<PathBuf, CacheError> {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::Normal(seg) => out.push(seg),
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(CacheError::UnsafeEntry(p.display().to_string()))
            }
        }
    }
    Ok(out)
}

fn io_err(path: &Path, e: io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Unpack the archive of `id` into `dst`.
///
/// Returns the number of files written.
///
/// # Errors
///
/// - `Io` if the archive cannot be read or a file cannot be written
/// - `Archive` if the zip is malformed or an entry lies outside the
///   module prefix
/// - `UnsafeEntry` if an entry path is absolute or contains `..`
pub fn unpack_module(archive: &Path, id: &ModuleIdentity, dst: &Path) -> Result<usize, CacheError> {
    let file = fs::File::open(archive).map_err(|e| io_err(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| CacheError::Archive {
        path: archive.to_path_buf(),
        message: e.to_string(),
    })?;
    let prefix = PathBuf::from(id.archive_prefix());
    fs::create_dir_all(dst).map_err(|e| io_err(dst, e))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| CacheError::Archive {
            path: archive.to_path_buf(),
            message: e.to_string(),
        })?;
        let name = entry.name().to_string();
        if name.is_empty() {
            continue;
        }
        let rel = safe_rel_path(Path::new(&name))?;
        let rel = rel.strip_prefix(&prefix).map_err(|_| CacheError::Archive {
            path: archive.to_path_buf(),
            message: format!("entry '{}' is outside '{}'", name, prefix.display()),
        })?;
        if rel.as_os_str().is_empty() {
            continue;
        }

        let out = dst.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| io_err(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let mut w = fs::File::create(&out).map_err(|e| io_err(&out, e))?;
        io::copy(&mut entry, &mut w).map_err(|e| io_err(&out, e))?;
        written += 1;
    }

    debug!(module = %id, files = written, dst = %dst.display(), "unpacked archive");
    Ok(written)
}
