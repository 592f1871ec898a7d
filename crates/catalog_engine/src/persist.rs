use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("parent directory of {path} missing or not writable: {message}")]
    ParentDir { path: PathBuf, message: String },
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Directory a target file lives in; the working directory for bare file names.
fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Ensure the target's parent directory exists; create if missing.
pub fn ensure_parent_dir(target: &Path) -> Result<(), PersistError> {
    let dir = parent_dir(target);
    let fail = |message: String| PersistError::ParentDir {
        path: target.to_path_buf(),
        message,
    };
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| fail(e.to_string()))?;
        if !meta.is_dir() {
            return Err(fail("parent is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
    }
    Ok(())
}

/// Atomically replace `target` with `content`: write a sibling temp file, then rename.
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(target: &Path, content: &str) -> Result<(), PersistError> {
    ensure_parent_dir(target)?;

    let io_err = |source: io::Error| PersistError::Io {
        path: target.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(parent_dir(target)).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.as_file_mut().sync_all().map_err(io_err)?;
    tmp.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Delete `path`; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<(), PersistError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PersistError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
