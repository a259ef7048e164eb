//! Atomic file replacement shared by the history store and the config file.
//!
//! Content is written to a temp file in the target's directory, flushed, synced,
//! and then renamed over the target. A crash at any point leaves either the old
//! file or the new one, never a mix. Temp files are named `.<file>-XXXXXX.tmp`
//! so leftovers from an interrupted write can be recognized and swept.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StintError};

const TEMP_SUFFIX: &str = ".tmp";

fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    format!(".{}-", name)
}

fn parent_dir(path: &Path) -> Result<PathBuf> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Ok(PathBuf::from(".")),
        Some(p) => Ok(p.to_path_buf()),
        None => Err(StintError::NoParentDir(path.to_path_buf())),
    }
}

/// Replaces `path` with `content` in one rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = parent_dir(path)?;
    fs_err::create_dir_all(&parent)
        .map_err(|e| StintError::io(format!("creating {}", parent.display()), e))?;

    if let Err(err) = write_then_rename(&parent, path, content) {
        sweep_temp_files(path);
        return Err(StintError::io(format!("writing {}", path.display()), err));
    }
    Ok(())
}

fn write_then_rename(parent: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Removes temp files left behind by earlier interrupted writes of `path`.
/// Best-effort: failures are logged and ignored.
pub(crate) fn sweep_temp_files(path: &Path) {
    let Ok(parent) = parent_dir(path) else {
        return;
    };
    let prefix = temp_prefix(path);
    let entries = match fs_err::read_dir(&parent) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(error = %err, "Skipping temp file sweep");
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
            if let Err(err) = fs_err::remove_file(entry.path()) {
                warn!(error = %err, "Failed to remove leftover temp file");
            }
        }
    }
}
