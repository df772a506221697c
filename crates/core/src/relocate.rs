use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DedupError, Result};

/// Moves `path` into `dest_dir` and returns the new location.
///
/// A same-named file already in `dest_dir` is never overwritten; the
/// moved file gets a `-N` suffix instead. When a plain rename fails (for
/// example across filesystems) the file is copied and the source removed.
pub fn relocate(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let target = reserve_target(path, dest_dir)?;
    move_to(path, &target)?;
    Ok(target)
}

/// Creates `dest_dir` and picks the free path `path` would be moved to,
/// without moving anything.
pub fn reserve_target(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|source| DedupError::Relocation {
        path: path.to_path_buf(),
        dest: dest_dir.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .ok_or_else(|| DedupError::Config(format!("{} has no file name", path.display())))?;
    Ok(free_target(dest_dir, name))
}

/// Moves `path` to exactly `target`, usually one picked by
/// [`reserve_target`].
pub fn move_to(path: &Path, target: &Path) -> Result<()> {
    let fail = |source: std::io::Error| DedupError::Relocation {
        path: path.to_path_buf(),
        dest: target.to_path_buf(),
        source,
    };
    match fs::rename(path, target) {
        Ok(()) => {
            debug!(from = %path.display(), to = %target.display(), "file relocated");
            Ok(())
        }
        Err(err) if path.is_file() => {
            warn!(
                from = %path.display(),
                to = %target.display(),
                error = %err,
                "rename failed, falling back to copy"
            );
            fs::copy(path, target).map_err(fail)?;
            if let Err(remove_err) = fs::remove_file(path) {
                let _ = fs::remove_file(target);
                return Err(fail(remove_err));
            }
            Ok(())
        }
        Err(err) => Err(fail(err)),
    }
}

fn free_target(dest_dir: &Path, name: &std::ffi::OsStr) -> PathBuf {
    let candidate = dest_dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| name.to_os_string());
    let ext = as_path.extension().map(|e| e.to_os_string());
    let mut n = 1usize;
    loop {
        let mut file: OsString = stem.clone();
        file.push(format!("-{n}"));
        if let Some(ext) = &ext {
            file.push(".");
            file.push(ext);
        }
        let candidate = dest_dir.join(&file);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
