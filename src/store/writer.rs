//! Crash-safe cassette writes

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// Replace the file at `path` with `bytes`
///
/// The bytes go to a temporary sibling which is synced and then renamed
/// over the target, so a crash mid-write leaves the previous file intact.
///
/// # Errors
///
/// Returns error if any step fails; the temporary file is removed
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    if let Err(e) = write_and_rename(&tmp_path, path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    sync_parent(path);
    Ok(())
}

fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Temporary sibling path, hidden and unique per process
fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map_or_else(|| "cassette".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()))
}

/// Persist the rename itself; best effort, directories cannot be synced everywhere
fn sync_parent(path: &Path) {
    if !cfg!(unix) {
        return;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_file_and_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/cassette.json");

        write_atomic(&path, b"hello").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");
        fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_no_temporary_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");

        write_atomic(&path, b"data").unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cassette.json")]);
    }

    #[test]
    fn test_failed_rename_keeps_target_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = temp_dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep.txt"), b"keep").unwrap();

        assert!(write_atomic(&path, b"data").is_err());

        assert!(path.is_dir());
        assert_eq!(fs::read(path.join("keep.txt")).unwrap(), b"keep");
        assert!(!temp_path(&path).exists());
    }
}
