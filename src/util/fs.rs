//! Filesystem utilities.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Copy a built binary into its install location and mark it executable.
///
/// A missing source is not an error: the build may legitimately not have
/// produced this binary yet. Returns `false` (with a skip notice) in that
/// case, `true` when the copy happened.
pub fn install_binary(src: &Path, dst: &Path) -> Result<bool> {
    if !src.exists() {
        tracing::info!("skipping copy of {}: not built", src.display());
        return Ok(false);
    }

    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;

    make_executable(dst)?;
    Ok(true)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(windows)]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_binary_copies_and_marks_executable() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("built");
        let dst = tmp.path().join("priv").join("app").join("built");
        fs::write(&src, b"#!/bin/sh\necho hi\n").unwrap();

        assert!(install_binary(&src, &dst).unwrap());
        assert!(dst.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&dst).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_install_binary_skips_missing_source() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("never-built");
        let dst = tmp.path().join("out").join("never-built");

        assert!(!install_binary(&src, &dst).unwrap());
        assert!(!dst.exists());
    }
}
