//! Symlink operations (create, read, remove).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::RealRuntime;
use super::path::is_path_under;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn symlink_impl(&self, original: &Path, link: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::symlink as unix_symlink;
            unix_symlink(original, link).context("Failed to create symlink")?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::{symlink_dir, symlink_file};

            if original.is_dir() {
                symlink_dir(original, link).context("Failed to create directory symlink")?;
            } else {
                symlink_file(original, link).context("Failed to create file symlink")?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_link_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).context("Failed to read symlink")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path).context("Failed to remove symlink")?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks need remove_dir, file symlinks remove_file.
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .context("Failed to remove symlink")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_if_target_under_impl(
        &self,
        link_path: &Path,
        target_prefix: &Path,
    ) -> Result<bool> {
        if !self.is_symlink_impl(link_path) {
            if self.exists_impl(link_path) {
                warn!("{:?} exists but is not a symlink, leaving it alone", link_path);
            } else {
                debug!("{:?} does not exist, nothing to unlink", link_path);
            }
            return Ok(false);
        }

        let target = self.read_link_impl(link_path)?;
        let resolved_target = if target.is_relative() {
            link_path.parent().unwrap_or(Path::new(".")).join(&target)
        } else {
            target.clone()
        };

        // Canonicalize both sides when they exist so `..` and nested links agree.
        let canonical_target =
            fs::canonicalize(&resolved_target).unwrap_or_else(|_| resolved_target.clone());
        let canonical_prefix =
            fs::canonicalize(target_prefix).unwrap_or_else(|_| target_prefix.to_path_buf());

        if !is_path_under(&canonical_target, &canonical_prefix) {
            debug!(
                "{:?} points to {:?}, outside {:?}; keeping it",
                link_path, canonical_target, canonical_prefix
            );
            return Ok(false);
        }

        debug!("Removing {:?} -> {:?}", link_path, target);
        self.remove_symlink_impl(link_path)?;
        Ok(true)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_symlink_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        runtime.create_dir_all(&target).unwrap();

        let link = dir.path().join("link");
        runtime.symlink(&target, &link).unwrap();
        assert!(runtime.is_symlink(&link));
        assert!(!runtime.is_symlink(&target));
        assert_eq!(runtime.read_link(&link).unwrap(), target);

        runtime.remove_symlink(&link).unwrap();
        assert!(!runtime.exists(&link));
        assert!(runtime.exists(&target));
    }

    #[test]
    fn test_remove_symlink_if_target_under_success() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let version_dir = dir.path().join("bin/vault/1.0.0");
        runtime.create_dir_all(&version_dir).unwrap();
        let binary = version_dir.join("vault");
        runtime.write(&binary, b"#!/bin/sh").unwrap();

        let link = dir.path().join("vault");
        runtime.symlink(&binary, &link).unwrap();

        assert!(runtime.remove_symlink_if_target_under(&link, &version_dir).unwrap());
        assert!(!runtime.is_symlink(&link));
    }

    #[test]
    fn test_remove_symlink_if_target_under_wrong_prefix() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let v1 = dir.path().join("bin/vault/1.0.0");
        let v2 = dir.path().join("bin/vault/1.0.1");
        runtime.create_dir_all(&v1).unwrap();
        runtime.create_dir_all(&v2).unwrap();
        let binary = v2.join("vault");
        runtime.write(&binary, b"#!/bin/sh").unwrap();

        let link = dir.path().join("vault");
        runtime.symlink(&binary, &link).unwrap();

        assert!(!runtime.remove_symlink_if_target_under(&link, &v1).unwrap());
        assert!(runtime.is_symlink(&link));
    }

    #[test]
    fn test_remove_symlink_if_target_under_relative_link() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let version_dir = dir.path().join("bin/vault/1.0.0");
        runtime.create_dir_all(&version_dir).unwrap();
        runtime.write(&version_dir.join("vault"), b"x").unwrap();

        let link = dir.path().join("vault");
        runtime
            .symlink(std::path::Path::new("bin/vault/1.0.0/vault"), &link)
            .unwrap();

        assert!(runtime.remove_symlink_if_target_under(&link, &version_dir).unwrap());
    }

    #[test]
    fn test_remove_symlink_if_target_under_not_symlink() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file = dir.path().join("vault");
        runtime.write(&file, b"regular file").unwrap();

        assert!(!runtime.remove_symlink_if_target_under(&file, dir.path()).unwrap());
        assert!(runtime.exists(&file));

        let missing = dir.path().join("missing");
        assert!(!runtime.remove_symlink_if_target_under(&missing, dir.path()).unwrap());
    }
}
