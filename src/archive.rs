//! Release archive extraction.

use anyhow::{Context, Result, bail};
use log::debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::runtime::Runtime;

/// Extractor for the `.zip` archives releases are published as.
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn can_handle(&self, archive_path: &Path) -> bool {
        archive_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }

    /// Unpack every entry of `archive_path` into `extract_to`, returning the
    /// files written. Entries escaping the destination are skipped.
    #[tracing::instrument(skip(self, runtime))]
    pub fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<Vec<PathBuf>> {
        if !self.can_handle(archive_path) {
            bail!("Unsupported archive format: {}", archive_path.display());
        }
        debug!("Extracting {:?} to {:?}...", archive_path, extract_to);

        // ZipArchive needs Read + Seek; Runtime::open only gives Read.
        let mut buffer = Vec::new();
        runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;

        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", archive_path))?;
        if archive.len() == 0 {
            bail!("Archive {:?} is empty", archive_path);
        }

        runtime.create_dir_all(extract_to)?;
        let mut written = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let Some(entry_path) = entry.enclosed_name() else {
                debug!("Skipping entry with unsafe path {:?}", entry.name());
                continue;
            };
            let full_path = extract_to.join(entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
                continue;
            }

            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;
            drop(dest);

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }

            written.push(full_path);
        }

        Ok(written)
    }
}
