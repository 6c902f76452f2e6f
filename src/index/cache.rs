//! Fingerprint-keyed cache of the raw release manifest.
//!
//! The manifest endpoint is probed for its ETag. The ETag names a
//! write-once file under the cache root; when that file is readable the
//! response body is never consumed. Otherwise the body is read, persisted
//! and returned. Entries are never overwritten or expired here.

use log::{debug, info};
use reqwest::header::ETAG;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use crate::runtime::path::partial_path;

/// Path of the manifest below the releases base URL.
pub const INDEX_FILE: &str = "index.json";

/// Suffix appended to the fingerprint to form the cache file name.
pub const INDEX_SUFFIX: &str = ".index.json";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// `<cache_dir>/<fingerprint>/<fingerprint>.index.json`
pub fn cache_path(cache_dir: &Path, fingerprint: &str) -> PathBuf {
    cache_dir
        .join(fingerprint)
        .join(format!("{}{}", fingerprint, INDEX_SUFFIX))
}

pub struct IndexCache<'a, R: Runtime> {
    runtime: &'a R,
    http: &'a HttpClient,
    releases_url: String,
    cache_dir: PathBuf,
}

impl<'a, R: Runtime> IndexCache<'a, R> {
    pub fn new(
        runtime: &'a R,
        http: &'a HttpClient,
        releases_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            http,
            releases_url: releases_url.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn index_url(&self) -> String {
        format!("{}/{}", self.releases_url.trim_end_matches('/'), INDEX_FILE)
    }

    /// Raw manifest bytes for the release index currently served.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<u8>, IndexError> {
        let url = self.index_url();
        let response = self
            .http
            .probe(&url)
            .await
            .map_err(|e| IndexError::Transport {
                url: url.clone(),
                source: e.into(),
            })?;

        let fingerprint = fingerprint(
            &url,
            response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok()),
        )?;
        let path = cache_path(&self.cache_dir, &fingerprint);

        match self.runtime.read(&path) {
            Ok(bytes) => {
                debug!("Release index {} served from {:?}", fingerprint, path);
                return Ok(bytes);
            }
            Err(e) => debug!("Release index cache miss at {:?}: {:#}", path, e),
        }

        info!("Fetching release index {} from {}...", fingerprint, url);
        let body = response
            .bytes()
            .await
            .map_err(|e| IndexError::Transport {
                url: url.clone(),
                source: e.into(),
            })?
            .to_vec();

        self.persist(&path, &body)
            .map_err(|e| IndexError::CacheWrite {
                path: path.clone(),
                source: e.into(),
            })?;

        Ok(body)
    }

    /// Write the entry beside its final path and rename it into place, so a
    /// reader never sees a partial file under the fingerprint's name.
    fn persist(&self, path: &Path, body: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            self.create_private_dirs(parent)?;
        }

        let partial = partial_path(path);
        let written = self
            .runtime
            .write(&partial, body)
            .and_then(|_| self.runtime.set_permissions(&partial, FILE_MODE))
            .and_then(|_| self.runtime.rename(&partial, path));
        if let Err(e) = written {
            if let Err(cleanup) = self.runtime.remove_file(&partial) {
                debug!("Failed to remove {:?}: {}", partial, cleanup);
            }
            return Err(e);
        }

        debug!("Cached release index at {:?}", path);
        Ok(())
    }

    /// Create `dir` and its missing ancestors. Every directory created here
    /// is restricted to the owner; existing ones are left alone.
    fn create_private_dirs(&self, dir: &Path) -> anyhow::Result<()> {
        let missing: Vec<&Path> = dir
            .ancestors()
            .take_while(|d| !d.as_os_str().is_empty() && !self.runtime.exists(d))
            .collect();

        self.runtime.create_dir_all(dir)?;
        for created in missing.iter().rev() {
            self.runtime.set_permissions(created, DIR_MODE)?;
        }
        Ok(())
    }
}

/// Extract the cache key from an ETag header value: weak marker and
/// surrounding quotes removed. The result must be usable as a single path
/// component.
fn fingerprint(url: &str, etag: Option<&str>) -> Result<String, IndexError> {
    let raw = etag.unwrap_or_default().trim();
    let value = raw.strip_prefix("W/").unwrap_or(raw).trim_matches('"');

    if value.is_empty() {
        return Err(IndexError::MissingFingerprint {
            url: url.to_string(),
        });
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(IndexError::InvalidFingerprint {
            url: url.to_string(),
            fingerprint: value.to_string(),
        });
    }
    Ok(value.to_string())
}
