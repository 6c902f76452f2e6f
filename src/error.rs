//! Error types for index loading and release resolution.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::platform::Platform;
use crate::version::VersionError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failures while obtaining or decoding the release index.
///
/// None of these are recoverable for the current invocation: there is no
/// retry at this level and no fallback to a stale cache entry.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to fetch release index from {url}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("release index at {url} carries no ETag, cannot cache it")]
    MissingFingerprint { url: String },

    #[error("release index at {url} has an unusable ETag {fingerprint:?}")]
    InvalidFingerprint { url: String, fingerprint: String },

    #[error("failed to write release index cache {}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("malformed release index")]
    Parse(#[from] serde_json::Error),

    #[error("product {product} lists an invalid version {literal:?}")]
    InvalidVersion {
        product: String,
        literal: String,
        #[source]
        source: VersionError,
    },
}

/// Pipeline stage that produced a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ManifestLoad,
    ProductLookup,
    VersionLookup,
    PlatformMatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ManifestLoad => write!(f, "manifest load"),
            Stage::ProductLookup => write!(f, "product lookup"),
            Stage::VersionLookup => write!(f, "version lookup"),
            Stage::PlatformMatch => write!(f, "platform match"),
        }
    }
}

/// The first failure met while turning (product, token) into a build.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    ManifestLoad(#[from] IndexError),

    #[error("unknown product {name:?} (available: {})", available.join(", "))]
    UnknownProduct { name: String, available: Vec<String> },

    #[error("unknown version {version:?} of {product}")]
    UnknownVersion { product: String, version: String },

    #[error("no build of {product} {version} available for {platform}")]
    NoPlatformBuild {
        product: String,
        version: String,
        platform: Platform,
    },
}

impl ResolveError {
    pub fn stage(&self) -> Stage {
        match self {
            ResolveError::ManifestLoad(_) => Stage::ManifestLoad,
            ResolveError::UnknownProduct { .. } => Stage::ProductLookup,
            ResolveError::UnknownVersion { .. } => Stage::VersionLookup,
            ResolveError::NoPlatformBuild { .. } => Stage::PlatformMatch,
        }
    }
}
