//! Products and their versions.

use std::collections::HashMap;

use crate::catalog::{Build, BuildCatalog};
use crate::error::ResolveError;
use crate::platform::Platform;
use crate::version::{LATEST, ListingOptions, VersionKey, VersionSet};

/// One published version of a product and its builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    key: VersionKey,
    shasums: Option<String>,
    shasums_signature: Option<String>,
    builds: BuildCatalog,
}

impl Version {
    pub fn new(key: VersionKey, builds: BuildCatalog) -> Self {
        Self {
            key,
            shasums: None,
            shasums_signature: None,
            builds,
        }
    }

    pub fn with_shasums(mut self, shasums: Option<String>, signature: Option<String>) -> Self {
        self.shasums = shasums;
        self.shasums_signature = signature;
        self
    }

    /// The version exactly as published.
    pub fn literal(&self) -> &str {
        self.key.as_str()
    }

    pub fn builds(&self) -> &BuildCatalog {
        &self.builds
    }

    /// Name of the SHA256SUMS file published next to the builds, if any.
    pub fn shasums(&self) -> Option<&str> {
        self.shasums.as_deref()
    }

    pub fn shasums_signature(&self) -> Option<&str> {
        self.shasums_signature.as_deref()
    }

    pub fn build_for(&self, platform: &Platform) -> Option<&Build> {
        self.builds.build_for(platform)
    }
}

/// A named product and every version the index knows of.
///
/// `sorted` is rebuilt on every mutation of `versions`, so it is always a
/// permutation of the map keys in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    name: String,
    versions: HashMap<String, Version>,
    sorted: VersionSet,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_versions(name: impl Into<String>, versions: impl IntoIterator<Item = Version>) -> Self {
        let versions = versions
            .into_iter()
            .map(|v| (v.literal().to_string(), v))
            .collect();
        let mut product = Self {
            name: name.into(),
            versions,
            sorted: VersionSet::default(),
        };
        product.sort_versions();
        product
    }

    /// Add or replace a version.
    pub fn insert(&mut self, version: Version) {
        self.versions.insert(version.literal().to_string(), version);
        self.sort_versions();
    }

    fn sort_versions(&mut self) {
        self.sorted = VersionSet::new(self.versions.values().map(|v| v.key.clone()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sorted(&self) -> &VersionSet {
        &self.sorted
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn latest(&self) -> Option<&Version> {
        self.sorted
            .latest()
            .and_then(|k| self.versions.get(k.as_str()))
    }

    /// Resolve `latest` or an exact literal.
    pub fn get_version(&self, token: &str) -> Result<&Version, ResolveError> {
        let found = if token == LATEST {
            self.latest()
        } else {
            self.versions.get(token)
        };
        found.ok_or_else(|| ResolveError::UnknownVersion {
            product: self.name.clone(),
            version: token.to_string(),
        })
    }

    /// Literals passing `options`, oldest first.
    pub fn list_available(&self, options: &ListingOptions) -> Vec<&str> {
        self.sorted
            .filter(options)
            .into_iter()
            .map(|k| k.as_str())
            .collect()
    }
}
