//! The release index: every product, version and build in one manifest.
//!
//! Construction is two-phase. The manifest bytes are first decoded into the
//! plain [`Manifest`] data, then [`Index::from_manifest`] parses version
//! literals and establishes each product's sorted view.

mod cache;
mod manifest;

use std::collections::BTreeMap;

use crate::catalog::BuildCatalog;
use crate::error::{IndexError, ResolveError};
use crate::product::{Product, Version};
use crate::runtime::Runtime;
use crate::version::VersionKey;

pub use cache::{INDEX_FILE, INDEX_SUFFIX, IndexCache, cache_path};
pub use manifest::{Manifest, ManifestProduct, ManifestVersion};

/// Failure of [`Index::get_product_version`].
///
/// When the product exists but the version does not, the product is kept
/// so the caller can show what is available.
#[derive(Debug)]
pub enum LookupError<'a> {
    Product(ResolveError),
    Version {
        product: &'a Product,
        error: ResolveError,
    },
}

impl<'a> LookupError<'a> {
    pub fn product(&self) -> Option<&'a Product> {
        match self {
            LookupError::Product(_) => None,
            LookupError::Version { product, .. } => Some(product),
        }
    }

    pub fn into_error(self) -> ResolveError {
        match self {
            LookupError::Product(error) | LookupError::Version { error, .. } => error,
        }
    }
}

impl std::fmt::Display for LookupError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Product(error) | LookupError::Version { error, .. } => {
                write!(f, "{}", error)
            }
        }
    }
}

impl std::error::Error for LookupError<'_> {}

impl From<LookupError<'_>> for ResolveError {
    fn from(e: LookupError<'_>) -> Self {
        e.into_error()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    products: BTreeMap<String, Product>,
}

impl Index {
    /// Decode manifest bytes and build the index.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IndexError> {
        Self::from_manifest(manifest::parse(bytes)?)
    }

    pub fn from_manifest(manifest: Manifest) -> Result<Self, IndexError> {
        let mut products = BTreeMap::new();
        for (name, raw) in manifest {
            let mut versions = Vec::with_capacity(raw.versions.len());
            for (literal, raw_version) in raw.versions {
                let key = VersionKey::parse(&literal).map_err(|source| {
                    IndexError::InvalidVersion {
                        product: name.clone(),
                        literal: literal.clone(),
                        source,
                    }
                })?;
                versions.push(
                    Version::new(key, BuildCatalog::new(raw_version.builds))
                        .with_shasums(raw_version.shasums, raw_version.shasums_signature),
                );
            }
            products.insert(name.clone(), Product::from_versions(name, versions));
        }
        Ok(Self { products })
    }

    /// Load the index through the fingerprint-keyed cache.
    pub async fn load<R: Runtime>(cache: &IndexCache<'_, R>) -> Result<Self, IndexError> {
        let bytes = cache.load().await?;
        Self::from_slice(&bytes)
    }

    pub fn get_product(&self, name: &str) -> Result<&Product, ResolveError> {
        self.products
            .get(name)
            .ok_or_else(|| ResolveError::UnknownProduct {
                name: name.to_string(),
                available: self.list_products().into_iter().map(String::from).collect(),
            })
    }

    pub fn get_product_version(
        &self,
        name: &str,
        token: &str,
    ) -> Result<(&Product, &Version), LookupError<'_>> {
        let product = self.get_product(name).map_err(LookupError::Product)?;
        let version = product
            .get_version(token)
            .map_err(|error| LookupError::Version { product, error })?;
        Ok((product, version))
    }

    /// Product names in alphabetical order.
    pub fn list_products(&self) -> Vec<&str> {
        self.products.keys().map(String::as_str).collect()
    }

    /// All version literals of a product, oldest first.
    pub fn list_versions(&self, name: &str) -> Option<Vec<&str>> {
        let product = self.products.get(name)?;
        Some(product.sorted().iter().map(|k| k.as_str()).collect())
    }

    pub fn latest_version(&self, name: &str) -> Option<&str> {
        self.products.get(name)?.latest().map(Version::literal)
    }
}
