//! Resolution facade: (product, token) to the build for this machine.

use log::debug;

use crate::catalog::Build;
use crate::error::ResolveError;
use crate::index::{Index, IndexCache};
use crate::platform::Platform;
use crate::product::{Product, Version};
use crate::runtime::Runtime;
use crate::version::ListingOptions;

/// A fully resolved release.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub product: &'a Product,
    pub version: &'a Version,
    pub build: &'a Build,
}

impl Resolution<'_> {
    pub fn product_name(&self) -> &str {
        self.product.name()
    }

    pub fn version_literal(&self) -> &str {
        self.version.literal()
    }
}

/// Holds the index loaded for this process and the platform to match.
pub struct Resolver {
    index: Index,
    platform: Platform,
}

impl Resolver {
    pub fn new(index: Index, platform: Platform) -> Self {
        Self { index, platform }
    }

    /// Load the index through `cache` and target `platform`.
    pub async fn load<R: Runtime>(
        cache: &IndexCache<'_, R>,
        platform: Platform,
    ) -> Result<Self, ResolveError> {
        let index = Index::load(cache).await?;
        Ok(Self::new(index, platform))
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Product lookup, then version lookup, then platform match. The first
    /// failing stage is reported.
    pub fn resolve(&self, product: &str, token: &str) -> Result<Resolution<'_>, ResolveError> {
        let (product, version) = self.index.get_product_version(product, token)?;
        let build = version.build_for(&self.platform).ok_or_else(|| {
            ResolveError::NoPlatformBuild {
                product: product.name().to_string(),
                version: version.literal().to_string(),
                platform: self.platform.clone(),
            }
        })?;

        debug!(
            "Resolved {} {} for {} to {}",
            product.name(),
            version.literal(),
            self.platform,
            build.url
        );
        Ok(Resolution {
            product,
            version,
            build,
        })
    }

    /// Version literals of `product` passing `options`, oldest first.
    pub fn list_available(
        &self,
        product: &str,
        options: &ListingOptions,
    ) -> Result<Vec<&str>, ResolveError> {
        Ok(self.index.get_product(product)?.list_available(options))
    }
}
