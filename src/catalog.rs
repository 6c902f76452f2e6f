//! Per-version build catalog keyed by platform.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::platform::Platform;

/// One downloadable artifact of a product version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub os: String,
    pub arch: String,
    pub filename: String,
    pub url: String,
    /// Hex digest when the manifest publishes one. Never verified here.
    #[serde(default, alias = "sha256", skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Build {
    pub fn platform(&self) -> Platform {
        Platform::new(&self.os, &self.arch)
    }
}

/// Builds of one version, at most one per (os, arch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildCatalog {
    builds: BTreeMap<Platform, Build>,
}

impl BuildCatalog {
    /// Index builds by platform. A repeated platform keeps its first entry.
    pub fn new(builds: impl IntoIterator<Item = Build>) -> Self {
        let mut map = BTreeMap::new();
        for build in builds {
            let platform = build.platform();
            if map.contains_key(&platform) {
                debug!("Ignoring duplicate build {} for {}", build.filename, platform);
                continue;
            }
            map.insert(platform, build);
        }
        Self { builds: map }
    }

    /// The build whose os and arch both equal `platform`'s. No fallback.
    pub fn build_for(&self, platform: &Platform) -> Option<&Build> {
        self.builds.get(platform)
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }
}
