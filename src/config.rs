//! Locations and endpoints, resolved once at startup.

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

pub const DEFAULT_RELEASES_URL: &str = "https://releases.hashicorp.com";

/// Products listed and dispatched without `--all`.
pub const CORE_PRODUCTS: &[&str] = &[
    "boundary",
    "consul",
    "consul-template",
    "envconsul",
    "nomad",
    "packer",
    "terraform",
    "vagrant",
    "vault",
    "waypoint",
];

/// Products shipped only as disk images on darwin; downloaded as-is.
pub const DMG_ONLY: &[&str] = &["vagrant"];

pub const ENV_RELEASES_URL: &str = "HASHI_RELEASES_URL";
pub const ENV_CACHE: &str = "HASHI_CACHE";
pub const ENV_BIN: &str = "HASHI_BIN";
pub const ENV_LINKS: &str = "HASHI_LINKS";

pub fn is_core_product(name: &str) -> bool {
    CORE_PRODUCTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL serving `index.json` and the release artifacts.
    pub releases_url: String,
    /// Root of the fingerprint-keyed index cache.
    pub cache_dir: PathBuf,
    /// Install root: `<bin_dir>/<product>/<version>/`.
    pub bin_dir: PathBuf,
    /// Directory holding the one active link per product.
    pub links_dir: PathBuf,
}

impl Settings {
    /// Resolve settings from the environment, with `releases_url` taking
    /// precedence when given (e.g. from a CLI flag).
    #[tracing::instrument(skip(runtime))]
    pub fn from_env<R: Runtime>(runtime: &R, releases_url: Option<String>) -> Result<Self> {
        let releases_url = releases_url
            .or_else(|| non_empty_var(runtime, ENV_RELEASES_URL))
            .unwrap_or_else(|| DEFAULT_RELEASES_URL.to_string());

        let cache_dir = match non_empty_var(runtime, ENV_CACHE) {
            Some(dir) => PathBuf::from(dir),
            None => runtime.temp_dir().join("hashi"),
        };

        let bin_dir = match non_empty_var(runtime, ENV_BIN) {
            Some(dir) => PathBuf::from(dir),
            None => runtime
                .home_dir()
                .context("Could not find home directory; set HASHI_BIN")?
                .join(".hashi-bin"),
        };

        let links_dir = non_empty_var(runtime, ENV_LINKS)
            .map(PathBuf::from)
            .unwrap_or_else(default_links_dir);

        let settings = Self {
            releases_url,
            cache_dir,
            bin_dir,
            links_dir,
        };
        debug!("Using {:?}", settings);
        Ok(settings)
    }

    /// `<bin_dir>/<product>`
    pub fn product_dir(&self, product: &str) -> PathBuf {
        self.bin_dir.join(product)
    }

    /// `<bin_dir>/<product>/<version>`
    pub fn version_dir(&self, product: &str, version: &str) -> PathBuf {
        self.product_dir(product).join(version)
    }

    /// `<bin_dir>/<product>/<version>/<executable>`, what the product link
    /// points at.
    pub fn executable_path(&self, product: &str, version: &str) -> PathBuf {
        self.version_dir(product, version).join(executable_name(product))
    }

    /// `<links_dir>/<product>`
    pub fn link_path(&self, product: &str) -> PathBuf {
        self.links_dir.join(executable_name(product))
    }
}

/// File name of a product's executable on this OS.
pub fn executable_name(product: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", product)
    } else {
        product.to_string()
    }
}

fn non_empty_var<R: Runtime>(runtime: &R, key: &str) -> Option<String> {
    runtime.env_var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(not(windows))]
fn default_links_dir() -> PathBuf {
    PathBuf::from("/usr/local/bin")
}

#[cfg(windows)]
fn default_links_dir() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\hashi\bin")
}
