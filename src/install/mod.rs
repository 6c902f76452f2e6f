//! Artifact lifecycle on disk for a resolved release.
//!
//! Layout: `<bin_dir>/<product>/<version>/<executable>`, with at most one
//! active link per product at `<links_dir>/<product>`.

mod download;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::archive::ZipExtractor;
use crate::catalog::Build;
use crate::config::{Settings, executable_name};
use crate::http::HttpClient;
use crate::resolve::Resolution;
use crate::runtime::Runtime;
use crate::runtime::path::{is_path_under, partial_path, resolve_link_target};
use crate::version::VersionKey;

pub use download::download_file;

/// Installed versions of one product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Installed {
    /// Version the product link currently points into.
    pub current: Option<String>,
    /// Installed version directories, oldest first.
    pub versions: Vec<String>,
}

pub struct Installer<'a, R: Runtime> {
    runtime: &'a R,
    http: &'a HttpClient,
    settings: &'a Settings,
}

impl<'a, R: Runtime> Installer<'a, R> {
    pub fn new(runtime: &'a R, http: &'a HttpClient, settings: &'a Settings) -> Self {
        Self {
            runtime,
            http,
            settings,
        }
    }

    /// Download the build's artifact unchanged to `dest`.
    #[tracing::instrument(skip(self, build))]
    pub async fn download_and_save(&self, build: &Build, dest: &Path) -> Result<PathBuf> {
        let partial = partial_path(dest);
        download_file(self.runtime, &build.url, &partial, self.http).await?;
        self.runtime
            .rename(&partial, dest)
            .with_context(|| format!("Failed to move download into place at {:?}", dest))?;
        Ok(dest.to_path_buf())
    }

    /// Download the build's archive and unpack it into `dest_dir`. Returns the
    /// path of the product's executable.
    #[tracing::instrument(skip(self, build))]
    pub async fn download_and_extract(
        &self,
        build: &Build,
        dest_dir: &Path,
        product: &str,
    ) -> Result<PathBuf> {
        self.runtime.create_dir_all(dest_dir)?;
        let archive = partial_path(&dest_dir.join(&build.filename));
        download_file(self.runtime, &build.url, &archive, self.http).await?;

        let archive_name = dest_dir.join(&build.filename);
        self.runtime.rename(&archive, &archive_name)?;
        let extracted = ZipExtractor.extract(self.runtime, &archive_name, dest_dir);
        if let Err(e) = self.runtime.remove_file(&archive_name) {
            debug!("Failed to remove archive {:?}: {}", archive_name, e);
        }
        let written = extracted?;

        let executable = dest_dir.join(executable_name(product));
        if !written.contains(&executable) {
            bail!(
                "{} does not contain {}",
                build.filename,
                executable_name(product)
            );
        }
        Ok(executable)
    }

    /// Install the release into its version directory. An existing
    /// directory is treated as already installed.
    #[tracing::instrument(skip(self, release))]
    pub async fn install(&self, release: &Resolution<'_>) -> Result<PathBuf> {
        let product = release.product_name();
        let version_dir = self
            .settings
            .version_dir(product, release.version_literal());

        if self.runtime.exists(&version_dir) {
            info!("{} {} is already installed", product, release.version_literal());
            return Ok(version_dir);
        }

        if let Err(e) = self
            .download_and_extract(release.build, &version_dir, product)
            .await
        {
            if self.runtime.exists(&version_dir)
                && let Err(cleanup) = self.runtime.remove_dir_all(&version_dir)
            {
                debug!("Failed to clean up {:?}: {}", version_dir, cleanup);
            }
            return Err(e);
        }

        info!("Installed {} {} to {:?}", product, release.version_literal(), version_dir);
        Ok(version_dir)
    }

    /// Remove an installed version, dropping the product link when it
    /// points into it.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, product: &str, version: &str) -> Result<()> {
        let version_dir = self.settings.version_dir(product, version);
        if !self.runtime.exists(&version_dir) {
            bail!("{} {} is not installed", product, version);
        }

        let link = self.settings.link_path(product);
        if self
            .runtime
            .remove_symlink_if_target_under(&link, &version_dir)?
        {
            info!("Removed link {:?}", link);
        }

        self.runtime
            .remove_dir_all(&version_dir)
            .with_context(|| format!("Failed to remove {:?}", version_dir))?;
        info!("Uninstalled {} {}", product, version);
        Ok(())
    }

    /// Point the product link at this release, installing it first if
    /// needed. Only an existing symlink is replaced.
    #[tracing::instrument(skip(self, release))]
    pub async fn link(&self, release: &Resolution<'_>) -> Result<PathBuf> {
        let product = release.product_name();
        self.install(release).await?;
        let target = self
            .settings
            .executable_path(product, release.version_literal());
        let link = self.settings.link_path(product);

        if self.runtime.is_symlink(&link) {
            self.runtime.remove_symlink(&link)?;
        } else if self.runtime.exists(&link) {
            bail!("{:?} exists and is not a symlink, refusing to replace it", link);
        } else {
            self.runtime.create_dir_all(&self.settings.links_dir)?;
        }

        self.runtime
            .symlink(&target, &link)
            .with_context(|| format!("Failed to link {:?} -> {:?}", link, target))?;
        info!("{:?} -> {:?}", link, target);
        Ok(link)
    }

    /// Installed versions of `product` and the one currently linked.
    #[tracing::instrument(skip(self))]
    pub fn installed(&self, product: &str) -> Result<Installed> {
        let product_dir = self.settings.product_dir(product);
        if !self.runtime.exists(&product_dir) {
            return Ok(Installed::default());
        }

        let mut versions: Vec<String> = self
            .runtime
            .read_dir(&product_dir)?
            .into_iter()
            .filter(|p| self.runtime.is_dir(p))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        versions.sort_by(|a, b| match (VersionKey::parse(a), VersionKey::parse(b)) {
            (Ok(ka), Ok(kb)) => ka.cmp(&kb),
            _ => a.cmp(b),
        });

        Ok(Installed {
            current: self.current_version(product, &product_dir),
            versions,
        })
    }

    fn current_version(&self, product: &str, product_dir: &Path) -> Option<String> {
        let link = self.settings.link_path(product);
        if !self.runtime.is_symlink(&link) {
            return None;
        }
        let target = resolve_link_target(&link, &self.runtime.read_link(&link).ok()?);
        if !is_path_under(&target, product_dir) {
            debug!("{:?} points outside {:?}", link, product_dir);
            return None;
        }
        let version = target.strip_prefix(product_dir).ok()?.components().next()?;
        Some(version.as_os_str().to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::create_zip;
    use crate::index::Index;
    use crate::platform::Platform;
    use crate::resolve::Resolver;
    use crate::runtime::RealRuntime;
    use reqwest::Client;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _dir: TempDir,
        settings: Settings,
        http: HttpClient,
        resolver: Resolver,
    }

    fn fixture(server_url: &str) -> Fixture {
        let dir = tempdir().unwrap();
        let settings = Settings {
            releases_url: server_url.to_string(),
            cache_dir: dir.path().join("cache"),
            bin_dir: dir.path().join("hashi-bin"),
            links_dir: dir.path().join("links"),
        };
        let manifest = format!(
            r#"{{"vault": {{"name": "vault", "versions": {{
                "1.0.0": {{"builds": [{{"os": "linux", "arch": "amd64",
                    "filename": "vault_1.0.0_linux_amd64.zip",
                    "url": "{url}/vault/1.0.0/vault_1.0.0_linux_amd64.zip"}}]}},
                "1.1.0": {{"builds": [{{"os": "linux", "arch": "amd64",
                    "filename": "vault_1.1.0_linux_amd64.zip",
                    "url": "{url}/vault/1.1.0/vault_1.1.0_linux_amd64.zip"}}]}}
            }}}}}}"#,
            url = server_url
        );
        let index = Index::from_slice(manifest.as_bytes()).unwrap();
        Fixture {
            _dir: dir,
            settings,
            http: HttpClient::new(Client::new()).retry_delay(Duration::from_millis(1)),
            resolver: Resolver::new(index, Platform::new("linux", "amd64")),
        }
    }

    async fn serve_zip(
        server: &mut mockito::Server,
        version: &str,
        hits: usize,
    ) -> mockito::Mock {
        let content = format!("vault {}", version);
        let body = create_zip(&[
            ("vault", content.as_str(), 0o755),
            ("LICENSE.txt", "MPL-2.0", 0o644),
        ]);
        server
            .mock(
                "GET",
                format!("/vault/{v}/vault_{v}_linux_amd64.zip", v = version).as_str(),
            )
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_install_extracts_into_version_dir() {
        let mut server = mockito::Server::new_async().await;
        let mock = serve_zip(&mut server, "1.0.0", 1).await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        let release = f.resolver.resolve("vault", "1.0.0").unwrap();
        let dir = installer.install(&release).await.unwrap();

        mock.assert_async().await;
        assert_eq!(dir, f.settings.version_dir("vault", "1.0.0"));
        assert_eq!(
            std::fs::read_to_string(dir.join(executable_name("vault"))).unwrap(),
            "vault 1.0.0"
        );
        // the archive itself is not kept
        assert!(!dir.join("vault_1.0.0_linux_amd64.zip").exists());
        assert!(!dir.join("vault_1.0.0_linux_amd64.zip.part").exists());
    }

    #[tokio::test]
    async fn test_install_is_skipped_when_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = serve_zip(&mut server, "1.0.0", 1).await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        let release = f.resolver.resolve("vault", "1.0.0").unwrap();
        installer.install(&release).await.unwrap();
        installer.install(&release).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_install_leaves_nothing_behind() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/vault/1.0.0/vault_1.0.0_linux_amd64.zip")
            .with_status(404)
            .create_async()
            .await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        let release = f.resolver.resolve("vault", "1.0.0").unwrap();
        assert!(installer.install(&release).await.is_err());
        assert!(!f.settings.version_dir("vault", "1.0.0").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_link_switch_and_uninstall() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = serve_zip(&mut server, "1.0.0", 1).await;
        let _m2 = serve_zip(&mut server, "1.1.0", 1).await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        let v1 = f.resolver.resolve("vault", "1.0.0").unwrap();
        let link = installer.link(&v1).await.unwrap();
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "vault 1.0.0");

        let latest = f.resolver.resolve("vault", "latest").unwrap();
        installer.link(&latest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "vault 1.1.0");

        let installed = installer.installed("vault").unwrap();
        assert_eq!(installed.versions, vec!["1.0.0", "1.1.0"]);
        assert_eq!(installed.current.as_deref(), Some("1.1.0"));

        // Uninstalling the inactive version keeps the link.
        installer.uninstall("vault", "1.0.0").unwrap();
        assert!(RealRuntime.is_symlink(&link));

        installer.uninstall("vault", "1.1.0").unwrap();
        assert!(!RealRuntime.is_symlink(&link));
        assert_eq!(installer.installed("vault").unwrap(), Installed::default());
    }

    #[tokio::test]
    async fn test_link_refuses_to_replace_regular_file() {
        let mut server = mockito::Server::new_async().await;
        let _m = serve_zip(&mut server, "1.0.0", 1).await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        std::fs::create_dir_all(&f.settings.links_dir).unwrap();
        let link = f.settings.link_path("vault");
        std::fs::write(&link, "someone else's vault").unwrap();

        let release = f.resolver.resolve("vault", "1.0.0").unwrap();
        assert!(installer.link(&release).await.is_err());
        assert_eq!(
            std::fs::read_to_string(&link).unwrap(),
            "someone else's vault"
        );
    }

    #[test]
    fn test_uninstall_not_installed() {
        let f = fixture("http://unused.invalid");
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);
        let err = installer.uninstall("vault", "1.0.0").unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }

    #[tokio::test]
    async fn test_download_and_save_keeps_file_as_is() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/vault/1.0.0/vault_1.0.0_linux_amd64.zip")
            .with_status(200)
            .with_body("raw artifact")
            .create_async()
            .await;
        let f = fixture(&server.url());
        let installer = Installer::new(&RealRuntime, &f.http, &f.settings);

        let release = f.resolver.resolve("vault", "1.0.0").unwrap();
        let dest = f.settings.cache_dir.join(&release.build.filename);
        std::fs::create_dir_all(&f.settings.cache_dir).unwrap();

        let saved = installer.download_and_save(release.build, &dest).await.unwrap();
        assert_eq!(saved, dest);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "raw artifact");
    }
}
