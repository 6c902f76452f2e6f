//! Command implementations behind the CLI.
//!
//! Every command that needs the release index loads it once through the
//! cache, resolves against it and hands the result to the installer.

use anyhow::{Result, anyhow, bail};
use log::{debug, info};

use crate::config::{DMG_ONLY, Settings, is_core_product};
use crate::error::ResolveError;
use crate::http::HttpClient;
use crate::index::IndexCache;
use crate::install::Installer;
use crate::platform::Platform;
use crate::resolve::Resolver;
use crate::runtime::Runtime;
use crate::version::ListingOptions;

/// Lifecycle actions taking a product and a version token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Download,
    Install,
    Uninstall,
    Use,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Download => "download",
            Action::Install => "install",
            Action::Uninstall => "uninstall",
            Action::Use => "use",
        }
    }
}

/// Everything a command needs, built once per invocation.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub settings: Settings,
    pub http: HttpClient,
    pub platform: Platform,
    pub options: ListingOptions,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, releases_url: Option<String>, options: ListingOptions) -> Result<Self> {
        let settings = Settings::from_env(&runtime, releases_url)?;
        let http = HttpClient::with_user_agent(env!("HASHI_VERSION"))?;
        Ok(Self {
            runtime,
            settings,
            http,
            platform: Platform::detect(),
            options,
        })
    }

    async fn resolver(&self) -> Result<Resolver, ResolveError> {
        let cache = IndexCache::new(
            &self.runtime,
            &self.http,
            self.settings.releases_url.as_str(),
            self.settings.cache_dir.as_path(),
        );
        Resolver::load(&cache, self.platform.clone()).await
    }

    fn installer(&self) -> Installer<'_, R> {
        Installer::new(&self.runtime, &self.http, &self.settings)
    }

    /// Non-core products are only reachable with `--all`.
    fn ensure_visible(&self, product: &str) -> Result<()> {
        if !self.options.all && !is_core_product(product) {
            bail!(
                "{} is not a core product; pass --all (or set HASHI_ALL) to use it",
                product
            );
        }
        Ok(())
    }
}

/// Print product names known to the index.
#[tracing::instrument(skip(config))]
pub async fn products<R: Runtime>(config: &Config<R>) -> Result<()> {
    let resolver = config.resolver().await?;
    for name in resolver.index().list_products() {
        if config.options.all || is_core_product(name) {
            println!("{}", name);
        }
    }
    Ok(())
}

/// Print the versions of `product` passing the listing switches, oldest first.
#[tracing::instrument(skip(config))]
pub async fn list_available<R: Runtime>(config: &Config<R>, product: &str) -> Result<()> {
    config.ensure_visible(product)?;
    let resolver = config.resolver().await?;
    let versions = resolver
        .list_available(product, &config.options)
        .map_err(explain)?;
    for version in versions {
        println!("{}", version);
    }
    Ok(())
}

/// Print installed versions of `product`, marking the linked one.
#[tracing::instrument(skip(config))]
pub fn list<R: Runtime>(config: &Config<R>, product: &str) -> Result<()> {
    config.ensure_visible(product)?;
    let installed = config.installer().installed(product)?;
    if installed.versions.is_empty() {
        println!("No versions of {} installed.", product);
        return Ok(());
    }

    debug!(
        "{} installed versions of {}, current {:?}",
        installed.versions.len(),
        product,
        installed.current
    );
    for version in &installed.versions {
        if installed.current.as_deref() == Some(version.as_str()) {
            println!("* {}", version);
        } else {
            println!("  {}", version);
        }
    }
    Ok(())
}

/// Resolve `product`/`token` and run `action` on the result.
#[tracing::instrument(skip(config))]
pub async fn run<R: Runtime>(
    config: &Config<R>,
    action: Action,
    product: &str,
    token: &str,
) -> Result<()> {
    config.ensure_visible(product)?;
    let resolver = config.resolver().await?;
    let release = resolver.resolve(product, token).map_err(explain)?;
    let installer = config.installer();

    info!(
        "{} {} {}",
        action.name(),
        release.product_name(),
        release.version_literal()
    );

    match action {
        Action::Download => {
            let cwd = config.runtime.current_dir()?;
            let path = if config.platform.os == "darwin" && DMG_ONLY.contains(&product) {
                installer
                    .download_and_save(release.build, &cwd.join(&release.build.filename))
                    .await?
            } else {
                installer
                    .download_and_extract(release.build, &cwd, product)
                    .await?
            };
            println!("Saved {}", path.display());
        }
        Action::Install => {
            let dir = installer.install(&release).await?;
            println!("Installed to {}", dir.display());
        }
        Action::Uninstall => {
            installer.uninstall(product, release.version_literal())?;
            println!(
                "Uninstalled {} {}",
                release.product_name(),
                release.version_literal()
            );
        }
        Action::Use => {
            let link = installer.link(&release).await?;
            let target = config
                .settings
                .executable_path(product, release.version_literal());
            println!("{} -> {}", link.display(), target.display());
        }
    }
    Ok(())
}

/// Attach a next step to recoverable resolution failures.
fn explain(err: ResolveError) -> anyhow::Error {
    let hint = match &err {
        ResolveError::UnknownVersion { product, .. } => Some(format!(
            "provide 'latest' or a version from `hashi list-available {}`",
            product
        )),
        ResolveError::NoPlatformBuild { .. } => {
            Some("this release is not published for this platform".to_string())
        }
        _ => None,
    };
    match hint {
        Some(hint) => anyhow!(err).context(hint),
        None => anyhow!(err),
    }
}
