use anyhow::{Result, bail};
use clap::Parser;
use clap::builder::FalseyValueParser;
use hashi::commands::{self, Action, Config};
use hashi::version::ListingOptions;

/// hashi - HashiCorp release installer
///
/// Resolve, download and install HashiCorp products from the public
/// release index.
///
/// Versions are accepted as exact literals (e.g. 1.15.2, 1.16.0-rc1,
/// 1.15.2+ent) or as `latest`, the highest version the index lists.
///
/// Examples:
///   hashi list-available vault
///   hashi install terraform latest
///   hashi use nomad 1.7.2
#[derive(Parser, Debug)]
#[command(author, version = env!("HASHI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Releases base URL (defaults to https://releases.hashicorp.com)
    #[arg(
        long = "releases-url",
        env = "HASHI_RELEASES_URL",
        value_name = "URL",
        global = true
    )]
    releases_url: Option<String>,

    /// Show and accept every product and version
    #[arg(long, env = "HASHI_ALL", value_parser = FalseyValueParser::new(), global = true)]
    all: bool,

    /// Include -beta and -rc versions in listings
    #[arg(
        long = "with-beta",
        env = "HASHI_BETA",
        value_parser = FalseyValueParser::new(),
        global = true
    )]
    with_beta: bool,

    /// List only +ent versions
    #[arg(
        long = "only-enterprise",
        env = "HASHI_ENTERPRISE",
        value_parser = FalseyValueParser::new(),
        global = true
    )]
    only_enterprise: bool,
}

impl Cli {
    fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            all: self.all,
            beta: self.with_beta,
            enterprise: self.only_enterprise,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List products in the release index
    Products,

    /// List versions of a product available for download
    ListAvailable(ProductArgs),

    /// List installed versions of a product
    List(ProductArgs),

    /// Download and unpack a release into the current directory
    Download(ReleaseArgs),

    /// Install a release under the bin directory
    Install(ReleaseArgs),

    /// Remove an installed release
    Uninstall(ReleaseArgs),

    /// Install a release if needed and make it the active one
    Use(ReleaseArgs),
}

#[derive(clap::Args, Debug)]
struct ProductArgs {
    /// Product name, e.g. "vault"
    #[arg(value_name = "PRODUCT")]
    product: String,
}

#[derive(clap::Args, Debug)]
struct ReleaseArgs {
    /// Product name, e.g. "vault"
    #[arg(value_name = "PRODUCT")]
    product: String,

    /// Exact version literal or "latest"
    #[arg(value_name = "VERSION")]
    version: Option<String>,
}

impl ReleaseArgs {
    fn version_for(&self, action: Action) -> Result<&str> {
        match self.version.as_deref() {
            Some(version) => Ok(version),
            None => bail!(
                "usage: hashi {} {} <VERSION>\n\nProvide 'latest' or a version from `hashi list-available {}`",
                action.name(),
                self.product,
                self.product
            ),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let options = cli.listing_options();
    let config = Config::new(hashi::runtime::RealRuntime, cli.releases_url, options)?;

    let (action, args) = match &cli.command {
        Commands::Products => return commands::products(&config).await,
        Commands::ListAvailable(args) => {
            return commands::list_available(&config, &args.product).await;
        }
        Commands::List(args) => return commands::list(&config, &args.product),
        Commands::Download(args) => (Action::Download, args),
        Commands::Install(args) => (Action::Install, args),
        Commands::Uninstall(args) => (Action::Uninstall, args),
        Commands::Use(args) => (Action::Use, args),
    };
    let version = args.version_for(action)?;
    commands::run(&config, action, &args.product, version).await
}
