use anyhow::{Context, Result};
use nomadnet_releases::cli::{self, Command};
use nomadnet_releases::config::{Config, Paths};
use nomadnet_releases::counter::CounterStore;
use nomadnet_releases::download;
use nomadnet_releases::provider::GithubProvider;
use nomadnet_releases::store::DocumentStore;
use nomadnet_releases::sync;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args = cli::parse_args();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = Config::resolve_path(args.config.as_deref());
    let config = Config::load(&config_path)?;
    let paths = config.paths()?;

    match args.command.unwrap_or(Command::Sync) {
        Command::Sync => run_sync(&config, &paths),
        Command::Count { filename } => {
            let counter = CounterStore::open(paths.counts_file());
            println!("{}", counter.increment(&filename));
            Ok(())
        }
        Command::Show { filename } => {
            let counter = CounterStore::open(paths.counts_file());
            println!("{}", counter.get(&filename));
            Ok(())
        }
        Command::Download { filename } => {
            let doc = DocumentStore::new(paths.releases_file()).load();
            let counter = CounterStore::open(paths.counts_file());
            let line = download::page_output(doc.as_ref(), &counter, &paths.files_dir, &filename)?;
            println!("{line}");
            Ok(())
        }
    }
}

fn run_sync(config: &Config, paths: &Paths) -> Result<()> {
    info!(
        "Syncing {} every {}h (scheduled externally)",
        config.github_repo, config.sync_interval_hours
    );
    let provider = GithubProvider::new(&config.github_repo).context("failed to build HTTP client")?;
    sync::run(config, paths, &provider)
}
