use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use pubmed_query::{cli::{self, Cli}, config::Config};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing; logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| "pubmed_query=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Configuration loaded: {:?}", config);

    let cli = Cli::parse();
    cli::run(cli, &config)
}
