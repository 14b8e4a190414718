use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use vss_graphql::authz::Authenticator;
use vss_graphql::catalog::Catalog;
use vss_graphql::settings::Settings;
use vss_graphql::storage::SignalSource;
use vss_graphql::{graphql, web};

#[derive(Parser, Debug)]
#[command(
    name = "vss-graphql",
    version,
    about = "GraphQL gateway for Vehicle Signal Specification data"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let catalog = Catalog::vehicle()?;
    let authenticator = Authenticator::from_settings(&settings.auth)?;
    tracing::info!(algorithm = %authenticator.algorithm(), "Token verification ready");

    let source = SignalSource::from_settings(&settings.storage, &catalog).await?;
    let schema = graphql::build_schema(&catalog, source)?;

    // start web server
    web::serve(settings, schema, authenticator).await?;
    Ok(())
}
