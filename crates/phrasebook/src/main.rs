use clap::Parser;
use phrasebook_lib::auth::Authenticator;
use phrasebook_lib::config::Config;
use phrasebook_lib::events::EventBus;
use phrasebook_lib::graphql_api::{self, ApiSchemaContext};
use phrasebook_lib::{http, CliOptions, PrometheusExporter, PHRASEBOOK_VERSION};
use phrasebook_store::Store;
use prometheus_exporter::prometheus;
use tracing::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Parse options");
    let cli_options = CliOptions::parse();
    info!(version = PHRASEBOOK_VERSION, env = %cli_options.env, "Starting Phrasebook");

    let config = match &cli_options.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            Config::read(path)?
        }
        None => Config::default(),
    };

    info!("Initialize store and running migrations");
    let store = Store::new(&cli_options.database_url).await?;
    info!("Store initialization successful");

    // Prometheus metrics.
    let _exporter = if cli_options.prometheus_port == 0 {
        None
    } else {
        let registry = prometheus::default_registry().clone();
        let exporter = PrometheusExporter::start(cli_options.prometheus_port, registry)?;
        info!(port = exporter.port(), "Exporting Prometheus metrics");
        Some(exporter)
    };

    if cli_options.jwt_secret.is_none() {
        warn!("No JWT secret configured, every request will be anonymous");
    }
    let authenticator = Authenticator::new(
        cli_options.jwt_secret.as_deref(),
        !cli_options.env.is_production(),
    );

    let ctx = ApiSchemaContext::new(store, EventBus::default(), &config);
    let schema = graphql_api::api_schema(ctx);
    let router = http::router(schema, authenticator, &config, cli_options.env)?;

    http::serve(router, cli_options.port, &config.graphql.path).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
