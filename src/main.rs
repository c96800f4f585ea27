use clap::Parser;
use pamphlet::{config::Config, fetch::HttpFetcher, state::Cms};
use std::sync::Arc;
use tracing::info;

/// Headless driver: initializes the runtime against a published site and
/// prints the view resolved for a route.
#[derive(Debug, Clone, Parser)]
pub struct StartArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config_path: String,

    /// Route to resolve after startup; defaults to the configured view.
    #[arg(short, long)]
    pub route: Option<String>,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,
}

#[tokio::main]
async fn main() {
    let StartArgs {
        config_path,
        route,
        log_level: level,
    } = StartArgs::parse();

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::read(config_path).expect("invalid config file");

    let mut cms =
        Cms::new(config, Arc::new(HttpFetcher::new())).expect("invalid configuration");

    cms.init().await.expect("error during initialization");

    if let Some(route) = route {
        cms.navigate(route).await.expect("error resolving route");
    }

    info!("resolved {}", cms.current_url());

    if let Some(rendered) = cms.rendered() {
        println!("{}", rendered.html);
    }
}
