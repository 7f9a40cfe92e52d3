use anyhow::Context;
use clap::Parser;
use clinic_server::config::{load_config, ConfigSource};
use clinic_server::logging::init_logging;
use clinic_server::{build_clinic, build_router, AppState};

/// Clinic records server
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "clinic.toml", env = "CLINIC_CONFIG")]
    config: String,

    /// Listen address, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (mut config, source) = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
        config.validate()?;
    }

    init_logging(&config.logging, cli.log_level.as_deref())?;
    match &source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "configuration loaded"),
        ConfigSource::Defaults(path) => {
            tracing::info!(path = %path.display(), "no configuration file, using defaults")
        }
    }

    let addr = config.bind_addr()?;
    let clinic = build_clinic(&config).context("failed to initialize record store")?;
    let app = build_router(AppState::new(clinic));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "clinic server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
