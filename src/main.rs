use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use telehealth_session::{
    create_router, AppState, Config, DeviceMediaFactory, HttpRecordingService, HttpTokenClient,
    JoinLinkIssuer, NatsTransport, RecordingCoordinator, SessionDefaults, SessionDeps,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "telehealth-session", about = "Telehealth media session service")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/telehealth-session")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!("Token service: {}", cfg.token.endpoint);
    info!("Recording service: {}", cfg.recording.base_url);

    let transport = NatsTransport::connect(&cfg.transport.nats_url, &cfg.transport.subject_prefix).await?;

    let deps = SessionDeps {
        token_client: Arc::new(HttpTokenClient::new(&cfg.token)?),
        media: Arc::new(DeviceMediaFactory::new(
            cfg.media.devices.clone(),
            cfg.media.permission_granted,
        )),
        transport: Arc::new(transport),
    };

    let recordings = Arc::new(RecordingCoordinator::new(Arc::new(HttpRecordingService::new(
        &cfg.recording,
    )?)));
    let links = Arc::new(JoinLinkIssuer::new(&cfg.links)?);

    let defaults = SessionDefaults {
        constraints: cfg.media.constraints.clone(),
        token_attempts: cfg.token.max_attempts,
        token_retry_backoff: cfg.token.retry_backoff(),
        min_participants: cfg.recording.min_participants,
    };

    let app = create_router(AppState::new(deps, recordings, links, defaults));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
