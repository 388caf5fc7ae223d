use std::sync::Arc;

use dotenvy::dotenv;
use log::info;

use servidesk::config::AppConfig;
use servidesk::mailer::{Mailer, NoopMailer, SmtpMailer};
use servidesk::notify::broadcaster::ChannelBroadcaster;
use servidesk::shared::state::AppState;
use servidesk::shared::utils::{create_conn, run_migrations};
use servidesk::storage::DiskEvidenceStore;
use servidesk::{app_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    let pool = create_conn(&config.database.url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        match command.as_str() {
            "seed" => {
                seed::run(&pool)?;
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {other}");
                eprintln!("Usage: servidesk [seed]");
                std::process::exit(2);
            }
        }
    }

    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(email) => Arc::new(SmtpMailer::new(email)?),
        None => Arc::new(NoopMailer),
    };
    let state = Arc::new(AppState {
        conn: pool,
        broadcaster: Arc::new(ChannelBroadcaster::new(256)),
        mailer,
        evidence_store: Arc::new(DiskEvidenceStore::new(&config.storage.evidence_dir)),
        config: config.clone(),
    });

    let app = app_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
